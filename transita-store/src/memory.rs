//! In-memory implementations of the store traits.
//!
//! Same atomic semantics as the Redis/Postgres implementations, emulated
//! under a process-local mutex. Used by the engine and API test suites and
//! for local development without external services. Not suitable for
//! multi-instance deployments: the mutual-exclusion guarantees stop at the
//! process boundary.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use transita_core::{
    Booking, BookingStatus, LeaseStore, LedgerError, NewBooking, PaymentRecord, PaymentStatus,
    ReservationLedger, Seat, SettlementOutcome, StoreError, Trip, TripStatus,
};

#[derive(Default)]
pub struct MemoryLeaseStore {
    locks: Mutex<HashMap<(Uuid, Uuid), (String, Instant)>>,
    markers: Mutex<HashMap<(String, String), Instant>>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn acquire_seat_lock(
        &self,
        trip_id: Uuid,
        seat_id: Uuid,
        token: &str,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        let mut locks = self.locks.lock().expect("lease store poisoned");
        let now = Instant::now();
        if let Some((_, expires_at)) = locks.get(&(trip_id, seat_id)) {
            if *expires_at > now {
                return Ok(false);
            }
        }
        locks.insert(
            (trip_id, seat_id),
            (token.to_string(), now + Duration::from_secs(ttl_seconds)),
        );
        Ok(true)
    }

    async fn consume_seat_lock(
        &self,
        trip_id: Uuid,
        seat_id: Uuid,
        token: &str,
    ) -> Result<bool, StoreError> {
        let mut locks = self.locks.lock().expect("lease store poisoned");
        let now = Instant::now();
        match locks.get(&(trip_id, seat_id)) {
            Some((_, expires_at)) if *expires_at <= now => {
                locks.remove(&(trip_id, seat_id));
                Ok(false)
            }
            Some((stored, _)) if stored == token => {
                locks.remove(&(trip_id, seat_id));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_seat_lock(&self, trip_id: Uuid, seat_id: Uuid) -> Result<(), StoreError> {
        let mut locks = self.locks.lock().expect("lease store poisoned");
        locks.remove(&(trip_id, seat_id));
        Ok(())
    }

    async fn mark_event_processed(
        &self,
        provider: &str,
        event_id: &str,
        retention_seconds: u64,
    ) -> Result<bool, StoreError> {
        let mut markers = self.markers.lock().expect("marker store poisoned");
        let now = Instant::now();
        let key = (provider.to_string(), event_id.to_string());
        if let Some(expires_at) = markers.get(&key) {
            if *expires_at > now {
                return Ok(false);
            }
        }
        markers.insert(key, now + Duration::from_secs(retention_seconds));
        Ok(true)
    }
}

#[derive(Default)]
struct LedgerInner {
    trips: HashMap<Uuid, Trip>,
    seats: HashMap<Uuid, Seat>,
    bookings: HashMap<Uuid, Booking>,
    /// Keyed by provider reference, which is unique by construction.
    payments: HashMap<String, PaymentRecord>,
}

#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<LedgerInner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_trip(&self, seats_available: i32) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.lock().expect("ledger poisoned");
        inner.trips.insert(
            id,
            Trip {
                id,
                status: TripStatus::Scheduled,
                seats_available,
            },
        );
        id
    }

    pub fn add_seat(&self, trip_id: Uuid, seat_number: &str) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.lock().expect("ledger poisoned");
        inner.seats.insert(
            id,
            Seat {
                id,
                trip_id,
                seat_number: seat_number.to_string(),
            },
        );
        id
    }

    pub fn payment_by_ref(&self, provider_ref: &str) -> Option<PaymentRecord> {
        let inner = self.inner.lock().expect("ledger poisoned");
        inner.payments.get(provider_ref).cloned()
    }
}

impl LedgerInner {
    fn upsert_payment(
        &mut self,
        provider: &str,
        provider_ref: &str,
        amount_cents: Option<i64>,
        status: PaymentStatus,
    ) -> Option<Uuid> {
        match self.payments.get_mut(provider_ref) {
            Some(record) => {
                record.status = status;
                record.paid_at = (status == PaymentStatus::Successful).then(Utc::now);
                record.booking_id
            }
            None => {
                self.payments.insert(
                    provider_ref.to_string(),
                    PaymentRecord {
                        id: Uuid::new_v4(),
                        booking_id: None,
                        provider: provider.to_string(),
                        provider_ref: provider_ref.to_string(),
                        status,
                        amount_cents: amount_cents.unwrap_or(0),
                        currency: "UGX".to_string(),
                        paid_at: (status == PaymentStatus::Successful).then(Utc::now),
                    },
                );
                None
            }
        }
    }
}

#[async_trait]
impl ReservationLedger for MemoryLedger {
    async fn confirm_booking(&self, new: NewBooking) -> Result<Booking, LedgerError> {
        let mut inner = self.inner.lock().expect("ledger poisoned");

        if !inner.seats.contains_key(&new.seat_id) {
            return Err(LedgerError::NotFound("seat"));
        }

        // A missing trip behaves like an exhausted one, matching the
        // conditioned update against the relational store.
        let available = inner
            .trips
            .get(&new.trip_id)
            .map(|t| t.seats_available)
            .unwrap_or(0);
        if available <= 0 {
            return Err(LedgerError::NoCapacity);
        }

        let seat_active = inner.bookings.values().any(|b| {
            b.trip_id == new.trip_id
                && b.seat_id == new.seat_id
                && matches!(b.status, BookingStatus::Confirmed | BookingStatus::Paid)
        });
        if seat_active {
            return Err(LedgerError::SeatTaken);
        }

        if let Some(trip) = inner.trips.get_mut(&new.trip_id) {
            trip.seats_available -= 1;
        }
        let booking = Booking {
            id: Uuid::new_v4(),
            trip_id: new.trip_id,
            seat_id: new.seat_id,
            booker_id: new.booker_id,
            status: BookingStatus::Confirmed,
            amount_cents: new.amount_cents,
            booked_at: Utc::now(),
        };
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn booking(&self, id: Uuid) -> Result<Option<Booking>, LedgerError> {
        let inner = self.inner.lock().expect("ledger poisoned");
        Ok(inner.bookings.get(&id).cloned())
    }

    async fn create_payment(
        &self,
        booking_id: Uuid,
        provider: &str,
        provider_ref: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<PaymentRecord, LedgerError> {
        let mut inner = self.inner.lock().expect("ledger poisoned");
        if !inner.bookings.contains_key(&booking_id) {
            return Err(LedgerError::NotFound("booking"));
        }
        if inner.payments.contains_key(provider_ref) {
            return Err(LedgerError::Unavailable(format!(
                "duplicate provider ref {provider_ref}"
            )));
        }
        let record = PaymentRecord {
            id: Uuid::new_v4(),
            booking_id: Some(booking_id),
            provider: provider.to_string(),
            provider_ref: provider_ref.to_string(),
            status: PaymentStatus::Initiated,
            amount_cents,
            currency: currency.to_string(),
            paid_at: None,
        };
        inner
            .payments
            .insert(provider_ref.to_string(), record.clone());
        Ok(record)
    }

    async fn apply_payment_success(
        &self,
        provider: &str,
        provider_ref: &str,
        amount_cents: Option<i64>,
    ) -> Result<SettlementOutcome, LedgerError> {
        let mut inner = self.inner.lock().expect("ledger poisoned");
        let booking_id =
            inner.upsert_payment(provider, provider_ref, amount_cents, PaymentStatus::Successful);

        let mut outcome = SettlementOutcome {
            booking_id,
            transitioned: false,
            released: None,
        };
        if let Some(id) = booking_id {
            if let Some(booking) = inner.bookings.get_mut(&id) {
                if booking.status == BookingStatus::Confirmed {
                    booking.status = BookingStatus::Paid;
                    outcome.transitioned = true;
                }
            }
        }
        Ok(outcome)
    }

    async fn apply_payment_failure(
        &self,
        provider: &str,
        provider_ref: &str,
        amount_cents: Option<i64>,
    ) -> Result<SettlementOutcome, LedgerError> {
        let mut inner = self.inner.lock().expect("ledger poisoned");
        let booking_id =
            inner.upsert_payment(provider, provider_ref, amount_cents, PaymentStatus::Failed);

        let mut outcome = SettlementOutcome {
            booking_id,
            transitioned: false,
            released: None,
        };
        if let Some(id) = booking_id {
            let flipped = match inner.bookings.get_mut(&id) {
                Some(booking) if booking.status == BookingStatus::Confirmed => {
                    booking.status = BookingStatus::Cancelled;
                    Some((booking.trip_id, booking.seat_id))
                }
                _ => None,
            };
            if let Some((trip_id, seat_id)) = flipped {
                if let Some(trip) = inner.trips.get_mut(&trip_id) {
                    trip.seats_available += 1;
                }
                outcome.transitioned = true;
                outcome.released = Some((trip_id, seat_id));
            }
        }
        Ok(outcome)
    }

    async fn record_unknown_payment_status(
        &self,
        provider: &str,
        provider_ref: &str,
        _raw_status: &str,
    ) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().expect("ledger poisoned");
        inner.upsert_payment(provider, provider_ref, None, PaymentStatus::Unknown);
        Ok(())
    }

    async fn seats_available(&self, trip_id: Uuid) -> Result<i32, LedgerError> {
        let inner = self.inner.lock().expect("ledger poisoned");
        inner
            .trips
            .get(&trip_id)
            .map(|t| t.seats_available)
            .ok_or(LedgerError::NotFound("trip"))
    }
}
