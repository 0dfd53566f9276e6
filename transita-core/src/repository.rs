use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::Booking;
use crate::error::{LedgerError, StoreError};
use crate::payment::PaymentRecord;

/// Shared ephemeral store holding seat leases and webhook idempotency
/// markers, reachable by every service instance.
///
/// Both key families are write-once-per-validity-window: every method is a
/// single atomic store operation, never read-then-write. Returned booleans
/// report the atomic outcome; `Err` means the store itself was unreachable.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Create-if-absent with expiry. True when this call created the lock.
    async fn acquire_seat_lock(
        &self,
        trip_id: Uuid,
        seat_id: Uuid,
        token: &str,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError>;

    /// Compare-and-delete as one indivisible step. True when the stored
    /// token matched and the key was removed. Must never delete a key whose
    /// token differs.
    async fn consume_seat_lock(
        &self,
        trip_id: Uuid,
        seat_id: Uuid,
        token: &str,
    ) -> Result<bool, StoreError>;

    /// Unconditional delete. Deleting an absent key is not an error.
    async fn release_seat_lock(&self, trip_id: Uuid, seat_id: Uuid) -> Result<(), StoreError>;

    /// Write-once replay marker for (provider, event id), kept for the
    /// retention window. True when this call created the marker; false on a
    /// replay.
    async fn mark_event_processed(
        &self,
        provider: &str,
        event_id: &str,
        retention_seconds: u64,
    ) -> Result<bool, StoreError>;
}

/// Input for the atomic confirm transaction.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub trip_id: Uuid,
    pub seat_id: Uuid,
    pub booker_id: Uuid,
    pub amount_cents: i64,
}

/// What a reconciliation write actually changed.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub booking_id: Option<Uuid>,
    /// True when this call flipped a confirmed booking (to paid or
    /// cancelled). False means the gate found it already transitioned, or
    /// the payment matched no booking.
    pub transitioned: bool,
    /// (trip, seat) whose capacity was restored by a cancellation; the
    /// caller should release any residual lease for it.
    pub released: Option<(Uuid, Uuid)>,
}

/// The relational store owning trips, seats, bookings and payments.
///
/// Every method is one atomic transaction. The (trip, seat) uniqueness
/// constraint on active bookings lives here and is the final arbiter
/// against double-booking, independent of the lease layer.
#[async_trait]
pub trait ReservationLedger: Send + Sync {
    /// Atomically decrement `seats_available` (conditioned on `> 0`) and
    /// insert the booking with status confirmed. Zero-row decrement aborts
    /// with `NoCapacity`; a uniqueness violation aborts with `SeatTaken`.
    async fn confirm_booking(&self, new: NewBooking) -> Result<Booking, LedgerError>;

    async fn booking(&self, id: Uuid) -> Result<Option<Booking>, LedgerError>;

    /// Persist an initiated payment attempt for an existing booking.
    async fn create_payment(
        &self,
        booking_id: Uuid,
        provider: &str,
        provider_ref: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<PaymentRecord, LedgerError>;

    /// Locate-or-create the payment by external reference, mark it
    /// successful, and flip the linked booking confirmed → paid. No seat or
    /// capacity change.
    async fn apply_payment_success(
        &self,
        provider: &str,
        provider_ref: &str,
        amount_cents: Option<i64>,
    ) -> Result<SettlementOutcome, LedgerError>;

    /// Locate-or-create the payment by external reference, mark it failed,
    /// flip the linked booking confirmed → cancelled and restore one seat —
    /// all in one transaction. The increment only happens when the status
    /// flip affected a row, so a booking is cancelled-and-restored at most
    /// once no matter how many failure events arrive.
    async fn apply_payment_failure(
        &self,
        provider: &str,
        provider_ref: &str,
        amount_cents: Option<i64>,
    ) -> Result<SettlementOutcome, LedgerError>;

    /// Record an unrecognized provider status for observability. No booking
    /// or trip mutation.
    async fn record_unknown_payment_status(
        &self,
        provider: &str,
        provider_ref: &str,
        raw_status: &str,
    ) -> Result<(), LedgerError>;

    async fn seats_available(&self, trip_id: Uuid) -> Result<i32, LedgerError>;
}
