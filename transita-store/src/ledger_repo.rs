use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use transita_core::{
    Booking, BookingStatus, LedgerError, NewBooking, PaymentRecord, PaymentStatus,
    ReservationLedger, SettlementOutcome,
};

/// Postgres-backed reservation ledger.
///
/// The partial unique index on active bookings (see the initial migration)
/// is the authoritative double-booking guard; everything here funnels
/// capacity changes through conditioned updates so no read-modify-write
/// window exists.
pub struct PgReservationLedger {
    pool: PgPool,
}

fn unavailable(e: sqlx::Error) -> LedgerError {
    LedgerError::Unavailable(e.to_string())
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    trip_id: Uuid,
    seat_id: Uuid,
    booker_id: Uuid,
    status: String,
    amount_cents: i64,
    booked_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, LedgerError> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| LedgerError::Unavailable(format!("bad booking status {}", self.status)))?;
        Ok(Booking {
            id: self.id,
            trip_id: self.trip_id,
            seat_id: self.seat_id,
            booker_id: self.booker_id,
            status,
            amount_cents: self.amount_cents,
            booked_at: self.booked_at,
        })
    }
}

impl PgReservationLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Locate-or-create the payment row for a provider reference and set its
    /// status. Returns the linked booking id, if any.
    async fn upsert_payment(
        tx: &mut Transaction<'_, Postgres>,
        provider: &str,
        provider_ref: &str,
        amount_cents: Option<i64>,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Uuid>, LedgerError> {
        let existing: Option<(Uuid, Option<Uuid>)> =
            sqlx::query_as("SELECT id, booking_id FROM payments WHERE provider_ref = $1")
                .bind(provider_ref)
                .fetch_optional(&mut **tx)
                .await
                .map_err(unavailable)?;

        match existing {
            Some((id, booking_id)) => {
                sqlx::query("UPDATE payments SET status = $1, paid_at = $2 WHERE id = $3")
                    .bind(status.as_str())
                    .bind(paid_at)
                    .bind(id)
                    .execute(&mut **tx)
                    .await
                    .map_err(unavailable)?;
                Ok(booking_id)
            }
            None => {
                // Webhook for a reference we never initiated: keep the
                // record for reconciliation, unlinked to any booking.
                sqlx::query(
                    "INSERT INTO payments (id, booking_id, provider, provider_ref, status, amount_cents, currency, paid_at) \
                     VALUES ($1, NULL, $2, $3, $4, $5, $6, $7)",
                )
                .bind(Uuid::new_v4())
                .bind(provider)
                .bind(provider_ref)
                .bind(status.as_str())
                .bind(amount_cents.unwrap_or(0))
                .bind("UGX")
                .bind(paid_at)
                .execute(&mut **tx)
                .await
                .map_err(unavailable)?;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ReservationLedger for PgReservationLedger {
    async fn confirm_booking(&self, new: NewBooking) -> Result<Booking, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        // Conditioned decrement: zero rows means the trip is unknown or out
        // of capacity, either way the booking must not proceed.
        let updated = sqlx::query(
            "UPDATE trips SET seats_available = seats_available - 1 \
             WHERE id = $1 AND seats_available > 0",
        )
        .bind(new.trip_id)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        if updated.rows_affected() == 0 {
            return Err(LedgerError::NoCapacity);
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

        let inserted = sqlx::query(
            "INSERT INTO bookings (id, trip_id, seat_id, booker_id, status, amount_cents, booked_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(booking.id)
        .bind(booking.trip_id)
        .bind(booking.seat_id)
        .bind(booking.booker_id)
        .bind(booking.status.as_str())
        .bind(booking.amount_cents)
        .bind(booking.booked_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            // Dropping the transaction rolls the decrement back with it.
            return Err(match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => LedgerError::SeatTaken,
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    LedgerError::NotFound("seat")
                }
                other => unavailable(other),
            });
        }

        tx.commit().await.map_err(unavailable)?;
        Ok(booking)
    }

    async fn booking(&self, id: Uuid) -> Result<Option<Booking>, LedgerError> {
        let row: Option<BookingRow> = sqlx::query_as(
            "SELECT id, trip_id, seat_id, booker_id, status, amount_cents, booked_at \
             FROM bookings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn create_payment(
        &self,
        booking_id: Uuid,
        provider: &str,
        provider_ref: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<PaymentRecord, LedgerError> {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
        if exists.is_none() {
            return Err(LedgerError::NotFound("booking"));
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

        sqlx::query(
            "INSERT INTO payments (id, booking_id, provider, provider_ref, status, amount_cents, currency) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id)
        .bind(record.booking_id)
        .bind(&record.provider)
        .bind(&record.provider_ref)
        .bind(record.status.as_str())
        .bind(record.amount_cents)
        .bind(&record.currency)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(record)
    }

    async fn apply_payment_success(
        &self,
        provider: &str,
        provider_ref: &str,
        amount_cents: Option<i64>,
    ) -> Result<SettlementOutcome, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let booking_id = Self::upsert_payment(
            &mut tx,
            provider,
            provider_ref,
            amount_cents,
            PaymentStatus::Successful,
            Some(Utc::now()),
        )
        .await?;

        let mut outcome = SettlementOutcome {
            booking_id,
            transitioned: false,
            released: None,
        };

        if let Some(id) = booking_id {
            let updated =
                sqlx::query("UPDATE bookings SET status = 'paid' WHERE id = $1 AND status = 'confirmed'")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(unavailable)?;
            outcome.transitioned = updated.rows_affected() == 1;
        }

        tx.commit().await.map_err(unavailable)?;
        Ok(outcome)
    }

    async fn apply_payment_failure(
        &self,
        provider: &str,
        provider_ref: &str,
        amount_cents: Option<i64>,
    ) -> Result<SettlementOutcome, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let booking_id = Self::upsert_payment(
            &mut tx,
            provider,
            provider_ref,
            amount_cents,
            PaymentStatus::Failed,
            None,
        )
        .await?;

        let mut outcome = SettlementOutcome {
            booking_id,
            transitioned: false,
            released: None,
        };

        if let Some(id) = booking_id {
            // The increment is gated on this flip affecting a row, so a
            // booking is cancelled-and-restored exactly once even when the
            // provider sends several distinct failure events for it.
            let flipped: Option<(Uuid, Uuid)> = sqlx::query_as(
                "UPDATE bookings SET status = 'cancelled' \
                 WHERE id = $1 AND status = 'confirmed' \
                 RETURNING trip_id, seat_id",
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unavailable)?;

            if let Some((trip_id, seat_id)) = flipped {
                sqlx::query("UPDATE trips SET seats_available = seats_available + 1 WHERE id = $1")
                    .bind(trip_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(unavailable)?;
                outcome.transitioned = true;
                outcome.released = Some((trip_id, seat_id));
            }
        }

        tx.commit().await.map_err(unavailable)?;
        Ok(outcome)
    }

    async fn record_unknown_payment_status(
        &self,
        provider: &str,
        provider_ref: &str,
        raw_status: &str,
    ) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;
        Self::upsert_payment(
            &mut tx,
            provider,
            provider_ref,
            None,
            PaymentStatus::Unknown,
            None,
        )
        .await?;
        tx.commit().await.map_err(unavailable)?;
        debug!(provider, provider_ref, raw_status, "recorded unknown payment status");
        Ok(())
    }

    async fn seats_available(&self, trip_id: Uuid) -> Result<i32, LedgerError> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT seats_available FROM trips WHERE id = $1")
                .bind(trip_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable)?;
        row.map(|r| r.0).ok_or(LedgerError::NotFound("trip"))
    }
}
