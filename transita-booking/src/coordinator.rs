use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::locks::SeatLockManager;
use crate::EngineError;
use transita_core::{
    ConfirmOutcome, ConflictReason, ConsumeOutcome, LedgerError, NewBooking, ReservationLedger,
};

/// Converts a validated lease into a durable booking.
///
/// The lease gets consumed first; the ledger transaction then decrements
/// capacity conditioned on `seats_available > 0` and inserts the booking,
/// with the storage uniqueness constraint as the last line of defense. For
/// a given (trip, seat) at most one confirm can ever succeed, however many
/// callers race or bypass the lease layer.
pub struct BookingCoordinator {
    locks: Arc<SeatLockManager>,
    ledger: Arc<dyn ReservationLedger>,
}

impl BookingCoordinator {
    pub fn new(locks: Arc<SeatLockManager>, ledger: Arc<dyn ReservationLedger>) -> Self {
        Self { locks, ledger }
    }

    pub async fn confirm(
        &self,
        trip_id: Uuid,
        seat_id: Uuid,
        token: &str,
        booker_id: Uuid,
    ) -> Result<ConfirmOutcome, EngineError> {
        // 1. Consume the lease; a mismatch means it expired or was re-issued.
        if self.locks.consume(trip_id, seat_id, token).await? == ConsumeOutcome::Invalid {
            return Ok(ConfirmOutcome::Expired);
        }

        // 2. One atomic transaction: conditioned decrement + insert.
        match self
            .ledger
            .confirm_booking(NewBooking {
                trip_id,
                seat_id,
                booker_id,
                amount_cents: 0,
            })
            .await
        {
            Ok(booking) => {
                info!(booking_id = %booking.id, %trip_id, %seat_id, "booking confirmed");
                Ok(ConfirmOutcome::Confirmed(booking))
            }
            Err(LedgerError::NoCapacity) => Ok(ConfirmOutcome::Conflict(ConflictReason::NoSeats)),
            Err(LedgerError::SeatTaken) => Ok(ConfirmOutcome::Conflict(ConflictReason::SeatBooked)),
            Err(e) => Err(EngineError::Ledger(e)),
        }
    }
}
