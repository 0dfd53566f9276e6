use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::EngineError;
use transita_core::{AcquireOutcome, ConsumeOutcome, Lease, LeaseStore, ReleaseOutcome};

/// Issues, validates and releases time-bounded exclusive seat leases.
///
/// The lease is a soft mutex for user-facing flow control; the ledger's
/// uniqueness constraint remains the correctness boundary. There is no
/// renewal — a holder finishes within the TTL or re-acquires.
pub struct SeatLockManager {
    store: Arc<dyn LeaseStore>,
    default_ttl_seconds: u64,
}

impl SeatLockManager {
    pub fn new(store: Arc<dyn LeaseStore>, default_ttl_seconds: u64) -> Self {
        Self {
            store,
            default_ttl_seconds,
        }
    }

    /// Attempt a create-if-absent of the lease with a fresh token.
    pub async fn acquire(
        &self,
        trip_id: Uuid,
        seat_id: Uuid,
        ttl_seconds: Option<u64>,
    ) -> Result<AcquireOutcome, EngineError> {
        let ttl = ttl_seconds.unwrap_or(self.default_ttl_seconds);
        // Token stored as the lock value keeps compare-and-delete simple.
        let token = Uuid::new_v4().to_string();

        let created = self
            .store
            .acquire_seat_lock(trip_id, seat_id, &token, ttl)
            .await?;
        if !created {
            debug!(%trip_id, %seat_id, "seat lock conflict");
            return Ok(AcquireOutcome::Conflict);
        }

        Ok(AcquireOutcome::Held(Lease {
            trip_id,
            seat_id,
            token,
            expires_at: Utc::now() + Duration::seconds(ttl as i64),
        }))
    }

    /// Atomically validate the token and delete the lease.
    pub async fn consume(
        &self,
        trip_id: Uuid,
        seat_id: Uuid,
        token: &str,
    ) -> Result<ConsumeOutcome, EngineError> {
        let consumed = self.store.consume_seat_lock(trip_id, seat_id, token).await?;
        Ok(if consumed {
            ConsumeOutcome::Consumed
        } else {
            ConsumeOutcome::Invalid
        })
    }

    /// Release a lease. With a token this only succeeds when the token
    /// matches; without one it deletes unconditionally (administrative or
    /// compensating release) and always reports `Released`.
    pub async fn release(
        &self,
        trip_id: Uuid,
        seat_id: Uuid,
        token: Option<&str>,
    ) -> Result<ReleaseOutcome, EngineError> {
        match token {
            Some(token) => {
                let removed = self.store.consume_seat_lock(trip_id, seat_id, token).await?;
                Ok(if removed {
                    ReleaseOutcome::Released
                } else {
                    ReleaseOutcome::Invalid
                })
            }
            None => {
                self.store.release_seat_lock(trip_id, seat_id).await?;
                Ok(ReleaseOutcome::Released)
            }
        }
    }
}
