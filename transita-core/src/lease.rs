use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A time-bounded advisory exclusive claim on a (trip, seat) pair.
///
/// The lease lives only in the shared ephemeral store; the opaque token
/// proves ownership of this particular acquisition. It is destroyed on
/// consumption, voluntary release or TTL expiry — never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub trip_id: Uuid,
    pub seat_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum AcquireOutcome {
    Held(Lease),
    /// A live lease already exists for this (trip, seat).
    Conflict,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed,
    /// Key absent or held under a different token.
    Invalid,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    /// Token supplied but it did not match the live lease.
    Invalid,
}
