use thiserror::Error;

/// Failure talking to the shared ephemeral store (Redis or the in-memory
/// stand-in). Always transient from the caller's point of view: retry with
/// backoff. Contention is never reported through this type — the lease
/// operations return explicit outcomes instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lease store unavailable: {0}")]
    Unavailable(String),
}

/// Failure applying a change to the reservation ledger.
///
/// `NoCapacity` and `SeatTaken` are expected contention results of the
/// booking transaction; callers translate them into conflict outcomes rather
/// than surfacing them as errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no seats available")]
    NoCapacity,
    #[error("seat already booked")]
    SeatTaken,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}
