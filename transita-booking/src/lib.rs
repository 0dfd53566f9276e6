pub mod coordinator;
pub mod locks;
pub mod providers;
pub mod reconciler;

pub use coordinator::BookingCoordinator;
pub use locks::SeatLockManager;
pub use providers::ProviderRegistry;
pub use reconciler::{PaymentReconciler, WebhookDisposition};

use thiserror::Error;
use transita_core::{LedgerError, StoreError};

/// Infrastructure failure during an engine operation. Expected contention
/// never takes this path — it is reported through the outcome enums.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
