use std::sync::Arc;

use crate::metrics::Metrics;
use transita_booking::{BookingCoordinator, PaymentReconciler, SeatLockManager};
use transita_core::ReservationLedger;

#[derive(Clone)]
pub struct AppState {
    pub locks: Arc<SeatLockManager>,
    pub coordinator: Arc<BookingCoordinator>,
    pub reconciler: Arc<PaymentReconciler>,
    pub ledger: Arc<dyn ReservationLedger>,
    pub metrics: Arc<Metrics>,
}
