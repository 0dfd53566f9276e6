#![allow(dead_code)]

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use transita_booking::{BookingCoordinator, PaymentReconciler, ProviderRegistry, SeatLockManager};
use transita_core::{
    AcquireOutcome, Booking, ConfirmOutcome, Lease, LeaseStore, ReservationLedger,
};
use transita_store::{MemoryLeaseStore, MemoryLedger};

pub const FLUTTERWAVE_SECRET: &str = "test_flutterwave_secret";
pub const MTN_SECRET: &str = "test_mtn_secret";
pub const AIRTEL_SECRET: &str = "test_airtel_secret";

pub struct Harness {
    pub store: Arc<MemoryLeaseStore>,
    pub ledger: Arc<MemoryLedger>,
    pub locks: Arc<SeatLockManager>,
    pub coordinator: Arc<BookingCoordinator>,
    pub reconciler: Arc<PaymentReconciler>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryLeaseStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let locks = Arc::new(SeatLockManager::new(
        store.clone() as Arc<dyn LeaseStore>,
        300,
    ));
    let coordinator = Arc::new(BookingCoordinator::new(
        locks.clone(),
        ledger.clone() as Arc<dyn ReservationLedger>,
    ));
    let registry =
        ProviderRegistry::with_default_providers(FLUTTERWAVE_SECRET, MTN_SECRET, AIRTEL_SECRET);
    let reconciler = Arc::new(PaymentReconciler::new(
        registry,
        ledger.clone() as Arc<dyn ReservationLedger>,
        locks.clone(),
        store.clone() as Arc<dyn LeaseStore>,
        3600,
    ));
    Harness {
        store,
        ledger,
        locks,
        coordinator,
        reconciler,
    }
}

pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

pub fn signed_headers(secret: &str, body: &[u8]) -> HashMap<String, String> {
    HashMap::from([("x-signature".to_string(), sign(secret, body))])
}

/// A mobile-wallet style webhook body with a unique event id.
pub fn wallet_webhook_body(event_id: &str, provider_ref: &str, status: &str) -> Vec<u8> {
    serde_json::json!({
        "id": event_id,
        "data": {
            "transaction_id": provider_ref,
            "status": status,
            "amount": 50.0,
        }
    })
    .to_string()
    .into_bytes()
}

pub async fn acquire_lease(h: &Harness, trip_id: Uuid, seat_id: Uuid) -> Lease {
    match h.locks.acquire(trip_id, seat_id, Some(60)).await.unwrap() {
        AcquireOutcome::Held(lease) => lease,
        AcquireOutcome::Conflict => panic!("seat unexpectedly locked"),
    }
}

pub async fn lock_and_confirm(h: &Harness, trip_id: Uuid, seat_id: Uuid) -> Booking {
    let lease = acquire_lease(h, trip_id, seat_id).await;
    match h
        .coordinator
        .confirm(trip_id, seat_id, &lease.token, Uuid::new_v4())
        .await
        .unwrap()
    {
        ConfirmOutcome::Confirmed(booking) => booking,
        other => panic!("confirm failed: {:?}", other),
    }
}
