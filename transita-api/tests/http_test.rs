//! End-to-end flows through the HTTP surface, backed by the in-memory
//! stores.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use transita_api::metrics::Metrics;
use transita_api::{app, AppState};
use transita_booking::{BookingCoordinator, PaymentReconciler, ProviderRegistry, SeatLockManager};
use transita_core::{LeaseStore, ReservationLedger};
use transita_store::{MemoryLeaseStore, MemoryLedger};

const MTN_SECRET: &str = "test_mtn_secret";

struct TestApp {
    router: axum::Router,
    ledger: Arc<MemoryLedger>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryLeaseStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let cache: Arc<dyn LeaseStore> = store;
    let shared_ledger: Arc<dyn ReservationLedger> = ledger.clone();

    let locks = Arc::new(SeatLockManager::new(cache.clone(), 300));
    let coordinator = Arc::new(BookingCoordinator::new(locks.clone(), shared_ledger.clone()));
    let registry = ProviderRegistry::with_default_providers("", MTN_SECRET, "");
    let reconciler = Arc::new(PaymentReconciler::new(
        registry,
        shared_ledger.clone(),
        locks.clone(),
        cache,
        3600,
    ));
    let metrics = Arc::new(Metrics::new().unwrap());

    let state = AppState {
        locks,
        coordinator,
        reconciler,
        ledger: shared_ledger,
        metrics,
    };

    TestApp {
        router: app(state),
        ledger,
    }
}

fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

async fn send(router: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post_json(router: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, req).await
}

async fn get_json(router: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(router, req).await
}

async fn post_webhook(
    router: &axum::Router,
    provider: &str,
    body: &[u8],
    signature: &str,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(format!("/v1/payments/webhook/{provider}"))
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-signature", signature)
        .body(Body::from(body.to_vec()))
        .unwrap();
    send(router, req).await
}

async fn lock_seat(t: &TestApp, trip_id: Uuid, seat_id: Uuid) -> (StatusCode, Value) {
    post_json(
        &t.router,
        "/v1/bookings/locks/lock",
        json!({"trip_id": trip_id, "seat_id": seat_id, "ttl": 60}),
    )
    .await
}

#[tokio::test]
async fn failed_payment_cancels_booking_and_frees_the_seat_for_rebooking() {
    let t = test_app();
    let trip_id = t.ledger.add_trip(1);
    let seat_id = t.ledger.add_seat(trip_id, "S1");

    // Client A locks and confirms the last seat.
    let (status, body) = lock_seat(&t, trip_id, seat_id).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = post_json(
        &t.router,
        "/v1/bookings/locks/confirm",
        json!({"trip_id": trip_id, "seat_id": seat_id, "token": token, "booker_id": Uuid::new_v4()}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let booking_id = body["booking_id"].as_str().unwrap().to_string();
    assert_eq!(t.ledger.seats_available(trip_id).await.unwrap(), 0);

    // A initiates payment; the provider later reports failure.
    let (status, body) = post_json(
        &t.router,
        "/v1/payments/initiate",
        json!({"booking_id": booking_id, "provider": "mtn", "amount_cents": 5000}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let provider_ref = body["provider_ref"].as_str().unwrap().to_string();

    let webhook_body = json!({
        "id": "evt_fail_1",
        "data": {"transaction_id": provider_ref, "status": "failed", "amount": 50.0}
    })
    .to_string()
    .into_bytes();
    let (status, body) =
        post_webhook(&t.router, "mtn", &webhook_body, &sign(MTN_SECRET, &webhook_body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], json!(true));

    let (status, body) = get_json(&t.router, &format!("/v1/bookings/{booking_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("cancelled"));
    assert_eq!(t.ledger.seats_available(trip_id).await.unwrap(), 1);

    // A second client can now take the same seat end to end.
    let (status, body) = lock_seat(&t, trip_id, seat_id).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = post_json(
        &t.router,
        "/v1/bookings/locks/confirm",
        json!({"trip_id": trip_id, "seat_id": seat_id, "token": token, "booker_id": Uuid::new_v4()}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["booking_id"].as_str().unwrap(), booking_id);
}

#[tokio::test]
async fn two_confirms_on_the_same_token_never_create_two_bookings() {
    let t = test_app();
    let trip_id = t.ledger.add_trip(5);
    let seat_id = t.ledger.add_seat(trip_id, "S1");

    let (_, body) = lock_seat(&t, trip_id, seat_id).await;
    let token = body["token"].as_str().unwrap().to_string();
    let payload = json!({
        "trip_id": trip_id,
        "seat_id": seat_id,
        "token": token,
        "booker_id": Uuid::new_v4(),
    });

    let (first, second) = tokio::join!(
        post_json(&t.router, "/v1/bookings/locks/confirm", payload.clone()),
        post_json(&t.router, "/v1/bookings/locks/confirm", payload.clone()),
    );

    let statuses = [first.0, second.0];
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(),
        1
    );
    assert_eq!(t.ledger.seats_available(trip_id).await.unwrap(), 4);
}

#[tokio::test]
async fn success_webhook_is_idempotent_across_three_deliveries() {
    let t = test_app();
    let trip_id = t.ledger.add_trip(2);
    let seat_id = t.ledger.add_seat(trip_id, "S1");

    let (_, body) = lock_seat(&t, trip_id, seat_id).await;
    let token = body["token"].as_str().unwrap().to_string();
    let (_, body) = post_json(
        &t.router,
        "/v1/bookings/locks/confirm",
        json!({"trip_id": trip_id, "seat_id": seat_id, "token": token, "booker_id": Uuid::new_v4()}),
    )
    .await;
    let booking_id = body["booking_id"].as_str().unwrap().to_string();

    let (_, body) = post_json(
        &t.router,
        "/v1/payments/initiate",
        json!({"booking_id": booking_id, "provider": "mtn", "amount_cents": 5000}),
    )
    .await;
    let provider_ref = body["provider_ref"].as_str().unwrap().to_string();

    let webhook_body = json!({
        "id": "evt_ok_1",
        "data": {"transaction_id": provider_ref, "status": "success", "amount": 50.0}
    })
    .to_string()
    .into_bytes();
    let signature = sign(MTN_SECRET, &webhook_body);

    for _ in 0..3 {
        let (status, body) = post_webhook(&t.router, "mtn", &webhook_body, &signature).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["received"], json!(true));
    }

    let (_, body) = get_json(&t.router, &format!("/v1/bookings/{booking_id}")).await;
    assert_eq!(body["status"], json!("paid"));
    // Success events never move capacity.
    assert_eq!(t.ledger.seats_available(trip_id).await.unwrap(), 1);
}

#[tokio::test]
async fn lock_conflicts_and_rejects_surface_as_http_errors() {
    let t = test_app();
    let trip_id = t.ledger.add_trip(2);
    let seat_id = t.ledger.add_seat(trip_id, "S1");

    let (status, _) = lock_seat(&t, trip_id, seat_id).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = lock_seat(&t, trip_id, seat_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("Seat already locked"));

    // Tampered signature never reaches the ledger.
    let webhook_body = br#"{"id":"evt_x","data":{"transaction_id":"mtn_x","status":"success"}}"#;
    let (status, _) = post_webhook(&t.router, "mtn", webhook_body, "deadbeef").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_webhook(
        &t.router,
        "paypal",
        webhook_body,
        &sign(MTN_SECRET, webhook_body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&t.router, &format!("/v1/bookings/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_metrics_endpoints_respond() {
    let t = test_app();
    let trip_id = t.ledger.add_trip(1);
    let seat_id = t.ledger.add_seat(trip_id, "S1");

    let (status, body) = get_json(&t.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));

    lock_seat(&t, trip_id, seat_id).await;

    let req = Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let resp = t.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("transita_seat_lock_attempts_total"));
}
