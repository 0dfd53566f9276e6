use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use transita_core::WebhookAck;

#[derive(Debug, Deserialize)]
struct PaymentInitiateRequest {
    booking_id: Uuid,
    /// One of: flutterwave, mtn, airtel.
    provider: String,
    amount_cents: i64,
    #[serde(default = "default_currency")]
    currency: String,
}

fn default_currency() -> String {
    "UGX".to_string()
}

#[derive(Debug, Serialize)]
struct PaymentInitiateResponse {
    provider: String,
    provider_ref: String,
    checkout_url: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/payments/initiate", post(initiate_payment))
        .route("/v1/payments/webhook/{provider}", post(payment_webhook))
}

/// POST /v1/payments/initiate
async fn initiate_payment(
    State(state): State<AppState>,
    Json(req): Json<PaymentInitiateRequest>,
) -> Result<Json<PaymentInitiateResponse>, AppError> {
    let initiated = state
        .reconciler
        .initiate(req.booking_id, &req.provider, req.amount_cents, &req.currency)
        .await?;

    Ok(Json(PaymentInitiateResponse {
        provider: initiated.record.provider,
        provider_ref: initiated.record.provider_ref,
        checkout_url: initiated.checkout_url,
    }))
}

/// POST /v1/payments/webhook/{provider}
/// Receive payment status updates. Signature verification needs the exact
/// raw body bytes, so this handler takes the body unparsed.
async fn payment_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect();

    let disposition = state
        .reconciler
        .handle_webhook(&provider, &headers, &body)
        .await?;

    state
        .metrics
        .payment_events
        .with_label_values(&[provider.as_str(), disposition.as_str()])
        .inc();

    Ok(Json(WebhookAck { received: true }))
}
