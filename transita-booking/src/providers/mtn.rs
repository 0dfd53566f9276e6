use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use super::{amount_to_cents, canonical_status, verify_hmac_sha256};
use transita_core::payment::AdapterError;
use transita_core::{CanonicalStatus, InitiatedPayment, NormalizedEvent, PaymentAdapter};

/// MTN Mobile Money. Initiation pushes a wallet prompt to the customer, so
/// there is no checkout URL. Webhook bodies carry the transaction either
/// under `data` or at the top level.
pub struct MtnAdapter {
    secret: String,
}

impl MtnAdapter {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

pub(super) fn normalize_wallet_payload(payload: &serde_json::Value) -> NormalizedEvent {
    let data = if payload["data"].is_object() {
        &payload["data"]
    } else {
        payload
    };

    let raw_status = data["status"]
        .as_str()
        .or_else(|| data["transaction_status"].as_str())
        .map(str::to_string);
    let provider_ref = data["transaction_id"]
        .as_str()
        .or_else(|| data["tx_ref"].as_str())
        .map(str::to_string);

    NormalizedEvent {
        status: raw_status
            .as_deref()
            .map_or(CanonicalStatus::Unknown, canonical_status),
        provider_ref,
        amount_cents: amount_to_cents(&data["amount"]),
        raw_status,
    }
}

#[async_trait]
impl PaymentAdapter for MtnAdapter {
    fn name(&self) -> &'static str {
        "mtn"
    }

    async fn initiate(
        &self,
        _booking_id: Uuid,
        _amount_cents: i64,
        _currency: &str,
    ) -> Result<InitiatedPayment, AdapterError> {
        Ok(InitiatedPayment {
            provider_ref: format!("mtn_{}", Uuid::new_v4().simple()),
            checkout_url: None,
        })
    }

    fn verify_signature(&self, headers: &HashMap<String, String>, raw_body: &[u8]) -> bool {
        verify_hmac_sha256(
            &self.secret,
            headers.get("x-signature").map(String::as_str),
            raw_body,
        )
    }

    fn normalize(&self, payload: &serde_json::Value) -> NormalizedEvent {
        normalize_wallet_payload(payload)
    }
}
