use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use super::mtn::normalize_wallet_payload;
use super::verify_hmac_sha256;
use transita_core::payment::AdapterError;
use transita_core::{InitiatedPayment, NormalizedEvent, PaymentAdapter};

/// Airtel Money. Same wallet-push flow and payload layout as MTN, with its
/// own signing secret.
pub struct AirtelAdapter {
    secret: String,
}

impl AirtelAdapter {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl PaymentAdapter for AirtelAdapter {
    fn name(&self) -> &'static str {
        "airtel"
    }

    async fn initiate(
        &self,
        _booking_id: Uuid,
        _amount_cents: i64,
        _currency: &str,
    ) -> Result<InitiatedPayment, AdapterError> {
        Ok(InitiatedPayment {
            provider_ref: format!("airtel_{}", Uuid::new_v4().simple()),
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
