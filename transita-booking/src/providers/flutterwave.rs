use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use super::{amount_to_cents, canonical_status, verify_hmac_sha256};
use transita_core::payment::AdapterError;
use transita_core::{CanonicalStatus, InitiatedPayment, NormalizedEvent, PaymentAdapter};

/// Flutterwave card/mobile checkout. Webhooks are signed with
/// `x-flutterwave-signature` (falling back to the generic `x-signature`)
/// and wrap the transaction under a `data` object.
pub struct FlutterwaveAdapter {
    secret: String,
}

impl FlutterwaveAdapter {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl PaymentAdapter for FlutterwaveAdapter {
    fn name(&self) -> &'static str {
        "flutterwave"
    }

    async fn initiate(
        &self,
        _booking_id: Uuid,
        amount_cents: i64,
        currency: &str,
    ) -> Result<InitiatedPayment, AdapterError> {
        // The live integration calls the Flutterwave API here; the sandbox
        // adapter fabricates a reference and hosted checkout URL.
        let provider_ref = format!("flw_{}", Uuid::new_v4().simple());
        let checkout_url = format!(
            "https://checkout.flutterwave.com/pay/{}?amount_cents={}&currency={}",
            provider_ref, amount_cents, currency
        );
        Ok(InitiatedPayment {
            provider_ref,
            checkout_url: Some(checkout_url),
        })
    }

    fn verify_signature(&self, headers: &HashMap<String, String>, raw_body: &[u8]) -> bool {
        let signature = headers
            .get("x-flutterwave-signature")
            .or_else(|| headers.get("x-signature"))
            .map(String::as_str);
        verify_hmac_sha256(&self.secret, signature, raw_body)
    }

    fn normalize(&self, payload: &serde_json::Value) -> NormalizedEvent {
        let data = &payload["data"];
        let raw_status = data["status"].as_str().map(str::to_string);
        let provider_ref = data["tx_ref"]
            .as_str()
            .or_else(|| data["flw_ref"].as_str())
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_a_successful_charge() {
        let adapter = FlutterwaveAdapter::new("s");
        let payload = serde_json::json!({
            "id": "evt_9",
            "data": {"status": "successful", "tx_ref": "flw_abc", "amount": 120.5}
        });
        let event = adapter.normalize(&payload);
        assert_eq!(event.status, CanonicalStatus::Success);
        assert_eq!(event.provider_ref.as_deref(), Some("flw_abc"));
        assert_eq!(event.amount_cents, Some(12050));
    }

    #[test]
    fn falls_back_to_flw_ref_and_unknown_status() {
        let adapter = FlutterwaveAdapter::new("s");
        let payload = serde_json::json!({"data": {"flw_ref": "FLW-123"}});
        let event = adapter.normalize(&payload);
        assert_eq!(event.status, CanonicalStatus::Unknown);
        assert_eq!(event.provider_ref.as_deref(), Some("FLW-123"));
        assert_eq!(event.amount_cents, None);
    }
}
