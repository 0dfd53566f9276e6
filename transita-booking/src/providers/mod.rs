//! Payment provider adapters.
//!
//! One `PaymentAdapter` implementation per provider, held in an immutable
//! registry built once at startup. Adapters own every provider-specific
//! detail: signature header, secret, and payload field layout.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;

use transita_core::{CanonicalStatus, PaymentAdapter};

pub mod airtel;
pub mod flutterwave;
pub mod mtn;

pub use airtel::AirtelAdapter;
pub use flutterwave::FlutterwaveAdapter;
pub use mtn::MtnAdapter;

type HmacSha256 = Hmac<Sha256>;

/// Immutable provider lookup, selected by lower-cased name per request.
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn PaymentAdapter>>,
}

impl ProviderRegistry {
    pub fn from_adapters(adapters: Vec<Arc<dyn PaymentAdapter>>) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|a| (a.name().to_string(), a))
            .collect();
        Self { adapters }
    }

    /// The production provider set, configured with per-provider webhook
    /// signing secrets.
    pub fn with_default_providers(
        flutterwave_secret: &str,
        mtn_secret: &str,
        airtel_secret: &str,
    ) -> Self {
        Self::from_adapters(vec![
            Arc::new(FlutterwaveAdapter::new(flutterwave_secret)),
            Arc::new(MtnAdapter::new(mtn_secret)),
            Arc::new(AirtelAdapter::new(airtel_secret)),
        ])
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PaymentAdapter>> {
        self.adapters.get(&name.to_ascii_lowercase()).cloned()
    }
}

/// HMAC-SHA256 check of a hex signature header against the exact raw body,
/// in constant time. An empty secret can never verify.
pub(crate) fn verify_hmac_sha256(secret: &str, signature_hex: Option<&str>, body: &[u8]) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Some(signature_hex) = signature_hex else {
        return false;
    };
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Map a provider's verbatim status string onto the canonical three states.
pub(crate) fn canonical_status(raw: &str) -> CanonicalStatus {
    match raw.to_ascii_lowercase().as_str() {
        "successful" | "success" | "paid" | "completed" => CanonicalStatus::Success,
        "failed" | "failed_attempt" | "error" | "declined" | "cancelled" => CanonicalStatus::Failed,
        _ => CanonicalStatus::Unknown,
    }
}

/// Payload amounts arrive in fractional major units.
pub(crate) fn amount_to_cents(value: &serde_json::Value) -> Option<i64> {
    value.as_f64().map(|a| (a * 100.0).round() as i64)
}
