use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Initiated,
    Successful,
    Failed,
    Unknown,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Initiated => "initiated",
            PaymentStatus::Successful => "successful",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initiated" => Some(PaymentStatus::Initiated),
            "successful" => Some(PaymentStatus::Successful),
            "failed" => Some(PaymentStatus::Failed),
            "unknown" => Some(PaymentStatus::Unknown),
            _ => None,
        }
    }
}

/// A payment attempt against a booking, keyed externally by the provider's
/// reference. `booking_id` stays empty when a webhook arrives for a
/// reference this service never initiated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub provider: String,
    pub provider_ref: String,
    pub status: PaymentStatus,
    pub amount_cents: i64,
    pub currency: String,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Provider verdict reduced to the three states the reconciler acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalStatus {
    Success,
    Failed,
    Unknown,
}

/// A provider webhook payload reduced to canonical fields.
#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub status: CanonicalStatus,
    pub provider_ref: Option<String>,
    pub amount_cents: Option<i64>,
    /// Provider's verbatim status string, kept for observability.
    pub raw_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatedPayment {
    pub provider_ref: String,
    pub checkout_url: Option<String>,
}

/// Webhook acknowledgement body. Providers must receive 2xx + this body on
/// every non-reject path, replays included, or they keep retrying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("payment initiation failed: {0}")]
    Initiate(String),
}

/// Capability set implemented once per payment provider.
///
/// Instances are immutable and selected by name from the registry per
/// request; `normalize` owns all provider-specific payload knowledge so no
/// field-picking conditionals leak into the reconciler.
#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Obtain an external reference (and optional checkout URL) for a new
    /// payment attempt.
    async fn initiate(
        &self,
        booking_id: Uuid,
        amount_cents: i64,
        currency: &str,
    ) -> Result<InitiatedPayment, AdapterError>;

    /// Verify the webhook signature over the exact raw body bytes. Header
    /// names are lower-cased by the transport layer.
    fn verify_signature(&self, headers: &HashMap<String, String>, raw_body: &[u8]) -> bool;

    /// Reduce a provider payload to canonical status, external reference
    /// and amount.
    fn normalize(&self, payload: &serde_json::Value) -> NormalizedEvent;
}
