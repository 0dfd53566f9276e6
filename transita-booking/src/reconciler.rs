use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::locks::SeatLockManager;
use crate::providers::ProviderRegistry;
use transita_core::payment::AdapterError;
use transita_core::{
    CanonicalStatus, LeaseStore, LedgerError, PaymentRecord, ReservationLedger, StoreError,
};

/// Webhook inputs rejected before any state mutation.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("unknown payment provider: {0}")]
    UnknownProvider(String),
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("missing event id for idempotency")]
    MissingEventId,
    #[error("malformed webhook body")]
    MalformedBody,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("unknown payment provider: {0}")]
    UnknownProvider(String),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// What a webhook delivery actually did. Every variant is acknowledged
/// with 2xx so providers stop retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// Event id already marked; nothing applied.
    Replay,
    /// Booking flipped confirmed → paid.
    Paid,
    /// Booking flipped confirmed → cancelled, capacity restored.
    Cancelled,
    /// Status recorded with no booking transition (unknown status, unmatched
    /// reference, or the booking had already left the confirmed state).
    Recorded,
}

impl WebhookDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookDisposition::Replay => "replay",
            WebhookDisposition::Paid => "paid",
            WebhookDisposition::Cancelled => "cancelled",
            WebhookDisposition::Recorded => "recorded",
        }
    }
}

pub struct InitiateResult {
    pub record: PaymentRecord,
    pub checkout_url: Option<String>,
}

/// Applies asynchronous provider verdicts to bookings, exactly once per
/// provider event.
pub struct PaymentReconciler {
    providers: ProviderRegistry,
    ledger: Arc<dyn ReservationLedger>,
    locks: Arc<SeatLockManager>,
    cache: Arc<dyn LeaseStore>,
    event_retention_seconds: u64,
}

/// Providers disagree about where the event id lives; try the common
/// fields in a fixed order.
fn extract_event_id(payload: &Value) -> Option<String> {
    for field in ["id", "event_id", "tx_id", "transaction_id"] {
        if let Some(id) = payload[field].as_str() {
            return Some(id.to_string());
        }
    }
    payload["data"]["id"]
        .as_str()
        .or_else(|| payload["data"]["tx_ref"].as_str())
        .map(str::to_string)
}

impl PaymentReconciler {
    pub fn new(
        providers: ProviderRegistry,
        ledger: Arc<dyn ReservationLedger>,
        locks: Arc<SeatLockManager>,
        cache: Arc<dyn LeaseStore>,
        event_retention_seconds: u64,
    ) -> Self {
        Self {
            providers,
            ledger,
            locks,
            cache,
            event_retention_seconds,
        }
    }

    /// Obtain an external reference from the provider and persist the
    /// payment attempt. No seat or trip mutation happens here.
    pub async fn initiate(
        &self,
        booking_id: Uuid,
        provider: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<InitiateResult, PaymentError> {
        let adapter = self
            .providers
            .get(provider)
            .ok_or_else(|| PaymentError::UnknownProvider(provider.to_string()))?;

        let initiated = adapter.initiate(booking_id, amount_cents, currency).await?;
        let record = self
            .ledger
            .create_payment(
                booking_id,
                adapter.name(),
                &initiated.provider_ref,
                amount_cents,
                currency,
            )
            .await?;

        info!(%booking_id, provider = adapter.name(), provider_ref = %record.provider_ref, "payment initiated");
        Ok(InitiateResult {
            record,
            checkout_url: initiated.checkout_url,
        })
    }

    /// Drive a provider webhook through verification, replay dedup and the
    /// booking state machine.
    pub async fn handle_webhook(
        &self,
        provider: &str,
        headers: &HashMap<String, String>,
        raw_body: &[u8],
    ) -> Result<WebhookDisposition, WebhookError> {
        // 1. Authenticity: reject before touching any state.
        let adapter = self
            .providers
            .get(provider)
            .ok_or_else(|| WebhookError::UnknownProvider(provider.to_string()))?;
        if !adapter.verify_signature(headers, raw_body) {
            return Err(WebhookError::InvalidSignature);
        }

        let payload: Value =
            serde_json::from_slice(raw_body).map_err(|_| WebhookError::MalformedBody)?;

        // 2. Without an event id the delivery cannot be deduplicated.
        let event_id = extract_event_id(&payload).ok_or(WebhookError::MissingEventId)?;

        // 3. Single atomic test-and-set; a lost race or a redelivery both
        //    land here and must be acknowledged without side effects.
        let fresh = self
            .cache
            .mark_event_processed(adapter.name(), &event_id, self.event_retention_seconds)
            .await?;
        if !fresh {
            info!(provider = adapter.name(), %event_id, "webhook replay acknowledged");
            return Ok(WebhookDisposition::Replay);
        }

        // 4. Provider-specific payload knowledge stays in the adapter.
        let event = adapter.normalize(&payload);
        let Some(provider_ref) = event.provider_ref else {
            warn!(provider = adapter.name(), %event_id, "webhook without provider reference");
            return Ok(WebhookDisposition::Recorded);
        };

        match event.status {
            CanonicalStatus::Success => {
                let outcome = self
                    .ledger
                    .apply_payment_success(adapter.name(), &provider_ref, event.amount_cents)
                    .await?;
                if outcome.transitioned {
                    info!(provider = adapter.name(), %provider_ref, booking_id = ?outcome.booking_id, "booking paid");
                    Ok(WebhookDisposition::Paid)
                } else {
                    Ok(WebhookDisposition::Recorded)
                }
            }
            CanonicalStatus::Failed => {
                let outcome = self
                    .ledger
                    .apply_payment_failure(adapter.name(), &provider_ref, event.amount_cents)
                    .await?;
                if let Some((trip_id, seat_id)) = outcome.released {
                    // Best effort: the lease expires on its own if this
                    // fails, so the cancellation stays committed.
                    if let Err(e) = self.locks.release(trip_id, seat_id, None).await {
                        warn!(%trip_id, %seat_id, error = %e, "failed to release seat lock after cancellation");
                    }
                    info!(provider = adapter.name(), %provider_ref, booking_id = ?outcome.booking_id, "booking cancelled, seat restored");
                    Ok(WebhookDisposition::Cancelled)
                } else {
                    Ok(WebhookDisposition::Recorded)
                }
            }
            CanonicalStatus::Unknown => {
                // Fail closed: leave the booking at its last known good
                // state until a later event or manual resolution.
                let raw = event.raw_status.as_deref().unwrap_or("");
                self.ledger
                    .record_unknown_payment_status(adapter.name(), &provider_ref, raw)
                    .await?;
                warn!(provider = adapter.name(), %provider_ref, raw_status = raw, "unrecognized payment status");
                Ok(WebhookDisposition::Recorded)
            }
        }
    }
}
