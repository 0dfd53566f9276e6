use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use transita_booking::reconciler::{PaymentError, WebhookError};
use transita_booking::EngineError;
use transita_core::{LedgerError, StoreError};

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    TransientError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::TransientError(msg) => {
                tracing::warn!("Downstream unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::TransientError(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NoCapacity => AppError::ConflictError("No seats available".to_string()),
            LedgerError::SeatTaken => AppError::ConflictError("Seat already booked".to_string()),
            LedgerError::NotFound(what) => AppError::NotFoundError(format!("{} not found", what)),
            LedgerError::Unavailable(msg) => AppError::TransientError(msg),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Store(e) => e.into(),
            EngineError::Ledger(e) => e.into(),
        }
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Store(e) => e.into(),
            WebhookError::Ledger(e) => e.into(),
            reject => AppError::ValidationError(reject.to_string()),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::UnknownProvider(name) => {
                AppError::ValidationError(format!("unknown payment provider: {}", name))
            }
            PaymentError::Adapter(e) => AppError::InternalServerError(e.to_string()),
            PaymentError::Ledger(e) => e.into(),
        }
    }
}
