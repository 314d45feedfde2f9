use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failure of the one-time model acquisition. Never reaches a request; it
/// leaves the service in the unready state.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model hub error: {0}")]
    Hub(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("model load failed: {0}")]
    Model(String),
    #[error("unsupported quantization: {0}")]
    UnsupportedQuantization(String),
    #[error("unsupported precision: {0}")]
    UnsupportedPrecision(String),
    #[error("tokenizer has no end-of-sequence token")]
    MissingEosToken,
    #[error("no inference backend compiled in")]
    BackendUnavailable,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Model not loaded properly")]
    ModelNotLoaded,
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("model execution failed: {0}")]
    Inference(String),
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("generation cancelled")]
    Cancelled,
}

impl ServiceError {
    // Unavailability and request-time faults share one status code; callers
    // tell them apart by the message.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": "error",
        });

        (status, axum::Json(body)).into_response()
    }
}
