use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Every variant is scoped to a single request; none is retried.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Provider API key is missing")]
    MissingCredential,

    #[error("Unsupported or corrupt document '{filename}': {reason}")]
    UnsupportedOrCorruptDocument { filename: String, reason: String },

    #[error("Provider returned malformed JSON")]
    MalformedProviderResponse { raw: String },

    #[error("Provider returned unexpected content type '{content_type}'")]
    UnexpectedProviderResponseType { content_type: String, raw: String },

    #[error("Provider error (status {status})")]
    ProviderError { status: u16, body: Value },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unknown failure: {0}")]
    UnknownFailure(String),
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::UnknownFailure(format!("{e:#}"))
    }
}

impl AppError {
    pub fn corrupt(filename: &str, reason: impl std::fmt::Display) -> Self {
        AppError::UnsupportedOrCorruptDocument {
            filename: filename.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The status code this error is reported with.
    /// `ProviderError` mirrors the upstream status when it is a valid HTTP error code.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ProviderError { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, details): (String, Option<Value>) = match self {
            AppError::MissingCredential => {
                tracing::error!("Provider API key is missing");
                ("API key is missing".to_string(), None)
            }
            AppError::UnsupportedOrCorruptDocument { filename, reason } => {
                tracing::warn!("Extraction failed for '{filename}': {reason}");
                (
                    "Failed to extract text from document".to_string(),
                    Some(json!({ "filename": filename, "reason": reason })),
                )
            }
            AppError::MalformedProviderResponse { raw } => {
                tracing::error!("Failed to parse JSON from provider");
                (
                    "Invalid JSON response from provider".to_string(),
                    Some(Value::String(raw)),
                )
            }
            AppError::UnexpectedProviderResponseType { content_type, raw } => {
                tracing::error!("Unexpected content-type from provider: {content_type}");
                (
                    "Unexpected response type from provider".to_string(),
                    Some(Value::String(raw)),
                )
            }
            AppError::ProviderError { status, body } => {
                tracing::error!("Provider API error (status {status}): {body}");
                ("Error from provider".to_string(), Some(body))
            }
            AppError::Validation(msg) => (msg, None),
            AppError::PayloadTooLarge(msg) => {
                tracing::warn!("Upload rejected: {msg}");
                (
                    "Upload exceeds the maximum allowed size".to_string(),
                    Some(Value::String(msg)),
                )
            }
            AppError::UnknownFailure(msg) => {
                tracing::error!("Unexpected error: {msg}");
                (
                    "Failed to optimize resume".to_string(),
                    Some(Value::String(msg)),
                )
            }
        };

        let body = match details {
            Some(details) => json!({ "error": message, "details": details }),
            None => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}
