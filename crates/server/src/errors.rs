use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use service::registration::{ConflictKind, RegistrationError};

/// JSON error body: `{"error": <title>, "message": <detail>, "code": <n>}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub message: Option<String>,
    pub code: Option<u16>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &'static str, message: Option<String>) -> Self {
        Self { status, error, message, code: None }
    }

    pub fn with_code(mut self, code: u16) -> Self { self.code = Some(code); self }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({ "error": self.error });
        if let Some(message) = self.message {
            body["message"] = serde_json::Value::String(message);
        }
        if let Some(code) = self.code {
            body["code"] = serde_json::Value::from(code);
        }
        (self.status, Json(body)).into_response()
    }
}

/// Client errors keep their message; internal ones are logged and replaced.
impl From<RegistrationError> for JsonApiError {
    fn from(e: RegistrationError) -> Self {
        let code = e.code();
        let (status, title) = match &e {
            RegistrationError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation Error"),
            RegistrationError::DuplicateEmail => (StatusCode::CONFLICT, "Email already registered"),
            RegistrationError::NotFound(_) => (StatusCode::NOT_FOUND, "Payment not found"),
            RegistrationError::InvalidState { .. } => (StatusCode::CONFLICT, "Invalid payment state"),
            RegistrationError::InvalidPaymentType { .. } => (StatusCode::CONFLICT, "Invalid payment type"),
            RegistrationError::PersistenceConflict(ConflictKind::Email) => (StatusCode::CONFLICT, "Email already registered"),
            RegistrationError::PersistenceConflict(_) => (StatusCode::CONFLICT, "Conflict"),
            RegistrationError::Gateway(_) => (StatusCode::BAD_GATEWAY, "Payment gateway unavailable"),
            RegistrationError::AllocationExhausted { .. }
            | RegistrationError::Hashing(_)
            | RegistrationError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        };
        if e.is_client_error() {
            warn!(code, error = %e, "request rejected");
            JsonApiError::new(status, title, Some(e.to_string())).with_code(code)
        } else {
            error!(code, error = %e, "request failed");
            JsonApiError::new(status, title, None).with_code(code)
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
