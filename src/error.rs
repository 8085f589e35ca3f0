use crate::protocol::error_shapes::{anthropic_error_payload, openai_error_payload};
use crate::protocol::Dialect;

/// Canonical error type used across all modules.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Protocol translation error: {0}")]
    Translation(String),
    #[error("All endpoints failed after {attempts} attempts")]
    Exhausted { attempts: usize },
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad error category for status code and wire shape selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    RateLimit,
    BadGateway,
    ServerError,
}

impl GatewayError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            GatewayError::InvalidRequest(_) | GatewayError::Translation(_) => {
                ErrorCategory::InvalidRequest
            }
            GatewayError::Upstream { status: 429, .. } => ErrorCategory::RateLimit,
            GatewayError::Upstream { status, .. } if (400..500).contains(status) => {
                ErrorCategory::InvalidRequest
            }
            GatewayError::Upstream { .. } | GatewayError::Exhausted { .. } => {
                ErrorCategory::BadGateway
            }
            GatewayError::Config(_) | GatewayError::Transport(_) | GatewayError::Internal(_) => {
                ErrorCategory::ServerError
            }
        }
    }
}

fn http_status_for_category(cat: ErrorCategory) -> http::StatusCode {
    match cat {
        ErrorCategory::InvalidRequest => http::StatusCode::BAD_REQUEST,
        ErrorCategory::RateLimit => http::StatusCode::TOO_MANY_REQUESTS,
        ErrorCategory::BadGateway => http::StatusCode::BAD_GATEWAY,
        ErrorCategory::ServerError => http::StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Format an error for a given client dialect, returning (`status_code`, JSON body).
#[must_use]
pub fn format_error(err: &GatewayError, dialect: Dialect) -> (http::StatusCode, serde_json::Value) {
    let cat = err.category();
    let status = http_status_for_category(cat);
    let message = err.to_string();

    let body = match dialect {
        Dialect::OpenAi => openai_error_payload(cat, &message),
        Dialect::Anthropic => anthropic_error_payload(cat, &message),
    };

    (status, body)
}

/// Convert a `GatewayError` into an axum response for a specific client dialect.
#[must_use]
pub fn into_axum_response(err: &GatewayError, dialect: Dialect) -> axum::response::Response {
    use axum::response::IntoResponse;
    let (status, body) = format_error(err, dialect);
    (status, axum::Json(body)).into_response()
}

/// Default `IntoResponse` uses the native dialect. Handlers that know the
/// client dialect should call [`into_axum_response`] instead.
impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        into_axum_response(&self, Dialect::Anthropic)
    }
}
