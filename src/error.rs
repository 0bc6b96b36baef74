use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::rate_limit::Window;

// Raised while building a limiter configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("requests per {window} must be a positive integer")]
    ZeroLimit { window: Window },
}

// Everything the chat endpoint can answer with besides a stream
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("{0}")]
    BadRequest(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {message}")]
    UpstreamStatus { status: StatusCode, message: String },

    #[error("Upstream API key is not configured")]
    MissingApiKey,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamStatus { status, .. } => *status,
            ProxyError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, "chat request failed: {}", self);
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_429_with_generic_message() {
        let err = ProxyError::RateLimited;
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        // no hint about which window tripped
        let msg = err.to_string();
        assert!(!msg.contains("minute") && !msg.contains("hour") && !msg.contains("day"));
    }

    #[test]
    fn upstream_status_is_passed_through() {
        let err = ProxyError::UpstreamStatus {
            status: StatusCode::UNAUTHORIZED,
            message: "bad key".to_string(),
        };
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Upstream returned 401 Unauthorized: bad key");
    }

    #[test]
    fn zero_limit_names_the_window() {
        let err = ConfigError::ZeroLimit { window: Window::Hour };
        assert_eq!(err.to_string(), "requests per hour must be a positive integer");
    }
}
