//! Errors the proxy answers itself instead of the engine.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Failures at the proxy edge, before or after the engine runs.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The incoming request could not be turned into an absolute URL.
    #[error("BAD_REQUEST: {0}")]
    BadRequest(String),

    /// A passthrough request could not reach upstream.
    #[error("BAD_GATEWAY: {0}")]
    BadGateway(String),

    /// The method has no meaning for this proxy (CONNECT tunnels).
    #[error("METHOD_NOT_ALLOWED: {0}")]
    MethodNotAllowed(String),

    /// The request came back from this proxy or targets its own listener.
    #[error("LOOP_DETECTED: {0}")]
    LoopDetected(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::LoopDetected(_) => StatusCode::LOOP_DETECTED,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(status = status.as_u16(), error = %self, "request rejected at proxy");
        (status, Json(json!({ "error": self.to_string(), "code": status.as_u16() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ProxyError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ProxyError::BadGateway("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ProxyError::MethodNotAllowed("x".into()).status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ProxyError::LoopDetected("x".into()).status_code(), StatusCode::LOOP_DETECTED);
    }

    #[test]
    fn test_message_carries_code() {
        let err = ProxyError::BadGateway("connection refused".into());
        assert_eq!(err.to_string(), "BAD_GATEWAY: connection refused");
    }
}
