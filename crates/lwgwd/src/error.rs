//! Ingress error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use lwgw_core::{ErrorCategory, GatewayError};

#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest(String),
    /// 404 Not Found
    NotFound(String),
    /// 422 Unprocessable Entity (value or credential material rejected)
    Unprocessable(String),
    /// 502 Bad Gateway (platform service or protocol engine failed)
    BadGateway(String),
    /// 500 Internal Server Error
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable", msg)
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        // The engine already reported the failure at its own severity
        tracing::debug!(status = status.as_u16(), error = error_type, %message, "API error");

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let message = err.to_string();
        match err.category() {
            ErrorCategory::MalformedInput => ApiError::BadRequest(message),
            ErrorCategory::StaleReference => ApiError::NotFound(message),
            ErrorCategory::SecurityViolation | ErrorCategory::DecodeError => {
                ApiError::Unprocessable(message)
            }
            ErrorCategory::UpstreamFailure => ApiError::BadGateway(message),
            ErrorCategory::Internal => ApiError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: GatewayError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_category_status() {
        assert_eq!(status_of(GatewayError::Malformed("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(GatewayError::NotRegistered("E1".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(GatewayError::Security {
                device_id: "d1".into(),
                reason: "odd key".into()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(GatewayError::Southbound("down".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_of(GatewayError::Internal("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
