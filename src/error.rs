// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::services::ScopedQueryError;
use crate::warehouse::WarehouseError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 502 Bad Gateway (warehouse failures)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<ScopedQueryError> for ApiError {
    fn from(err: ScopedQueryError) -> Self {
        match err {
            ScopedQueryError::Unauthorized(msg) => ApiError::unauthorized(msg),
            ScopedQueryError::Forbidden(msg) => ApiError::forbidden(msg),
            ScopedQueryError::UnknownQuery(name) => ApiError::not_found(format!("Unknown query '{}'", name)),
            ScopedQueryError::InvalidFilter(e) => ApiError::bad_request(e.to_string()),
            ScopedQueryError::Upstream(e) => e.into(),
        }
    }
}

impl From<WarehouseError> for ApiError {
    fn from(err: WarehouseError) -> Self {
        match err {
            WarehouseError::Query(msg) => {
                // Don't expose warehouse SQL errors to clients
                tracing::error!("Warehouse query error: {}", msg);
                ApiError::bad_gateway("The analytics warehouse rejected the query")
            }
            WarehouseError::Connection(msg) => {
                tracing::error!("Warehouse connection error: {}", msg);
                ApiError::service_unavailable("Analytics warehouse temporarily unavailable")
            }
            other => {
                tracing::warn!("Warehouse failure: {}", other);
                ApiError::bad_gateway(other.to_string())
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterError;
    use chrono::NaiveDate;

    #[test]
    fn scoped_query_errors_map_to_status_codes() {
        let cases: Vec<(ScopedQueryError, u16)> = vec![
            (ScopedQueryError::Unauthorized("no session".into()), 401),
            (ScopedQueryError::Forbidden("nope".into()), 403),
            (ScopedQueryError::UnknownQuery("x".into()), 404),
            (
                ScopedQueryError::InvalidFilter(FilterError::InvalidDateRange {
                    start: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                    end: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                }),
                400,
            ),
            (ScopedQueryError::Upstream(WarehouseError::Timeout(30)), 502),
            (ScopedQueryError::Upstream(WarehouseError::Connection("refused".into())), 503),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn query_errors_are_not_leaked() {
        let err = ApiError::from(WarehouseError::Query("syntax error at or near SELECT".into()));
        assert!(!err.message().contains("syntax"));
    }
}
