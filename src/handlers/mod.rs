pub mod collection;
pub mod credentials;
pub mod devices;
pub mod topology;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Limit for list endpoints. Clamped to [1, 200].
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: i32,
}

impl LimitQuery {
    pub fn sanitize(&self) -> i32 {
        self.limit.clamp(1, 200)
    }
}

fn default_limit() -> i32 {
    50
}

/// Error body: {"error": "message"}
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// API error type
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{} not found", resource),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(nf) = err.downcast_ref::<crate::db::NotFoundError>() {
            return Self {
                status: StatusCode::NOT_FOUND,
                message: nf.to_string(),
            };
        }
        if let Some(invalid) = err.downcast_ref::<crate::db::ValidationError>() {
            return Self::bad_request(invalid.to_string());
        }
        tracing::error!("Request failed: {:#}", err);
        Self::internal(format!("{:#}", err))
    }
}

/// Response helper: return 201 Created with JSON body
pub fn created<T: Serialize>(item: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(item))
}

/// Healthcheck endpoint
pub async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "linkmap",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NotFoundError, ValidationError};

    #[test]
    fn test_typed_errors_map_to_status() {
        let err: ApiError = anyhow::Error::new(NotFoundError::new("Device", "7")).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Device not found: 7");

        let err: ApiError = anyhow::Error::new(ValidationError("bad".to_string())).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: ApiError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(LimitQuery { limit: 0 }.sanitize(), 1);
        assert_eq!(LimitQuery { limit: 5000 }.sanitize(), 200);
    }
}
