pub mod api;
pub mod pages;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::aggregate::AggregateError;
use crate::schema::{DeviceClass, DeviceClassSchema};

/// Error response body: {"error": "message"}
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

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        Self::bad_request(err.message())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Request failed: {:#}", err);
        Self::internal(err.to_string())
    }
}

/// Resolve the device class named in a URL
pub fn class_schema(slug: &str) -> Result<&'static DeviceClassSchema, ApiError> {
    DeviceClass::from_slug(slug)
        .map(DeviceClass::schema)
        .ok_or_else(|| ApiError::not_found("device class"))
}

/// Healthcheck endpoint: returns 200 OK with status
pub async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "net-provision",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_is_bad_request() {
        let err = ApiError::from(AggregateError::NoDevices {
            message: "Add at least one switch.",
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Add at least one switch.");
    }

    #[test]
    fn test_internal_error_from_anyhow() {
        let err = ApiError::from(anyhow::anyhow!("Page rendering failed: missing block"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Page rendering failed: missing block");
    }
}
