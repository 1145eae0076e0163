//! Envelope response format for all API responses.
//!
//! Every response is wrapped in a consistent envelope:
//! ```json
//! {
//!   "data": { ... },
//!   "meta": { "request_id": "...", "timestamp": "..." },
//!   "errors": []
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Envelope response wrapping all API data.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    pub meta: ApiMeta,

    /// Error list (empty on success).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// Time-ordered (v7) id for correlating logs.
    pub request_id: String,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    pub message: String,
}

impl ApiMeta {
    fn now() -> Self {
        Self {
            request_id: uuid::Uuid::now_v7().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            meta: ApiMeta::now(),
            errors: Vec::new(),
        }
    }

    pub fn into_body(self) -> Json<Self> {
        Json(self)
    }
}

impl ApiResponse<()> {
    /// An error envelope without data.
    pub fn error(code: &str, message: &str) -> Self {
        Self {
            data: None,
            meta: ApiMeta::now(),
            errors: vec![ApiErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
            }],
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_omits_errors() {
        let json = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(json["data"], 42);
        assert!(json.get("errors").is_none());
        assert!(json["meta"]["timestamp"].is_string());
        assert!(json["meta"]["request_id"].is_string());
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let json = serde_json::to_value(ApiResponse::error("NOT_FOUND", "gone")).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["errors"][0]["code"], "NOT_FOUND");
        assert_eq!(json["errors"][0]["message"], "gone");
    }
}
