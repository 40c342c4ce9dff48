//! ==============================================================================
//! error.rs - hub error taxonomy
//! ==============================================================================
//!
//! purpose:
//!     one error type for everything a request can hit, and the mapping from
//!     each kind onto the json envelope the api returns.
//!
//!     - Validation  -> 400, names the offending fields, nothing was stored
//!     - Persistence -> logged by the snapshot layer, never reaches a client
//!     - Unexpected  -> 500 with a generic message
//!
//! ==============================================================================

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use std::path::PathBuf;

/// why an ingestion payload was rejected
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid numeric value for {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("snapshot {} failed: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl HubError {
    pub fn status(&self) -> StatusCode {
        match self {
            HubError::Validation(_) => StatusCode::BAD_REQUEST,
            HubError::Persistence { .. } | HubError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            HubError::Validation(e) => {
                tracing::warn!("[INGEST] rejected: {}", e);
                e.to_string()
            }
            other => {
                tracing::error!("[API] request failed: {}", other);
                "Internal server error".to_string()
            }
        };
        let body = serde_json::json!({ "success": false, "error": message });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_message_lists_every_field() {
        let e = ValidationError::MissingFields(vec!["device_id", "humidity"]);
        assert_eq!(e.to_string(), "Missing required fields: device_id, humidity");
    }

    #[test]
    fn status_codes_follow_error_kind() {
        let validation: HubError = ValidationError::MissingFields(vec!["temperature"]).into();
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            HubError::Unexpected("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let persistence = HubError::Persistence {
            path: PathBuf::from("sensor_data.json"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert_eq!(persistence.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unexpected_errors_hide_details_from_clients() {
        let response = HubError::Unexpected("secret internals".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({ "success": false, "error": "Internal server error" })
        );
        assert!(!body.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn validation_errors_name_the_fields() {
        let err: HubError = ValidationError::MissingFields(vec!["device_id"]).into();
        let body = body_json(err.into_response()).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Missing required fields: device_id");
    }
}
