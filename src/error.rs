//! Error handling for the model serving core
//!
//! This module provides a unified error type with proper mapping to HTTP
//! status codes and structured error responses.

use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the serving core
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Artifact loading errors (startup-fatal)
    #[error("Artifact load error: {message}")]
    ArtifactLoad { message: String },

    /// Request referenced a model that was never loaded
    #[error("Model not found: {name}")]
    ModelNotFound { name: String },

    /// Server is not accepting inference requests yet (or anymore)
    #[error("Server not ready: {message}")]
    NotReady { message: String },

    /// Request failed structural validation
    #[error("Invalid request: {message}")]
    Validation { message: String },

    /// Request shape does not match the model's declared input schema
    #[error("Schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// Submission queue is full
    #[error("Server busy: {message}")]
    Busy { message: String },

    /// Request exceeded its deadline
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Model execution failed on a well-formed request
    #[error("Execution error: {message}")]
    Execution { message: String },

    /// Internal server errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error response structure for API responses. The correlation id is a
/// top-level sibling of the error object, as in success bodies.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Detailed error information
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub message: String,
    pub error_type: String,
    pub code: String,
}

impl ErrorResponse {
    /// Attach the correlation id of the request that failed
    pub fn with_request_id<S: Into<String>>(mut self, request_id: S) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl EngineError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an artifact load error
    pub fn artifact_load<S: Into<String>>(message: S) -> Self {
        Self::ArtifactLoad {
            message: message.into(),
        }
    }

    /// Create a model-not-found error
    pub fn model_not_found<S: Into<String>>(name: S) -> Self {
        Self::ModelNotFound { name: name.into() }
    }

    /// Create a not-ready error
    pub fn not_ready<S: Into<String>>(message: S) -> Self {
        Self::NotReady {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a schema mismatch error
    pub fn schema_mismatch<S: Into<String>>(message: S) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create a server-busy error
    pub fn busy<S: Into<String>>(message: S) -> Self {
        Self::Busy {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Create an execution error
    pub fn execution<S: Into<String>>(message: S) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Convert to an error response for API
    pub fn to_error_response(&self) -> ErrorResponse {
        let (error_type, code) = match self {
            EngineError::Config { .. } => ("config_error", "CONFIG_ERROR"),
            EngineError::ArtifactLoad { .. } => ("artifact_load_error", "ARTIFACT_LOAD_ERROR"),
            EngineError::ModelNotFound { .. } => ("model_not_found", "MODEL_NOT_FOUND"),
            EngineError::NotReady { .. } => ("not_ready_error", "NOT_READY"),
            EngineError::Validation { .. } => ("validation_error", "VALIDATION_ERROR"),
            EngineError::SchemaMismatch { .. } => ("schema_mismatch_error", "SCHEMA_MISMATCH"),
            EngineError::Busy { .. } => ("busy_error", "SERVER_BUSY"),
            EngineError::Timeout { .. } => ("timeout_error", "TIMEOUT"),
            EngineError::Execution { .. } => ("execution_error", "EXECUTION_ERROR"),
            EngineError::Internal { .. } => ("internal_error", "INTERNAL_ERROR"),
            EngineError::Io(_) => ("io_error", "IO_ERROR"),
            EngineError::Serde(_) => ("serialization_error", "SERIALIZATION_ERROR"),
        };

        ErrorResponse {
            error: ErrorDetails {
                message: self.to_string(),
                error_type: error_type.to_string(),
                code: code.to_string(),
            },
            request_id: None,
        }
    }

    /// HTTP status code this error maps to
    pub fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            EngineError::Validation { .. } | EngineError::SchemaMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            EngineError::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::Busy { .. } => StatusCode::TOO_MANY_REQUESTS,
            EngineError::NotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            EngineError::Config { .. }
            | EngineError::ArtifactLoad { .. }
            | EngineError::Execution { .. }
            | EngineError::Internal { .. }
            | EngineError::Io(_)
            | EngineError::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ResponseError for EngineError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.to_error_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = EngineError::config("Test config error");
        assert!(error.to_string().contains("Test config error"));

        let error = EngineError::validation("Invalid parameter");
        assert!(error.to_string().contains("Invalid parameter"));

        let error = EngineError::timeout(250);
        assert!(error.to_string().contains("250 ms"));
    }

    #[test]
    fn test_error_response() {
        let error = EngineError::validation("Test error");
        let response = error.to_error_response();

        assert_eq!(response.error.error_type, "validation_error");
        assert_eq!(response.error.code, "VALIDATION_ERROR");
        assert!(response.error.message.contains("Test error"));
        assert!(response.request_id.is_none());
    }

    #[test]
    fn test_error_response_with_request_id() {
        let response = EngineError::busy("queue full")
            .to_error_response()
            .with_request_id("req-123");

        assert_eq!(response.request_id.as_deref(), Some("req-123"));
    }

    #[test]
    fn test_error_body_places_request_id_beside_error() {
        let response = EngineError::model_not_found("scorer")
            .to_error_response()
            .with_request_id("req-9");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["request_id"], "req-9");
        assert_eq!(value["error"]["code"], "MODEL_NOT_FOUND");
        assert!(value["error"].get("request_id").is_none());

        // Without an id the field is omitted entirely
        let bare = serde_json::to_value(EngineError::busy("full").to_error_response()).unwrap();
        assert!(bare.get("request_id").is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(EngineError::validation("x").status_code(), 400);
        assert_eq!(EngineError::schema_mismatch("x").status_code(), 400);
        assert_eq!(EngineError::model_not_found("m").status_code(), 404);
        assert_eq!(EngineError::busy("x").status_code(), 429);
        assert_eq!(EngineError::not_ready("booting").status_code(), 503);
        assert_eq!(EngineError::timeout(1).status_code(), 504);
        assert_eq!(EngineError::execution("x").status_code(), 500);
        assert_eq!(EngineError::artifact_load("x").status_code(), 500);
    }

    #[test]
    fn test_http_response() {
        let error = EngineError::validation("Test error");
        let http_response = error.error_response();

        assert_eq!(http_response.status(), 400);
    }
}
