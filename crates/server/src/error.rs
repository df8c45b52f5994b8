use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use embedding::{DetectionError, ValidationError};
use matcher::ServiceError;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Service(err) => match err {
                ServiceError::InvalidThreshold(_) => StatusCode::BAD_REQUEST,
                ServiceError::Query(DetectionError::Decode(_))
                | ServiceError::Query(DetectionError::NoFaceDetected)
                | ServiceError::Query(DetectionError::Validation(_)) => StatusCode::BAD_REQUEST,
                ServiceError::Query(DetectionError::Detector(_)) => StatusCode::BAD_GATEWAY,
                ServiceError::Query(DetectionError::DimensionMismatch { .. })
                | ServiceError::InvalidConfig(_)
                | ServiceError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ServiceError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            },
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::NotFound => "NOT_FOUND",
            ServerError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Service(err) => match err {
                ServiceError::InvalidThreshold(_) => "INVALID_THRESHOLD",
                ServiceError::InvalidConfig(_) => "INTERNAL_ERROR",
                ServiceError::Query(DetectionError::Decode(_)) => "DECODE_ERROR",
                ServiceError::Query(DetectionError::NoFaceDetected) => "NO_FACE_DETECTED",
                ServiceError::Query(DetectionError::DimensionMismatch { .. }) => {
                    "EMBEDDING_GENERATION_FAILED"
                }
                ServiceError::Query(DetectionError::Validation(v)) => validation_code(v),
                ServiceError::Query(DetectionError::Detector(_)) => "DETECTOR_UNAVAILABLE",
                ServiceError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
                ServiceError::Timeout(_) => "REQUEST_TIMEOUT",
            },
        }
    }

    /// Client-facing message. Server-side failures keep their details in the
    /// logs only.
    fn public_message(&self) -> String {
        match self {
            ServerError::Internal(_) | ServerError::Service(ServiceError::InvalidConfig(_)) => {
                "Internal server error".to_string()
            }
            ServerError::Service(ServiceError::StoreUnavailable(_)) => {
                "Record store unavailable".to_string()
            }
            ServerError::Service(ServiceError::Query(DetectionError::Detector(_))) => {
                "Face detector unavailable".to_string()
            }
            ServerError::Service(ServiceError::Query(DetectionError::DimensionMismatch {
                expected,
                ..
            })) => format!("Failed to generate a {expected}-d embedding"),
            other => other.to_string(),
        }
    }
}

fn validation_code(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::NotASequence { .. } => "INVALID_EMBEDDING",
        ValidationError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
        ValidationError::NonFiniteValue { .. } => "NON_FINITE_VALUE",
        ValidationError::ZeroNorm { .. } => "ZERO_NORM",
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request_failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.public_message(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<DetectionError> for ServerError {
    fn from(err: DetectionError) -> Self {
        ServerError::Service(ServiceError::Query(err))
    }
}

impl From<ValidationError> for ServerError {
    fn from(err: ValidationError) -> Self {
        ServerError::Service(err.into())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}
