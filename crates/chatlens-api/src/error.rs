use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use chatlens::{AnalysisError, FailureReason, IngestError, LlmError, ParseError, StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Could not read the chat export: {0}")]
    Parse(#[from] ParseError),

    #[error("AI provider call failed ({reason}): {detail}")]
    Provider { reason: FailureReason, detail: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable kind sent as `error`
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Parse(_) => "parse_error",
            ApiError::Provider { reason, .. } => match reason {
                FailureReason::Auth => "provider_auth",
                FailureReason::Network => "provider_network",
                FailureReason::Timeout => "provider_timeout",
                FailureReason::ProviderRejected => "provider_rejected",
                FailureReason::InvalidInput => "provider_invalid_input",
                FailureReason::Cancelled => "cancelled",
            },
            ApiError::Storage(_) => "storage_fault",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Provider { reason, .. } => match reason {
                FailureReason::Auth => StatusCode::UNAUTHORIZED,
                FailureReason::Timeout => StatusCode::GATEWAY_TIMEOUT,
                FailureReason::Cancelled => StatusCode::CONFLICT,
                FailureReason::Network | FailureReason::ProviderRejected | FailureReason::InvalidInput => {
                    StatusCode::BAD_GATEWAY
                }
            },
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn provider(reason: FailureReason, detail: impl Into<String>) -> Self {
        ApiError::Provider {
            reason,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                "Storage error".to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                "Internal server error".to_string()
            }
            ApiError::Provider { reason, detail } => {
                tracing::warn!(reason = %reason, "Provider error: {}", detail);
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": self.kind(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ApiError::NotFound(format!("Room not found: {}", id)),
            StoreError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Storage(other.to_string()),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::InvalidInput(msg) => ApiError::BadRequest(msg),
            IngestError::TooLarge { .. } => ApiError::PayloadTooLarge(e.to_string()),
            IngestError::Parse(e) => ApiError::Parse(e),
            IngestError::Store(e) => e.into(),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::NotFound(id) => ApiError::NotFound(format!("Room not found: {}", id)),
            AnalysisError::RequestNotFound(_) => ApiError::NotFound(e.to_string()),
            AnalysisError::Conflict { .. } => ApiError::Conflict(e.to_string()),
            AnalysisError::Storage(e) => e.into(),
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        let reason = match &e {
            LlmError::Auth(_) => FailureReason::Auth,
            LlmError::Network(_) => FailureReason::Network,
            LlmError::Timeout(_) => FailureReason::Timeout,
            LlmError::ProviderRejected(_) => FailureReason::ProviderRejected,
            LlmError::InvalidInput(_) => FailureReason::InvalidInput,
        };
        ApiError::provider(reason, e.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(format!("Upload is too large: {}", e.body_text()))
        } else {
            ApiError::BadRequest(format!("Multipart error: {}", e.body_text()))
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
