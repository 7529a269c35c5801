use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::record_store::RecordStoreError;

pub const CONFIGURATION_MESSAGE: &str = "Configuración de Airtable incompleta";
pub const INTERNAL_MESSAGE: &str = "Error interno del servidor";
pub const INVALID_BODY_MESSAGE: &str = "Cuerpo de la solicitud inválido";

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Human-readable error description
    pub error: String,
    /// Underlying cause (store error body, missing key, parser message)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A required record-store identifier is not configured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The caller's payload was rejected before any outbound call
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<String>,
    },

    /// The record store answered with a non-success status
    #[error("Upstream error ({status}): {message}")]
    Upstream {
        status: StatusCode,
        message: String,
        details: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Maps a record-store failure, labelling upstream rejections with `operation`.
    pub fn from_store(err: RecordStoreError, operation: &str) -> Self {
        match err {
            RecordStoreError::NotConfigured(key) => Self::Configuration(key),
            RecordStoreError::Status { status, body } => Self::Upstream {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                message: operation.to_string(),
                details: body,
            },
            other => Self::Internal(other.to_string()),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::Configuration(_) | Self::Internal(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the `(error, details)` pair of the response body.
    pub fn response_parts(&self) -> (String, Option<String>) {
        match self {
            Self::Configuration(key) => (
                CONFIGURATION_MESSAGE.to_string(),
                Some(format!("Falta la variable de configuración {}", key)),
            ),
            Self::Validation { message, details } => (message.clone(), details.clone()),
            Self::Upstream {
                message, details, ..
            } => (message.clone(), Some(details.clone())),
            Self::Internal(msg) => (INTERNAL_MESSAGE.to_string(), Some(msg.clone())),
            Self::Other(err) => (INTERNAL_MESSAGE.to_string(), Some(err.to_string())),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let (error, details) = self.response_parts();
        let body = ErrorResponse {
            success: false,
            error,
            details,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation {
            message: INVALID_BODY_MESSAGE.to_string(),
            details: Some(rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation {
            message: "Parámetros de consulta inválidos".to_string(),
            details: Some(rejection.body_text()),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation {
            message: "Datos inválidos".to_string(),
            details: Some(err.to_string()),
        }
    }
}
