//! API error taxonomy and the uniform JSON error envelope.
//!
//! Every rejected path ends up here and leaves the server as
//! `{"error": {"message", "type", "code", "param"}}` with a client or
//! server status code.

use std::any::Any;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// A single failed field check on an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: &'static str,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("The model `{0}` does not exist or you do not have access to it.")]
    UnsupportedModel(String),

    #[error("The model `{0}` does not exist.")]
    UnknownModel(String),

    #[error("{0}")]
    EndpointNotSupported(&'static str),

    #[error("Validation failed: {{{}}}", format_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Invalid URL ({method} {path})")]
    UnknownUrl { method: String, path: String },

    #[error("Method {method} is not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}={}", f.field, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownModel(_) | ApiError::UnknownUrl { .. } => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Internal(_) => "internal_server_error",
            _ => "invalid_request_error",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::UnsupportedModel(_) | ApiError::UnknownModel(_) => "model_not_found",
            ApiError::EndpointNotSupported(_) => "endpoint_not_supported",
            ApiError::Validation(_) => "validation_error",
            ApiError::UnknownUrl { .. } => "unknown_url",
            ApiError::MethodNotAllowed { .. } => "method_not_allowed",
            ApiError::MalformedBody(_) => "invalid_request_body",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn param(&self) -> Option<String> {
        match self {
            ApiError::UnsupportedModel(_) | ApiError::UnknownModel(_) => {
                Some("model".to_string())
            }
            ApiError::Validation(fields) => fields.first().map(|f| f.field.to_string()),
            _ => None,
        }
    }

    /// Build the wire envelope for this error.
    pub fn body(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                error_type: self.error_type().to_string(),
                code: self.code().to_string(),
                param: self.param(),
            },
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

/// Turn a caught handler panic into a 500 error envelope.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    error!("Handler panicked: {detail}");
    ApiError::Internal(detail).into_response()
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
    pub param: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), code = self.code(), "Request rejected: {self}");
        (status, Json(self.body())).into_response()
    }
}
