//! JSON envelope shared by every endpoint.

use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::Error;

/// `{success, message?, data?}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T = ()> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Failures that end a request with an error status.
#[derive(Debug)]
pub enum ApiError {
    /// 401: secure key missing or wrong
    Unauthorized,
    /// 405: execution endpoint called without POST
    MethodNotAllowed,
    /// 400: request body is not a task request
    BadRequestBody(String),
    /// 413: request body over the configured limit
    PayloadTooLarge,
    /// 400: the curl pipeline failed
    Execution(Error),
    /// 500: metrics provider failed; message is shown to the caller
    Metrics(String),
    /// 500: anything unexpected; details are logged, never returned
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "invalid secure key"),
            Self::MethodNotAllowed => write!(f, "only POST requests are supported"),
            Self::BadRequestBody(msg) => write!(f, "cannot parse request body: {msg}"),
            Self::PayloadTooLarge => write!(f, "request body too large"),
            Self::Execution(err) => write!(f, "curl execution failed: {err}"),
            Self::Metrics(msg) => write!(f, "{msg}"),
            Self::Internal(_) => write!(f, "internal server error"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequestBody(_) | Self::Execution(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Metrics(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::BadRequestBody(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            tracing::error!("internal error: {detail}");
        }
        let body: ApiResponse = ApiResponse::failure(self.to_string());
        (self.status(), Json(body)).into_response()
    }
}
