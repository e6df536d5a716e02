//! HTTP error rendering.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hairfit_core::Error;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    PayloadTooLarge(String),
    InsufficientStorage(String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InsufficientStorage(_) => StatusCode::INSUFFICIENT_STORAGE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::PayloadTooLarge(m)
            | ApiError::InsufficientStorage(m)
            | ApiError::BadGateway(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            // Provider messages go to the client verbatim.
            Error::Provider(msg) => ApiError::BadGateway(msg),
            Error::Timeout(_) | Error::Request(_) => ApiError::BadGateway(err.to_string()),
            Error::NotFound(_) => ApiError::NotFound(err.to_string()),
            Error::DuplicateKey(_) | Error::EditInProgress | Error::AlreadyProcessing => {
                ApiError::Conflict(err.to_string())
            }
            Error::PayloadTooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            Error::StorageQuotaExceeded(_) => ApiError::InsufficientStorage(err.to_string()),
            Error::InvalidInput(_) | Error::InvalidState(_) | Error::Serialization(_) => {
                ApiError::BadRequest(err.to_string())
            }
            Error::Config(_) | Error::Internal(_) | Error::Io(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.message(),
        }));
        (self.status(), body).into_response()
    }
}

/// Error from the transform endpoint, rendered as `{success: false, error}`.
#[derive(Debug)]
pub struct TransformError(pub ApiError);

impl From<ApiError> for TransformError {
    fn from(err: ApiError) -> Self {
        TransformError(err)
    }
}

impl From<Error> for TransformError {
    fn from(err: Error) -> Self {
        TransformError(err.into())
    }
}

impl From<JsonRejection> for TransformError {
    fn from(rejection: JsonRejection) -> Self {
        TransformError(rejection.into())
    }
}

impl IntoResponse for TransformError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.0.message(),
        }));
        (self.0.status(), body).into_response()
    }
}
