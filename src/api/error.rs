use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::form::{FormError, SubmitError};
use crate::services::{AuthError, CatalogError};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    ExternalApiError { service: String, message: String },

    ValidationError(String),

    NotImplemented(String),

    Conflict(String),

    InternalError(String),

    Unauthorized(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::ExternalApiError { service, message } => {
                write!(f, "{service} error: {message}")
            }
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::NotImplemented(msg) => write!(f, "Not implemented: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::ExternalApiError { service, message } => {
                tracing::warn!("{} error: {}", service, message);
                (StatusCode::BAD_GATEWAY, message.clone())
            }
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotImplemented(msg) => (StatusCode::NOT_IMPLEMENTED, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotAuthenticated => Self::Unauthorized(err.to_string()),
            CatalogError::EpisodeNotFound => Self::NotFound(err.to_string()),
            CatalogError::Backend { .. } => Self::backend(err.to_string()),
            CatalogError::Storage(msg) => Self::internal(msg),
        }
    }
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Invalid(e) => e.into(),
            SubmitError::Catalog(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AuthError::UserExists => Self::Conflict(err.to_string()),
            AuthError::WeakPassword(_) => Self::validation(err.to_string()),
            AuthError::Unsupported(_) => Self::NotImplemented(err.to_string()),
            AuthError::Backend(msg) => Self::ExternalApiError {
                service: "Identity".to_string(),
                message: msg,
            },
            AuthError::Storage(msg) | AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id} not found"))
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::ExternalApiError {
            service: "Backend".to_string(),
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}
