//! Application error taxonomy and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::routes::ErrorResponse;

/// Failure talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored record is malformed: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure talking to the external image host.
#[derive(Debug, Error)]
pub enum ImageHostError {
    #[error("image host request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("image host rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("image host returned an unexpected response: {0}")]
    Protocol(String),
}

/// Failure bringing the server up; reported once and the process exits.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("database unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("image host client: {0}")]
    ImageHost(#[from] ImageHostError),

    #[error("invalid bind address {0}")]
    InvalidAddress(String),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    ValidationFailed {
        field: Option<&'static str>,
        message: String,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("image upload rejected: {0}")]
    UploadRejected(#[source] ImageHostError),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] StoreError),

    #[error("{0}")]
    ConfigurationMissing(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        AppError::ValidationFailed {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::UploadRejected(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ConfigurationMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Upstream detail stays in the logs, never in the response body.
        let body = match &self {
            AppError::ValidationFailed { field, message } => ErrorResponse {
                error: message.clone(),
                field: field.map(str::to_string),
            },
            AppError::UploadRejected(e) => {
                tracing::error!(error = %e, "image host upload failed");
                ErrorResponse::new("Failed to upload image. Please try again later.")
            }
            AppError::UpstreamUnavailable(e) => {
                tracing::error!(error = %e, "store operation failed");
                ErrorResponse::new("Service temporarily unavailable. Please try again later.")
            }
            AppError::ConfigurationMissing(what) => {
                tracing::error!(missing = %what, "configuration missing");
                ErrorResponse::new(what.clone())
            }
            other => ErrorResponse::new(other.to_string()),
        };

        (status, Json(body)).into_response()
    }
}
