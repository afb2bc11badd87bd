//! Error types for the API server

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mh_http_client::MhError;
use serde::Serialize;
use thiserror::Error;

/// Startup errors
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] MhError),

    /// Identity store error
    #[error("Identity store error: {0}")]
    Store(#[from] StoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid or unresolvable configuration
#[derive(Error, Debug)]
#[error("{0}")]
pub struct ConfigError(pub String);

/// Identity store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Store file is not valid JSON
    #[error("Corrupt store file: {0}")]
    Json(#[from] serde_json::Error),

    /// Store directory creation failed
    #[error("Store directory creation failed: {0}")]
    DirCreation(String),

    /// A link with the same id already exists
    #[error("{field} {id} is already linked")]
    Conflict { field: &'static str, id: u64 },
}

/// Error returned by handlers, rendered as `{ "success": false, "error": ... }`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Upstream(#[from] MhError),

    #[error(transparent)]
    Store(StoreError),
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(error) => upstream_status(error),
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller; internal failures are not described
    fn public_message(&self) -> String {
        match self {
            ApiError::Upstream(MhError::Authentication(_) | MhError::SessionRefreshIneffective) => {
                "Invalid credentials".to_string()
            }
            ApiError::Upstream(MhError::ChallengeRequired { .. }) => {
                "King's Reward puzzle pending".to_string()
            }
            ApiError::Upstream(MhError::NotFound(_)) => "User not found".to_string(),
            ApiError::Upstream(MhError::Upstream { message, .. }) => message.clone(),
            ApiError::Upstream(_) => "Unexpected response from MouseHunt".to_string(),
            ApiError::Store(_) => "Identity store failure".to_string(),
            other => other.to_string(),
        }
    }
}

fn upstream_status(error: &MhError) -> StatusCode {
    match error {
        MhError::Authentication(_) | MhError::SessionRefreshIneffective => StatusCode::UNAUTHORIZED,
        MhError::NotFound(_) => StatusCode::NOT_FOUND,
        MhError::Upstream { code: 401 | 403, .. } => StatusCode::UNAUTHORIZED,
        MhError::Upstream { code: 400 | 404, .. } => StatusCode::NOT_FOUND,
        MhError::Request(_)
        | MhError::Transport { .. }
        | MhError::ChallengeRequired { .. }
        | MhError::Extraction(_)
        | MhError::Schema(_)
        | MhError::Decode(_)
        | MhError::Upstream { .. }
        | MhError::ClientInit(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict { .. } => ApiError::Conflict(error.to_string()),
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        } else {
            log::debug!("Request rejected ({status}): {self}");
        }

        let envelope = ErrorEnvelope {
            success: false,
            error: self.public_message(),
        };
        (status, Json(envelope)).into_response()
    }
}
