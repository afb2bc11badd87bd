//! Error types for the MouseHunt HTTP client

use thiserror::Error;

/// Errors that can occur when talking to MouseHunt
#[derive(Error, Debug)]
pub enum MhError {
    /// HTTP request failed before a response arrived (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Invalid HTTP status: {status}")]
    Transport {
        /// The status code that was received
        status: reqwest::StatusCode,
    },

    /// Credentials were rejected outright, or the session refresh could not be sent
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Session still reported as expired after one refresh and retry
    #[error("Session refresh did not revive the session")]
    SessionRefreshIneffective,

    /// The authenticated hunter has a pending King's Reward puzzle
    #[error("User has a pending puzzle")]
    ChallengeRequired {
        /// Profile id of the hunter the puzzle is for, when reported
        user_id: Option<u64>,
    },

    /// Expected path in the response document did not resolve
    #[error("Malformed upstream response: {0}")]
    Extraction(#[from] ExtractError),

    /// Extracted value did not match the expected record shape
    #[error("Malformed upstream response: {0}")]
    Schema(#[from] SchemaError),

    /// Response body was not JSON
    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Error envelope returned by the `/api` endpoint family
    #[error("Upstream error {code}: {message}")]
    Upstream {
        /// Code reported inside the envelope
        code: i64,
        /// Message reported inside the envelope
        message: String,
    },

    /// A looked-up identity does not exist upstream
    #[error("Not found: {0}")]
    NotFound(String),

    /// Client initialization failed
    #[error("Client initialization failed: {0}")]
    ClientInit(String),
}

/// Path query failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Path expression could not be parsed
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Path matched nothing
    #[error("no match for `{path}`")]
    NotFound { path: String },

    /// Path matched more than one value where one was required
    #[error("`{path}` matched {matches} values, expected exactly one")]
    Ambiguous { path: String, matches: usize },

    /// Path resolved to a value that is not an array
    #[error("`{path}` is not a list")]
    NotAList { path: String },

    /// Path resolved to an empty array where rows were required
    #[error("`{path}` is an empty list")]
    EmptyCollection { path: String },
}

/// Shape validation failure for a typed record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{shape} mismatch: {detail}")]
pub struct SchemaError {
    /// Name of the record that was being validated
    pub shape: String,
    /// What did not match
    pub detail: String,
}

impl SchemaError {
    pub fn new(shape: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            shape: shape.into(),
            detail: detail.into(),
        }
    }
}
