//! Error types for govlens-api

use thiserror::Error;

/// Errors that can occur while talking to the governance API
#[derive(Error, Debug)]
pub enum ApiError {
    /// A required setting was neither passed nor present in the environment
    #[error("missing configuration: {0} is not set")]
    MissingConfig(&'static str),

    /// A setting was present but unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A base URL could not be parsed
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The server answered with a non-200 status
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The body was not JSON, or did not match the expected record shape
    #[error("could not decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// Connection, TLS or timeout failure
    #[error("HTTP transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

impl ApiError {
    /// HTTP status of the failure, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
