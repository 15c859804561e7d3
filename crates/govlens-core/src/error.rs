//! Domain-level error taxonomy for govlens.

/// govlens domain errors.
#[derive(Debug, thiserror::Error)]
pub enum GovlensError {
    #[error("API error: {0}")]
    Api(#[from] govlens_api::ApiError),

    #[error("invalid score input: {field} = {value} (expected {expected})")]
    InvalidScoreInput {
        field: &'static str,
        value: i64,
        expected: &'static str,
    },

    #[error("model returned a probability outside [0, 1]: {0}")]
    InvalidProbability(f64),

    #[error("invalid link base: {0}")]
    InvalidLinkBase(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for govlens domain operations.
pub type Result<T> = std::result::Result<T, GovlensError>;
