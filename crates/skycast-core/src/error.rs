//! Error types for the aggregation core

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A sample could not be ingested, usually because its timestamp is
    /// missing or unparseable. Raised before any bucketing happens.
    #[error("Invalid sample at index {index}: {reason}")]
    InvalidSample { index: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
