//! Error types for the fall-detection pipeline

use std::time::Duration;

use thiserror::Error;

use crate::{InvariantViolation, Timestamp};

/// Core Fallwatch errors
#[derive(Error, Debug)]
pub enum FallwatchError {
    // Boundary errors
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("Time went backwards: {current:?} after {previous:?}")]
    TimeWentBackwards {
        previous: Timestamp,
        current: Timestamp,
    },

    // Configuration errors
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    // Reasoning provider errors
    #[error("Provider transport error: {0}")]
    ProviderTransport(String),

    #[error("Provider returned HTTP status {0}")]
    ProviderStatus(u16),

    #[error("Provider timed out after {0:?}")]
    ProviderTimeout(Duration),

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Provider response could not be parsed: {0}")]
    UnparseableResponse(String),

    // Persistence errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl FallwatchError {
    /// Shorthand for configuration failures
    pub fn invalid_config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        FallwatchError::InvalidConfig {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Errors produced by the external reasoning backend
    pub fn is_provider_fault(&self) -> bool {
        matches!(
            self,
            FallwatchError::ProviderTransport(_)
                | FallwatchError::ProviderStatus(_)
                | FallwatchError::ProviderTimeout(_)
                | FallwatchError::EmptyResponse
                | FallwatchError::UnparseableResponse(_)
        )
    }
}

/// Result type for Fallwatch operations
pub type FallwatchResult<T> = Result<T, FallwatchError>;
