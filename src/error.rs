//! Error types for the build engine.

use crate::models::{Category, PcType};
use thiserror::Error;

/// Errors that reject a configuration call or a profile table entry.
///
/// Conditions that still allow a (partial) build, such as an empty
/// required category, are reported as warnings on the configuration
/// instead.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown pc type: {0}")]
    UnknownPcType(String),

    #[error("custom budget must be a positive amount no larger than 10000000000000, got {0}")]
    InvalidBudget(f64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no profile configured for pc type {0}")]
    MissingProfile(PcType),

    #[error("invalid profile for {pc_type}: {reason}")]
    InvalidProfile { pc_type: PcType, reason: String },

    #[error("category {category} is required by {pc_type} but has no weight")]
    UnweightedRequiredCategory { pc_type: PcType, category: Category },

    #[error("failed to read profile file: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Whether the error was caused by the caller's input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ConfigError::UnknownPcType(_)
                | ConfigError::InvalidBudget(_)
                | ConfigError::InvalidInput(_)
                | ConfigError::InvalidProfile { .. }
                | ConfigError::UnweightedRequiredCategory { .. }
        )
    }
}
