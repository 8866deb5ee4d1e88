//! Error types for FPF Core

use thiserror::Error;

/// Failure of a port search
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// Start port below the cursor or above the maximum port
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No available port between the start port and the maximum port
    #[error("Port not found: {0}")]
    NotFound(String),
}

/// Rejected allocator configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, PortError>;
