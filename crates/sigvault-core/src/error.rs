//! Error types for the sigvault core.

/// Core error type for sigvault configuration and shared types.
#[derive(Debug, thiserror::Error)]
pub enum SigvaultError {
    /// A configuration value could not be parsed or is out of range.
    #[error("configuration error: {0}")]
    Config(String),

    /// The region identifier is empty or contains characters outside `[a-z0-9-]`.
    #[error("invalid AWS region: {0:?}")]
    InvalidRegion(String),
}

/// Convenience result type for sigvault core operations.
pub type SigvaultResult<T> = Result<T, SigvaultError>;
