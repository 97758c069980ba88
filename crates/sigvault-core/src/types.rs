//! Shared type definitions.

use std::fmt;

use crate::error::{SigvaultError, SigvaultResult};

/// AWS Region identifier, as carried in a credential scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AwsRegion(String);

impl AwsRegion {
    /// Region used when nothing else is configured.
    pub const DEFAULT: &str = "us-east-1";

    /// Create a new region without validation.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    /// Create a region after checking it is a plausible region name.
    ///
    /// Only lower-case ASCII letters, digits and `-` are accepted.
    ///
    /// # Errors
    /// Returns [`SigvaultError::InvalidRegion`] for empty or malformed names.
    pub fn parse(region: impl Into<String>) -> SigvaultResult<Self> {
        let region = region.into();
        let valid = !region.is_empty()
            && region
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(SigvaultError::InvalidRegion(region));
        }
        Ok(Self(region))
    }

    /// Get the region as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AwsRegion {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for AwsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
