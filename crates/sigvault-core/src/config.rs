//! Configuration for the authentication engine.
//!
//! Provides [`SigvaultConfig`]. Values are loaded from environment variables
//! and fall back to defaults matching AWS behaviour (15 minute clock skew,
//! 7 day presigned URL cap).

use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::error::{SigvaultError, SigvaultResult};
use crate::types::AwsRegion;

/// Longest validity AWS accepts for a presigned URL, in seconds.
const MAX_PRESIGNED_EXPIRES_SECS: u64 = 604_800;

/// Widest accepted clock skew window, in seconds (one day).
const MAX_CLOCK_SKEW_SECS: u64 = 86_400;

/// Authentication engine configuration.
///
/// # Examples
///
/// ```
/// use sigvault_core::SigvaultConfig;
///
/// let config = SigvaultConfig::default();
/// assert_eq!(config.max_clock_skew_secs, 900);
/// assert_eq!(config.default_service, "iam");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SigvaultConfig {
    /// Region placed in the credential scope of outgoing signed requests.
    #[builder(default)]
    pub default_region: AwsRegion,

    /// Service placed in the credential scope of outgoing signed requests.
    #[builder(default = String::from("iam"))]
    pub default_service: String,

    /// Accepted distance, in seconds, between a request timestamp and now.
    #[builder(default = 900)]
    pub max_clock_skew_secs: u64,

    /// Upper bound for `X-Amz-Expires` on presigned V4 URLs.
    #[builder(default = MAX_PRESIGNED_EXPIRES_SECS)]
    pub max_presigned_expires_secs: u64,

    /// Whether `UNSIGNED-PAYLOAD` and streaming payload markers are honoured.
    #[builder(default = true)]
    pub allow_unsigned_payload: bool,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for SigvaultConfig {
    fn default() -> Self {
        Self {
            default_region: AwsRegion::default(),
            default_service: String::from("iam"),
            max_clock_skew_secs: 900,
            max_presigned_expires_secs: MAX_PRESIGNED_EXPIRES_SECS,
            allow_unsigned_payload: true,
            log_level: String::from("info"),
        }
    }
}

impl SigvaultConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SIGVAULT_DEFAULT_REGION` | `us-east-1` |
    /// | `SIGVAULT_DEFAULT_SERVICE` | `iam` |
    /// | `SIGVAULT_MAX_CLOCK_SKEW_SECS` | `900` |
    /// | `SIGVAULT_MAX_PRESIGNED_EXPIRES_SECS` | `604800` |
    /// | `SIGVAULT_ALLOW_UNSIGNED_PAYLOAD` | `true` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// # Errors
    /// Returns [`SigvaultError::Config`] when a numeric variable does not parse
    /// or the resulting configuration fails [`SigvaultConfig::validate`], and
    /// [`SigvaultError::InvalidRegion`] for a malformed region.
    pub fn from_env() -> SigvaultResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("SIGVAULT_DEFAULT_REGION") {
            config.default_region = AwsRegion::parse(v)?;
        }
        if let Ok(v) = std::env::var("SIGVAULT_DEFAULT_SERVICE") {
            config.default_service = v;
        }
        if let Ok(v) = std::env::var("SIGVAULT_MAX_CLOCK_SKEW_SECS") {
            config.max_clock_skew_secs = parse_u64("SIGVAULT_MAX_CLOCK_SKEW_SECS", &v)?;
        }
        if let Ok(v) = std::env::var("SIGVAULT_MAX_PRESIGNED_EXPIRES_SECS") {
            config.max_presigned_expires_secs =
                parse_u64("SIGVAULT_MAX_PRESIGNED_EXPIRES_SECS", &v)?;
        }
        if let Ok(v) = std::env::var("SIGVAULT_ALLOW_UNSIGNED_PAYLOAD") {
            config.allow_unsigned_payload = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config.validate()?;
        debug!(?config, "loaded sigvault configuration");
        Ok(config)
    }

    /// Check that the configured bounds are usable.
    ///
    /// # Errors
    /// Returns [`SigvaultError::Config`] if the clock skew window is zero or
    /// wider than a day, the presigned expiry cap is zero or exceeds 7 days,
    /// or the default service is empty.
    pub fn validate(&self) -> SigvaultResult<()> {
        if self.max_clock_skew_secs == 0 || self.max_clock_skew_secs > MAX_CLOCK_SKEW_SECS {
            return Err(SigvaultError::Config(format!(
                "max_clock_skew_secs must be within 1..={MAX_CLOCK_SKEW_SECS}"
            )));
        }
        if self.max_presigned_expires_secs == 0
            || self.max_presigned_expires_secs > MAX_PRESIGNED_EXPIRES_SECS
        {
            return Err(SigvaultError::Config(format!(
                "max_presigned_expires_secs must be within 1..={MAX_PRESIGNED_EXPIRES_SECS}"
            )));
        }
        if self.default_service.is_empty() {
            return Err(SigvaultError::Config(
                "default_service must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

fn parse_u64(name: &str, value: &str) -> SigvaultResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| SigvaultError::Config(format!("{name} must be an integer, got {value:?}")))
}

/// Parse a boolean from common string representations.
fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
