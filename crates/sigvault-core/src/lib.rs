//! Configuration and shared types for sigvault.
//!
//! This crate holds the pieces every sigvault component agrees on: the
//! [`SigvaultConfig`] loaded from the environment, the region newtype, and the
//! core error type used when configuration is invalid.

mod config;
mod error;
mod types;

pub use config::SigvaultConfig;
pub use error::{SigvaultError, SigvaultResult};
pub use types::AwsRegion;
