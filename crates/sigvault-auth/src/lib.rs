//! AWS Signature Version 2 and 4 request authentication with identity resolution.
//!
//! This crate classifies incoming HTTP requests by signature scheme and
//! transport, rebuilds the exact string each scheme signs, and hands the
//! result to an identity backend that owns the secrets. The backend's answer
//! becomes an [`AuthInfo`]; requests without credentials resolve to the
//! public "All Users" identity.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sigvault_auth::in_memory::{AccessKey, Account};
//! use sigvault_auth::{Authenticator, InMemoryBackend, RequestContext, Vault};
//! use sigvault_core::SigvaultConfig;
//!
//! let backend = InMemoryBackend::new();
//! backend.add_account(Account::new("79a59df9", "Bart", "bart@example.com", "arn:aws:iam::123456789012:root"));
//! backend.add_access_key(AccessKey::new("accessKey1", "verySecretKey1", "79a59df9"));
//!
//! let auth = Authenticator::new(Vault::new(Arc::new(backend)), SigvaultConfig::default());
//! let mut ctx = RequestContext::new();
//! // let info = auth.do_auth(&parts, Some(&body), "s3", "req-1", &mut ctx).await?;
//! ```
//!
//! # Modules
//!
//! - [`dispatch`] - Scheme selection and the end-to-end entry point
//! - [`sigv2`] - Legacy SigV2 string-to-sign construction
//! - [`sigv4`] - SigV4 `Authorization` header parsing and checks
//! - [`presigned`] - SigV4 presigned URL parsing and expiry checks
//! - [`canonical`] - Canonical request construction for SigV4
//! - [`signing_key`] - Scoped signing key derivation
//! - [`vault`] - Identity backend trait and client
//! - [`in_memory`] - In-memory identity backend
//! - [`signer`] - Outgoing request signing

pub mod auth_info;
pub mod canonical;
pub mod context;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod in_memory;
pub mod params;
pub mod presigned;
pub mod query;
pub mod signer;
pub mod signing_key;
pub mod sigv2;
pub mod sigv4;
pub mod time;
pub mod vault;

pub use auth_info::{AccessKeyMetadata, AuthInfo, PUBLIC_ID};
pub use context::{AuthTransport, AuthType, RequestContext, SignatureVersion};
pub use credential::{Credential, CredentialScope};
pub use dispatch::{AuthCheck, Authenticator, CheckOutcome};
pub use error::{AuthError, BackendError};
pub use in_memory::InMemoryBackend;
pub use params::{HmacAlgorithm, V2SignatureParams, V4SignatureParams};
pub use query::QueryParams;
pub use signer::RequestSigner;
pub use signing_key::{derive_signing_key, hash_payload};
pub use vault::{IdentityBackend, LookupEntry, Vault, VerifyV2Request, VerifyV4Request};
