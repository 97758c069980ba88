//! Client for the external identity backend.
//!
//! The backend is the single source of truth for signature validity. It holds
//! the secrets, recomputes the signature from the string to sign and returns
//! the requester's identity. [`Vault`] wraps an injected
//! [`IdentityBackend`] handle, logs every exchange and applies the lookup
//! rules for the email directory.
//!
//! # Object safety
//!
//! [`IdentityBackend`] uses `#[async_trait]` so it can be shared as
//! `Arc<dyn IdentityBackend>`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::auth_info::AuthInfo;
use crate::context::RequestContext;
use crate::error::{AuthError, BackendError};
use crate::params::{HmacAlgorithm, V2SignatureParams, V4SignatureParams};

const NOT_FOUND: &str = "NotFound";
const WRONG_FORMAT: &str = "WrongFormat";

/// A V2 signature verification request sent to the backend.
#[derive(Debug, Clone, Copy)]
pub struct VerifyV2Request<'a> {
    /// The string the client should have signed.
    pub string_to_sign: &'a str,
    /// Base64 signature carried by the request.
    pub signature: &'a str,
    /// Claimed access key ID.
    pub access_key: &'a str,
    /// Digest the backend must use.
    pub algorithm: HmacAlgorithm,
    /// Request correlation id.
    pub req_uid: &'a str,
    /// Policy context of the request, when available.
    pub request_context: Option<&'a RequestContext>,
}

/// A V4 signature verification request sent to the backend.
#[derive(Debug, Clone, Copy)]
pub struct VerifyV4Request<'a> {
    /// The string the client should have signed.
    pub string_to_sign: &'a str,
    /// Hex signature carried by the request.
    pub signature: &'a str,
    /// Claimed access key ID.
    pub access_key: &'a str,
    /// Region of the credential scope.
    pub region: &'a str,
    /// Date of the credential scope, `YYYYMMDD`.
    pub scope_date: &'a str,
    /// Service of the credential scope.
    pub service: &'a str,
    /// Request correlation id.
    pub req_uid: &'a str,
    /// Policy context of the request, when available.
    pub request_context: Option<&'a RequestContext>,
}

/// One entry of a directory lookup answer.
///
/// On the wire every entry is a plain string; `"NotFound"` and
/// `"WrongFormat"` are sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LookupEntry {
    /// The looked-up value.
    Found(String),
    /// No account matches the key.
    NotFound,
    /// The key is not well formed.
    WrongFormat,
}

impl From<String> for LookupEntry {
    fn from(value: String) -> Self {
        match value.as_str() {
            NOT_FOUND => Self::NotFound,
            WRONG_FORMAT => Self::WrongFormat,
            _ => Self::Found(value),
        }
    }
}

impl From<LookupEntry> for String {
    fn from(entry: LookupEntry) -> Self {
        match entry {
            LookupEntry::Found(value) => value,
            LookupEntry::NotFound => NOT_FOUND.to_owned(),
            LookupEntry::WrongFormat => WRONG_FORMAT.to_owned(),
        }
    }
}

/// The identity backend's call surface.
#[async_trait::async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Verify a V2 signature and return the signer's identity.
    async fn verify_signature_v2(
        &self,
        request: VerifyV2Request<'_>,
    ) -> Result<AuthInfo, BackendError>;

    /// Verify a V4 signature and return the signer's identity.
    async fn verify_signature_v4(
        &self,
        request: VerifyV4Request<'_>,
    ) -> Result<AuthInfo, BackendError>;

    /// Map each email address to a canonical ID or a sentinel.
    async fn get_canonical_ids(
        &self,
        emails: &[String],
        req_uid: &str,
    ) -> Result<BTreeMap<String, LookupEntry>, BackendError>;

    /// Map each canonical ID to an email address or a sentinel.
    async fn get_email_addresses(
        &self,
        canonical_ids: &[String],
        req_uid: &str,
    ) -> Result<BTreeMap<String, LookupEntry>, BackendError>;
}

/// Shared handle on the identity backend.
#[derive(Clone)]
pub struct Vault {
    backend: Arc<dyn IdentityBackend>,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault").finish_non_exhaustive()
    }
}

impl Vault {
    /// Wrap a backend handle.
    pub fn new(backend: Arc<dyn IdentityBackend>) -> Self {
        Self { backend }
    }

    /// Ask the backend to verify a V2 signature.
    ///
    /// # Errors
    ///
    /// Backend errors are returned as [`AuthError::Backend`], unchanged.
    pub async fn authenticate_v2_request(
        &self,
        params: &V2SignatureParams,
        req_uid: &str,
        request_context: Option<&RequestContext>,
    ) -> Result<AuthInfo, AuthError> {
        debug!(req_uid, access_key = %params.access_key, "Authenticating V2 request");
        let result = self
            .backend
            .verify_signature_v2(VerifyV2Request {
                string_to_sign: &params.string_to_sign,
                signature: &params.signature,
                access_key: &params.access_key,
                algorithm: params.algorithm,
                req_uid,
                request_context,
            })
            .await;
        accept_identity(result, req_uid)
    }

    /// Ask the backend to verify a V4 signature.
    ///
    /// # Errors
    ///
    /// Backend errors are returned as [`AuthError::Backend`], unchanged.
    pub async fn authenticate_v4_request(
        &self,
        params: &V4SignatureParams,
        req_uid: &str,
        request_context: Option<&RequestContext>,
    ) -> Result<AuthInfo, AuthError> {
        debug!(req_uid, access_key = %params.access_key, scope = %params.scope, "Authenticating V4 request");
        let result = self
            .backend
            .verify_signature_v4(VerifyV4Request {
                string_to_sign: &params.string_to_sign,
                signature: &params.signature,
                access_key: &params.access_key,
                region: &params.scope.region,
                scope_date: &params.scope.scope_date,
                service: &params.scope.service,
                req_uid,
                request_context,
            })
            .await;
        accept_identity(result, req_uid)
    }

    /// Resolve email addresses to canonical IDs, keyed by email.
    ///
    /// # Errors
    ///
    /// Fails as a whole with [`AuthError::UnresolvableGrantByEmailAddress`]
    /// if any address is unknown or malformed.
    pub async fn get_canonical_ids(
        &self,
        emails: &[String],
        req_uid: &str,
    ) -> Result<BTreeMap<String, String>, AuthError> {
        trace!(req_uid, ?emails, "Getting canonical IDs from vault");
        let entries = self
            .backend
            .get_canonical_ids(emails, req_uid)
            .await
            .map_err(|err| backend_failure(err, req_uid))?;
        trace!(req_uid, ?entries, "Canonical IDs received from vault");

        entries
            .into_iter()
            .map(|(email, entry)| match entry {
                LookupEntry::Found(id) => Ok((email, id)),
                LookupEntry::NotFound | LookupEntry::WrongFormat => {
                    debug!(req_uid, email, "Unresolvable grantee email");
                    Err(AuthError::UnresolvableGrantByEmailAddress)
                }
            })
            .collect()
    }

    /// Resolve canonical IDs to email addresses, keyed by canonical ID.
    ///
    /// Unknown or malformed IDs are left out of the result.
    ///
    /// # Errors
    ///
    /// Only backend errors are reported.
    pub async fn get_email_addresses(
        &self,
        canonical_ids: &[String],
        req_uid: &str,
    ) -> Result<BTreeMap<String, String>, AuthError> {
        trace!(req_uid, ?canonical_ids, "Getting email addresses from vault");
        let entries = self
            .backend
            .get_email_addresses(canonical_ids, req_uid)
            .await
            .map_err(|err| backend_failure(err, req_uid))?;
        trace!(req_uid, ?entries, "Email addresses received from vault");

        Ok(entries
            .into_iter()
            .filter_map(|(id, entry)| match entry {
                LookupEntry::Found(email) => Some((id, email)),
                LookupEntry::NotFound | LookupEntry::WrongFormat => None,
            })
            .collect())
    }
}

fn accept_identity(
    result: Result<AuthInfo, BackendError>,
    req_uid: &str,
) -> Result<AuthInfo, AuthError> {
    let info = result.map_err(|err| backend_failure(err, req_uid))?;
    if info.canonical_id().is_empty() {
        error!(req_uid, "Vault returned an identity without canonical ID");
        return Err(AuthError::InternalError(
            "identity backend returned an identity without canonical ID".to_owned(),
        ));
    }
    debug!(req_uid, canonical_id = info.canonical_id(), "Received user info from vault");
    Ok(info)
}

fn backend_failure(err: BackendError, req_uid: &str) -> AuthError {
    error!(req_uid, code = %err.code, message = %err.message, "Received error message from vault");
    AuthError::Backend(err)
}
