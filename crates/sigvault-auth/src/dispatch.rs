//! Request classification and the authentication entry point.
//!
//! [`Authenticator::check`] selects exactly one of header V2, header V4,
//! query V2, query V4 or anonymous, first match wins:
//!
//! 1. `Authorization` starts with `AWS ` → V2 header.
//! 2. `Authorization` starts with `AWS4` → V4 header.
//! 3. Any other `Authorization` → `MissingSecurityHeader`.
//! 4. Non-empty `Signature` query parameter → V2 query.
//! 5. Non-empty `X-Amz-Algorithm` query parameter → V4 query.
//! 6. Otherwise → the public identity.
//!
//! `check` is synchronous and never talks to the backend;
//! [`Authenticator::do_auth`] completes the outstanding verification.

use chrono::{DateTime, Duration, Utc};
use http::request::Parts;
use sigvault_core::SigvaultConfig;
use tracing::{debug, trace};

use crate::auth_info::AuthInfo;
use crate::context::{AuthTransport, AuthType, RequestContext, SignatureVersion};
use crate::error::AuthError;
use crate::params::{V2SignatureParams, V4SignatureParams};
use crate::query::QueryParams;
use crate::vault::Vault;
use crate::{presigned, sigv2, sigv4};

/// What remains to be done for a classified request.
#[derive(Debug)]
pub enum CheckOutcome {
    /// A V2 signature must be verified by the backend.
    NeedsV2Verification(V2SignatureParams),
    /// A V4 signature must be verified by the backend.
    NeedsV4Verification(V4SignatureParams),
    /// The identity is known without a backend call.
    Resolved(AuthInfo),
    /// The request was rejected locally.
    Failed(AuthError),
}

/// Result of [`Authenticator::check`]: the selected path plus its outcome.
#[derive(Debug)]
pub struct AuthCheck {
    /// Selected scheme.
    pub auth_type: AuthType,
    /// Algorithm literal of the scheme, when one was selected.
    pub signature_version: Option<SignatureVersion>,
    /// Age of the signature, known only once the timestamp was validated.
    pub signature_age: Option<Duration>,
    /// Where the signing material was found.
    pub transport: Option<AuthTransport>,
    /// What remains to be done.
    pub outcome: CheckOutcome,
}

impl AuthCheck {
    fn anonymous(outcome: CheckOutcome) -> Self {
        Self {
            auth_type: AuthType::None,
            signature_version: None,
            signature_age: None,
            transport: None,
            outcome,
        }
    }

    fn v2(transport: AuthTransport, outcome: CheckOutcome, signature_age: Option<Duration>) -> Self {
        Self {
            auth_type: AuthType::V2,
            signature_version: Some(SignatureVersion::V2),
            signature_age,
            transport: Some(transport),
            outcome,
        }
    }

    fn v4(transport: AuthTransport, outcome: CheckOutcome, signature_age: Option<Duration>) -> Self {
        Self {
            auth_type: AuthType::V4,
            signature_version: Some(SignatureVersion::V4),
            signature_age,
            transport: Some(transport),
            outcome,
        }
    }
}

/// Authenticates requests against the V2 and V4 schemes.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use sigvault_auth::{Authenticator, CheckOutcome, InMemoryBackend, Vault};
/// use sigvault_core::SigvaultConfig;
///
/// let vault = Vault::new(Arc::new(InMemoryBackend::new()));
/// let auth = Authenticator::new(vault, SigvaultConfig::default());
///
/// let (parts, ()) = http::Request::builder().uri("/bucket/key").body(()).unwrap().into_parts();
/// let check = auth.check(&parts, None, "s3", "req-1");
/// assert!(matches!(check.outcome, CheckOutcome::Resolved(ref info) if info.is_requester_public_user()));
/// ```
#[derive(Debug, Clone)]
pub struct Authenticator {
    vault: Vault,
    config: SigvaultConfig,
    fixed_time: Option<DateTime<Utc>>,
}

impl Authenticator {
    /// Create an authenticator bound to a backend handle.
    #[must_use]
    pub fn new(vault: Vault, config: SigvaultConfig) -> Self {
        Self {
            vault,
            config,
            fixed_time: None,
        }
    }

    /// Evaluate clock checks against `now` instead of the system clock.
    #[must_use]
    pub fn with_time(mut self, now: DateTime<Utc>) -> Self {
        self.fixed_time = Some(now);
        self
    }

    /// The backend handle.
    #[must_use]
    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SigvaultConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.fixed_time.unwrap_or_else(Utc::now)
    }

    /// Classify a request and extract its signing material.
    ///
    /// `body`, when given, is checked against a declared
    /// `x-amz-content-sha256`. `service` is the service the request is
    /// addressed to; V4 credential scopes must name it.
    #[must_use]
    pub fn check(
        &self,
        parts: &Parts,
        body: Option<&[u8]>,
        service: &str,
        req_uid: &str,
    ) -> AuthCheck {
        debug!(req_uid, method = %parts.method, uri = %parts.uri, "Running auth checks");
        let now = self.now();

        if let Some(header) = parts.headers.get(http::header::AUTHORIZATION) {
            let header = header.to_str().unwrap_or_default();
            trace!(req_uid, auth_header = header, "Authorization header");
            if sigv2::is_sigv2(header) {
                debug!(req_uid, "Authenticating request with V2 using headers");
                let transport = AuthTransport::Header;
                return match sigv2::extract_header_params(parts, &self.config, now) {
                    Ok((params, age)) => {
                        AuthCheck::v2(transport, CheckOutcome::NeedsV2Verification(params), Some(age))
                    }
                    Err(err) => AuthCheck::v2(transport, failed(err, req_uid), None),
                };
            }
            if header.starts_with("AWS4") {
                debug!(req_uid, "Authenticating request with V4 using headers");
                let transport = AuthTransport::Header;
                return match sigv4::extract_header_params(parts, body, service, &self.config, now) {
                    Ok((params, age)) => {
                        AuthCheck::v4(transport, CheckOutcome::NeedsV4Verification(params), Some(age))
                    }
                    Err(err) => AuthCheck::v4(transport, failed(err, req_uid), None),
                };
            }
            debug!(req_uid, "Missing authorization security header");
            return AuthCheck::anonymous(CheckOutcome::Failed(AuthError::MissingSecurityHeader));
        }

        let query = QueryParams::from_uri(&parts.uri);
        if has_value(&query, "Signature") {
            debug!(req_uid, "Authenticating request with V2 using query string");
            let transport = AuthTransport::QueryString;
            return match sigv2::extract_query_params(parts, &query, now) {
                Ok(params) => AuthCheck::v2(transport, CheckOutcome::NeedsV2Verification(params), None),
                Err(err) => AuthCheck::v2(transport, failed(err, req_uid), None),
            };
        }
        if has_value(&query, "X-Amz-Algorithm") {
            debug!(req_uid, "Authenticating request with V4 using query string");
            let transport = AuthTransport::QueryString;
            return match presigned::extract_query_params(parts, &query, service, &self.config, now)
            {
                Ok((params, age)) => {
                    AuthCheck::v4(transport, CheckOutcome::NeedsV4Verification(params), Some(age))
                }
                Err(err) => AuthCheck::v4(transport, failed(err, req_uid), None),
            };
        }

        debug!(req_uid, "No authentication provided, user identified as public");
        AuthCheck::anonymous(CheckOutcome::Resolved(AuthInfo::public()))
    }

    /// Authenticate a request end to end.
    ///
    /// The selected scheme, signature version, signature age and transport
    /// are recorded in `request_context` before anything else happens, so
    /// they are available even when authentication fails.
    ///
    /// # Errors
    ///
    /// Local failures from [`Self::check`], or backend errors forwarded
    /// verbatim as [`AuthError::Backend`].
    pub async fn do_auth(
        &self,
        parts: &Parts,
        body: Option<&[u8]>,
        service: &str,
        req_uid: &str,
        request_context: &mut RequestContext,
    ) -> Result<AuthInfo, AuthError> {
        let check = self.check(parts, body, service, req_uid);
        request_context.record(
            check.auth_type,
            check.signature_version,
            check.signature_age,
            check.transport,
        );

        match check.outcome {
            CheckOutcome::Failed(err) => Err(err),
            CheckOutcome::Resolved(info) => Ok(info),
            CheckOutcome::NeedsV2Verification(params) => {
                self.vault
                    .authenticate_v2_request(&params, req_uid, Some(request_context))
                    .await
            }
            CheckOutcome::NeedsV4Verification(params) => {
                self.vault
                    .authenticate_v4_request(&params, req_uid, Some(request_context))
                    .await
            }
        }
    }
}

fn has_value(query: &QueryParams, name: &str) -> bool {
    query.get(name).is_some_and(|value| !value.is_empty())
}

fn failed(err: AuthError, req_uid: &str) -> CheckOutcome {
    debug!(req_uid, code = err.code(), error = %err, "Auth check failed");
    CheckOutcome::Failed(err)
}
