//! Request-scoped context populated by the dispatcher for policy evaluation.

use chrono::Duration;

/// Which signature scheme authenticated the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// No credentials, or credentials in an unrecognised scheme.
    None,
    /// Legacy HMAC signature (`AWS` prefix, `Signature` query parameter).
    V2,
    /// `AWS4-HMAC-SHA256` signature.
    V4,
}

impl AuthType {
    /// Lower-case name of the scheme.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::V2 => "v2",
            Self::V4 => "v4",
        }
    }
}

/// The algorithm literal announced by the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureVersion {
    /// `AWS`
    V2,
    /// `AWS4-HMAC-SHA256`
    V4,
}

impl SignatureVersion {
    /// The literal as it appears in policy condition keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V2 => "AWS",
            Self::V4 => "AWS4-HMAC-SHA256",
        }
    }
}

/// Where the signing material was carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTransport {
    /// `Authorization` header.
    Header,
    /// Presigned query string.
    QueryString,
}

impl AuthTransport {
    /// The `s3:authType` condition value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "REST-HEADER",
            Self::QueryString => "REST-QUERY-STRING",
        }
    }
}

/// Authentication facts recorded for downstream authorization.
///
/// Owned by the caller of [`crate::Authenticator::do_auth`]; the dispatcher
/// writes it exactly once per request and never reads it back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    auth_type: Option<AuthType>,
    signature_version: Option<SignatureVersion>,
    signature_age: Option<Duration>,
    transport: Option<AuthTransport>,
}

impl RequestContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheme that was selected for the request.
    #[must_use]
    pub fn auth_type(&self) -> Option<AuthType> {
        self.auth_type
    }

    /// Algorithm literal of the selected scheme.
    #[must_use]
    pub fn signature_version(&self) -> Option<SignatureVersion> {
        self.signature_version
    }

    /// Time elapsed between the request timestamp and processing.
    #[must_use]
    pub fn signature_age(&self) -> Option<Duration> {
        self.signature_age
    }

    /// Transport that carried the signature.
    #[must_use]
    pub fn transport(&self) -> Option<AuthTransport> {
        self.transport
    }

    pub(crate) fn record(
        &mut self,
        auth_type: AuthType,
        signature_version: Option<SignatureVersion>,
        signature_age: Option<Duration>,
        transport: Option<AuthTransport>,
    ) {
        self.auth_type = Some(auth_type);
        self.signature_version = signature_version;
        self.signature_age = signature_age;
        self.transport = transport;
    }
}
