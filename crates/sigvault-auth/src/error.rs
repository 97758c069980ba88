//! Error types for request authentication.
//!
//! [`AuthError`] covers every failure the engine can report. Errors raised
//! while inspecting the request are produced locally, before the identity
//! backend is contacted. Errors produced by the backend arrive as
//! [`BackendError`] and are carried through [`AuthError::Backend`] untouched.

/// An opaque error returned by the identity backend.
///
/// The engine never interprets these; `code` and `message` are forwarded to
/// the caller exactly as the backend produced them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct BackendError {
    /// AWS-style error code, e.g. `SignatureDoesNotMatch`.
    pub code: String,
    /// Human readable description.
    pub message: String,
}

impl BackendError {
    /// Create a backend error from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The signature recomputed by the backend differs from the request's.
    #[must_use]
    pub fn signature_does_not_match() -> Self {
        Self::new(
            "SignatureDoesNotMatch",
            "The request signature we calculated does not match the signature you provided.",
        )
    }

    /// The access key is unknown to the backend.
    #[must_use]
    pub fn invalid_access_key_id() -> Self {
        Self::new(
            "InvalidAccessKeyId",
            "The AWS access key Id you provided does not exist in our records.",
        )
    }

    /// The access key exists but has been deactivated.
    #[must_use]
    pub fn inactive_access_key() -> Self {
        Self::new("InvalidAccessKeyId", "The access key is inactive.")
    }
}

/// Errors that can occur while authenticating a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// An `Authorization` header is present but uses no known scheme, or a V2
    /// header request carries no date.
    #[error("Your request was missing a required header")]
    MissingSecurityHeader,

    /// A request field is malformed or names the wrong service.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The `Authorization` header could not be parsed.
    #[error("The authorization header is malformed: {0}")]
    AuthorizationHeaderMalformed(String),

    /// The presigned query parameters are missing or malformed.
    #[error("Query-string authentication parameters are invalid: {0}")]
    AuthorizationQueryParametersError(String),

    /// A header listed in `SignedHeaders` is absent from the request.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// The signing algorithm is not `AWS4-HMAC-SHA256`.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The request timestamp is too far from the current time.
    #[error("The difference between the request time and the current time is too large")]
    RequestTimeTooSkewed,

    /// The presigned URL is past its expiry.
    #[error("Request has expired")]
    RequestExpired,

    /// The body does not hash to the declared `x-amz-content-sha256`.
    #[error("The provided 'x-amz-content-sha256' header does not match what was computed")]
    XAmzContentSha256Mismatch,

    /// At least one email address in a grant could not be resolved.
    #[error("The email address you provided does not match any account on record")]
    UnresolvableGrantByEmailAddress,

    /// Error produced by the identity backend, forwarded verbatim.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Defect inside the engine or an unusable backend response.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// The AWS error code reported to clients.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::MissingSecurityHeader => "MissingSecurityHeader",
            Self::InvalidArgument(_) | Self::UnsupportedAlgorithm(_) => "InvalidArgument",
            Self::AuthorizationHeaderMalformed(_) => "AuthorizationHeaderMalformed",
            Self::AuthorizationQueryParametersError(_) => "AuthorizationQueryParametersError",
            Self::MissingHeader(_) | Self::RequestExpired => "AccessDenied",
            Self::RequestTimeTooSkewed => "RequestTimeTooSkewed",
            Self::XAmzContentSha256Mismatch => "XAmzContentSHA256Mismatch",
            Self::UnresolvableGrantByEmailAddress => "UnresolvableGrantByEmailAddress",
            Self::Backend(err) => &err.code,
            Self::InternalError(_) => "InternalError",
        }
    }

    /// Whether the error was raised without consulting the identity backend.
    #[must_use]
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::Backend(_))
    }
}
