//! Signing material extracted from a request, ready for backend verification.

use crate::credential::CredentialScope;

/// HMAC digest used by a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacAlgorithm {
    /// HMAC-SHA1, used by V2 signatures.
    Sha1,
    /// HMAC-SHA256, used by V4 signatures.
    Sha256,
}

impl HmacAlgorithm {
    /// Lower-case algorithm name as understood by the identity backend.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

/// V2 signing material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V2SignatureParams {
    /// Claimed access key ID.
    pub access_key: String,
    /// Base64 signature carried by the request.
    pub signature: String,
    /// The string the client should have signed.
    pub string_to_sign: String,
    /// Digest used for the HMAC.
    pub algorithm: HmacAlgorithm,
}

/// V4 signing material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V4SignatureParams {
    /// Claimed access key ID.
    pub access_key: String,
    /// Hex signature carried by the request.
    pub signature: String,
    /// The string the client should have signed.
    pub string_to_sign: String,
    /// Credential scope the signing key was derived for.
    pub scope: CredentialScope,
    /// Request timestamp, `YYYYMMDDTHHMMSSZ`.
    pub timestamp: String,
    /// Headers covered by the signature, lower-case and sorted.
    pub signed_headers: Vec<String>,
}

impl V4SignatureParams {
    /// Digest used for the HMAC; always SHA-256 for V4.
    #[must_use]
    pub fn algorithm(&self) -> HmacAlgorithm {
        HmacAlgorithm::Sha256
    }
}
