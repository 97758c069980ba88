//! AWS Signature Version 4 extraction for `Authorization` header requests.
//!
//! The engine never holds secrets. Verification here means:
//!
//! 1. Parse the `Authorization` header into credential, signed headers and
//!    signature.
//! 2. Validate the credential scope and the request clock locally.
//! 3. Resolve the payload hash the client signed.
//! 4. Rebuild the canonical request and the string to sign.
//!
//! The resulting [`V4SignatureParams`] are handed to the identity backend,
//! which derives the signing key and compares signatures.

use chrono::{DateTime, Duration, Utc};
use http::request::Parts;
use sha2::{Digest, Sha256};
use sigvault_core::SigvaultConfig;
use tracing::debug;

use crate::canonical::{build_canonical_request, collect_signed_headers};
use crate::credential::Credential;
use crate::error::AuthError;
use crate::params::V4SignatureParams;
use crate::signing_key::hash_payload;
use crate::time::{check_clock_skew, format_iso8601, parse_http_date, parse_iso8601};

/// The only algorithm supported by this implementation.
pub const SUPPORTED_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Payload marker for requests whose body is not covered by the signature.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Prefix shared by the chunked-upload payload markers.
const STREAMING_PAYLOAD_PREFIX: &str = "STREAMING-";

/// Parsed components of an AWS SigV4 `Authorization` header.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256 Credential=AKID/20130524/us-east-1/s3/aws4_request,
///   SignedHeaders=host;x-amz-content-sha256;x-amz-date,
///   Signature=<hex-signature>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAuthorization {
    /// Access key and credential scope.
    pub credential: Credential,
    /// Signed header names, lower-cased, in header order.
    pub signed_headers: Vec<String>,
    /// The hex-encoded signature.
    pub signature: String,
}

/// Parse an AWS SigV4 `Authorization` header value into its components.
///
/// # Errors
///
/// Returns [`AuthError::AuthorizationHeaderMalformed`] if a field is missing,
/// [`AuthError::UnsupportedAlgorithm`] if the algorithm is not
/// `AWS4-HMAC-SHA256`, or [`AuthError::InvalidArgument`] if the credential is
/// malformed.
pub fn parse_authorization_header(header: &str) -> Result<ParsedAuthorization, AuthError> {
    let (algorithm, rest) = header.trim().split_once(' ').ok_or_else(|| {
        AuthError::AuthorizationHeaderMalformed("missing authorization fields".to_owned())
    })?;

    if algorithm != SUPPORTED_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(algorithm.to_owned()));
    }

    let mut credential = None;
    let mut signed_headers = None;
    let mut signature = None;

    for part in rest.split(',') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("Credential=") {
            credential = Some(value);
        } else if let Some(value) = part.strip_prefix("SignedHeaders=") {
            signed_headers = Some(value);
        } else if let Some(value) = part.strip_prefix("Signature=") {
            signature = Some(value);
        }
    }

    let missing = |field: &str| AuthError::AuthorizationHeaderMalformed(format!("missing {field}"));
    let credential = Credential::parse(credential.ok_or_else(|| missing("Credential"))?)?;
    let signed_headers = parse_signed_headers(signed_headers.ok_or_else(|| missing("SignedHeaders"))?)?;
    let signature = signature.ok_or_else(|| missing("Signature"))?;
    if signature.is_empty() {
        return Err(missing("Signature"));
    }

    Ok(ParsedAuthorization {
        credential,
        signed_headers,
        signature: signature.to_owned(),
    })
}

/// Split a `;`-separated signed headers list into lower-case names.
pub(crate) fn parse_signed_headers(value: &str) -> Result<Vec<String>, AuthError> {
    let names: Vec<String> = value
        .split(';')
        .filter(|name| !name.is_empty())
        .map(str::to_lowercase)
        .collect();
    if names.is_empty() {
        return Err(AuthError::AuthorizationHeaderMalformed(
            "SignedHeaders is empty".to_owned(),
        ));
    }
    Ok(names)
}

/// Build the SigV4 string to sign.
///
/// # Examples
///
/// ```
/// use sigvault_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{SUPPORTED_ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Hash a canonical request and wrap it into the string to sign.
pub(crate) fn string_to_sign_for(
    canonical_request: &str,
    timestamp: &str,
    credential_scope: &str,
) -> String {
    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    build_string_to_sign(timestamp, credential_scope, &canonical_hash)
}

/// Extract V4 signing material from a header-signed request.
///
/// Returns the parameters for the backend together with the signature age
/// (`now` minus the request timestamp).
///
/// # Errors
///
/// Fails locally, before any backend call, on a malformed header, a scope
/// that does not match the request, a skewed clock, a missing signed header,
/// or a payload hash that does not match `body`.
pub fn extract_header_params(
    parts: &Parts,
    body: Option<&[u8]>,
    service: &str,
    config: &SigvaultConfig,
    now: DateTime<Utc>,
) -> Result<(V4SignatureParams, Duration), AuthError> {
    let header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingSecurityHeader)?
        .to_str()
        .map_err(|_| {
            AuthError::AuthorizationHeaderMalformed("authorization header is not ASCII".to_owned())
        })?;

    let parsed = parse_authorization_header(header)?;
    let (timestamp, request_time) = request_timestamp(parts)?;

    parsed.credential.scope.validate(&timestamp, service)?;
    check_clock_skew(request_time, now, config.max_clock_skew_secs)?;

    debug!(
        access_key = %parsed.credential.access_key,
        scope = %parsed.credential.scope,
        "Verifying SigV4 header signature"
    );

    let payload_hash = resolve_payload_hash(parts, body, config.allow_unsigned_payload)?;
    let header_pairs = collect_signed_headers(&parts.headers, &parts.uri, &parsed.signed_headers)?;
    let header_refs: Vec<(&str, &str)> = header_pairs
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let signed_refs: Vec<&str> = parsed.signed_headers.iter().map(String::as_str).collect();

    let canonical_request = build_canonical_request(
        parts.method.as_str(),
        parts.uri.path(),
        parts.uri.query().unwrap_or(""),
        &header_refs,
        &signed_refs,
        &payload_hash,
    );
    debug!(canonical_request, "Built canonical request");

    let scope = parsed.credential.scope;
    let string_to_sign = string_to_sign_for(&canonical_request, &timestamp, &scope.to_string());
    debug!(string_to_sign, "Built string to sign");

    let mut signed_headers = parsed.signed_headers;
    signed_headers.sort_unstable();

    Ok((
        V4SignatureParams {
            access_key: parsed.credential.access_key,
            signature: parsed.signature,
            string_to_sign,
            scope,
            timestamp,
            signed_headers,
        },
        now - request_time,
    ))
}

/// Determine the request timestamp from `x-amz-date`, falling back to `Date`.
///
/// Returns the timestamp in `YYYYMMDDTHHMMSSZ` form alongside its parsed value.
fn request_timestamp(parts: &Parts) -> Result<(String, DateTime<Utc>), AuthError> {
    if let Some(value) = header_str(parts, "x-amz-date") {
        let time = parse_iso8601(value).ok_or_else(|| {
            AuthError::InvalidArgument(format!("x-amz-date {value:?} is not YYYYMMDDTHHMMSSZ"))
        })?;
        return Ok((value.to_owned(), time));
    }
    if let Some(value) = header_str(parts, "date") {
        let time = parse_http_date(value)
            .ok_or_else(|| AuthError::InvalidArgument(format!("unparsable date {value:?}")))?;
        return Ok((format_iso8601(time), time));
    }
    Err(AuthError::MissingHeader("x-amz-date".to_owned()))
}

/// Work out the payload hash that belongs in the canonical request.
///
/// An explicit `x-amz-content-sha256` is used verbatim once checked; without
/// one the hash of `body` (or of an empty body) is used.
pub(crate) fn resolve_payload_hash(
    parts: &Parts,
    body: Option<&[u8]>,
    allow_unsigned_payload: bool,
) -> Result<String, AuthError> {
    let Some(declared) = header_str(parts, "x-amz-content-sha256") else {
        return Ok(hash_payload(body.unwrap_or_default()));
    };

    if declared == UNSIGNED_PAYLOAD || declared.starts_with(STREAMING_PAYLOAD_PREFIX) {
        if !allow_unsigned_payload {
            return Err(AuthError::InvalidArgument(format!(
                "payload marker {declared} is not permitted"
            )));
        }
        return Ok(declared.to_owned());
    }

    if let Some(body) = body {
        let actual = hash_payload(body);
        if !actual.eq_ignore_ascii_case(declared) {
            debug!(declared, actual, "Payload hash mismatch");
            return Err(AuthError::XAmzContentSha256Mismatch);
        }
    }
    Ok(declared.to_owned())
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}
