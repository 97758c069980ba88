//! V4 signing material carried in a presigned query string.
//!
//! Presigned URLs carry authentication information in query parameters rather
//! than HTTP headers:
//!
//! - `X-Amz-Algorithm` - Must be `AWS4-HMAC-SHA256`
//! - `X-Amz-Credential` - `AKID/date/region/service/aws4_request`
//! - `X-Amz-Date` - ISO 8601 basic format timestamp (`YYYYMMDDTHHMMSSZ`)
//! - `X-Amz-Expires` - Validity duration in seconds
//! - `X-Amz-SignedHeaders` - Semicolon-separated signed header names
//! - `X-Amz-Signature` - The hex-encoded signature
//!
//! For presigned URLs, the payload hash is always `UNSIGNED-PAYLOAD`.

use chrono::{DateTime, Duration, Utc};
use http::request::Parts;
use sigvault_core::SigvaultConfig;
use tracing::debug;

use crate::canonical::{
    build_canonical_headers, build_canonical_query_string_excluding, build_canonical_uri,
    build_signed_headers_string, collect_signed_headers,
};
use crate::credential::Credential;
use crate::error::AuthError;
use crate::params::V4SignatureParams;
use crate::query::QueryParams;
use crate::sigv4::{SUPPORTED_ALGORITHM, UNSIGNED_PAYLOAD, parse_signed_headers, string_to_sign_for};
use crate::time::{parse_iso8601, saturating_seconds};

/// Name of the query parameter that carries the signature itself.
const SIGNATURE_PARAM: &str = "X-Amz-Signature";

/// Parsed components from presigned URL query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPresignedParams {
    /// Access key and credential scope.
    pub credential: Credential,
    /// The ISO 8601 basic format timestamp.
    pub timestamp: String,
    /// The URL validity duration in seconds.
    pub expires: u64,
    /// Signed header names, lower-cased.
    pub signed_headers: Vec<String>,
    /// The hex-encoded signature.
    pub signature: String,
}

/// Parse presigned URL query parameters into their components.
///
/// # Errors
///
/// Returns [`AuthError::AuthorizationQueryParametersError`] if a required
/// parameter is absent or `X-Amz-Expires` is not a positive integer no larger
/// than `max_expires_secs`, [`AuthError::UnsupportedAlgorithm`] if the
/// algorithm is not `AWS4-HMAC-SHA256`, or [`AuthError::InvalidArgument`] if
/// the credential is malformed.
pub fn parse_presigned_params(
    query: &QueryParams,
    max_expires_secs: u64,
) -> Result<ParsedPresignedParams, AuthError> {
    let algorithm = required(query, "X-Amz-Algorithm")?;
    if algorithm != SUPPORTED_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(algorithm.to_owned()));
    }

    let credential = Credential::parse(required(query, "X-Amz-Credential")?)?;
    let timestamp = required(query, "X-Amz-Date")?;
    let expires_str = required(query, "X-Amz-Expires")?;
    let signed_headers = parse_signed_headers(required(query, "X-Amz-SignedHeaders")?)
        .map_err(|_| {
            AuthError::AuthorizationQueryParametersError("X-Amz-SignedHeaders is empty".to_owned())
        })?;
    let signature = required(query, SIGNATURE_PARAM)?;

    let expires = expires_str
        .parse::<u64>()
        .ok()
        .filter(|secs| (1..=max_expires_secs).contains(secs))
        .ok_or_else(|| {
            AuthError::AuthorizationQueryParametersError(format!(
                "X-Amz-Expires must be between 1 and {max_expires_secs} seconds, got {expires_str:?}"
            ))
        })?;

    Ok(ParsedPresignedParams {
        credential,
        timestamp: timestamp.to_owned(),
        expires,
        signed_headers,
        signature: signature.to_owned(),
    })
}

/// Extract V4 signing material from a presigned request.
///
/// Returns the parameters for the backend together with the signature age.
///
/// # Errors
///
/// Fails locally on malformed parameters, a scope that does not match the
/// request, a timestamp too far in the future, an expired URL, or a missing
/// signed header.
pub fn extract_query_params(
    parts: &Parts,
    query: &QueryParams,
    service: &str,
    config: &SigvaultConfig,
    now: DateTime<Utc>,
) -> Result<(V4SignatureParams, Duration), AuthError> {
    let parsed = parse_presigned_params(query, config.max_presigned_expires_secs)?;

    let request_time = parse_iso8601(&parsed.timestamp).ok_or_else(|| {
        AuthError::AuthorizationQueryParametersError(format!(
            "X-Amz-Date {:?} is not YYYYMMDDTHHMMSSZ",
            parsed.timestamp
        ))
    })?;
    parsed.credential.scope.validate(&parsed.timestamp, service)?;
    check_expiration(request_time, parsed.expires, now, config.max_clock_skew_secs)?;

    debug!(
        access_key = %parsed.credential.access_key,
        scope = %parsed.credential.scope,
        expires = parsed.expires,
        "Verifying presigned URL"
    );

    let header_pairs = collect_signed_headers(&parts.headers, &parts.uri, &parsed.signed_headers)?;
    let header_refs: Vec<(&str, &str)> = header_pairs
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let signed_refs: Vec<&str> = parsed.signed_headers.iter().map(String::as_str).collect();

    let method = parts.method.as_str();
    let canonical_uri = build_canonical_uri(parts.uri.path());
    let canonical_query = build_canonical_query_string_excluding(
        parts.uri.query().unwrap_or(""),
        &[SIGNATURE_PARAM],
    );
    let canonical_headers = build_canonical_headers(&header_refs, &signed_refs);
    let signed_headers_str = build_signed_headers_string(&signed_refs);

    let canonical_request = format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{UNSIGNED_PAYLOAD}"
    );
    debug!(canonical_request, "Built presigned canonical request");

    let scope = parsed.credential.scope;
    let string_to_sign =
        string_to_sign_for(&canonical_request, &parsed.timestamp, &scope.to_string());
    debug!(string_to_sign, "Built presigned string to sign");

    let mut signed_headers = parsed.signed_headers;
    signed_headers.sort_unstable();

    Ok((
        V4SignatureParams {
            access_key: parsed.credential.access_key,
            signature: parsed.signature,
            string_to_sign,
            scope,
            timestamp: parsed.timestamp,
            signed_headers,
        },
        now - request_time,
    ))
}

/// Check that a presigned URL is already valid and not yet expired.
///
/// A timestamp further in the future than the skew window is rejected as
/// skewed; a URL whose validity window has passed is rejected as expired.
pub fn check_expiration(
    request_time: DateTime<Utc>,
    expires_secs: u64,
    now: DateTime<Utc>,
    max_skew_secs: u64,
) -> Result<(), AuthError> {
    if request_time - now > saturating_seconds(max_skew_secs) {
        return Err(AuthError::RequestTimeTooSkewed);
    }

    let expired = request_time
        .checked_add_signed(saturating_seconds(expires_secs))
        .is_some_and(|deadline| now > deadline);
    if expired {
        debug!(%request_time, expires_secs, %now, "Presigned URL has expired");
        return Err(AuthError::RequestExpired);
    }
    Ok(())
}

fn required<'a>(query: &'a QueryParams, name: &str) -> Result<&'a str, AuthError> {
    query
        .get(name)
        .ok_or_else(|| AuthError::AuthorizationQueryParametersError(format!("missing {name}")))
}
