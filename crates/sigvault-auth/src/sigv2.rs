//! AWS Signature Version 2 extraction.
//!
//! SigV2 is the legacy signing mechanism. Header requests carry
//!
//! ```text
//! Authorization: AWS <AWSAccessKeyId>:<Signature>
//! ```
//!
//! and query requests carry `AWSAccessKeyId`, `Signature` and `Expires`. In
//! both cases `Signature = Base64(HMAC(SecretKey, StringToSign))` where
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Date + "\n" +
//!                CanonicalizedAmzHeaders +
//!                CanonicalizedResource
//! ```
//!
//! In query mode the `Expires` value takes the place of `Date`.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, KeyInit, Mac};
use http::request::Parts;
use sha1::Sha1;
use sigvault_core::SigvaultConfig;
use tracing::debug;

use crate::error::AuthError;
use crate::params::{HmacAlgorithm, V2SignatureParams};
use crate::query::QueryParams;
use crate::signing_key::hmac_sha256;
use crate::time::{check_clock_skew, parse_http_date};

type HmacSha1 = Hmac<Sha1>;

/// Sub-resources that belong to the canonicalized resource.
const SUB_RESOURCES: &[&str] = &[
    "acl",
    "cors",
    "delete",
    "lifecycle",
    "location",
    "logging",
    "notification",
    "partNumber",
    "policy",
    "replication",
    "requestPayment",
    "response-cache-control",
    "response-content-disposition",
    "response-content-encoding",
    "response-content-language",
    "response-content-type",
    "response-expires",
    "restore",
    "tagging",
    "torrent",
    "uploadId",
    "uploads",
    "versionId",
    "versioning",
    "versions",
    "website",
];

/// Check whether the `Authorization` header uses SigV2 format (`AWS AKID:sig`).
#[must_use]
pub fn is_sigv2(auth_header: &str) -> bool {
    auth_header.starts_with("AWS ")
}

/// Parse a SigV2 `Authorization` header: `AWS AKID:Signature`.
///
/// # Errors
///
/// Returns [`AuthError::AuthorizationHeaderMalformed`] when the prefix, the
/// separator, the access key or the signature is missing.
pub fn parse_sigv2_header(header: &str) -> Result<(String, String), AuthError> {
    let malformed = || AuthError::AuthorizationHeaderMalformed(format!("{header:?}"));
    let rest = header.strip_prefix("AWS ").ok_or_else(malformed)?;
    let (access_key, signature) = rest.trim().split_once(':').ok_or_else(malformed)?;

    if access_key.is_empty() || signature.is_empty() {
        return Err(malformed());
    }

    Ok((access_key.to_owned(), signature.to_owned()))
}

/// Extract V2 signing material from a header-signed request.
///
/// Returns the parameters for the backend together with the signature age.
///
/// # Errors
///
/// Fails with [`AuthError::MissingSecurityHeader`] when the request carries
/// neither `x-amz-date` nor `Date`, and with
/// [`AuthError::RequestTimeTooSkewed`] when that date is outside the window.
pub fn extract_header_params(
    parts: &Parts,
    config: &SigvaultConfig,
    now: DateTime<Utc>,
) -> Result<(V2SignatureParams, Duration), AuthError> {
    let header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingSecurityHeader)?
        .to_str()
        .map_err(|_| {
            AuthError::AuthorizationHeaderMalformed("authorization header is not ASCII".to_owned())
        })?;
    let (access_key, signature) = parse_sigv2_header(header)?;

    let date = header_value(parts, "x-amz-date")
        .or_else(|| header_value(parts, "date"))
        .ok_or(AuthError::MissingSecurityHeader)?;
    let request_time = parse_http_date(date)
        .ok_or_else(|| AuthError::InvalidArgument(format!("unparsable date {date:?}")))?;
    check_clock_skew(request_time, now, config.max_clock_skew_secs)?;

    debug!(access_key = %access_key, "Verifying SigV2 header signature");

    let string_to_sign = build_string_to_sign(parts, None);
    debug!(string_to_sign = ?string_to_sign, "Built SigV2 string to sign");

    Ok((
        V2SignatureParams {
            access_key,
            signature,
            string_to_sign,
            algorithm: HmacAlgorithm::Sha1,
        },
        now - request_time,
    ))
}

/// Extract V2 signing material from a query-signed request.
///
/// # Errors
///
/// Fails with [`AuthError::AuthorizationQueryParametersError`] on a missing or
/// malformed parameter and with [`AuthError::RequestExpired`] once `Expires`
/// has passed. Neither case reaches the backend.
pub fn extract_query_params(
    parts: &Parts,
    query: &QueryParams,
    now: DateTime<Utc>,
) -> Result<V2SignatureParams, AuthError> {
    let required = |name: &str| {
        query
            .get(name)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AuthError::AuthorizationQueryParametersError(format!("missing {name}")))
    };
    let access_key = required("AWSAccessKeyId")?;
    let signature = required("Signature")?;
    let expires = required("Expires")?;

    let expires_at: i64 = expires.parse().map_err(|_| {
        AuthError::AuthorizationQueryParametersError(format!("Expires {expires:?} is not an integer"))
    })?;
    if now.timestamp() > expires_at {
        debug!(expires_at, now = now.timestamp(), "SigV2 presigned URL has expired");
        return Err(AuthError::RequestExpired);
    }

    debug!(access_key, "Verifying SigV2 query signature");

    let string_to_sign = build_string_to_sign(parts, Some(expires));
    debug!(string_to_sign = ?string_to_sign, "Built SigV2 string to sign");

    Ok(V2SignatureParams {
        access_key: access_key.to_owned(),
        signature: signature.to_owned(),
        string_to_sign,
        algorithm: HmacAlgorithm::Sha1,
    })
}

/// Build the SigV2 string to sign from the request parts.
///
/// `expires` replaces the date line for query-string requests. Otherwise the
/// date line is `Date`, or empty when `x-amz-date` is present (it then appears
/// among the canonicalized amz headers instead).
#[must_use]
pub fn build_string_to_sign(parts: &Parts, expires: Option<&str>) -> String {
    let method = parts.method.as_str();
    let content_md5 = header_value(parts, "content-md5").unwrap_or_default();
    let content_type = header_value(parts, "content-type").unwrap_or_default();

    let date = match expires {
        Some(expires) => expires,
        None if parts.headers.contains_key("x-amz-date") => "",
        None => header_value(parts, "date").unwrap_or_default(),
    };

    let amz_headers = build_canonicalized_amz_headers(parts);
    let resource = build_canonicalized_resource(parts);

    format!("{method}\n{content_md5}\n{content_type}\n{date}\n{amz_headers}{resource}")
}

/// Build the CanonicalizedAmzHeaders string.
///
/// All x-amz-* headers are lowercased, sorted, and joined with newlines.
/// Each header is formatted as `name:value\n`.
fn build_canonicalized_amz_headers(parts: &Parts) -> String {
    let mut amz_headers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (name, value) in &parts.headers {
        let name_str = name.as_str();
        if name_str.starts_with("x-amz-") {
            let val = value.to_str().unwrap_or("").trim();
            amz_headers.entry(name_str).or_default().push(val);
        }
    }

    let mut result = String::new();
    for (name, values) in &amz_headers {
        result.push_str(name);
        result.push(':');
        result.push_str(&values.join(","));
        result.push('\n');
    }

    result
}

/// Build the CanonicalizedResource string.
///
/// This is the URI path plus any sub-resource query parameters (sorted).
/// Authentication parameters are never sub-resources.
fn build_canonicalized_resource(parts: &Parts) -> String {
    let path = parts.uri.path();
    let query = QueryParams::from_uri(&parts.uri);

    let mut sub_params: Vec<(&str, &str)> = query
        .iter()
        .filter(|(key, _)| SUB_RESOURCES.contains(key))
        .collect();

    if sub_params.is_empty() {
        return path.to_owned();
    }

    sub_params.sort_by(|a, b| a.0.cmp(b.0));
    let params_str: Vec<String> = sub_params
        .iter()
        .map(|(k, v)| {
            if v.is_empty() {
                (*k).to_owned()
            } else {
                format!("{k}={v}")
            }
        })
        .collect();
    format!("{path}?{}", params_str.join("&"))
}

/// Compute a SigV2 signature: `Base64(HMAC(secret, string_to_sign))`.
///
/// ```
/// use sigvault_auth::params::HmacAlgorithm;
/// use sigvault_auth::sigv2::compute_sigv2_signature;
///
/// let sig = compute_sigv2_signature(
///     "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
///     "GET\n\n\nTue, 27 Mar 2007 19:36:42 +0000\n/johnsmith/photos/puppy.jpg",
///     HmacAlgorithm::Sha1,
/// );
/// assert_eq!(sig, "bWq2s1WEIj+Ydj0vQ697zp+IXMU=");
/// ```
#[must_use]
pub fn compute_sigv2_signature(
    secret_key: &str,
    string_to_sign: &str,
    algorithm: HmacAlgorithm,
) -> String {
    match algorithm {
        HmacAlgorithm::Sha1 => {
            let mut mac = HmacSha1::new_from_slice(secret_key.as_bytes())
                .expect("HMAC can accept keys of any length");
            mac.update(string_to_sign.as_bytes());
            BASE64.encode(mac.finalize().into_bytes())
        }
        HmacAlgorithm::Sha256 => {
            BASE64.encode(hmac_sha256(secret_key.as_bytes(), string_to_sign.as_bytes()))
        }
    }
}

/// Extract a header value as a string, if present and ASCII.
fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}
