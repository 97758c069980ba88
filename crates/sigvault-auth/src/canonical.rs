//! Canonical request construction for AWS Signature Version 4.
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Every byte matters: a client and this engine must produce the same string
//! or the signature will not match.

use std::collections::BTreeMap;

use http::{HeaderMap, Uri};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::AuthError;

/// Characters that must be percent-encoded in URI path segments.
///
/// Everything except the unreserved set (`A-Z a-z 0-9 - _ . ~`).
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the full canonical request string from its components.
///
/// # Examples
///
/// ```
/// use sigvault_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     "",
///     &[("host", "examplebucket.s3.amazonaws.com")],
///     &["host"],
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// assert!(canonical.starts_with("GET\n/test.txt\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(&str, &str)],
    signed_headers: &[&str],
    payload_hash: &str,
) -> String {
    let canonical_uri = build_canonical_uri(uri);
    let canonical_query = build_canonical_query_string(query_string);
    let canonical_headers = build_canonical_headers(headers, signed_headers);
    let signed_headers_str = build_signed_headers_string(signed_headers);

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{payload_hash}"
    )
}

/// Build the canonical URI by URI-encoding each path segment.
///
/// Forward slashes are preserved and an empty path becomes `/`. Segments are
/// decoded before encoding so an already-encoded path is not encoded twice.
///
/// ```
/// use sigvault_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri(""), "/");
/// assert_eq!(build_canonical_uri("/a b"), "/a%20b");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            utf8_percent_encode(&decoded, URI_ENCODE_SET).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical query string by sorting parameters.
///
/// Parameters are sorted by name, then by value. Raw values are kept exactly
/// as they appear on the wire: clients disagree on whether `:` or `*` get
/// encoded, and the signature covers whatever the client sent.
///
/// ```
/// use sigvault_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string("b=2&a=1"), "a=1&b=2");
/// assert_eq!(build_canonical_query_string("acl"), "acl=");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    build_canonical_query_string_excluding(query, &[])
}

/// Like [`build_canonical_query_string`], dropping parameters named in `excluded`.
///
/// Presigned URLs exclude `X-Amz-Signature`, which cannot sign itself.
#[must_use]
pub fn build_canonical_query_string_excluding(query: &str, excluded: &[&str]) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| param.split_once('=').unwrap_or((param, "")))
        .filter(|(key, _)| !excluded.contains(key))
        .collect();

    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers block.
///
/// Only headers listed in `signed_headers` are included. Names are
/// lower-cased, values are trimmed and runs of whitespace collapse to a single
/// space. Repeated headers are joined with commas. No trailing newline.
///
/// ```
/// use sigvault_auth::canonical::build_canonical_headers;
///
/// let result = build_canonical_headers(
///     &[("Host", "example.com"), ("X-Amz-Date", "20130524T000000Z")],
///     &["host", "x-amz-date"],
/// );
/// assert_eq!(result, "host:example.com\nx-amz-date:20130524T000000Z");
/// ```
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)], signed_headers: &[&str]) -> String {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(name.to_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    let mut sorted_signed: Vec<String> = signed_headers.iter().map(|h| h.to_lowercase()).collect();
    sorted_signed.sort_unstable();

    sorted_signed
        .iter()
        .filter_map(|name| header_map.get(name).map(|value| format!("{name}:{value}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the `;`-separated, sorted, lower-case signed headers list.
///
/// ```
/// use sigvault_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(build_signed_headers_string(&["x-amz-date", "Host"]), "host;x-amz-date");
/// ```
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[&str]) -> String {
    let mut sorted: Vec<String> = signed_headers.iter().map(|h| h.to_lowercase()).collect();
    sorted.sort_unstable();
    sorted.join(";")
}

/// Collect `(name, value)` pairs for every signed header.
///
/// Each occurrence of a repeated header yields its own pair. A signed `host`
/// missing from the map (HTTP/2 carries it as `:authority`) falls back to the
/// URI authority.
pub fn collect_signed_headers(
    headers: &HeaderMap,
    uri: &Uri,
    signed_headers: &[String],
) -> Result<Vec<(String, String)>, AuthError> {
    let mut result = Vec::with_capacity(signed_headers.len());

    for name in signed_headers {
        let mut values = headers.get_all(name.as_str()).iter().peekable();
        if values.peek().is_none() {
            match (name.as_str(), uri.authority()) {
                ("host", Some(authority)) => {
                    result.push((name.clone(), authority.as_str().to_owned()));
                    continue;
                }
                _ => return Err(AuthError::MissingHeader(name.clone())),
            }
        }
        for value in values {
            let value = value
                .to_str()
                .map_err(|_| AuthError::InvalidArgument(format!("header {name} is not ASCII")))?;
            result.push((name.clone(), value.to_owned()));
        }
    }

    Ok(result)
}

/// Collapse consecutive whitespace characters to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
