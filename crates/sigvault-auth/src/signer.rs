//! Outgoing request signing with AWS Signature Version 4.
//!
//! [`RequestSigner`] signs requests this service sends to other services
//! (the identity backend's admin API, for instance). Signing never mutates
//! the caller's request; [`RequestSigner::sign`] returns a signed copy.

use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sigvault_core::{AwsRegion, SigvaultConfig};
use tracing::debug;

use crate::canonical::build_canonical_request;
use crate::credential::CredentialScope;
use crate::error::AuthError;
use crate::signing_key::{compute_signature, derive_signing_key, hash_payload};
use crate::sigv4::{SUPPORTED_ALGORITHM, string_to_sign_for};
use crate::time::{format_date, format_iso8601};

/// Headers covered by every outgoing signature, sorted.
const SIGNED_HEADERS: [&str; 3] = ["host", "x-amz-content-sha256", "x-amz-date"];

/// Characters escaped in form bodies: everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Encode form fields as `k=v&k=v`, percent-encoding keys and values.
///
/// ```
/// use sigvault_auth::signer::encode_form;
///
/// assert_eq!(
///     encode_form(&[("Action", "ListUsers"), ("Path", "/a b/")]),
///     "Action=ListUsers&Path=%2Fa%20b%2F"
/// );
/// ```
#[must_use]
pub fn encode_form(form: &[(&str, &str)]) -> String {
    form.iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, FORM_ENCODE_SET),
                utf8_percent_encode(v, FORM_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Signs outgoing requests with AWS SigV4.
///
/// # Examples
///
/// ```
/// use sigvault_auth::RequestSigner;
/// use sigvault_core::SigvaultConfig;
///
/// let signer = RequestSigner::from_config(&SigvaultConfig::default());
/// assert_eq!(signer.service(), "iam");
/// assert_eq!(signer.region().as_str(), "us-east-1");
/// ```
#[derive(Debug, Clone)]
pub struct RequestSigner {
    service: String,
    region: AwsRegion,
    time: Option<DateTime<Utc>>,
}

impl RequestSigner {
    /// Create a signer for a service in a region.
    pub fn new(service: impl Into<String>, region: AwsRegion) -> Self {
        Self {
            service: service.into(),
            region,
            time: None,
        }
    }

    /// Create a signer for the configured default service and region.
    #[must_use]
    pub fn from_config(config: &SigvaultConfig) -> Self {
        Self::new(config.default_service.clone(), config.default_region.clone())
    }

    /// Specify the signing time.
    ///
    /// Requests should be signed with the current time; a fixed time is only
    /// useful for reproducible signatures in tests.
    #[must_use]
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Service the signatures are scoped to.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Region the signatures are scoped to.
    #[must_use]
    pub fn region(&self) -> &AwsRegion {
        &self.region
    }

    /// Compute the `host`, `x-amz-date`, `x-amz-content-sha256` and
    /// `authorization` headers for a request carrying `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] if the request has no host or a
    /// header value cannot be represented.
    pub fn signing_headers(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        payload: &[u8],
        access_key: &str,
        secret_key: &str,
    ) -> Result<HeaderMap, AuthError> {
        let now = self.time.unwrap_or_else(Utc::now);
        let amz_date = format_iso8601(now);
        let scope = CredentialScope::new(format_date(now), self.region.as_str(), &self.service);

        let host = headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
            .or_else(|| uri.authority().map(|a| a.as_str().to_owned()))
            .ok_or_else(|| AuthError::InvalidArgument("request has no host".to_owned()))?;

        let payload_hash = hash_payload(payload);

        let canonical_request = build_canonical_request(
            method.as_str(),
            uri.path(),
            uri.query().unwrap_or(""),
            &[
                ("host", host.as_str()),
                ("x-amz-content-sha256", payload_hash.as_str()),
                ("x-amz-date", amz_date.as_str()),
            ],
            &SIGNED_HEADERS,
            &payload_hash,
        );
        let string_to_sign = string_to_sign_for(&canonical_request, &amz_date, &scope.to_string());
        debug!(%scope, string_to_sign, "Calculated outgoing string to sign");

        let signing_key =
            derive_signing_key(secret_key, &scope.region, &scope.scope_date, &scope.service);
        let signature = compute_signature(&signing_key, &string_to_sign);

        let mut authorization = header_value(&format!(
            "{SUPPORTED_ALGORITHM} Credential={access_key}/{scope}, SignedHeaders={}, Signature={signature}",
            SIGNED_HEADERS.join(";")
        ))?;
        authorization.set_sensitive(true);

        let mut signed = HeaderMap::with_capacity(4);
        signed.insert(http::header::HOST, header_value(&host)?);
        signed.insert(HeaderName::from_static("x-amz-date"), header_value(&amz_date)?);
        signed.insert(
            HeaderName::from_static("x-amz-content-sha256"),
            header_value(&payload_hash)?,
        );
        signed.insert(http::header::AUTHORIZATION, authorization);
        Ok(signed)
    }

    /// Return a signed copy of `request`.
    ///
    /// The payload hash covers the request body as sent. The copy carries the
    /// original method, URI, version, headers and body plus the signing
    /// headers, which replace any existing ones.
    ///
    /// # Errors
    ///
    /// See [`Self::signing_headers`].
    pub fn sign<B: AsRef<[u8]> + Clone>(
        &self,
        request: &http::Request<B>,
        access_key: &str,
        secret_key: &str,
    ) -> Result<http::Request<B>, AuthError> {
        let signing_headers = self.signing_headers(
            request.method(),
            request.uri(),
            request.headers(),
            request.body().as_ref(),
            access_key,
            secret_key,
        )?;

        let mut signed = http::Request::new(request.body().clone());
        *signed.method_mut() = request.method().clone();
        *signed.uri_mut() = request.uri().clone();
        *signed.version_mut() = request.version();
        *signed.headers_mut() = request.headers().clone();
        for (name, value) in &signing_headers {
            signed.headers_mut().insert(name.clone(), value.clone());
        }
        Ok(signed)
    }

    /// Build and sign a form `POST` to `uri`.
    ///
    /// The body is `form` encoded with [`encode_form`] and sent as
    /// `application/x-www-form-urlencoded`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] for an unparsable URI, otherwise
    /// see [`Self::signing_headers`].
    pub fn sign_form(
        &self,
        uri: &str,
        form: &[(&str, &str)],
        access_key: &str,
        secret_key: &str,
    ) -> Result<http::Request<Vec<u8>>, AuthError> {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(encode_form(form).into_bytes())
            .map_err(|err| AuthError::InvalidArgument(format!("invalid request: {err}")))?;
        self.sign(&request, access_key, secret_key)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value)
        .map_err(|_| AuthError::InvalidArgument(format!("invalid header value {value:?}")))
}
