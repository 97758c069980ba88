//! Credential scope parsing and validation.
//!
//! A V4 credential has the form `AKID/YYYYMMDD/region/service/aws4_request`
//! and is carried in the `Credential=` field of the `Authorization` header or
//! in the `X-Amz-Credential` query parameter.

use std::fmt;

use crate::error::AuthError;
use crate::signing_key::SCOPE_TERMINATOR;

/// The `date/region/service/aws4_request` part of a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialScope {
    /// Scope date, `YYYYMMDD`.
    pub scope_date: String,
    /// Region the signing key is bound to.
    pub region: String,
    /// Service the signing key is bound to.
    pub service: String,
}

impl CredentialScope {
    /// Create a scope from its parts.
    pub fn new(
        scope_date: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            scope_date: scope_date.into(),
            region: region.into(),
            service: service.into(),
        }
    }

    /// Check the scope against the request timestamp and the called service.
    ///
    /// The scope date must equal the date part of `timestamp`, the region
    /// must be present, and the service must equal `expected_service`.
    pub fn validate(&self, timestamp: &str, expected_service: &str) -> Result<(), AuthError> {
        let well_formed_date =
            self.scope_date.len() == 8 && self.scope_date.bytes().all(|b| b.is_ascii_digit());
        if !well_formed_date {
            return Err(AuthError::InvalidArgument(format!(
                "credential scope date {:?} is not YYYYMMDD",
                self.scope_date
            )));
        }
        if timestamp.get(..8) != Some(self.scope_date.as_str()) {
            return Err(AuthError::InvalidArgument(format!(
                "credential scope date {} does not match request date {timestamp}",
                self.scope_date
            )));
        }
        if self.region.is_empty() {
            return Err(AuthError::InvalidArgument(
                "credential scope region is empty".to_owned(),
            ));
        }
        if self.service != expected_service {
            return Err(AuthError::InvalidArgument(format!(
                "credential scope service {:?} does not match expected service {expected_service:?}",
                self.service
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{SCOPE_TERMINATOR}",
            self.scope_date, self.region, self.service
        )
    }
}

/// A parsed V4 credential: the access key plus its scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// The access key ID.
    pub access_key: String,
    /// The scope the key was derived for.
    pub scope: CredentialScope,
}

impl Credential {
    /// Parse `AKID/date/region/service/aws4_request`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sigvault_auth::credential::Credential;
    ///
    /// let cred = Credential::parse("AKIDEXAMPLE/20160209/us-east-1/iam/aws4_request").unwrap();
    /// assert_eq!(cred.access_key, "AKIDEXAMPLE");
    /// assert_eq!(cred.scope.to_string(), "20160209/us-east-1/iam/aws4_request");
    /// ```
    pub fn parse(value: &str) -> Result<Self, AuthError> {
        let parts: Vec<&str> = value.split('/').collect();
        let [access_key, scope_date, region, service, terminator] = parts.as_slice() else {
            return Err(AuthError::InvalidArgument(format!(
                "credential {value:?} must have five '/'-separated parts"
            )));
        };
        if *terminator != SCOPE_TERMINATOR {
            return Err(AuthError::InvalidArgument(format!(
                "credential terminator must be {SCOPE_TERMINATOR}, got {terminator:?}"
            )));
        }
        if access_key.is_empty() {
            return Err(AuthError::InvalidArgument(
                "credential access key is empty".to_owned(),
            ));
        }
        Ok(Self {
            access_key: (*access_key).to_owned(),
            scope: CredentialScope::new(*scope_date, *region, *service),
        })
    }
}
