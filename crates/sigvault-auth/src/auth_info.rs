//! The identity produced by a successful authentication.

use serde::{Deserialize, Serialize};

/// Canonical ID of the "All Users" group, assigned to anonymous requests.
pub const PUBLIC_ID: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

/// Metadata about the access key that signed the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyMetadata {
    /// The access key ID.
    pub access_key: String,
    /// Whether the key belongs to temporary (session) credentials.
    #[serde(default)]
    pub temporary: bool,
}

/// A resolved requester identity.
///
/// Built from the identity backend's response body, or as the public identity
/// when a request carries no credentials. Fields are private and the value is
/// never modified once handed out.
///
/// # Examples
///
/// ```
/// use sigvault_auth::AuthInfo;
///
/// let info: AuthInfo = serde_json::from_str(
///     r#"{"canonicalID":"79a59df9","accountDisplayName":"Bart","arn":"arn:aws:iam::123456789012:root"}"#,
/// ).unwrap();
/// assert_eq!(info.canonical_id(), "79a59df9");
/// assert!(!info.is_requester_an_iam_user());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    #[serde(rename = "canonicalID")]
    canonical_id: String,
    #[serde(rename = "accountDisplayName", default)]
    account_display_name: String,
    #[serde(default)]
    arn: String,
    #[serde(rename = "IAMdisplayName", default, skip_serializing_if = "Option::is_none")]
    iam_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(rename = "accessKey", default, skip_serializing_if = "Option::is_none")]
    access_key: Option<AccessKeyMetadata>,
}

impl AuthInfo {
    /// Create an identity for an account.
    pub fn new(
        canonical_id: impl Into<String>,
        account_display_name: impl Into<String>,
        arn: impl Into<String>,
    ) -> Self {
        Self {
            canonical_id: canonical_id.into(),
            account_display_name: account_display_name.into(),
            arn: arn.into(),
            iam_display_name: None,
            email: None,
            access_key: None,
        }
    }

    /// The identity of an unauthenticated requester.
    #[must_use]
    pub fn public() -> Self {
        Self::new(PUBLIC_ID, "", "")
    }

    /// Mark the requester as the named IAM user of the account.
    #[must_use]
    pub fn with_iam_user(mut self, display_name: impl Into<String>) -> Self {
        self.iam_display_name = Some(display_name.into());
        self
    }

    /// Attach the account's email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Attach metadata about the signing key.
    #[must_use]
    pub fn with_access_key(mut self, access_key: AccessKeyMetadata) -> Self {
        self.access_key = Some(access_key);
        self
    }

    /// Canonical ID of the owning account.
    #[must_use]
    pub fn canonical_id(&self) -> &str {
        &self.canonical_id
    }

    /// Display name of the owning account.
    #[must_use]
    pub fn account_display_name(&self) -> &str {
        &self.account_display_name
    }

    /// ARN of the requester (account root or IAM user).
    #[must_use]
    pub fn arn(&self) -> &str {
        &self.arn
    }

    /// Display name of the IAM user, if the requester is one.
    #[must_use]
    pub fn iam_display_name(&self) -> Option<&str> {
        self.iam_display_name.as_deref()
    }

    /// Email address of the account, when the backend supplied it.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Metadata of the signing key, when the backend supplied it.
    #[must_use]
    pub fn access_key(&self) -> Option<&AccessKeyMetadata> {
        self.access_key.as_ref()
    }

    /// Whether the request was signed by an IAM user rather than the account.
    #[must_use]
    pub fn is_requester_an_iam_user(&self) -> bool {
        self.iam_display_name.as_deref().is_some_and(|name| !name.is_empty())
    }

    /// Whether the requester is the anonymous "All Users" group.
    #[must_use]
    pub fn is_requester_public_user(&self) -> bool {
        self.canonical_id == PUBLIC_ID
    }

    /// Whether the requester acts as the account root.
    #[must_use]
    pub fn is_requester_account_owner(&self) -> bool {
        !self.is_requester_public_user() && !self.is_requester_an_iam_user()
    }
}
