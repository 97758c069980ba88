//! An in-memory identity backend.
//!
//! Holds accounts, access keys and the email directory in concurrent maps.
//! Signatures are recomputed from the submitted string to sign and compared
//! in constant time. Suitable for tests and local development.

use std::collections::BTreeMap;
use std::fmt;

use dashmap::DashMap;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::auth_info::{AccessKeyMetadata, AuthInfo};
use crate::error::BackendError;
use crate::sigv2::compute_sigv2_signature;
use crate::signing_key::{compute_signature, derive_signing_key};
use crate::vault::{IdentityBackend, LookupEntry, VerifyV2Request, VerifyV4Request};

/// An account known to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Canonical ID of the account.
    pub canonical_id: String,
    /// Display name of the account.
    pub display_name: String,
    /// Email address registered for the account.
    pub email: String,
    /// ARN of the account root.
    pub arn: String,
}

impl Account {
    /// Create an account.
    pub fn new(
        canonical_id: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
        arn: impl Into<String>,
    ) -> Self {
        Self {
            canonical_id: canonical_id.into(),
            display_name: display_name.into(),
            email: email.into(),
            arn: arn.into(),
        }
    }
}

/// The IAM user an access key belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IamUser {
    /// User name, reported as the IAM display name.
    pub name: String,
    /// ARN of the user.
    pub arn: String,
}

/// An access key pair owned by an account or one of its IAM users.
#[derive(Clone)]
pub struct AccessKey {
    /// The access key ID.
    pub access_key: String,
    /// The secret access key.
    pub secret_key: String,
    /// Canonical ID of the owning account.
    pub canonical_id: String,
    /// Owning IAM user, `None` for account root keys.
    pub iam_user: Option<IamUser>,
    /// Whether the key may be used.
    pub active: bool,
}

impl AccessKey {
    /// Create an active root key for an account.
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        canonical_id: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            canonical_id: canonical_id.into(),
            iam_user: None,
            active: true,
        }
    }

    /// Bind the key to an IAM user of the owning account.
    #[must_use]
    pub fn for_iam_user(mut self, name: impl Into<String>, arn: impl Into<String>) -> Self {
        self.iam_user = Some(IamUser {
            name: name.into(),
            arn: arn.into(),
        });
        self
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKey")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("canonical_id", &self.canonical_id)
            .field("iam_user", &self.iam_user)
            .field("active", &self.active)
            .finish()
    }
}

/// In-memory [`IdentityBackend`].
///
/// # Examples
///
/// ```
/// use sigvault_auth::in_memory::{AccessKey, Account, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.add_account(Account::new("79a59df9", "Bart", "bart@example.com", "arn:aws:iam::123456789012:root"));
/// backend.add_access_key(AccessKey::new("AKIDEXAMPLE", "secret", "79a59df9"));
/// assert_eq!(backend.account_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    accounts: DashMap<String, Account>,
    keys: DashMap<String, AccessKey>,
    emails: DashMap<String, String>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an account.
    pub fn add_account(&self, account: Account) {
        self.emails
            .insert(account.email.to_lowercase(), account.canonical_id.clone());
        self.accounts.insert(account.canonical_id.clone(), account);
    }

    /// Register or replace an access key.
    pub fn add_access_key(&self, key: AccessKey) {
        self.keys.insert(key.access_key.clone(), key);
    }

    /// Deactivate an access key. Returns whether the key exists.
    pub fn deactivate_access_key(&self, access_key: &str) -> bool {
        match self.keys.get_mut(access_key) {
            Some(mut key) => {
                key.active = false;
                true
            }
            None => false,
        }
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Resolve an access key to its secret and the identity it stands for.
    fn resolve(&self, access_key: &str) -> Result<(String, AuthInfo), BackendError> {
        let key = self
            .keys
            .get(access_key)
            .ok_or_else(BackendError::invalid_access_key_id)?;
        if !key.active {
            return Err(BackendError::inactive_access_key());
        }
        let account = self
            .accounts
            .get(&key.canonical_id)
            .ok_or_else(BackendError::invalid_access_key_id)?;

        let metadata = AccessKeyMetadata {
            access_key: key.access_key.clone(),
            temporary: false,
        };
        let info = match &key.iam_user {
            Some(user) => AuthInfo::new(&account.canonical_id, &account.display_name, &user.arn)
                .with_iam_user(&user.name),
            None => AuthInfo::new(&account.canonical_id, &account.display_name, &account.arn),
        }
        .with_email(&account.email)
        .with_access_key(metadata);

        Ok((key.secret_key.clone(), info))
    }
}

fn signatures_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[async_trait::async_trait]
impl IdentityBackend for InMemoryBackend {
    async fn verify_signature_v2(
        &self,
        request: VerifyV2Request<'_>,
    ) -> Result<AuthInfo, BackendError> {
        let (secret_key, info) = self.resolve(request.access_key)?;
        let expected =
            compute_sigv2_signature(&secret_key, request.string_to_sign, request.algorithm);
        if !signatures_match(&expected, request.signature) {
            debug!(req_uid = request.req_uid, access_key = request.access_key, "SigV2 signature mismatch");
            return Err(BackendError::signature_does_not_match());
        }
        Ok(info)
    }

    async fn verify_signature_v4(
        &self,
        request: VerifyV4Request<'_>,
    ) -> Result<AuthInfo, BackendError> {
        let (secret_key, info) = self.resolve(request.access_key)?;
        let signing_key = derive_signing_key(
            &secret_key,
            request.region,
            request.scope_date,
            request.service,
        );
        let expected = compute_signature(&signing_key, request.string_to_sign);
        if !signatures_match(&expected, request.signature) {
            debug!(req_uid = request.req_uid, access_key = request.access_key, "SigV4 signature mismatch");
            return Err(BackendError::signature_does_not_match());
        }
        Ok(info)
    }

    async fn get_canonical_ids(
        &self,
        emails: &[String],
        _req_uid: &str,
    ) -> Result<BTreeMap<String, LookupEntry>, BackendError> {
        Ok(emails
            .iter()
            .map(|email| {
                let entry = if email.contains('@') {
                    self.emails
                        .get(&email.to_lowercase())
                        .map_or(LookupEntry::NotFound, |id| LookupEntry::Found(id.value().clone()))
                } else {
                    LookupEntry::WrongFormat
                };
                (email.clone(), entry)
            })
            .collect())
    }

    async fn get_email_addresses(
        &self,
        canonical_ids: &[String],
        _req_uid: &str,
    ) -> Result<BTreeMap<String, LookupEntry>, BackendError> {
        Ok(canonical_ids
            .iter()
            .map(|id| {
                let entry = if id.trim().is_empty() {
                    LookupEntry::WrongFormat
                } else {
                    self.accounts
                        .get(id)
                        .map_or(LookupEntry::NotFound, |account| {
                            LookupEntry::Found(account.email.clone())
                        })
                };
                (id.clone(), entry)
            })
            .collect())
    }
}
