//! Dispatcher behavior across schemes and backend outcomes.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use sigvault_auth::{
        AuthError, AuthInfo, AuthType, Authenticator, BackendError, IdentityBackend, LookupEntry,
        RequestContext, RequestSigner, Vault, VerifyV2Request, VerifyV4Request,
    };
    use sigvault_core::SigvaultConfig;

    use crate::{
        ACCESS_KEY, CANONICAL_ID, SECRET_KEY, authenticator, fixed_now, req_uid, test_backend,
    };

    /// Answers every verification with a fixed result.
    #[derive(Debug)]
    struct FixedBackend(Result<AuthInfo, BackendError>);

    #[async_trait::async_trait]
    impl IdentityBackend for FixedBackend {
        async fn verify_signature_v2(
            &self,
            _request: VerifyV2Request<'_>,
        ) -> Result<AuthInfo, BackendError> {
            self.0.clone()
        }

        async fn verify_signature_v4(
            &self,
            _request: VerifyV4Request<'_>,
        ) -> Result<AuthInfo, BackendError> {
            self.0.clone()
        }

        async fn get_canonical_ids(
            &self,
            _emails: &[String],
            _req_uid: &str,
        ) -> Result<BTreeMap<String, LookupEntry>, BackendError> {
            Ok(BTreeMap::new())
        }

        async fn get_email_addresses(
            &self,
            _canonical_ids: &[String],
            _req_uid: &str,
        ) -> Result<BTreeMap<String, LookupEntry>, BackendError> {
            Ok(BTreeMap::new())
        }
    }

    fn fixed(result: Result<AuthInfo, BackendError>) -> Authenticator {
        Authenticator::new(
            Vault::new(Arc::new(FixedBackend(result))),
            SigvaultConfig::default(),
        )
        .with_time(fixed_now())
    }

    fn iam_post() -> (http::request::Parts, Vec<u8>) {
        let form = [("Action", "ListUsers"), ("Version", "2010-05-08")];
        RequestSigner::from_config(&SigvaultConfig::default())
            .with_time(fixed_now())
            .sign_form("http://iam.example.com:8600/", &form, ACCESS_KEY, SECRET_KEY)
            .unwrap()
            .into_parts()
    }

    #[tokio::test]
    async fn test_should_return_public_identity_without_backend_call() {
        let (auth, backend) = authenticator(fixed_now());
        let (parts, ()) = http::Request::builder()
            .uri("/bucket/key")
            .body(())
            .unwrap()
            .into_parts();
        let mut ctx = RequestContext::new();

        let info = auth
            .do_auth(&parts, None, "s3", &req_uid(), &mut ctx)
            .await
            .unwrap();

        assert!(info.is_requester_public_user());
        assert_eq!(backend.calls(), 0);
        assert_eq!(ctx.auth_type(), Some(AuthType::None));
        assert_eq!(ctx.transport(), None);
    }

    #[tokio::test]
    async fn test_should_reject_unknown_scheme_as_missing_security_header() {
        let (auth, backend) = authenticator(fixed_now());
        let (parts, ()) = http::Request::builder()
            .uri("/bucket/key")
            .header("authorization", "Bearer abc.def")
            .body(())
            .unwrap()
            .into_parts();

        let err = auth
            .do_auth(&parts, None, "s3", &req_uid(), &mut RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingSecurityHeader));
        assert!(err.is_local());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_should_verify_signed_iam_form_post() {
        let (auth, backend) = authenticator(fixed_now());
        let (parts, body) = iam_post();
        let service = auth.config().default_service.clone();

        let info = auth
            .do_auth(&parts, Some(&body), &service, &req_uid(), &mut RequestContext::new())
            .await
            .unwrap();
        assert_eq!(info.canonical_id(), CANONICAL_ID);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_should_forward_backend_error_verbatim() {
        let auth = fixed(Err(BackendError::new("AccountDisabled", "account is disabled")));
        let (parts, body) = iam_post();

        let err = auth
            .do_auth(&parts, Some(&body), "iam", &req_uid(), &mut RequestContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AccountDisabled");
        assert!(!err.is_local());
        match err {
            AuthError::Backend(inner) => assert_eq!(inner.message, "account is disabled"),
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_reject_identity_without_canonical_id() {
        let auth = fixed(Ok(AuthInfo::new("", "Nobody", "arn:aws:iam::000000000000:root")));
        let (parts, body) = iam_post();

        let err = auth
            .do_auth(&parts, Some(&body), "iam", &req_uid(), &mut RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InternalError(_)));
    }

    #[tokio::test]
    async fn test_should_refuse_deactivated_key() {
        let backend = test_backend();
        let auth = Authenticator::new(Vault::new(backend.clone()), SigvaultConfig::default())
            .with_time(fixed_now());
        let (parts, body) = iam_post();

        assert!(backend.deactivate_access_key(ACCESS_KEY));
        let err = auth
            .do_auth(&parts, Some(&body), "iam", &req_uid(), &mut RequestContext::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "InvalidAccessKeyId");
    }
}
