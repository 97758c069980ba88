//! Email and canonical ID lookup integration tests.

#[cfg(test)]
mod tests {
    use sigvault_auth::AuthError;

    use crate::{CANONICAL_ID, EMAIL, authenticator, fixed_now, req_uid};

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_should_resolve_every_known_email() {
        let (auth, backend) = authenticator(fixed_now());
        let ids = auth
            .vault()
            .get_canonical_ids(&owned(&[EMAIL, "JohnSmith@Example.com"]), &req_uid())
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_eq!(ids[EMAIL], CANONICAL_ID);
        assert_eq!(ids["JohnSmith@Example.com"], "canonical-johnsmith");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_should_fail_whole_email_lookup_on_one_unknown_address() {
        let (auth, _) = authenticator(fixed_now());
        let err = auth
            .vault()
            .get_canonical_ids(&owned(&[EMAIL, "ghost@example.com"]), &req_uid())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnresolvableGrantByEmailAddress));
    }

    #[tokio::test]
    async fn test_should_fail_email_lookup_on_malformed_address() {
        let (auth, _) = authenticator(fixed_now());
        let err = auth
            .vault()
            .get_canonical_ids(&owned(&["not-an-email"]), &req_uid())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UnresolvableGrantByEmailAddress");
    }

    #[tokio::test]
    async fn test_should_return_partial_email_addresses() {
        let (auth, _) = authenticator(fixed_now());
        let emails = auth
            .vault()
            .get_email_addresses(
                &owned(&[CANONICAL_ID, "canonical-unknown", "", "canonical-johnsmith"]),
                &req_uid(),
            )
            .await
            .unwrap();

        assert_eq!(emails.len(), 2);
        assert_eq!(emails[CANONICAL_ID], EMAIL);
        assert_eq!(emails["canonical-johnsmith"], "johnsmith@example.com");
    }

    #[tokio::test]
    async fn test_should_return_empty_map_for_empty_lookup() {
        let (auth, _) = authenticator(fixed_now());
        let ids = auth.vault().get_canonical_ids(&[], &req_uid()).await.unwrap();
        assert!(ids.is_empty());
    }
}
