//! Email/password authentication.
//!
//! Credential storage is behind [`AuthProvider`]; both remote store
//! implementations provide it. Registration creates the three documents every
//! account needs (user, grocery list, expenses) and signing in resolves them
//! into a [`Session`].

use crate::error::{Error, Result};
use crate::remote::{resolve_grocery_list, RemoteStore};
use crate::session::Session;
use sha2::{Digest, Sha256};
use std::future::Future;
use tracing::info;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Credential storage.
pub trait AuthProvider: Send + Sync {
    /// Store credentials for a new account. Fails if the email is taken.
    fn create_account(&self, email: &str, password: &str) -> impl Future<Output = Result<()>> + Send;

    /// Check a password. Unknown emails verify as `false`.
    fn verify_password(&self, email: &str, password: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// Salted SHA-256 digest of a password, hex encoded.
#[must_use]
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fresh random salt.
#[must_use]
pub fn new_salt() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("not an email address: {email}")))
    }
}

/// Create an account and its documents, returning a signed-in session.
///
/// # Errors
///
/// Returns `PasswordMismatch` when the confirmation differs, `InvalidArgument`
/// for a malformed email or short password, `Auth` when the email is taken,
/// or the remote store's error.
pub async fn register<S>(store: &S, email: &str, password: &str, confirm: &str) -> Result<Session>
where
    S: AuthProvider + RemoteStore,
{
    if password != confirm {
        return Err(Error::PasswordMismatch);
    }
    validate_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidArgument(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    store.create_account(email, password).await?;

    let user = match store.get_user_ref(email).await? {
        Some(existing) => existing,
        None => store.create_user(email).await?,
    };
    let list = match store.get_grocery_list_ref(&user).await? {
        Some(existing) => existing,
        None => store.create_grocery_list(&user).await?,
    };
    if store.get_expenses(&user).await?.is_none() {
        store.create_expenses(&user).await?;
    }

    info!(email, user_id = %user, "Registered account");
    Ok(Session::new(email, user, list))
}

/// Verify credentials and resolve the user's documents.
///
/// # Errors
///
/// Returns `Auth` for wrong credentials, or the lookup error when the user or
/// grocery list document is missing.
pub async fn sign_in<S>(store: &S, email: &str, password: &str) -> Result<Session>
where
    S: AuthProvider + RemoteStore,
{
    if !store.verify_password(email, password).await? {
        return Err(Error::Auth("invalid email or password".to_string()));
    }

    let (user, list) = resolve_grocery_list(store, email).await?;
    info!(email, user_id = %user, "Signed in");
    Ok(Session::new(email, user, list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemote;

    #[test]
    fn test_hash_password_is_salted() {
        let a = hash_password("salt-a", "hunter22");
        let b = hash_password("salt-b", "hunter22");
        assert_ne!(a, b);
        assert_eq!(a, hash_password("salt-a", "hunter22"));
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_register_creates_documents() {
        let remote = MemoryRemote::new();
        let session = register(&remote, "a@example.com", "hunter22", "hunter22")
            .await
            .unwrap();

        assert_eq!(session.email, "a@example.com");
        let user = remote.get_user_ref("a@example.com").await.unwrap().unwrap();
        assert_eq!(session.user_id, user);
        assert_eq!(
            remote.get_grocery_list_ref(&user).await.unwrap(),
            Some(session.list_id.clone())
        );
        assert!(remote.get_expenses(&user).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_register_rejects_mismatch_and_short_password() {
        let remote = MemoryRemote::new();
        let err = register(&remote, "a@example.com", "hunter22", "hunter23")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PasswordMismatch));
        assert_eq!(err.to_string(), "Passwords do not match!");

        let err = register(&remote, "a@example.com", "abc", "abc").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = register(&remote, "not-an-email", "hunter22", "hunter22")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_sign_in() {
        let remote = MemoryRemote::new();
        let registered = register(&remote, "a@example.com", "hunter22", "hunter22")
            .await
            .unwrap();

        let session = sign_in(&remote, "a@example.com", "hunter22").await.unwrap();
        assert_eq!(session.user_id, registered.user_id);
        assert_eq!(session.list_id, registered.list_id);

        let err = sign_in(&remote, "a@example.com", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
