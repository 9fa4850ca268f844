//! Authentication service.
//!
//! Password accounts with opaque session tokens. A successful login issues a
//! fresh UUID token that replaces any previous one; the token is then
//! resolved back to a user on every authenticated request.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use shopcart_core::{Actor, Username};

use super::{ServiceError, require_admin};
use crate::db::Store;
use crate::models::{LoginSession, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum password length.
const MAX_PASSWORD_LENGTH: usize = 50;

const INVALID_CREDENTIALS: &str = "invalid username or password";

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Register a regular user.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the username or password is invalid.
    /// Returns `ServiceError::Conflict` if the username is taken.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        self.register_with_role(username, password, false).await
    }

    /// Register a user, optionally with the admin capability.
    ///
    /// Surrounding whitespace is trimmed from both username and password.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the username or password is invalid.
    /// Returns `ServiceError::Conflict` if the username is taken.
    #[instrument(skip(self, password))]
    pub async fn register_with_role(
        &self,
        username: &str,
        password: &str,
        admin: bool,
    ) -> Result<User, ServiceError> {
        let username =
            Username::parse(username).map_err(|e| ServiceError::validation(e.to_string()))?;
        let password = password.trim();
        validate_password(password)?;

        let password_hash = hash_password(password)?;
        let user = self
            .store
            .create_user(&username, &password_hash, admin)
            .await
            .map_err(ServiceError::from_repository)?;

        info!(user_id = %user.id, admin, "user registered");
        Ok(user)
    }

    /// Verify credentials and issue a new session token.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthenticated` if the username is unknown or
    /// the password is wrong. The two cases are indistinguishable.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginSession, ServiceError> {
        let unauthenticated = || ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_owned());

        let username = Username::parse(username).map_err(|_| unauthenticated())?;
        let (user, password_hash) = self
            .store
            .get_user_with_password(&username)
            .await?
            .ok_or_else(unauthenticated)?;

        if verify_password(password.trim(), &password_hash).is_err() {
            warn!(user_id = %user.id, "login failed");
            return Err(unauthenticated());
        }

        let token = Uuid::new_v4().to_string();
        self.store.set_user_token(user.id, &token).await?;

        info!(user_id = %user.id, "user logged in");
        Ok(LoginSession {
            token,
            user_id: user.id,
            username: user.username,
            admin: user.admin,
        })
    }

    /// Resolve a session token to its user.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthenticated` if no user holds the token.
    pub async fn resolve_token(&self, token: &str) -> Result<User, ServiceError> {
        self.store
            .get_user_by_token(token)
            .await?
            .ok_or_else(|| ServiceError::Unauthenticated("invalid token".to_owned()))
    }

    /// List every user. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Authorization` if `actor` is not an admin.
    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<User>, ServiceError> {
        require_admin(actor)?;
        Ok(self.store.list_users().await?)
    }
}

fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.is_empty() {
        return Err(ServiceError::validation("password is required"));
    }
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(ServiceError::validation(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ServiceError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), ServiceError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_owned()))?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("user123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("user123", &hash).is_ok());
        assert!(verify_password("wrong", &hash).is_err());
    }

    #[test]
    fn test_password_length_bounds() {
        assert!(validate_password("").is_err());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password(&"p".repeat(50)).is_ok());
        assert!(validate_password(&"p".repeat(51)).is_err());
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let user = auth.register("  alice  ", " secret1 ").await.unwrap();
        assert_eq!(user.username.as_str(), "alice");
        assert!(!user.admin);

        let session = auth.login("alice", "secret1").await.unwrap();
        assert_eq!(session.user_id, user.id);
        let resolved = auth.resolve_token(&session.token).await.unwrap();
        assert_eq!(resolved, user);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        for (username, password) in [("ab", "secret1"), ("bad name", "secret1"), ("alice", "123")] {
            let err = auth.register(username, password).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{username}");
        }

        auth.register("alice", "secret1").await.unwrap();
        let err = auth.register("alice", "secret2").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register("alice", "secret1").await.unwrap();

        let wrong_password = auth.login("alice", "nope").await.unwrap_err();
        let unknown_user = auth.login("mallory", "secret1").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert!(matches!(unknown_user, ServiceError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_new_login_replaces_token() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register("alice", "secret1").await.unwrap();

        let first = auth.login("alice", "secret1").await.unwrap();
        let second = auth.login("alice", "secret1").await.unwrap();
        assert_ne!(first.token, second.token);
        assert!(auth.resolve_token(&first.token).await.is_err());
        assert!(auth.resolve_token(&second.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_users_requires_admin() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        let admin = auth
            .register_with_role("admin", "admin123", true)
            .await
            .unwrap();
        let user = auth.register("user", "user123").await.unwrap();

        let err = auth.list_users(&user.actor()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));
        assert_eq!(auth.list_users(&admin.actor()).await.unwrap().len(), 2);
    }
}
