//! Credential registration and verification.

use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::error::{AuthError, AuthResult};
use crate::auth::password::{DUMMY_SALT, generate_salt, hash_password, verify_password};
use crate::auth::store::{AuthStore, StoreError, StoredCredential};
use crate::types::Username;

/// Longest accepted username, matching the width of the stored column.
pub const MAX_USERNAME_LEN: usize = 50;

/// Verifies login attempts and registers new users.
pub struct CredentialVerifier<S> {
    store: Arc<S>,
}

impl<S: AuthStore> CredentialVerifier<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Check a username/password pair, returning the verified username.
    ///
    /// Unknown users and wrong passwords both fail with
    /// [`AuthError::InvalidCredentials`].
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult<Username> {
        let username = Username::new(username);

        let Some(credential) = self.store.get_credential(&username).await? else {
            // Spend the same hashing work as a real attempt.
            let _ = hash_password(password, &DUMMY_SALT);
            debug!("Login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &credential.salt, &credential.password_hash) {
            debug!("Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        debug!("Credentials verified for {}", username);
        Ok(username)
    }

    /// Register a new user with a freshly salted hash.
    pub async fn create_user(&self, username: &str, password: &str) -> AuthResult<()> {
        validate_username(username)?;
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password is empty".to_string()));
        }

        let username = Username::new(username);
        if self.store.get_credential(&username).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let salt = generate_salt();
        let credential = StoredCredential {
            password_hash: hash_password(password, &salt),
            username,
            salt,
        };

        match self.store.put_credential(&credential).await {
            Ok(()) => {
                info!("Registered user {}", credential.username);
                Ok(())
            }
            // Lost a race with a concurrent registration.
            Err(StoreError::Conflict(_)) => Err(AuthError::UserAlreadyExists),
            Err(e) => Err(e.into()),
        }
    }
}

/// Reject usernames that cannot be stored or compared reliably.
pub fn validate_username(username: &str) -> AuthResult<()> {
    if username.is_empty() {
        return Err(AuthError::InvalidInput("username is empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AuthError::InvalidInput(format!(
            "username exceeds {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AuthError::InvalidInput(
            "username contains whitespace or control characters".to_string(),
        ));
    }
    Ok(())
}
