//! The auth facade handed to request handlers.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::credentials::CredentialVerifier;
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::guard::AuthorizationGuard;
use crate::auth::identity::{Credential, DEFAULT_AUTH_SCHEME, DEFAULT_SESSION_COOKIE, Identity};
use crate::auth::session::{DEFAULT_MAX_SESSION_ID_ATTEMPTS, SessionManager};
use crate::auth::store::AuthStore;
use crate::auth::token::{Claims, DEFAULT_TOKEN_TTL_HOURS, SigningKey, TokenIssuer};
use crate::types::{ResourceKind, SessionId, Username};

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of bearer tokens in hours
    pub token_ttl_hours: i64,
    /// Base64url token signing secret. When absent a random key is generated
    /// at startup and tokens do not survive a restart.
    pub signing_secret: Option<String>,
    /// Name of the session cookie
    pub session_cookie: String,
    /// Scheme expected in the Authorization header
    pub auth_header_scheme: String,
    /// Upper bound on session id generation attempts
    pub max_session_id_attempts: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            signing_secret: None,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            auth_header_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            max_session_id_attempts: DEFAULT_MAX_SESSION_ID_ATTEMPTS,
        }
    }
}

/// Longest accepted token lifetime: 10 years.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

impl AuthConfig {
    /// Reject values that would make tokens unusable or overflow expiry math.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.token_ttl_hours) {
            anyhow::bail!(
                "auth.token_ttl_hours must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_HOURS,
                self.token_ttl_hours
            );
        }
        if self.session_cookie.is_empty() {
            anyhow::bail!("auth.session_cookie must not be empty");
        }
        Ok(())
    }

    /// Token lifetime. Out-of-range values fall back to the default.
    pub fn token_ttl(&self) -> Duration {
        match Duration::try_hours(self.token_ttl_hours) {
            Some(ttl) if (1..=MAX_TOKEN_TTL_HOURS).contains(&self.token_ttl_hours) => ttl,
            _ => {
                warn!(
                    "Invalid token_ttl_hours {}, using {}",
                    self.token_ttl_hours, DEFAULT_TOKEN_TTL_HOURS
                );
                Duration::hours(DEFAULT_TOKEN_TTL_HOURS)
            }
        }
    }

    /// Build the signing key this configuration describes.
    pub fn signing_key(&self) -> anyhow::Result<SigningKey> {
        match &self.signing_secret {
            Some(secret) => SigningKey::from_base64(secret),
            None => {
                warn!("No signing secret configured; tokens will not survive a restart");
                Ok(SigningKey::generate())
            }
        }
    }
}

/// Authentication and authorization entry points.
pub struct AuthService<S> {
    config: AuthConfig,
    credentials: CredentialVerifier<S>,
    sessions: SessionManager<S>,
    tokens: TokenIssuer,
    guard: AuthorizationGuard<S>,
}

impl<S: AuthStore> AuthService<S> {
    /// Create the service. The signing key is injected rather than derived
    /// so callers decide whether it is persisted.
    pub fn new(config: AuthConfig, store: Arc<S>, key: SigningKey) -> Self {
        let tokens = TokenIssuer::with_ttl(key, config.token_ttl());
        Self {
            credentials: CredentialVerifier::new(store.clone()),
            sessions: SessionManager::with_max_attempts(
                store.clone(),
                config.max_session_id_attempts,
            ),
            guard: AuthorizationGuard::new(store),
            tokens,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialVerifier<S> {
        &self.credentials
    }

    pub fn sessions(&self) -> &SessionManager<S> {
        &self.sessions
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn guard(&self) -> &AuthorizationGuard<S> {
        &self.guard
    }

    /// Web flow: verify credentials and open a session, replacing any prior
    /// session for the user.
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult<SessionId> {
        let username = self.credentials.authenticate(username, password).await?;
        let session_id = self.sessions.create_session(&username).await?;
        info!("{} logged in", username);
        Ok(session_id)
    }

    /// API flow: verify credentials and mint a bearer token.
    pub async fn issue_token(&self, username: &str, password: &str) -> AuthResult<String> {
        let username = self.credentials.authenticate(username, password).await?;
        let token = self.tokens.issue(&username)?;
        info!("Issued API token for {}", username);
        Ok(token)
    }

    pub fn validate_token(&self, token: &str) -> AuthResult<Username> {
        self.tokens.validate(token).map(|claims| claims.username)
    }

    pub async fn is_session_valid(&self, session_id: &SessionId) -> bool {
        self.sessions.is_valid(session_id).await
    }

    /// End the session's owner's login.
    pub async fn logout(&self, session_id: &SessionId) -> AuthResult<()> {
        let username = self.sessions.resolve_username(session_id).await?;
        self.sessions.delete_session(&username).await?;
        info!("{} logged out", username);
        Ok(())
    }

    pub async fn create_user(&self, username: &str, password: &str) -> AuthResult<()> {
        self.credentials.create_user(username, password).await
    }

    pub async fn authorize_delete(&self, username: &Username, kind: ResourceKind, id: &str) -> bool {
        self.guard.authorize_delete(username, kind, id).await
    }

    /// Resolve whichever credential a request presented.
    pub async fn resolve_identity(&self, credential: &Credential) -> AuthResult<Identity> {
        match credential {
            Credential::SessionCookie(session_id) => {
                let username = self.sessions.resolve_username(session_id).await?;
                Ok(Identity::Session {
                    username,
                    session_id: session_id.clone(),
                })
            }
            Credential::Bearer(token) => {
                let claims = self.tokens.validate(token)?;
                let expires_at = token_expiry(&claims)?;
                Ok(Identity::Token {
                    username: claims.username,
                    expires_at,
                })
            }
        }
    }

    /// Resolve identity straight from request header values.
    ///
    /// Returns `Ok(None)` when the request carries no usable credential.
    pub async fn identity_from_headers(
        &self,
        authorization: Option<&str>,
        cookie_header: Option<&str>,
    ) -> AuthResult<Option<Identity>> {
        let Some(credential) = Credential::from_headers(
            authorization,
            cookie_header,
            &self.config.session_cookie,
            &self.config.auth_header_scheme,
        ) else {
            return Ok(None);
        };
        self.resolve_identity(&credential).await.map(Some)
    }
}

fn token_expiry(claims: &Claims) -> AuthResult<DateTime<Utc>> {
    claims.expires_at_utc().ok_or(AuthError::MalformedToken)
}
