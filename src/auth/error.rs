//! Error types for authentication and authorization.

use std::fmt;

use http::StatusCode;

use crate::auth::store::StoreError;

/// Errors returned by the auth core.
///
/// None of the messages name a user other than the caller, so they are safe
/// to surface in HTTP responses as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown username or wrong password. The two cases are deliberately
    /// indistinguishable.
    InvalidCredentials,
    /// A credential record already exists for the username.
    UserAlreadyExists,
    /// No session row matches the presented session id.
    SessionNotFound,
    /// The token is not a well-formed signed token.
    MalformedToken,
    /// The token signature does not verify against the current key.
    InvalidSignature,
    /// The token's expiry has passed.
    Expired,
    /// The caller is authenticated but does not own the resource.
    NotAuthorized,
    /// The target resource (or its parent) does not exist.
    NotFound,
    /// Registration input was rejected.
    InvalidInput(String),
    /// Any failure of the backing store.
    StorageError(String),
    /// Unexpected failure inside the core itself.
    Internal(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "Invalid username or password"),
            Self::UserAlreadyExists => write!(f, "User already exists"),
            Self::SessionNotFound => write!(f, "Session not found"),
            Self::MalformedToken => write!(f, "Malformed token"),
            Self::InvalidSignature => write!(f, "Invalid token signature"),
            Self::Expired => write!(f, "Token has expired"),
            Self::NotAuthorized => write!(f, "Not authorized"),
            Self::NotFound => write!(f, "Resource not found"),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl AuthError {
    /// HTTP status this error surfaces as.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials
            | Self::SessionNotFound
            | Self::InvalidSignature
            | Self::Expired => StatusCode::UNAUTHORIZED,
            Self::MalformedToken | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotAuthorized => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UserAlreadyExists => StatusCode::CONFLICT,
            Self::StorageError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
