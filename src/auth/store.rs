//! Storage contract consumed by the auth core.
//!
//! The core never caches what it reads through this trait. Every validity
//! and ownership check is a fresh call against the store.

use std::fmt;
use std::future::Future;

use crate::types::{CommentId, PasswordHash, PostId, ResourceKind, SessionId, Username};

/// Persisted credential for a single user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub username: Username,
    pub password_hash: PasswordHash,
    pub salt: [u8; 16],
}

/// Errors reported by a store implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    Conflict(String),
    /// Any other backend failure.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict(msg) => write!(f, "Conflict: {}", msg),
            Self::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// Record store backing credentials, sessions and ownership facts.
pub trait AuthStore: Send + Sync + 'static {
    fn get_credential(
        &self,
        username: &Username,
    ) -> impl Future<Output = StoreResult<Option<StoredCredential>>> + Send;

    /// Insert a new credential. Must fail with [`StoreError::Conflict`] if one
    /// already exists for the username.
    fn put_credential(
        &self,
        credential: &StoredCredential,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn put_session(
        &self,
        session_id: &SessionId,
        username: &Username,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Remove every session row owned by `username`. Not an error if none exist.
    fn delete_sessions_for_user(
        &self,
        username: &Username,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn session_exists(&self, session_id: &SessionId)
    -> impl Future<Output = StoreResult<bool>> + Send;

    fn username_for_session(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = StoreResult<Option<Username>>> + Send;

    fn author_of(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> impl Future<Output = StoreResult<Option<Username>>> + Send;

    fn parent_post_of(
        &self,
        comment_id: &CommentId,
    ) -> impl Future<Output = StoreResult<Option<PostId>>> + Send;
}
