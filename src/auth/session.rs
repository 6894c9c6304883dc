//! Server-side session lifecycle.
//!
//! A user has at most one live session. Creating a session deletes whatever
//! session the user had before, so logging in elsewhere invalidates the old
//! cookie. Sessions never expire on their own; they end on logout or
//! replacement.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::auth::error::{AuthError, AuthResult};
use crate::auth::store::AuthStore;
use crate::types::{SessionId, Username};

/// Bytes of randomness in a session id (128 bits).
pub const SESSION_ID_BYTES: usize = 16;

/// Default bound on session id generation attempts.
pub const DEFAULT_MAX_SESSION_ID_ATTEMPTS: u32 = 8;

/// Generate a random session id.
pub fn generate_session_id() -> SessionId {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    SessionId::new(URL_SAFE_NO_PAD.encode(bytes))
}

/// Per-username mutexes so concurrent logins for one user serialize.
///
/// Each entry counts its holders and waiters and is removed when the count
/// drops to zero, including when a waiting future is cancelled.
#[derive(Default)]
struct UserLocks {
    locks: std::sync::Mutex<HashMap<Username, (Arc<Mutex<()>>, usize)>>,
}

impl UserLocks {
    async fn acquire(&self, username: &Username) -> UserLockGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = locks
                .entry(username.clone())
                .or_insert_with(|| (Arc::new(Mutex::new(())), 0));
            entry.1 += 1;
            entry.0.clone()
        };

        let mut guard = UserLockGuard {
            locks: self,
            username: username.clone(),
            held: None,
        };
        guard.held = Some(lock.lock_owned().await);
        guard
    }

    fn release(&self, username: &Username) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = locks.get_mut(username) {
            entry.1 -= 1;
            if entry.1 == 0 {
                locks.remove(username);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Holds (or waits for) one user's lock; releases its slot on drop.
struct UserLockGuard<'a> {
    locks: &'a UserLocks,
    username: Username,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLockGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        self.locks.release(&self.username);
    }
}

/// Issues, replaces, validates and revokes session ids.
pub struct SessionManager<S> {
    store: Arc<S>,
    max_attempts: u32,
    user_locks: UserLocks,
}

impl<S: AuthStore> SessionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_max_attempts(store, DEFAULT_MAX_SESSION_ID_ATTEMPTS)
    }

    /// Create a manager with a custom bound on id generation attempts.
    /// At least one attempt is always made.
    pub fn with_max_attempts(store: Arc<S>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
            user_locks: UserLocks::default(),
        }
    }

    /// Replace any existing session for `username` with a new one.
    pub async fn create_session(&self, username: &Username) -> AuthResult<SessionId> {
        let _guard = self.user_locks.acquire(username).await;
        self.replace_session(username).await
    }

    async fn replace_session(&self, username: &Username) -> AuthResult<SessionId> {
        self.store.delete_sessions_for_user(username).await?;

        for attempt in 1..=self.max_attempts {
            let candidate = generate_session_id();
            if self.store.session_exists(&candidate).await? {
                warn!("Session id collision on attempt {}, regenerating", attempt);
                continue;
            }
            self.store.put_session(&candidate, username).await?;
            info!("Created session for {}", username);
            return Ok(candidate);
        }

        Err(AuthError::StorageError(format!(
            "could not allocate a unique session id after {} attempts",
            self.max_attempts
        )))
    }

    /// Remove every session for `username`. Idempotent.
    pub async fn delete_session(&self, username: &Username) -> AuthResult<()> {
        let result = {
            let _guard = self.user_locks.acquire(username).await;
            self.store.delete_sessions_for_user(username).await
        };
        result?;
        debug!("Deleted sessions for {}", username);
        Ok(())
    }

    /// Whether a session row with exactly this id exists.
    ///
    /// Storage failures count as invalid.
    pub async fn is_valid(&self, session_id: &SessionId) -> bool {
        match self.store.session_exists(session_id).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("Session lookup failed, treating as invalid: {}", e);
                false
            }
        }
    }

    /// Resolve a session id to its owner.
    pub async fn resolve_username(&self, session_id: &SessionId) -> AuthResult<Username> {
        self.store
            .username_for_session(session_id)
            .await?
            .ok_or(AuthError::SessionNotFound)
    }
}
