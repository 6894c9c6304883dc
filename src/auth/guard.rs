//! Ownership checks before mutating content.
//!
//! Every decision reads the current author facts from the store. Missing
//! resources and lookup failures never authorize.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::error::{AuthError, AuthResult};
use crate::auth::store::AuthStore;
use crate::types::{CommentId, PostId, ResourceKind, Username};

/// Decides whether an authenticated user may delete a post or comment.
pub struct AuthorizationGuard<S> {
    store: Arc<S>,
}

impl<S: AuthStore> AuthorizationGuard<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Only the author may delete a post.
    pub async fn check_delete_post(&self, username: &Username, post_id: &PostId) -> AuthResult<()> {
        let author = self
            .store
            .author_of(ResourceKind::Post, post_id.as_str())
            .await?
            .ok_or(AuthError::NotFound)?;

        if &author == username {
            Ok(())
        } else {
            Err(AuthError::NotAuthorized)
        }
    }

    /// The comment's author or the parent post's author may delete a comment.
    pub async fn check_delete_comment(
        &self,
        username: &Username,
        comment_id: &CommentId,
    ) -> AuthResult<()> {
        let comment_author = self
            .store
            .author_of(ResourceKind::Comment, comment_id.as_str())
            .await?
            .ok_or(AuthError::NotFound)?;

        if &comment_author == username {
            return Ok(());
        }

        let parent = self
            .store
            .parent_post_of(comment_id)
            .await?
            .ok_or(AuthError::NotFound)?;
        let post_author = self
            .store
            .author_of(ResourceKind::Post, parent.as_str())
            .await?
            .ok_or(AuthError::NotFound)?;

        if &post_author == username {
            debug!("{} moderating comment on own post {}", username, parent);
            Ok(())
        } else {
            Err(AuthError::NotAuthorized)
        }
    }

    /// Dispatch on resource kind.
    pub async fn check_delete(
        &self,
        username: &Username,
        kind: ResourceKind,
        id: &str,
    ) -> AuthResult<()> {
        match kind {
            ResourceKind::Post => self.check_delete_post(username, &PostId::new(id)).await,
            ResourceKind::Comment => {
                self.check_delete_comment(username, &CommentId::new(id))
                    .await
            }
        }
    }

    pub async fn can_delete_post(&self, username: &Username, post_id: &PostId) -> bool {
        permitted(self.check_delete_post(username, post_id).await)
    }

    pub async fn can_delete_comment(&self, username: &Username, comment_id: &CommentId) -> bool {
        permitted(self.check_delete_comment(username, comment_id).await)
    }

    pub async fn authorize_delete(&self, username: &Username, kind: ResourceKind, id: &str) -> bool {
        permitted(self.check_delete(username, kind, id).await)
    }
}

/// Collapse a decision to a boolean, failing closed.
fn permitted(decision: AuthResult<()>) -> bool {
    match decision {
        Ok(()) => true,
        Err(AuthError::StorageError(e)) => {
            warn!("Authorization lookup failed, denying: {}", e);
            false
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::memory::MemoryStore;
    use std::sync::atomic::Ordering;

    fn guard() -> (Arc<MemoryStore>, AuthorizationGuard<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.add_post("p1", "bob");
        store.add_post("p2", "carol");
        store.add_comment("c1", "p1", "dave");
        store.add_comment("c2", "p2", "bob");
        (store.clone(), AuthorizationGuard::new(store))
    }

    fn user(name: &str) -> Username {
        Username::new(name)
    }

    #[tokio::test]
    async fn test_post_author_may_delete_post() {
        let (_, guard) = guard();
        assert!(guard.can_delete_post(&user("bob"), &PostId::new("p1")).await);
    }

    #[tokio::test]
    async fn test_others_may_not_delete_post() {
        let (_, guard) = guard();
        for name in ["carol", "dave", "Bob", "bob ", ""] {
            assert!(!guard.can_delete_post(&user(name), &PostId::new("p1")).await);
        }
        assert_eq!(
            guard
                .check_delete_post(&user("carol"), &PostId::new("p1"))
                .await
                .unwrap_err(),
            AuthError::NotAuthorized
        );
    }

    #[tokio::test]
    async fn test_missing_post_is_not_found() {
        let (_, guard) = guard();
        assert!(!guard.can_delete_post(&user("bob"), &PostId::new("missing")).await);
        assert_eq!(
            guard
                .check_delete_post(&user("bob"), &PostId::new("missing"))
                .await
                .unwrap_err(),
            AuthError::NotFound
        );
    }

    #[tokio::test]
    async fn test_comment_author_may_delete_comment() {
        let (_, guard) = guard();
        assert!(guard.can_delete_comment(&user("dave"), &CommentId::new("c1")).await);
        assert!(guard.can_delete_comment(&user("bob"), &CommentId::new("c2")).await);
    }

    #[tokio::test]
    async fn test_post_author_may_moderate_comments() {
        let (_, guard) = guard();
        assert!(guard.can_delete_comment(&user("bob"), &CommentId::new("c1")).await);
        assert!(guard.can_delete_comment(&user("carol"), &CommentId::new("c2")).await);
    }

    #[tokio::test]
    async fn test_unrelated_user_may_not_delete_comment() {
        let (_, guard) = guard();
        assert!(!guard.can_delete_comment(&user("carol"), &CommentId::new("c1")).await);
        assert!(!guard.can_delete_comment(&user("dave"), &CommentId::new("c2")).await);
    }

    #[tokio::test]
    async fn test_missing_comment_is_not_found() {
        let (_, guard) = guard();
        assert!(!guard.can_delete_comment(&user("bob"), &CommentId::new("missing")).await);
        assert_eq!(
            guard
                .check_delete_comment(&user("bob"), &CommentId::new("missing"))
                .await
                .unwrap_err(),
            AuthError::NotFound
        );
    }

    #[tokio::test]
    async fn test_orphaned_comment_only_its_author() {
        let (store, guard) = guard();
        store.add_comment("c3", "gone", "erin");

        assert!(guard.can_delete_comment(&user("erin"), &CommentId::new("c3")).await);
        assert_eq!(
            guard
                .check_delete_comment(&user("bob"), &CommentId::new("c3"))
                .await
                .unwrap_err(),
            AuthError::NotFound
        );
    }

    #[tokio::test]
    async fn test_authorize_delete_dispatch() {
        let (_, guard) = guard();
        assert!(guard.authorize_delete(&user("bob"), ResourceKind::Post, "p1").await);
        assert!(!guard.authorize_delete(&user("bob"), ResourceKind::Post, "p2").await);
        assert!(guard.authorize_delete(&user("bob"), ResourceKind::Comment, "c1").await);
        // A post id is not a comment id.
        assert!(!guard.authorize_delete(&user("bob"), ResourceKind::Comment, "p1").await);
    }

    #[tokio::test]
    async fn test_storage_failure_denies() {
        let (store, guard) = guard();
        store.fail_all.store(true, Ordering::SeqCst);

        assert!(!guard.can_delete_post(&user("bob"), &PostId::new("p1")).await);
        assert!(!guard.can_delete_comment(&user("dave"), &CommentId::new("c1")).await);
        assert!(matches!(
            guard.check_delete_post(&user("bob"), &PostId::new("p1")).await,
            Err(AuthError::StorageError(_))
        ));
    }
}
