//! SurrealDB-backed [`AuthStore`].
//!
//! All queries bind their inputs as parameters. Table names are fixed per
//! [`ResourceKind`] and never derived from request data.

use tracing::debug;

use crate::auth::store::{AuthStore, StoreError, StoreResult, StoredCredential};
use crate::db::connection::Db;
use crate::db::schema::CredentialRow;
use crate::types::{CommentId, PostId, ResourceKind, SessionId, Username};

const POST_AUTHOR_QUERY: &str = "SELECT VALUE author FROM post WHERE post_id = $id LIMIT 1";
const COMMENT_AUTHOR_QUERY: &str =
    "SELECT VALUE author FROM post_comment WHERE comment_id = $id LIMIT 1";

#[derive(Clone)]
pub struct SurrealStore {
    db: Db,
}

impl SurrealStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    async fn first_string(&self, query: &'static str, id: &str) -> StoreResult<Option<String>> {
        let mut res = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .await
            .map_err(backend)?;
        let values: Vec<String> = res.take(0).map_err(backend)?;
        Ok(values.into_iter().next())
    }
}

fn backend(err: surrealdb::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Unique index violations surface as "already contains" errors.
fn write_error(err: surrealdb::Error) -> StoreError {
    let msg = err.to_string();
    if msg.contains("already contains") {
        StoreError::Conflict(msg)
    } else {
        StoreError::Backend(msg)
    }
}

impl AuthStore for SurrealStore {
    async fn get_credential(&self, username: &Username) -> StoreResult<Option<StoredCredential>> {
        let mut res = self
            .db
            .query(
                "SELECT username, password_hash, salt FROM user WHERE username = $username LIMIT 1",
            )
            .bind(("username", username.as_str().to_string()))
            .await
            .map_err(backend)?;
        let rows: Vec<CredentialRow> = res.take(0).map_err(backend)?;
        rows.into_iter()
            .next()
            .map(StoredCredential::try_from)
            .transpose()
    }

    async fn put_credential(&self, credential: &StoredCredential) -> StoreResult<()> {
        self.db
            .query("CREATE user CONTENT $content")
            .bind(("content", CredentialRow::from(credential)))
            .await
            .map_err(write_error)?
            .check()
            .map_err(write_error)?;
        debug!("Stored credential for {}", credential.username);
        Ok(())
    }

    async fn put_session(&self, session_id: &SessionId, username: &Username) -> StoreResult<()> {
        self.db
            .query("CREATE user_session SET session_id = $session_id, username = $username")
            .bind(("session_id", session_id.as_str().to_string()))
            .bind(("username", username.as_str().to_string()))
            .await
            .map_err(write_error)?
            .check()
            .map_err(write_error)?;
        Ok(())
    }

    async fn delete_sessions_for_user(&self, username: &Username) -> StoreResult<()> {
        self.db
            .query("DELETE user_session WHERE username = $username")
            .bind(("username", username.as_str().to_string()))
            .await
            .map_err(backend)?
            .check()
            .map_err(backend)?;
        Ok(())
    }

    async fn session_exists(&self, session_id: &SessionId) -> StoreResult<bool> {
        Ok(self.username_for_session(session_id).await?.is_some())
    }

    async fn username_for_session(&self, session_id: &SessionId) -> StoreResult<Option<Username>> {
        let mut res = self
            .db
            .query("SELECT VALUE username FROM user_session WHERE session_id = $session_id LIMIT 1")
            .bind(("session_id", session_id.as_str().to_string()))
            .await
            .map_err(backend)?;
        let values: Vec<Username> = res.take(0).map_err(backend)?;
        Ok(values.into_iter().next())
    }

    async fn author_of(&self, kind: ResourceKind, id: &str) -> StoreResult<Option<Username>> {
        let query = match kind {
            ResourceKind::Post => POST_AUTHOR_QUERY,
            ResourceKind::Comment => COMMENT_AUTHOR_QUERY,
        };
        Ok(self.first_string(query, id).await?.map(Username::new))
    }

    async fn parent_post_of(&self, comment_id: &CommentId) -> StoreResult<Option<PostId>> {
        Ok(self
            .first_string(
                "SELECT VALUE post_id FROM post_comment WHERE comment_id = $id LIMIT 1",
                comment_id.as_str(),
            )
            .await?
            .map(PostId::new))
    }
}
