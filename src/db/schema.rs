use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use surrealdb::sql::Datetime;

use crate::auth::password::SALT_BYTES;
use crate::auth::store::{StoreError, StoredCredential};
use crate::types::{CommentId, PasswordHash, PostId, Username};

/// Persisted credential row (table: `user`).
///
/// The salt is stored base64url encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRow {
    pub username: Username,
    pub password_hash: PasswordHash,
    pub salt: String,
}

impl From<&StoredCredential> for CredentialRow {
    fn from(credential: &StoredCredential) -> Self {
        Self {
            username: credential.username.clone(),
            password_hash: credential.password_hash.clone(),
            salt: URL_SAFE_NO_PAD.encode(credential.salt),
        }
    }
}

impl TryFrom<CredentialRow> for StoredCredential {
    type Error = StoreError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        let bytes = URL_SAFE_NO_PAD
            .decode(&row.salt)
            .map_err(|e| StoreError::Backend(format!("corrupt salt for {}: {}", row.username, e)))?;
        let salt: [u8; SALT_BYTES] = bytes.try_into().map_err(|_| {
            StoreError::Backend(format!("salt for {} has the wrong length", row.username))
        })?;
        Ok(Self {
            username: row.username,
            password_hash: row.password_hash,
            salt,
        })
    }
}

/// A post (table: `post`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub post_id: PostId,
    pub author: Username,
    pub content: String,
    pub created_at: Option<Datetime>,
}

/// Payload used when inserting a new post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCreate {
    pub post_id: PostId,
    pub author: Username,
    pub content: String,
}

/// A comment on a post (table: `post_comment`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub comment_id: CommentId,
    pub post_id: PostId,
    pub author: Username,
    pub content: String,
    pub created_at: Option<Datetime>,
}

/// Payload used when inserting a new comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentCreate {
    pub comment_id: CommentId,
    pub post_id: PostId,
    pub author: Username,
    pub content: String,
}
