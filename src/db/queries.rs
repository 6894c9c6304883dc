// Content queries backing the post and comment endpoints.
//
// Authorization is not checked here; callers run the guard first.

use crate::db::connection::Db;
use crate::db::schema::*;
use crate::types::{CommentId, PostId, Username};
use anyhow::{Result, anyhow};
use uuid::Uuid;

pub struct QueryBuilder;

impl QueryBuilder {
    /// Create a post owned by `author`.
    pub async fn create_post(db: &Db, author: &Username, content: &str) -> Result<PostRecord> {
        let data = PostCreate {
            post_id: PostId::new(Uuid::new_v4().to_string()),
            author: author.clone(),
            content: content.to_string(),
        };

        let mut res = db
            .query(
                r#"
                CREATE post CONTENT $data
                RETURN post_id, author, content, created_at
                "#,
            )
            .bind(("data", data))
            .await?;

        let created: Option<PostRecord> = res.take(0)?;
        created.ok_or_else(|| anyhow!("failed to create post record"))
    }

    pub async fn get_post(db: &Db, post_id: &PostId) -> Result<Option<PostRecord>> {
        let mut res = db
            .query(
                "SELECT post_id, author, content, created_at FROM post WHERE post_id = $post_id LIMIT 1",
            )
            .bind(("post_id", post_id.as_str().to_string()))
            .await?;

        let posts: Vec<PostRecord> = res.take(0)?;
        Ok(posts.into_iter().next())
    }

    /// All posts, oldest first.
    pub async fn list_posts(db: &Db) -> Result<Vec<PostRecord>> {
        let mut res = db
            .query(
                r#"
                SELECT post_id, author, content, created_at
                FROM post
                ORDER BY created_at ASC
                "#,
            )
            .await?;

        Ok(res.take(0)?)
    }

    /// Delete a post together with its comments.
    pub async fn delete_post(db: &Db, post_id: &PostId) -> Result<()> {
        db.query(
            r#"
            BEGIN TRANSACTION;
            DELETE post_comment WHERE post_id = $post_id;
            DELETE post WHERE post_id = $post_id;
            COMMIT TRANSACTION;
            "#,
        )
        .bind(("post_id", post_id.as_str().to_string()))
        .await?
        .check()?;
        Ok(())
    }

    /// Add a comment to an existing post. Returns `None` if the post does not exist.
    pub async fn create_comment(
        db: &Db,
        post_id: &PostId,
        author: &Username,
        content: &str,
    ) -> Result<Option<CommentRecord>> {
        if Self::get_post(db, post_id).await?.is_none() {
            return Ok(None);
        }

        let data = CommentCreate {
            comment_id: CommentId::new(Uuid::new_v4().to_string()),
            post_id: post_id.clone(),
            author: author.clone(),
            content: content.to_string(),
        };

        let mut res = db
            .query(
                r#"
                CREATE post_comment CONTENT $data
                RETURN comment_id, post_id, author, content, created_at
                "#,
            )
            .bind(("data", data))
            .await?;

        let created: Option<CommentRecord> = res.take(0)?;
        created
            .map(Some)
            .ok_or_else(|| anyhow!("failed to create comment record"))
    }

    /// Comments on a post, oldest first.
    pub async fn list_comments(db: &Db, post_id: &PostId) -> Result<Vec<CommentRecord>> {
        let mut res = db
            .query(
                r#"
                SELECT comment_id, post_id, author, content, created_at
                FROM post_comment
                WHERE post_id = $post_id
                ORDER BY created_at ASC
                "#,
            )
            .bind(("post_id", post_id.as_str().to_string()))
            .await?;

        Ok(res.take(0)?)
    }

    pub async fn delete_comment(db: &Db, comment_id: &CommentId) -> Result<()> {
        db.query("DELETE post_comment WHERE comment_id = $comment_id")
            .bind(("comment_id", comment_id.as_str().to_string()))
            .await?
            .check()?;
        Ok(())
    }
}
