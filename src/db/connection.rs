use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use tracing::debug;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("KIND_DB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("KIND_DB_NAMESPACE").unwrap_or_else(|_| "kind".to_string()),
            database: env::var("KIND_DB_DATABASE").unwrap_or_else(|_| "app".to_string()),
            username: env::var("KIND_DB_USERNAME").ok(),
            password: env::var("KIND_DB_PASSWORD").ok(),
        }
    }
}

impl DatabaseConfig {
    /// In-memory database, used by tests and `--db-url memory`.
    pub fn in_memory() -> Self {
        Self {
            url: "memory".to_string(),
            namespace: "kind".to_string(),
            database: "app".to_string(),
            username: None,
            password: None,
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    debug!("Connecting to database at {}", config.url);
    let db = surrealdb::engine::any::connect(config.url).await?;

    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

/// Define tables and indexes. Safe to run on every startup.
pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = [
        // Credentials, one row per user
        "DEFINE TABLE IF NOT EXISTS user SCHEMAFULL;
         DEFINE FIELD IF NOT EXISTS username ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS password_hash ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS salt ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE user TYPE datetime DEFAULT time::now();",

        // Login sessions
        "DEFINE TABLE IF NOT EXISTS user_session SCHEMAFULL;
         DEFINE FIELD IF NOT EXISTS session_id ON TABLE user_session TYPE string;
         DEFINE FIELD IF NOT EXISTS username ON TABLE user_session TYPE string;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE user_session TYPE datetime DEFAULT time::now();",

        "DEFINE TABLE IF NOT EXISTS post SCHEMAFULL;
         DEFINE FIELD IF NOT EXISTS post_id ON TABLE post TYPE string;
         DEFINE FIELD IF NOT EXISTS author ON TABLE post TYPE string;
         DEFINE FIELD IF NOT EXISTS content ON TABLE post TYPE string;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE post TYPE datetime DEFAULT time::now();",

        "DEFINE TABLE IF NOT EXISTS post_comment SCHEMAFULL;
         DEFINE FIELD IF NOT EXISTS comment_id ON TABLE post_comment TYPE string;
         DEFINE FIELD IF NOT EXISTS post_id ON TABLE post_comment TYPE string;
         DEFINE FIELD IF NOT EXISTS author ON TABLE post_comment TYPE string;
         DEFINE FIELD IF NOT EXISTS content ON TABLE post_comment TYPE string;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE post_comment TYPE datetime DEFAULT time::now();",

        // The unique index on user_session.username backs the one-session rule
        // across processes.
        "DEFINE INDEX IF NOT EXISTS user_username ON TABLE user COLUMNS username UNIQUE;
         DEFINE INDEX IF NOT EXISTS user_session_id ON TABLE user_session COLUMNS session_id UNIQUE;
         DEFINE INDEX IF NOT EXISTS user_session_username ON TABLE user_session COLUMNS username UNIQUE;
         DEFINE INDEX IF NOT EXISTS post_post_id ON TABLE post COLUMNS post_id UNIQUE;
         DEFINE INDEX IF NOT EXISTS post_comment_id ON TABLE post_comment COLUMNS comment_id UNIQUE;
         DEFINE INDEX IF NOT EXISTS post_comment_post_id ON TABLE post_comment COLUMNS post_id;",
    ];

    for query in schema_queries {
        db.query(query).await?.check()?;
    }

    debug!("Database schema ensured");
    Ok(())
}
