// Core modules
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod types;

// Re-export key types and functions
pub use api::{AppState, create_router};
pub use auth::{AuthConfig, AuthError, AuthService, SigningKey};
pub use config::{AppConfig, load_config};
pub use db::{DatabaseConfig, SurrealStore, create_connection, ensure_schema};

use anyhow::Result;
use std::sync::Arc;

/// Connect to the database, ensure the schema and assemble the auth service.
pub async fn create_app_state(database: DatabaseConfig, auth: AuthConfig) -> Result<AppState> {
    let key = auth.signing_key()?;
    create_app_state_with_key(database, auth, key).await
}

/// Like [`create_app_state`] with an explicit signing key.
pub async fn create_app_state_with_key(
    database: DatabaseConfig,
    auth: AuthConfig,
    key: SigningKey,
) -> Result<AppState> {
    auth.validate()?;
    let db = create_connection(database).await?;
    ensure_schema(&db).await?;

    let store = Arc::new(SurrealStore::new(db.clone()));
    let auth = Arc::new(AuthService::new(auth, store, key));

    Ok(AppState { auth, db })
}
