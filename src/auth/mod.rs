//! Authentication and authorization core.
//!
//! Two login mechanisms share one credential store:
//!
//! - **Session**: `authenticate` verifies a password and opens a server-side
//!   session. A user has at most one live session.
//! - **Token**: `issue_token` verifies a password and mints a stateless,
//!   signed bearer token with a fixed lifetime.
//!
//! Deletion of posts and comments is gated by [`AuthorizationGuard`], which
//! reads ownership from the store on every call.
//!
//! ## Usage
//!
//! ```ignore
//! let service = AuthService::new(AuthConfig::default(), store, SigningKey::generate());
//! service.create_user("alice", "hunter2").await?;
//! let session_id = service.authenticate("alice", "hunter2").await?;
//! assert!(service.is_session_valid(&session_id).await);
//! ```

pub mod credentials;
pub mod error;
pub mod guard;
pub mod identity;
pub mod password;
pub mod service;
pub mod session;
pub mod store;
pub mod token;


pub use credentials::{CredentialVerifier, MAX_USERNAME_LEN, validate_username};
pub use error::{AuthError, AuthResult};
pub use guard::AuthorizationGuard;
pub use identity::{Credential, Identity};
pub use password::{generate_salt, hash_password, verify_password};
pub use service::{AuthConfig, AuthService};
pub use session::{SessionManager, generate_session_id};
pub use store::{AuthStore, StoreError, StoreResult, StoredCredential};
pub use token::{Claims, SigningKey, TokenIssuer};
