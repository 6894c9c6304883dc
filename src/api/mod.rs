// HTTP surface: registration, both login flows and content endpoints.

mod error;

pub use error::ApiError;

use axum::{
    Router,
    extract::{FromRequestParts, Path, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::auth::identity::cookie_value;
use crate::auth::{AuthError, AuthService, Identity};
use crate::db::{CommentRecord, Db, PostRecord, QueryBuilder, SurrealStore};
use crate::types::{CommentId, PostId, ResourceKind, SessionId, Username};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService<SurrealStore>>,
    pub db: Db,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/api/token", post(issue_token))
        .route("/api/whoami", get(whoami))
        .route("/api/posts", get(list_posts))
        .route("/api/post", post(create_post))
        .route("/api/post/{id}", get(get_post).delete(delete_post))
        .route(
            "/api/post/{id}/comments",
            get(list_comments).post(create_comment),
        )
        .route("/api/comment/{id}", delete(delete_comment))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub post_id: PostId,
    pub author: Username,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<PostRecord> for PostView {
    fn from(record: PostRecord) -> Self {
        Self {
            post_id: record.post_id,
            author: record.author,
            content: record.content,
            created_at: record.created_at.map(|dt| dt.0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub comment_id: CommentId,
    pub post_id: PostId,
    pub author: Username,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<CommentRecord> for CommentView {
    fn from(record: CommentRecord) -> Self {
        Self {
            comment_id: record.comment_id,
            post_id: record.post_id,
            author: record.author,
            content: record.content,
            created_at: record.created_at.map(|dt| dt.0),
        }
    }
}

/// Authenticated caller, resolved from the `Authorization` header or the
/// session cookie.
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        // An unreadable Authorization header still counts as the presented
        // credential, so the cookie is not consulted.
        let authorization = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| ApiError::Unauthenticated)?),
            None => None,
        };
        let cookies = cookie_header(&parts.headers);

        state
            .auth
            .identity_from_headers(authorization, cookies.as_deref())
            .await?
            .map(AuthUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

/// All `Cookie` headers joined into one.
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join("; "))
    }
}

fn session_cookie(name: &str, value: &str) -> String {
    format!("{}={}; HttpOnly; Secure; SameSite=Lax; Path=/", name, value)
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .auth
        .create_user(&payload.username, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "username": payload.username })),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let session_id = state
        .auth
        .authenticate(&payload.username, &payload.password)
        .await?;
    let cookie = session_cookie(&state.auth.config().session_cookie, session_id.as_str());

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "username": payload.username })),
    )
        .into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let name = &state.auth.config().session_cookie;
    let session_id = cookie_header(&headers)
        .as_deref()
        .and_then(|h| cookie_value(h, name))
        .map(SessionId::new)
        .ok_or(ApiError::Unauthenticated)?;

    state.auth.logout(&session_id).await?;

    let cleared = format!("{}; Max-Age=0", session_cookie(name, ""));
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cleared)]).into_response())
}

async fn issue_token(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let token = state
        .auth
        .issue_token(&payload.username, &payload.password)
        .await?;

    Ok(Json(serde_json::json!({
        "token": token,
        "token_type": state.auth.config().auth_header_scheme,
        "expires_in": state.auth.tokens().ttl().num_seconds(),
    })))
}

async fn whoami(AuthUser(identity): AuthUser) -> Json<Identity> {
    Json(identity)
}

async fn create_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(payload): Json<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = QueryBuilder::create_post(&state.db, identity.username(), &payload.content).await?;
    Ok((StatusCode::CREATED, Json(PostView::from(record))))
}

async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostView>>, ApiError> {
    let posts = QueryBuilder::list_posts(&state.db).await?;
    Ok(Json(posts.into_iter().map(PostView::from).collect()))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PostView>, ApiError> {
    QueryBuilder::get_post(&state.db, &PostId::new(id))
        .await?
        .map(|record| Json(PostView::from(record)))
        .ok_or(ApiError::Auth(AuthError::NotFound))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    let comments = QueryBuilder::list_comments(&state.db, &PostId::new(id)).await?;
    Ok(Json(comments.into_iter().map(CommentView::from).collect()))
}

async fn create_comment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = QueryBuilder::create_comment(
        &state.db,
        &PostId::new(id),
        identity.username(),
        &payload.content,
    )
    .await?
    .ok_or(ApiError::Auth(AuthError::NotFound))?;

    Ok((StatusCode::CREATED, Json(CommentView::from(record))))
}

async fn delete_post(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .auth
        .guard()
        .check_delete(identity.username(), ResourceKind::Post, &id)
        .await?;
    QueryBuilder::delete_post(&state.db, &PostId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .auth
        .guard()
        .check_delete(identity.username(), ResourceKind::Comment, &id)
        .await?;
    QueryBuilder::delete_comment(&state.db, &CommentId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
