//! Authentication: password hashing, bearer-token sessions, and the
//! middleware/extractors the rest of the API builds on.
//!
//! Login and logout publish [`SessionEvent`]s on a broadcast channel; the
//! route guard re-derives access on every event (see the `guard` module).

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::CookieJar;
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;

use super::error::ApiError;
use crate::db::{LoginRequest, LoginResponse, Session, SignupRequest, User, UserResponse};
use crate::db::{ROLE_ADMIN, ROLE_CLIENT};
use crate::AppState;

/// Session cookie used by the server-rendered pages. The JSON API also
/// accepts the same token as a bearer header.
pub const SESSION_COOKIE: &str = "pd_session";

/// Published on the session-event channel at login and logout.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn { user_id: String },
    SignedOut { user_id: String },
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random session token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage; only the hash ever touches the database.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Create a session row for a user and return the bearer token.
pub async fn create_session(
    pool: &SqlitePool,
    user_id: &str,
    ttl_days: i64,
) -> Result<String, sqlx::Error> {
    let token = generate_token();
    let token_hash = hash_token(&token);
    // Same format as datetime('now') so the expiry comparison stays textual
    let expires_at = (chrono::Utc::now() + chrono::Duration::days(ttl_days))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    let session_id = uuid::Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO sessions (id, user_id, token_hash, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&session_id)
        .bind(user_id)
        .bind(&token_hash)
        .bind(&expires_at)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Delete the session behind a token. Returns the user id when a session
/// actually existed.
pub async fn destroy_session(pool: &SqlitePool, token: &str) -> Result<Option<String>, sqlx::Error> {
    let token_hash = hash_token(token);
    let session: Option<Session> = sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ?")
        .bind(&token_hash)
        .fetch_optional(pool)
        .await?;
    let Some(session) = session else {
        return Ok(None);
    };
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(&session.id)
        .execute(pool)
        .await?;
    Ok(Some(session.user_id))
}

/// Resolve a token into its user, rejecting expired sessions.
pub async fn get_current_user(pool: &SqlitePool, token: &str) -> Result<User, ApiError> {
    let token_hash = hash_token(token);
    let session: Option<Session> = sqlx::query_as(
        "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?;

    let session = session.ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&session.user_id)
        .fetch_optional(pool)
        .await?;

    user.ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))
}

/// Pull the token from the Authorization header or the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization").and_then(|h| h.to_str().ok()) {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }
    let jar = CookieJar::from_headers(headers);
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Sign-up endpoint: creates a client-role account.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if super::validation::validate_email(&request.email).is_err() {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if request.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    sqlx::query("INSERT INTO users (id, email, password_hash, role) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(&request.email)
        .bind(&password_hash)
        .bind(ROLE_CLIENT)
        .execute(&state.db)
        .await?;

    tracing::info!("New account registered: {}", request.email);

    Ok(Json(UserResponse {
        id,
        email: request.email,
        role: ROLE_CLIENT.to_string(),
    }))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = create_session(&state.db, &user.id, state.config.auth.session_ttl_days).await?;

    let _ = state.session_events.send(SessionEvent::SignedIn {
        user_id: user.id.clone(),
    });

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// Logout endpoint: destroys the current session.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = extract_token(&headers).ok_or_else(|| ApiError::unauthorized("Not signed in"))?;
    if let Some(user_id) = destroy_session(&state.db, &token).await? {
        let _ = state.session_events.send(SessionEvent::SignedOut { user_id });
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Current-session endpoint
pub async fn session(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Middleware restricting a router to admin users.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    let user = get_current_user(&state.db, &token).await?;
    if user.role != ROLE_ADMIN {
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(next.run(request).await)
}

/// Extractor for the current authenticated user.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        get_current_user(&state.db, &token).await
    }
}

/// Create the bootstrap admin account on first startup.
pub async fn ensure_admin_user(pool: &SqlitePool, email: &str, password: &str) -> anyhow::Result<()> {
    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE role = ? LIMIT 1")
        .bind(ROLE_ADMIN)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let id = uuid::Uuid::new_v4().to_string();
    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("failed to hash admin password: {e}"))?;
    sqlx::query("INSERT INTO users (id, email, password_hash, role) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(email)
        .bind(&password_hash)
        .bind(ROLE_ADMIN)
        .execute(pool)
        .await?;

    tracing::info!("Created bootstrap admin user: {email}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn token_hashing_is_deterministic_and_opaque() {
        let a = hash_token("abc");
        let b = hash_token("abc");
        assert_eq!(a, b);
        assert_ne!(a, "abc");
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn sessions_resolve_to_their_user_until_destroyed() {
        let pool = db::init_test_pool().await;
        ensure_admin_user(&pool, "admin@test.local", "s3cret-pass").await.unwrap();
        let admin: User = sqlx::query_as("SELECT * FROM users WHERE role = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();

        let token = create_session(&pool, &admin.id, 7).await.unwrap();
        let user = get_current_user(&pool, &token).await.unwrap();
        assert_eq!(user.id, admin.id);

        let destroyed = destroy_session(&pool, &token).await.unwrap();
        assert_eq!(destroyed.as_deref(), Some(admin.id.as_str()));
        assert!(get_current_user(&pool, &token).await.is_err());
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected() {
        let pool = db::init_test_pool().await;
        ensure_admin_user(&pool, "admin@test.local", "s3cret-pass").await.unwrap();
        let admin: User = sqlx::query_as("SELECT * FROM users WHERE role = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();

        let token = create_session(&pool, &admin.id, -1).await.unwrap();
        assert!(get_current_user(&pool, &token).await.is_err());
    }

    #[tokio::test]
    async fn ensure_admin_user_is_idempotent() {
        let pool = db::init_test_pool().await;
        ensure_admin_user(&pool, "admin@test.local", "s3cret-pass").await.unwrap();
        ensure_admin_user(&pool, "other@test.local", "another-pass").await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
