//! Bearer-token resolution.
//!
//! Signup, login, and password handling live in the platform's auth
//! service; the relay only resolves the bearer token it is handed. The one
//! distinction that matters here: a token whose session is gone or expired
//! is merely unauthorized, but a live session pointing at a deleted or
//! deactivated account is a stale identity and must surface as such.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid or expired session")]
    InvalidSession,
    #[error("user no longer exists")]
    UserNotFound,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Identity snapshot taken at send time and denormalized into the message.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_id: String,
    pub username: String,
    pub avatar: Option<String>,
}

pub struct AuthManager {
    pool: SqlitePool,
}

impl AuthManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve a bearer token to the account behind it.
    pub async fn resolve_bearer(&self, token: &str) -> Result<UserIdentity, AuthError> {
        let session: Option<(String, String)> =
            sqlx::query_as("SELECT user_id, expires_at FROM sessions WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;

        let (user_id, expires_at) = session.ok_or(AuthError::InvalidSession)?;
        let expires: DateTime<Utc> = expires_at
            .parse()
            .map_err(|_| AuthError::InvalidSession)?;
        if expires <= Utc::now() {
            return Err(AuthError::InvalidSession);
        }

        let user: Option<(String, Option<String>, i64)> =
            sqlx::query_as("SELECT username, avatar, is_active FROM users WHERE id = ?")
                .bind(&user_id)
                .fetch_optional(&self.pool)
                .await?;

        match user {
            Some((username, avatar, active)) if active != 0 => Ok(UserIdentity {
                user_id,
                username,
                avatar,
            }),
            _ => {
                warn!("[Auth] live session for missing account {}", user_id);
                Err(AuthError::UserNotFound)
            }
        }
    }
}
