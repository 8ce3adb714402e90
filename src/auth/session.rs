use rand::distr::{Alphanumeric, SampleString};
use sha2::{Digest, Sha256};
use std::fmt;

use super::Identity;
use crate::db::models::User;
use crate::db::{unix_timestamp, Repository};
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "session";

const TOKEN_LEN: usize = 64;

/// Opaque value a client presents to re-assert its login.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// Server-side session table: SHA-256(token) -> user id. Holds no user
/// columns; every resolution reads the user row fresh.
#[derive(Debug, Clone)]
pub struct SessionManager {
    repo: Repository,
}

fn generate_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), TOKEN_LEN)
}

/// Only the digest is stored, so a leaked table cannot be replayed.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl SessionManager {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn login(&self, user: &User) -> Result<SessionToken, AppError> {
        let token = generate_token();

        sqlx::query("INSERT INTO sessions (token_hash, user_id, created_at) VALUES (?, ?, ?)")
            .bind(hash_token(&token))
            .bind(user.id)
            .bind(unix_timestamp())
            .execute(self.repo.pool())
            .await?;

        tracing::info!(user_id = user.id, "session established");

        Ok(SessionToken(token))
    }

    /// Returns whether a live session was removed.
    pub async fn logout(&self, token: &SessionToken) -> Result<bool, AppError> {
        let removed = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(token.as_str()))
            .execute(self.repo.pool())
            .await?
            .rows_affected();

        Ok(removed > 0)
    }

    /// Fails open: unknown tokens, deleted users and storage errors all
    /// resolve to `Identity::Anonymous`.
    pub async fn current_identity(&self, token: Option<&SessionToken>) -> Identity {
        let Some(token) = token else {
            return Identity::Anonymous;
        };

        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.password_hash, u.name
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = ?
            "#,
        )
        .bind(hash_token(token.as_str()))
        .fetch_optional(self.repo.pool())
        .await;

        match row {
            Ok(Some(user)) => Identity::User(user),
            Ok(None) => {
                tracing::debug!("session token did not resolve to a user");
                Identity::Anonymous
            }
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed; treating caller as anonymous");
                Identity::Anonymous
            }
        }
    }
}

/// `Set-Cookie` value carrying the token.
pub fn session_cookie(token: &SessionToken, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={}; HttpOnly; SameSite=Lax; Path=/",
        token.as_str()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}
