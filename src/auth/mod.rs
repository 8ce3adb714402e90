/*!
 * Authentication
 * Caller identity, server-side sessions and capability checks
 */
pub mod guard;
pub mod session;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use std::convert::Infallible;

use crate::db::models::User;
use crate::AppState;

pub use guard::{Capability, Decision, DenyReason, Guard};
pub use session::{SessionManager, SessionToken, SESSION_COOKIE};

/// Who is calling: a live user row, or nobody.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    User(User),
}

impl Identity {
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::User(user) => Some(user),
            Identity::Anonymous => None,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }
}

/// Resolved once per request from the presented token. Never rejects:
/// a bad or missing token just yields `Identity::Anonymous`.
#[derive(Debug, Clone)]
pub struct CurrentIdentity {
    pub identity: Identity,
    pub token: Option<SessionToken>,
}

impl<S> FromRequestParts<S> for CurrentIdentity
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = extract_session_token(&parts.headers);
        let identity = state.sessions.current_identity(token.as_ref()).await;

        Ok(CurrentIdentity { identity, token })
    }
}

/// `Authorization: Bearer <token>` first, then the `session` cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Option<SessionToken> {
    extract_bearer_token(headers)
        .or_else(|| extract_cookie_token(headers))
        .filter(|t| !t.is_empty())
        .map(SessionToken::new)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
}

fn extract_cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            pair.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        })
}
