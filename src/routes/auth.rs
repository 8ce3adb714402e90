/**
 * Authentication Routes
 * Registration, login and logout over server-side sessions
 */
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::guard::MEMBER;
use crate::auth::session::{clear_session_cookie, session_cookie};
use crate::auth::{CurrentIdentity, SessionToken};
use crate::db::models::User;
use crate::error::AppError;
use crate::routes::{json_body, require_non_empty, SuccessResponse};
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User info returned to the frontend
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserInfo,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub is_anonymous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

// ============================================================================
// Validation
// ============================================================================

fn validate_email(email: &str) -> Result<(), AppError> {
    require_non_empty(email, "Email")?;
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }
    Ok(())
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        require_non_empty(&self.password, "Password")?;
        require_non_empty(&self.name, "Name")
    }
}

impl LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        require_non_empty(&self.password, "Password")
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn user_info(state: &AppState, user: &User) -> UserInfo {
    UserInfo {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        is_admin: state.guard.is_admin(user),
    }
}

fn session_response(
    status: StatusCode,
    state: &AppState,
    user: &User,
    token: SessionToken,
) -> Response {
    let cookie = session_cookie(&token, state.secure_cookies);
    let body = AuthResponse {
        success: true,
        user: user_info(state, user),
        token: token.as_str().to_string(),
    };

    (status, [(header::SET_COOKIE, cookie)], Json(body)).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/register
/// Create an account and log it in
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let payload = json_body(payload)?;
    payload.validate()?;

    let password_hash = state.credentials.hash_password(payload.password).await?;

    let user = state
        .repo
        .create_user(&payload.email, &password_hash, &payload.name)
        .await
        .inspect_err(|e| {
            if matches!(e, AppError::DuplicateEmail) {
                tracing::warn!(email = %payload.email, "registration for existing email");
            }
        })?;

    tracing::info!(user_id = user.id, email = %user.email, "user registered");

    let token = state.sessions.login(&user).await?;
    Ok(session_response(StatusCode::CREATED, &state, &user, token))
}

/// POST /api/auth/login
/// Unknown email and wrong password produce the same answer.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let payload = json_body(payload)?;
    payload.validate()?;

    let user = state.repo.find_user_by_email(&payload.email).await?;
    let password_ok = state
        .credentials
        .check_login(payload.password, user.as_ref().map(|u| u.password_hash.clone()))
        .await;

    let user = match user {
        Some(user) if password_ok => user,
        Some(user) => {
            tracing::warn!(user_id = user.id, "failed login attempt");
            return Err(AppError::InvalidCredentials);
        }
        None => {
            tracing::warn!(email = %payload.email, "login attempt for unknown user");
            return Err(AppError::InvalidCredentials);
        }
    };

    let token = state.sessions.login(&user).await?;
    tracing::info!(user_id = user.id, "successful login");

    Ok(session_response(StatusCode::OK, &state, &user, token))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentIdentity,
) -> Result<Response, AppError> {
    let user = state.guard.enforce(&current.identity, MEMBER)?;

    if let Some(token) = &current.token {
        state.sessions.logout(token).await?;
    }
    tracing::info!(user_id = user.id, "logged out");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(SuccessResponse { success: true }),
    )
        .into_response())
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, current: CurrentIdentity) -> Json<MeResponse> {
    Json(MeResponse {
        is_anonymous: current.identity.is_anonymous(),
        user: current.identity.user().map(|u| user_info(&state, u)),
    })
}
