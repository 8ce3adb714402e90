/**
 * Blog Routes
 * Post listing, single-post view with comments, admin post management
 */
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::guard::{MEMBER, PUBLISH};
use crate::auth::CurrentIdentity;
use crate::db::models::{BlogPost, Comment, CommentView, PostFields, PostSummary};
use crate::error::AppError;
use crate::routes::{json_body, require_non_empty};
use crate::sanitize::sanitize_comment;
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for GET /api/posts
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListResponse {
    pub is_anonymous: bool,
    pub posts: Vec<PostSummary>,
}

/// Response for GET /api/posts/{id}
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub img_url: String,
    pub date: String,
    pub author_name: String,
    pub is_anonymous: bool,
    pub is_owner_or_admin: bool,
    /// Edit and delete controls; admin only.
    pub can_edit: bool,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted_comments: u64,
}

// ============================================================================
// Validation
// ============================================================================

lazy_static::lazy_static! {
    /// Absolute http(s) URL with a host and no whitespace
    static ref IMAGE_URL_REGEX: Regex =
        Regex::new(r"^https?://[A-Za-z0-9\-._~%]+(?::\d+)?(?:[/?#]\S*)?$").unwrap();
}

fn is_valid_image_url(url: &str) -> bool {
    IMAGE_URL_REGEX.is_match(url)
}

/// Checks the fields and trims the image URL in place, so the stored value
/// is the one that was validated.
fn validate_post(fields: &mut PostFields) -> Result<(), AppError> {
    require_non_empty(&fields.title, "Title")?;
    require_non_empty(&fields.subtitle, "Subtitle")?;
    require_non_empty(&fields.body, "Body")?;
    fields.img_url = fields.img_url.trim().to_string();
    require_non_empty(&fields.img_url, "Image URL")?;
    if !is_valid_image_url(&fields.img_url) {
        return Err(AppError::Validation("Image URL must be a valid URL".to_string()));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/posts - All posts, oldest first
pub async fn list_posts(
    State(state): State<AppState>,
    current: CurrentIdentity,
) -> Result<Json<PostListResponse>, AppError> {
    let posts = state.repo.list_post_summaries().await?;

    Ok(Json(PostListResponse {
        is_anonymous: current.identity.is_anonymous(),
        posts,
    }))
}

/// GET /api/posts/{id} - One post with its comments
pub async fn show_post(
    State(state): State<AppState>,
    current: CurrentIdentity,
    Path(id): Path<i64>,
) -> Result<Json<PostView>, AppError> {
    let post = state.repo.get_post_or_fail(id).await?;
    let author = state.repo.get_user_or_fail(post.author_id).await?;
    let comments = state.repo.list_comment_views(post.id).await?;

    Ok(Json(PostView {
        is_owner_or_admin: state.guard.is_owner_or_admin(&current.identity, post.author_id),
        can_edit: state.guard.can_publish(&current.identity),
        is_anonymous: current.identity.is_anonymous(),
        id: post.id,
        title: post.title,
        subtitle: post.subtitle,
        body: post.body,
        img_url: post.img_url,
        date: post.date,
        author_name: author.name,
        comments,
    }))
}

/// POST /api/posts - Create a post (admin only)
pub async fn create_post(
    State(state): State<AppState>,
    current: CurrentIdentity,
    payload: Result<Json<PostFields>, JsonRejection>,
) -> Result<(StatusCode, Json<BlogPost>), AppError> {
    let user = state.guard.enforce(&current.identity, PUBLISH)?;
    let mut payload = json_body(payload)?;
    validate_post(&mut payload)?;

    let post = state.repo.create_post(&payload, user.id).await?;
    tracing::info!(post_id = post.id, user_id = user.id, "post created");

    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/posts/{id} - Replace a post's content (admin only).
/// The editor becomes the post's author.
pub async fn edit_post(
    State(state): State<AppState>,
    current: CurrentIdentity,
    Path(id): Path<i64>,
    payload: Result<Json<PostFields>, JsonRejection>,
) -> Result<Json<BlogPost>, AppError> {
    let user = state.guard.enforce(&current.identity, PUBLISH)?;
    let mut payload = json_body(payload)?;
    validate_post(&mut payload)?;

    let post = state.repo.update_post(id, &payload, Some(user.id)).await?;
    tracing::info!(post_id = post.id, user_id = user.id, "post updated");

    Ok(Json(post))
}

/// DELETE /api/posts/{id} - Delete a post and its comments (admin only)
pub async fn delete_post(
    State(state): State<AppState>,
    current: CurrentIdentity,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.guard.enforce(&current.identity, PUBLISH)?;

    let deleted_comments = state.repo.delete_post(id).await?;
    tracing::info!(post_id = id, user_id = user.id, deleted_comments, "post deleted");

    Ok(Json(DeleteResponse {
        success: true,
        deleted_comments,
    }))
}

/// POST /api/posts/{id}/comments - Comment on a post (login required)
pub async fn add_comment(
    State(state): State<AppState>,
    current: CurrentIdentity,
    Path(post_id): Path<i64>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let user = state.guard.enforce(&current.identity, MEMBER)?;
    let payload = json_body(payload)?;

    let text = sanitize_comment(&payload.text);
    require_non_empty(&text, "Comment")?;

    let comment = state.repo.create_comment(&text, user.id, post_id).await?;
    tracing::debug!(comment_id = comment.id, post_id, user_id = user.id, "comment added");

    Ok((StatusCode::CREATED, Json(comment)))
}
