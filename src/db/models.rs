//! Database Models - rows of the blog tables (used by sqlx/serde).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Registered account. The hash never leaves the server.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    /// Creation day, e.g. "October 14, 2026". Written once.
    pub date: String,
    pub body: String,
    pub img_url: String,
    pub author_id: i64,
}

/// Editable post columns, shared by create and edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFields {
    pub title: String,
    pub subtitle: String,
    pub img_url: String,
    pub body: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub author_id: i64,
    pub post_id: i64,
}

/// Listing row: a post joined with its author's name.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    pub author_name: String,
    pub date: String,
}

/// Comment joined with its author, as shown under a post.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub author_name: String,
    pub text: String,
    pub author_email: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub message: String,
}
