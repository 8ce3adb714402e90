/**
 * Contact Route
 * Stores messages sent through the contact form
 */
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::NewContactMessage;
use crate::error::AppError;
use crate::routes::{json_body, require_non_empty};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/contact
pub async fn submit_contact(
    State(state): State<AppState>,
    payload: Result<Json<NewContactMessage>, JsonRejection>,
) -> Result<(StatusCode, Json<ContactResponse>), AppError> {
    let payload = json_body(payload)?;
    require_non_empty(&payload.name, "Name")?;
    require_non_empty(&payload.email, "Email")?;
    require_non_empty(&payload.message, "Message")?;

    let saved = state.repo.create_contact_message(&payload).await?;
    tracing::info!(contact_id = saved.id, "contact message received");

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            success: true,
            message: "Your message is delivered. We will get to you soon.".to_string(),
        }),
    ))
}
