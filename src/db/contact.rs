use super::models::{ContactMessage, NewContactMessage};
use super::{unix_timestamp, Repository};
use crate::error::AppError;

impl Repository {
    pub async fn create_contact_message(
        &self,
        message: &NewContactMessage,
    ) -> Result<ContactMessage, AppError> {
        let row = sqlx::query_as::<_, ContactMessage>(
            r#"
            INSERT INTO contact_messages (name, email, phone, message, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, name, email, phone, message, created_at
            "#,
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.phone)
        .bind(&message.message)
        .bind(unix_timestamp())
        .fetch_one(self.pool())
        .await?;

        Ok(row)
    }
}
