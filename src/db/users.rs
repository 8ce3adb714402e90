use super::models::User;
use super::{is_unique_violation, Repository};
use crate::error::AppError;

impl Repository {
    /// Exact match on the email as supplied.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, name FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    /// The UNIQUE constraint decides duplicates inside the insert itself,
    /// so two racing registrations for one email cannot both land.
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<User, AppError> {
        let mut tx = self.pool().begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name)
            VALUES (?, ?, ?)
            RETURNING id, email, password_hash, name
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateEmail
            } else {
                AppError::Database(e)
            }
        })?;

        tx.commit().await?;

        Ok(user)
    }

    pub async fn get_user_or_fail(&self, id: i64) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("SELECT id, email, password_hash, name FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(AppError::NotFound("User"))
    }
}
