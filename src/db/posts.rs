use chrono::NaiveDate;

use super::models::{BlogPost, PostFields, PostSummary};
use super::{is_foreign_key_violation, is_unique_violation, Repository};
use crate::error::AppError;

const POST_COLUMNS: &str = "id, title, subtitle, date, body, img_url, author_id";

/// "October 14, 2026"
pub fn format_post_date(day: NaiveDate) -> String {
    day.format("%B %d, %Y").to_string()
}

fn map_write_error(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::DuplicateTitle
    } else if is_foreign_key_violation(&e) {
        AppError::NotFound("User")
    } else {
        AppError::Database(e)
    }
}

impl Repository {
    /// Oldest first.
    pub async fn list_posts(&self) -> Result<Vec<BlogPost>, AppError> {
        let posts = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts ORDER BY id ASC"
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(posts)
    }

    pub async fn list_post_summaries(&self) -> Result<Vec<PostSummary>, AppError> {
        let rows = sqlx::query_as::<_, PostSummary>(
            r#"
            SELECT p.id, p.title, p.subtitle, u.name AS author_name, p.date
            FROM blog_posts p
            JOIN users u ON u.id = p.author_id
            ORDER BY p.id ASC
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    pub async fn get_post_or_fail(&self, id: i64) -> Result<BlogPost, AppError> {
        sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or(AppError::NotFound("Post"))
    }

    /// Dated today (UTC).
    pub async fn create_post(
        &self,
        fields: &PostFields,
        author_id: i64,
    ) -> Result<BlogPost, AppError> {
        let today = chrono::Utc::now().date_naive();
        self.create_post_dated(fields, author_id, today).await
    }

    pub async fn create_post_dated(
        &self,
        fields: &PostFields,
        author_id: i64,
        day: NaiveDate,
    ) -> Result<BlogPost, AppError> {
        let mut tx = self.pool().begin().await?;

        let post = sqlx::query_as::<_, BlogPost>(&format!(
            r#"
            INSERT INTO blog_posts (title, subtitle, date, body, img_url, author_id)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&fields.title)
        .bind(&fields.subtitle)
        .bind(format_post_date(day))
        .bind(&fields.body)
        .bind(&fields.img_url)
        .bind(author_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;

        Ok(post)
    }

    /// Replaces the editable columns. `author_id` reassigns the post when
    /// given; the publication date is left alone.
    pub async fn update_post(
        &self,
        id: i64,
        fields: &PostFields,
        author_id: Option<i64>,
    ) -> Result<BlogPost, AppError> {
        let mut tx = self.pool().begin().await?;

        let post = sqlx::query_as::<_, BlogPost>(&format!(
            r#"
            UPDATE blog_posts
            SET title = ?, subtitle = ?, body = ?, img_url = ?,
                author_id = COALESCE(?, author_id)
            WHERE id = ?
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&fields.title)
        .bind(&fields.subtitle)
        .bind(&fields.body)
        .bind(&fields.img_url)
        .bind(author_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_write_error)?
        .ok_or(AppError::NotFound("Post"))?;

        tx.commit().await?;

        Ok(post)
    }

    /// Removes the post and every comment under it in one transaction.
    /// Returns how many comments went with it.
    pub async fn delete_post(&self, id: i64) -> Result<u64, AppError> {
        let mut tx = self.pool().begin().await?;

        let comments = sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound("Post"));
        }

        tx.commit().await?;

        Ok(comments)
    }
}
