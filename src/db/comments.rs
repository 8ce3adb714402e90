use super::models::{Comment, CommentView};
use super::Repository;
use crate::error::AppError;

impl Repository {
    /// Creation order.
    pub async fn list_comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT id, text, author_id, post_id FROM comments WHERE post_id = ? ORDER BY id ASC",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await?;

        Ok(comments)
    }

    pub async fn list_comment_views(&self, post_id: i64) -> Result<Vec<CommentView>, AppError> {
        let rows = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT u.name AS author_name, c.text, u.email AS author_email
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = ?
            ORDER BY c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Inserts only when both the author and the post exist; the existence
    /// check and the insert are one statement.
    pub async fn create_comment(
        &self,
        text: &str,
        author_id: i64,
        post_id: i64,
    ) -> Result<Comment, AppError> {
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (text, author_id, post_id)
            SELECT ?, u.id, p.id
            FROM users u, blog_posts p
            WHERE u.id = ? AND p.id = ?
            RETURNING id, text, author_id, post_id
            "#,
        )
        .bind(text)
        .bind(author_id)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(comment) = inserted else {
            tx.rollback().await?;
            return Err(self.missing_comment_target(author_id).await?);
        };

        tx.commit().await?;

        Ok(comment)
    }

    async fn missing_comment_target(&self, author_id: i64) -> Result<AppError, AppError> {
        let user_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(author_id)
            .fetch_one(self.pool())
            .await?
            > 0;

        Ok(if user_exists {
            AppError::NotFound("Post")
        } else {
            AppError::NotFound("User")
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::models::PostFields;
    use crate::db::test_repo;
    use crate::error::AppError;

    async fn seeded() -> (crate::db::Repository, i64, i64) {
        let repo = test_repo().await;
        let user = repo.create_user("a@x.com", "h", "Alice").await.unwrap();
        let post = repo
            .create_post(
                &PostFields {
                    title: "Hello".into(),
                    subtitle: "s".into(),
                    img_url: "https://x.com/i.png".into(),
                    body: "b".into(),
                },
                user.id,
            )
            .await
            .unwrap();
        (repo, user.id, post.id)
    }

    async fn comment_count(repo: &crate::db::Repository) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(repo.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_comments_listed_in_creation_order() {
        let (repo, user_id, post_id) = seeded().await;
        repo.create_comment("first", user_id, post_id).await.unwrap();
        repo.create_comment("second", user_id, post_id).await.unwrap();

        let texts: Vec<String> = repo
            .list_comments_for_post(post_id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);

        let views = repo.list_comment_views(post_id).await.unwrap();
        assert_eq!(views[0].author_name, "Alice");
        assert_eq!(views[0].author_email, "a@x.com");
    }

    #[tokio::test]
    async fn test_comment_on_missing_post_inserts_nothing() {
        let (repo, user_id, _) = seeded().await;
        let err = repo.create_comment("lost", user_id, 999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("Post")));
        assert_eq!(comment_count(&repo).await, 0);
    }

    #[tokio::test]
    async fn test_comment_by_missing_user_inserts_nothing() {
        let (repo, _, post_id) = seeded().await;
        let err = repo.create_comment("ghost", 999, post_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("User")));
        assert_eq!(comment_count(&repo).await, 0);
    }

    #[tokio::test]
    async fn test_comments_scoped_to_post() {
        let (repo, user_id, post_id) = seeded().await;
        repo.create_comment("here", user_id, post_id).await.unwrap();
        assert!(repo.list_comments_for_post(post_id + 1).await.unwrap().is_empty());
    }
}
