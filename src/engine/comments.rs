//! Threaded, severity-tagged annotations attached to a review.

use uuid::Uuid;

use crate::db::{
    AddComment, CommentSeverity, CommentStatus, CommentType, DbPool, ReviewComment,
};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct CommentEngine {
    pool: DbPool,
}

impl CommentEngine {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn add(
        &self,
        review_id: Uuid,
        author_id: Uuid,
        input: AddComment,
    ) -> Result<ReviewComment> {
        let mut tx = self.pool.begin().await?;

        let review_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM reviews WHERE id = $1)")
                .bind(review_id)
                .fetch_one(&mut *tx)
                .await?;
        if !review_exists {
            return Err(Error::NotFound(format!("review {review_id}")));
        }

        let thread_depth = match input.parent_id {
            Some(parent_id) => {
                let parent = sqlx::query_as::<_, ReviewComment>(
                    "SELECT * FROM review_comments WHERE id = $1",
                )
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| Error::NotFound(format!("parent comment {parent_id}")))?;
                if parent.review_id != review_id {
                    return Err(Error::InvalidState(format!(
                        "parent comment {parent_id} belongs to a different review"
                    )));
                }
                parent.thread_depth + 1
            }
            None => 0,
        };

        let comment = sqlx::query_as::<_, ReviewComment>(
            r#"
            INSERT INTO review_comments
                (id, review_id, author_id, location, severity, comment_type, body,
                 parent_id, thread_depth)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(review_id)
        .bind(author_id)
        .bind(&input.location)
        .bind(input.severity.unwrap_or(CommentSeverity::Suggestion))
        .bind(input.comment_type.unwrap_or(CommentType::General))
        .bind(&input.body)
        .bind(input.parent_id)
        .bind(thread_depth)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(comment)
    }

    pub async fn resolve(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
        note: Option<String>,
    ) -> Result<ReviewComment> {
        let mut tx = self.pool.begin().await?;

        let comment = sqlx::query_as::<_, ReviewComment>(
            "SELECT * FROM review_comments WHERE id = $1 FOR UPDATE",
        )
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("comment {comment_id}")))?;

        if comment.status == CommentStatus::Resolved {
            return Err(Error::InvalidState(format!(
                "comment {comment_id} is already resolved"
            )));
        }

        let updated = sqlx::query_as::<_, ReviewComment>(
            r#"
            UPDATE review_comments
            SET status = 'resolved', resolved_by = $2, resolution_note = $3, resolved_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(comment_id)
        .bind(user_id)
        .bind(&note)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Thread order: roots first by age, replies nested under their parents
    /// by depth.
    pub async fn list_for_review(&self, review_id: Uuid) -> Result<Vec<ReviewComment>> {
        let comments = sqlx::query_as::<_, ReviewComment>(
            r#"
            SELECT * FROM review_comments
            WHERE review_id = $1
            ORDER BY COALESCE(parent_id, id), thread_depth, created_at
            "#,
        )
        .bind(review_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }
}
