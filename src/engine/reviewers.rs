//! Reviewer registry: identity, capacity and performance bookkeeping.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::{
    DbPool, EligibleReviewerFilter, RegisterReviewer, Reviewer, ReviewerStatus,
};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct ReviewerRegistry {
    pool: DbPool,
}

impl ReviewerRegistry {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register a new reviewer in `pending` status.
    pub async fn register(&self, input: RegisterReviewer) -> Result<Reviewer> {
        let reviewer = sqlx::query_as::<_, Reviewer>(
            r#"
            INSERT INTO reviewers (id, user_id, community_id, specialization, max_active_reviews)
            VALUES ($1, $2, $3, $4, COALESCE($5, 5))
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(input.community_id)
        .bind(input.specialization)
        .bind(input.max_active_reviews)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return Error::ConflictingAssignment(format!(
                        "user {} is already registered as a {:?}",
                        input.user_id, input.specialization
                    ));
                }
            }
            Error::from(e)
        })?;

        tracing::info!(reviewer_id = %reviewer.id, user_id = %reviewer.user_id, "reviewer registered");
        Ok(reviewer)
    }

    /// Move a pending reviewer to `active`, recording who approved them.
    pub async fn activate(&self, reviewer_id: Uuid, approver_id: Uuid) -> Result<Reviewer> {
        let mut tx = self.pool.begin().await?;

        let reviewer = lock_reviewer(&mut tx, reviewer_id).await?;
        if reviewer.status != ReviewerStatus::Pending {
            return Err(Error::InvalidState(format!(
                "reviewer {} is {:?}, only pending reviewers can be activated",
                reviewer_id, reviewer.status
            )));
        }

        let reviewer = sqlx::query_as::<_, Reviewer>(
            r#"
            UPDATE reviewers
            SET status = 'active', activated_by = $2, activated_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(reviewer_id)
        .bind(approver_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reviewer)
    }

    pub async fn get(&self, reviewer_id: Uuid) -> Result<Reviewer> {
        sqlx::query_as::<_, Reviewer>("SELECT * FROM reviewers WHERE id = $1")
            .bind(reviewer_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("reviewer {reviewer_id}")))
    }

    pub async fn set_availability(&self, reviewer_id: Uuid, available: bool) -> Result<Reviewer> {
        sqlx::query_as::<_, Reviewer>(
            "UPDATE reviewers SET is_available = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(reviewer_id)
        .bind(available)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("reviewer {reviewer_id}")))
    }

    /// Atomically adjust `current_active_reviews`, refusing to leave [0, max].
    pub async fn adjust_active_count(&self, reviewer_id: Uuid, delta: i32) -> Result<Reviewer> {
        let mut conn = self.pool.acquire().await?;
        adjust_active_count_on(&mut conn, reviewer_id, delta).await
    }

    /// Reviewers who could take on new work, best-ranked first.
    pub async fn list_eligible(&self, filter: EligibleReviewerFilter) -> Result<Vec<Reviewer>> {
        let reviewers = sqlx::query_as::<_, Reviewer>(
            r#"
            SELECT * FROM reviewers
            WHERE status = 'active'
              AND is_available
              AND current_active_reviews < max_active_reviews
              AND ($1::reviewer_specialization IS NULL OR specialization = $1)
              AND ($2::uuid IS NULL OR community_id IS NULL OR community_id = $2)
            ORDER BY total_reviews_completed DESC, average_quality_score DESC NULLS LAST
            "#,
        )
        .bind(filter.specialization)
        .bind(filter.community_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviewers)
    }
}

/// Read a reviewer row for update inside the caller's transaction.
pub(crate) async fn lock_reviewer(conn: &mut PgConnection, reviewer_id: Uuid) -> Result<Reviewer> {
    sqlx::query_as::<_, Reviewer>("SELECT * FROM reviewers WHERE id = $1 FOR UPDATE")
        .bind(reviewer_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("reviewer {reviewer_id}")))
}

/// Guarded single-statement counter adjustment; the WHERE clause keeps the
/// result inside [0, max] so concurrent callers can never lose an update.
pub(crate) async fn adjust_active_count_on(
    conn: &mut PgConnection,
    reviewer_id: Uuid,
    delta: i32,
) -> Result<Reviewer> {
    let updated = sqlx::query_as::<_, Reviewer>(
        r#"
        UPDATE reviewers
        SET current_active_reviews = current_active_reviews + $2, updated_at = now()
        WHERE id = $1
          AND current_active_reviews + $2 >= 0
          AND current_active_reviews + $2 <= max_active_reviews
        RETURNING *
        "#,
    )
    .bind(reviewer_id)
    .bind(delta)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(reviewer) => Ok(reviewer),
        None => {
            let reviewer = sqlx::query_as::<_, Reviewer>("SELECT * FROM reviewers WHERE id = $1")
                .bind(reviewer_id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| Error::NotFound(format!("reviewer {reviewer_id}")))?;
            if delta > 0 {
                Err(Error::CapacityExceeded(format!(
                    "reviewer {} has {} of {} active reviews",
                    reviewer_id, reviewer.current_active_reviews, reviewer.max_active_reviews
                )))
            } else {
                Err(Error::InvalidState(format!(
                    "active review count for reviewer {} cannot go below zero",
                    reviewer_id
                )))
            }
        }
    }
}
