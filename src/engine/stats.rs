//! Aggregate workflow statistics for dashboards and compliance reporting.

use crate::db::{DbPool, StageCount, StatusCount, WorkflowStats};
use crate::error::Result;

#[derive(Clone)]
pub struct StatsEngine {
    pool: DbPool,
}

impl StatsEngine {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn overview(&self) -> Result<WorkflowStats> {
        let submissions_by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM submissions GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let submissions_by_stage = sqlx::query_as::<_, StageCount>(
            r#"
            SELECT current_stage AS stage, COUNT(*) AS count
            FROM submissions
            GROUP BY current_stage
            ORDER BY current_stage
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let reviewer_on_time_rate: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT SUM(reviews_on_time)::float8 / NULLIF(SUM(total_reviews_completed), 0)
            FROM reviewers
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let average_review_minutes: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(time_spent_minutes)::float8 FROM reviews WHERE status = 'completed'",
        )
        .fetch_one(&self.pool)
        .await?;

        let appeal_reversal_rate: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT AVG(CASE WHEN decision = 'overturned' THEN 1.0 ELSE 0.0 END)::float8
            FROM appeals
            WHERE status = 'decided'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(WorkflowStats {
            submissions_by_status,
            submissions_by_stage,
            reviewer_on_time_rate,
            average_review_minutes,
            appeal_reversal_rate,
        })
    }
}
