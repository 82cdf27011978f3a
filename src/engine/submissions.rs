//! Submission lifecycle: creation, submission, stage advancement and
//! terminal status handling. Every mutation locks the submission row and
//! commits together with its history entry.

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::{
    CreateSubmission, DbPool, ReviewStage, Submission, SubmissionFilter, SubmissionStatus,
    WorkflowAction,
};
use crate::engine::history::{self, NewHistoryEntry};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct SubmissionEngine {
    pool: DbPool,
}

impl SubmissionEngine {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a draft submission with its SLA deadline and content hash.
    pub async fn create(&self, actor_id: Uuid, input: CreateSubmission) -> Result<Submission> {
        let priority = input.priority.unwrap_or(crate::db::SubmissionPriority::Normal);
        let sla_deadline = Utc::now() + Duration::days(priority.sla_days());
        let content_hash = content_hash(&input.content_snapshot);

        let mut tx = self.pool.begin().await?;

        let submission = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions
                (id, content_type, content_id, community_id, submitted_by, version,
                 required_approvals, priority, sla_deadline, content_snapshot, content_hash)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, 1), COALESCE($7, 1), $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.content_type)
        .bind(input.content_id)
        .bind(input.community_id)
        .bind(actor_id)
        .bind(input.version)
        .bind(input.required_approvals)
        .bind(priority)
        .bind(sla_deadline)
        .bind(&input.content_snapshot)
        .bind(&content_hash)
        .fetch_one(&mut *tx)
        .await?;

        history::record(
            &mut tx,
            NewHistoryEntry::new(
                submission.id,
                WorkflowAction::SubmissionCreated,
                actor_id,
                format!("submission created for {} {}", submission.content_type, submission.content_id),
            )
            .details(serde_json::json!({
                "priority": priority,
                "sla_deadline": sla_deadline,
                "content_hash": content_hash,
            })),
        )
        .await?;

        tx.commit().await?;
        tracing::info!(submission_id = %submission.id, "submission created");
        Ok(submission)
    }

    /// Author submits (or resubmits after requested changes).
    pub async fn submit(&self, submission_id: Uuid, actor_id: Uuid) -> Result<Submission> {
        let mut tx = self.pool.begin().await?;
        let submission = lock_submission(&mut tx, submission_id).await?;

        if submission.submitted_by != actor_id {
            return Err(Error::Unauthorized(format!(
                "only the author may submit submission {submission_id}"
            )));
        }
        let new_status = match submission.status {
            SubmissionStatus::Draft => SubmissionStatus::Submitted,
            SubmissionStatus::ChangesRequested => SubmissionStatus::Resubmitted,
            other => {
                return Err(Error::InvalidState(format!(
                    "submission {submission_id} is {other:?}, expected draft or changes_requested"
                )))
            }
        };

        let updated = sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions
            SET status = $2, submitted_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(submission_id)
        .bind(new_status)
        .fetch_one(&mut *tx)
        .await?;

        history::record(
            &mut tx,
            NewHistoryEntry::new(
                submission_id,
                WorkflowAction::SubmittedForReview,
                actor_id,
                "submission sent for review",
            )
            .status_change(submission.status, new_status),
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Advance to the next stage in the fixed order.
    pub async fn advance_stage(&self, submission_id: Uuid, actor_id: Uuid) -> Result<Submission> {
        let mut tx = self.pool.begin().await?;
        let submission = lock_submission(&mut tx, submission_id).await?;
        let updated = advance_stage_on(&mut tx, &submission, actor_id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Generic transactional status write with its history entry.
    pub async fn set_status(
        &self,
        submission_id: Uuid,
        status: SubmissionStatus,
        actor_id: Uuid,
    ) -> Result<Submission> {
        let mut tx = self.pool.begin().await?;
        let submission = lock_submission(&mut tx, submission_id).await?;
        let updated = set_status_on(
            &mut tx,
            &submission,
            status,
            actor_id,
            WorkflowAction::StatusChanged,
            format!("status set to {status:?}"),
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Author withdraws the submission from review.
    pub async fn withdraw(&self, submission_id: Uuid, actor_id: Uuid) -> Result<Submission> {
        let mut tx = self.pool.begin().await?;
        let submission = lock_submission(&mut tx, submission_id).await?;

        if submission.submitted_by != actor_id {
            return Err(Error::Unauthorized(format!(
                "only the author may withdraw submission {submission_id}"
            )));
        }
        if submission.status.is_terminal() {
            return Err(Error::InvalidState(format!(
                "submission {submission_id} is already {:?}",
                submission.status
            )));
        }

        let updated = set_status_on(
            &mut tx,
            &submission,
            SubmissionStatus::Withdrawn,
            actor_id,
            WorkflowAction::SubmissionWithdrawn,
            "submission withdrawn by author".to_string(),
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn get(&self, submission_id: Uuid) -> Result<Submission> {
        sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1")
            .bind(submission_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("submission {submission_id}")))
    }

    pub async fn list(&self, filter: SubmissionFilter) -> Result<Vec<Submission>> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE ($1::submission_status IS NULL OR status = $1)
              AND ($2::review_stage IS NULL OR current_stage = $2)
              AND ($3::uuid IS NULL OR community_id = $3)
              AND ($4::uuid IS NULL OR submitted_by = $4)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status)
        .bind(filter.stage)
        .bind(filter.community_id)
        .bind(filter.submitted_by)
        .fetch_all(&self.pool)
        .await?;
        Ok(submissions)
    }
}

/// sha256 over the canonical JSON of the snapshot, kept for integrity
/// comparison across versions.
pub(crate) fn content_hash(snapshot: &serde_json::Value) -> String {
    let bytes = serde_json::to_vec(snapshot).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

/// Read a submission row for update inside the caller's transaction.
pub(crate) async fn lock_submission(
    conn: &mut PgConnection,
    submission_id: Uuid,
) -> Result<Submission> {
    sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1 FOR UPDATE")
        .bind(submission_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("submission {submission_id}")))
}

/// Advance an already-locked submission: push the old stage onto
/// `completed_stages`, reset approvals to zero, status `in_review`.
pub(crate) async fn advance_stage_on(
    conn: &mut PgConnection,
    submission: &Submission,
    actor_id: Uuid,
) -> Result<Submission> {
    let next: ReviewStage = submission.current_stage.next().ok_or_else(|| {
        Error::InvalidState(format!(
            "submission {} is already at final_approval",
            submission.id
        ))
    })?;

    let updated = sqlx::query_as::<_, Submission>(
        r#"
        UPDATE submissions
        SET current_stage = $2,
            completed_stages = array_append(completed_stages, $3),
            current_approvals = 0,
            status = 'in_review',
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(submission.id)
    .bind(next)
    .bind(submission.current_stage)
    .fetch_one(&mut *conn)
    .await?;

    history::record(
        conn,
        NewHistoryEntry::new(
            submission.id,
            WorkflowAction::StageAdvanced,
            actor_id,
            format!("advanced from {:?} to {:?}", submission.current_stage, next),
        )
        .status_change(submission.status, SubmissionStatus::InReview)
        .stage_change(submission.current_stage, next),
    )
    .await?;

    Ok(updated)
}

/// Write a new status on an already-locked submission. Entering a terminal
/// status stamps `completed_at`; leaving one clears it.
pub(crate) async fn set_status_on(
    conn: &mut PgConnection,
    submission: &Submission,
    status: SubmissionStatus,
    actor_id: Uuid,
    action: WorkflowAction,
    description: String,
) -> Result<Submission> {
    let updated = sqlx::query_as::<_, Submission>(
        r#"
        UPDATE submissions
        SET status = $2,
            completed_at = CASE WHEN $3 THEN now() ELSE NULL END,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(submission.id)
    .bind(status)
    .bind(status.is_terminal())
    .fetch_one(&mut *conn)
    .await?;

    history::record(
        conn,
        NewHistoryEntry::new(submission.id, action, actor_id, description)
            .status_change(submission.status, status),
    )
    .await?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable_and_version_sensitive() {
        let a = serde_json::json!({"title": "Intro to Fractions", "blocks": [1, 2, 3]});
        let b = serde_json::json!({"title": "Intro to Fractions", "blocks": [1, 2, 4]});
        assert_eq!(content_hash(&a), content_hash(&a));
        assert_ne!(content_hash(&a), content_hash(&b));
        assert_eq!(content_hash(&a).len(), 64);
    }
}
