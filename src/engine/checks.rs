//! Automated check gateway: records plagiarism/accessibility runs and folds
//! their results back onto the submission as an advisory gate signal.
//! Nothing here blocks stage advancement; `auto_checks_passed` is stored for
//! human reviewers and calling policy layers to consult.

use chrono::Utc;
use uuid::Uuid;

use crate::db::{
    auto_checks_passed, AutomatedCheck, CheckKind, CheckOutcome, CheckStatus, DbPool,
    WorkflowAction,
};
use crate::engine::history::{self, NewHistoryEntry};
use crate::engine::submissions::lock_submission;
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct CheckGateway {
    pool: DbPool,
}

impl CheckGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open a pending check record for an external scanner to fill in.
    pub async fn request_check(
        &self,
        submission_id: Uuid,
        kind: CheckKind,
        requested_by: Uuid,
    ) -> Result<AutomatedCheck> {
        let mut tx = self.pool.begin().await?;

        // Fails early with NotFound rather than on the FK.
        lock_submission(&mut tx, submission_id).await?;

        let check = sqlx::query_as::<_, AutomatedCheck>(
            r#"
            INSERT INTO automated_checks (id, submission_id, kind, requested_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(submission_id)
        .bind(kind)
        .bind(requested_by)
        .fetch_one(&mut *tx)
        .await?;

        history::record(
            &mut tx,
            NewHistoryEntry::new(
                submission_id,
                WorkflowAction::CheckRequested,
                requested_by,
                format!("{kind:?} check requested"),
            )
            .details(serde_json::json!({ "check_id": check.id, "kind": kind })),
        )
        .await?;

        tx.commit().await?;
        Ok(check)
    }

    /// Scanner callback: close the check and write derived scores back onto
    /// the submission.
    pub async fn record_result(
        &self,
        check_id: Uuid,
        actor_id: Uuid,
        outcome: CheckOutcome,
    ) -> Result<AutomatedCheck> {
        let mut tx = self.pool.begin().await?;

        let check = sqlx::query_as::<_, AutomatedCheck>(
            "SELECT * FROM automated_checks WHERE id = $1 FOR UPDATE",
        )
        .bind(check_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("check {check_id}")))?;

        if !matches!(check.status, CheckStatus::Pending | CheckStatus::InProgress) {
            return Err(Error::InvalidState(format!(
                "check {} is {:?}, its result is already recorded",
                check_id, check.status
            )));
        }

        let result_json = serde_json::to_value(&outcome)
            .map_err(|e| Error::InvalidState(format!("unserializable check outcome: {e}")))?;
        let now = Utc::now();

        let updated = match &outcome {
            CheckOutcome::Plagiarism {
                similarity_score,
                sources_matched,
                needs_human_review,
            } => {
                if check.kind != CheckKind::Plagiarism {
                    return Err(Error::InvalidState(format!(
                        "check {} is a {:?} check, got a plagiarism result",
                        check_id, check.kind
                    )));
                }
                let updated = sqlx::query_as::<_, AutomatedCheck>(
                    r#"
                    UPDATE automated_checks
                    SET status = 'completed', result = $2, similarity_score = $3,
                        issues_found = $4, needs_human_review = $5, completed_at = $6
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(check_id)
                .bind(&result_json)
                .bind(similarity_score)
                .bind(sources_matched)
                .bind(needs_human_review)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;

                let submission = lock_submission(&mut tx, check.submission_id).await?;
                let gate = auto_checks_passed(Some(*similarity_score), submission.accessibility_passed);
                sqlx::query(
                    r#"
                    UPDATE submissions
                    SET plagiarism_checked = true, plagiarism_score = $2,
                        auto_checks_passed = $3, updated_at = now()
                    WHERE id = $1
                    "#,
                )
                .bind(submission.id)
                .bind(similarity_score)
                .bind(gate)
                .execute(&mut *tx)
                .await?;
                updated
            }
            CheckOutcome::Accessibility {
                score,
                issues_found,
                passed,
                needs_human_review,
            } => {
                if check.kind != CheckKind::Accessibility {
                    return Err(Error::InvalidState(format!(
                        "check {} is a {:?} check, got an accessibility result",
                        check_id, check.kind
                    )));
                }
                let updated = sqlx::query_as::<_, AutomatedCheck>(
                    r#"
                    UPDATE automated_checks
                    SET status = 'completed', result = $2, accessibility_score = $3,
                        issues_found = $4, needs_human_review = $5, completed_at = $6
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(check_id)
                .bind(&result_json)
                .bind(score)
                .bind(issues_found)
                .bind(needs_human_review)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;

                let submission = lock_submission(&mut tx, check.submission_id).await?;
                let gate = auto_checks_passed(submission.plagiarism_score, *passed);
                sqlx::query(
                    r#"
                    UPDATE submissions
                    SET accessibility_checked = true, accessibility_score = $2,
                        accessibility_passed = $3, auto_checks_passed = $4, updated_at = now()
                    WHERE id = $1
                    "#,
                )
                .bind(submission.id)
                .bind(score)
                .bind(passed)
                .bind(gate)
                .execute(&mut *tx)
                .await?;
                updated
            }
            // A failed run is terminal for the check record only; the
            // submission keeps moving through human stages without this gate.
            CheckOutcome::Failure { error } => {
                sqlx::query_as::<_, AutomatedCheck>(
                    r#"
                    UPDATE automated_checks
                    SET status = 'failed', result = $2, error = $3, completed_at = $4
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(check_id)
                .bind(&result_json)
                .bind(error)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        history::record(
            &mut tx,
            NewHistoryEntry::new(
                check.submission_id,
                WorkflowAction::CheckCompleted,
                actor_id,
                format!("{:?} check finished as {:?}", check.kind, updated.status),
            )
            .details(serde_json::json!({ "check_id": check_id, "outcome": result_json })),
        )
        .await?;

        tx.commit().await?;
        tracing::info!(check_id = %check_id, kind = ?check.kind, status = ?updated.status, "check result recorded");
        Ok(updated)
    }

    pub async fn list_for_submission(&self, submission_id: Uuid) -> Result<Vec<AutomatedCheck>> {
        let checks = sqlx::query_as::<_, AutomatedCheck>(
            "SELECT * FROM automated_checks WHERE submission_id = $1 ORDER BY created_at",
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(checks)
    }
}
