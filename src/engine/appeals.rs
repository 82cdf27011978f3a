//! Appeal resolution: disputes against rejected or changes-requested
//! submissions, with SLA tracking and reversal bookkeeping against the
//! original reviewer.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::db::{
    Appeal, AppealDecision, AppealStatus, CreateAppeal, DbPool, DecideAppeal, Review,
    SubmissionStatus, WorkflowAction,
};
use crate::engine::history::{self, NewHistoryEntry};
use crate::engine::submissions::{lock_submission, set_status_on};
use crate::error::{Error, Result};

/// Days an appeal decision has before its SLA lapses.
const APPEAL_SLA_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AppealEngine {
    pool: DbPool,
}

impl AppealEngine {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open an appeal. Only the submission's author, and only against a
    /// rejected or changes-requested submission.
    pub async fn create(&self, appellant_id: Uuid, input: CreateAppeal) -> Result<Appeal> {
        let mut tx = self.pool.begin().await?;
        let submission = lock_submission(&mut tx, input.submission_id).await?;

        if submission.submitted_by != appellant_id {
            return Err(Error::Unauthorized(format!(
                "only the author may appeal submission {}",
                submission.id
            )));
        }
        if !submission.status.is_appealable() {
            return Err(Error::InvalidState(format!(
                "submission {} is {:?}, only rejected or changes_requested submissions can be appealed",
                submission.id, submission.status
            )));
        }

        if let Some(review_id) = input.original_review_id {
            let belongs: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM reviews WHERE id = $1 AND submission_id = $2)",
            )
            .bind(review_id)
            .bind(submission.id)
            .fetch_one(&mut *tx)
            .await?;
            if !belongs {
                return Err(Error::NotFound(format!(
                    "review {review_id} on submission {}",
                    submission.id
                )));
            }
        }

        let sla_deadline = Utc::now() + Duration::days(APPEAL_SLA_DAYS);
        let appeal = sqlx::query_as::<_, Appeal>(
            r#"
            INSERT INTO appeals
                (id, submission_id, appellant_id, appeal_type, reason,
                 original_review_id, sla_deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(submission.id)
        .bind(appellant_id)
        .bind(input.appeal_type)
        .bind(&input.reason)
        .bind(input.original_review_id)
        .bind(sla_deadline)
        .fetch_one(&mut *tx)
        .await?;

        history::record(
            &mut tx,
            NewHistoryEntry::new(
                submission.id,
                WorkflowAction::AppealSubmitted,
                appellant_id,
                format!("{:?} appeal submitted", input.appeal_type),
            )
            .details(serde_json::json!({
                "appeal_id": appeal.id,
                "appeal_type": input.appeal_type,
                "sla_deadline": sla_deadline,
            })),
        )
        .await?;

        tx.commit().await?;
        tracing::info!(appeal_id = %appeal.id, submission_id = %submission.id, "appeal submitted");
        Ok(appeal)
    }

    /// Decide an appeal. Overturned and remanded reopen the submission;
    /// overturned additionally counts a reversal against the original
    /// reviewer. Upheld and partially overturned leave the submission alone.
    pub async fn decide(
        &self,
        appeal_id: Uuid,
        decider_id: Uuid,
        input: DecideAppeal,
    ) -> Result<Appeal> {
        let mut tx = self.pool.begin().await?;

        let appeal = sqlx::query_as::<_, Appeal>("SELECT * FROM appeals WHERE id = $1 FOR UPDATE")
            .bind(appeal_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("appeal {appeal_id}")))?;

        match appeal.status {
            AppealStatus::Decided => {
                return Err(Error::InvalidState(format!(
                    "appeal {appeal_id} is already decided"
                )))
            }
            AppealStatus::Withdrawn => {
                return Err(Error::InvalidState(format!(
                    "appeal {appeal_id} was withdrawn"
                )))
            }
            _ => {}
        }

        let now = Utc::now();
        let sla_met = now <= appeal.sla_deadline;

        let updated = sqlx::query_as::<_, Appeal>(
            r#"
            UPDATE appeals
            SET status = 'decided', decision = $2, decided_by = $3, rationale = $4,
                sla_met = $5, decided_at = $6, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(appeal_id)
        .bind(input.decision)
        .bind(decider_id)
        .bind(&input.rationale)
        .bind(sla_met)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        match input.decision {
            AppealDecision::Overturned => {
                let submission = lock_submission(&mut tx, appeal.submission_id).await?;
                set_status_on(
                    &mut tx,
                    &submission,
                    SubmissionStatus::InReview,
                    decider_id,
                    WorkflowAction::StatusChanged,
                    "appeal overturned the decision, submission reopened".to_string(),
                )
                .await?;

                if let Some(review_id) = appeal.original_review_id {
                    let review =
                        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
                            .bind(review_id)
                            .fetch_optional(&mut *tx)
                            .await?
                            .ok_or_else(|| Error::NotFound(format!("review {review_id}")))?;
                    sqlx::query(
                        r#"
                        UPDATE reviewers
                        SET appeal_reversal_count = appeal_reversal_count + 1, updated_at = now()
                        WHERE id = $1
                        "#,
                    )
                    .bind(review.reviewer_id)
                    .execute(&mut *tx)
                    .await?;
                }
            }
            AppealDecision::Remanded => {
                let submission = lock_submission(&mut tx, appeal.submission_id).await?;
                set_status_on(
                    &mut tx,
                    &submission,
                    SubmissionStatus::InReview,
                    decider_id,
                    WorkflowAction::StatusChanged,
                    "appeal remanded the submission for re-review".to_string(),
                )
                .await?;
            }
            // Neither touches the submission; the appeal record and its
            // history entry are the whole outcome.
            AppealDecision::Upheld | AppealDecision::PartiallyOverturned => {}
        }

        history::record(
            &mut tx,
            NewHistoryEntry::new(
                appeal.submission_id,
                WorkflowAction::AppealDecided,
                decider_id,
                format!("appeal decided: {:?}", input.decision),
            )
            .details(serde_json::json!({
                "appeal_id": appeal_id,
                "decision": input.decision,
                "sla_met": sla_met,
            })),
        )
        .await?;

        tx.commit().await?;
        tracing::info!(appeal_id = %appeal_id, decision = ?input.decision, sla_met, "appeal decided");
        Ok(updated)
    }

    /// Appellant withdraws an undecided appeal.
    pub async fn withdraw(&self, appeal_id: Uuid, appellant_id: Uuid) -> Result<Appeal> {
        let mut tx = self.pool.begin().await?;

        let appeal = sqlx::query_as::<_, Appeal>("SELECT * FROM appeals WHERE id = $1 FOR UPDATE")
            .bind(appeal_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("appeal {appeal_id}")))?;

        if appeal.appellant_id != appellant_id {
            return Err(Error::Unauthorized(format!(
                "only the appellant may withdraw appeal {appeal_id}"
            )));
        }
        if matches!(appeal.status, AppealStatus::Decided | AppealStatus::Withdrawn) {
            return Err(Error::InvalidState(format!(
                "appeal {appeal_id} is {:?}",
                appeal.status
            )));
        }

        let updated = sqlx::query_as::<_, Appeal>(
            "UPDATE appeals SET status = 'withdrawn', updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(appeal_id)
        .fetch_one(&mut *tx)
        .await?;

        history::record(
            &mut tx,
            NewHistoryEntry::new(
                appeal.submission_id,
                WorkflowAction::AppealWithdrawn,
                appellant_id,
                "appeal withdrawn by appellant".to_string(),
            )
            .details(serde_json::json!({ "appeal_id": appeal_id })),
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn get(&self, appeal_id: Uuid) -> Result<Appeal> {
        sqlx::query_as::<_, Appeal>("SELECT * FROM appeals WHERE id = $1")
            .bind(appeal_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("appeal {appeal_id}")))
    }

    pub async fn list_for_submission(&self, submission_id: Uuid) -> Result<Vec<Appeal>> {
        let appeals = sqlx::query_as::<_, Appeal>(
            "SELECT * FROM appeals WHERE submission_id = $1 ORDER BY created_at DESC",
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(appeals)
    }
}
