//! Review assignment and decision handling.
//!
//! `submit` is the concurrency-sensitive path: two reviewers finishing
//! reviews of the same submission race on `current_approvals` and on the
//! status/stage transition, so the whole sequence (complete the review,
//! release reviewer capacity, count the approval, advance or terminate) runs
//! in one transaction with the submission row locked for update.
//!
//! Lock order is the same everywhere (review row, then submission, then
//! reviewer) so concurrent assign/start/decline/submit calls on the same
//! submission and reviewer cannot deadlock each other.

use chrono::{Duration, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::{
    AssignReview, DbPool, Review, ReviewDecision, ReviewStage, ReviewStatus, ReviewType,
    Reviewer, ReviewerStatus, SubmitReview, Submission, SubmissionStatus, WorkflowAction,
};
use crate::engine::history::{self, NewHistoryEntry};
use crate::engine::reviewers;
use crate::engine::submissions::{advance_stage_on, lock_submission, set_status_on};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct ReviewEngine {
    pool: DbPool,
}

impl ReviewEngine {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Reviewers who could take this review: right specialization, active,
    /// available, under capacity, not the author, not already involved with
    /// this submission for this review type. Best-ranked first.
    pub async fn find_eligible_reviewers(
        &self,
        submission_id: Uuid,
        review_type: ReviewType,
    ) -> Result<Vec<Reviewer>> {
        let submission =
            sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1")
                .bind(submission_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound(format!("submission {submission_id}")))?;

        let reviewers = sqlx::query_as::<_, Reviewer>(
            r#"
            SELECT r.* FROM reviewers r
            WHERE r.specialization = $1
              AND r.status = 'active'
              AND r.is_available
              AND r.current_active_reviews < r.max_active_reviews
              AND r.user_id <> $2
              AND ($3::uuid IS NULL OR r.community_id IS NULL OR r.community_id = $3)
              AND NOT EXISTS (
                  SELECT 1 FROM reviews v
                  WHERE v.submission_id = $4
                    AND v.reviewer_id = r.id
                    AND v.review_type = $5
                    AND v.status IN ('assigned', 'in_progress', 'completed')
              )
            ORDER BY r.total_reviews_completed DESC, r.average_quality_score DESC NULLS LAST
            "#,
        )
        .bind(review_type.required_specialization())
        .bind(submission.submitted_by)
        .bind(submission.community_id)
        .bind(submission_id)
        .bind(review_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviewers)
    }

    /// Assign a reviewer, claiming one unit of their capacity atomically.
    pub async fn assign(&self, actor_id: Uuid, input: AssignReview) -> Result<Review> {
        let mut tx = self.pool.begin().await?;

        let submission = lock_submission(&mut tx, input.submission_id).await?;
        let reviewer = reviewers::lock_reviewer(&mut tx, input.reviewer_id).await?;

        if reviewer.status != ReviewerStatus::Active {
            return Err(Error::InvalidState(format!(
                "reviewer {} is {:?}, not active",
                reviewer.id, reviewer.status
            )));
        }
        if reviewer.user_id == submission.submitted_by {
            return Err(Error::SelfReviewForbidden(format!(
                "reviewer {} authored submission {}",
                reviewer.id, submission.id
            )));
        }

        let duplicate: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reviews
                WHERE submission_id = $1 AND reviewer_id = $2 AND review_type = $3
                  AND status IN ('assigned', 'in_progress')
            )
            "#,
        )
        .bind(submission.id)
        .bind(reviewer.id)
        .bind(input.review_type)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(Error::ConflictingAssignment(format!(
                "reviewer {} already holds an active {:?} review of submission {}",
                reviewer.id, input.review_type, submission.id
            )));
        }

        reviewers::adjust_active_count_on(&mut tx, reviewer.id, 1).await?;

        let due_date = Utc::now() + Duration::days(submission.priority.review_due_days());
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, submission_id, reviewer_id, review_type, assigned_by, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(submission.id)
        .bind(reviewer.id)
        .bind(input.review_type)
        .bind(actor_id)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        // First assignment pulls a freshly submitted item into review.
        if matches!(
            submission.status,
            SubmissionStatus::Submitted | SubmissionStatus::Resubmitted
        ) {
            set_status_on(
                &mut tx,
                &submission,
                SubmissionStatus::InReview,
                actor_id,
                WorkflowAction::StatusChanged,
                "submission entered review on first assignment".to_string(),
            )
            .await?;
        }

        history::record(
            &mut tx,
            NewHistoryEntry::new(
                submission.id,
                WorkflowAction::ReviewAssigned,
                actor_id,
                format!("{:?} review assigned to reviewer {}", input.review_type, reviewer.id),
            )
            .details(serde_json::json!({
                "review_id": review.id,
                "review_type": input.review_type,
                "due_date": due_date,
            })),
        )
        .await?;

        tx.commit().await?;
        tracing::info!(review_id = %review.id, submission_id = %submission.id, "review assigned");
        Ok(review)
    }

    /// Assigned reviewer begins work.
    pub async fn start(&self, review_id: Uuid, reviewer_user_id: Uuid) -> Result<Review> {
        let mut tx = self.pool.begin().await?;
        let (review, _, _) = lock_review_for_reviewer(&mut tx, review_id, reviewer_user_id).await?;

        if review.status != ReviewStatus::Assigned {
            return Err(Error::InvalidState(format!(
                "review {} is {:?}, only assigned reviews can be started",
                review_id, review.status
            )));
        }

        let updated = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET status = 'in_progress', started_at = now(), updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(review_id)
        .fetch_one(&mut *tx)
        .await?;

        history::record(
            &mut tx,
            NewHistoryEntry::new(
                review.submission_id,
                WorkflowAction::ReviewStarted,
                reviewer_user_id,
                format!("{:?} review started", review.review_type),
            )
            .details(serde_json::json!({ "review_id": review_id })),
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Assigned reviewer declines, releasing their capacity slot.
    pub async fn decline(
        &self,
        review_id: Uuid,
        reviewer_user_id: Uuid,
        reason: Option<String>,
    ) -> Result<Review> {
        let mut tx = self.pool.begin().await?;
        let (review, _, reviewer) =
            lock_review_for_reviewer(&mut tx, review_id, reviewer_user_id).await?;

        if review.status != ReviewStatus::Assigned {
            return Err(Error::InvalidState(format!(
                "review {} is {:?}, only assigned reviews can be declined",
                review_id, review.status
            )));
        }

        let updated = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET status = 'declined', decline_reason = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(review_id)
        .bind(&reason)
        .fetch_one(&mut *tx)
        .await?;

        reviewers::adjust_active_count_on(&mut tx, reviewer.id, -1).await?;

        history::record(
            &mut tx,
            NewHistoryEntry::new(
                review.submission_id,
                WorkflowAction::ReviewDeclined,
                reviewer_user_id,
                format!("{:?} review declined", review.review_type),
            )
            .details(serde_json::json!({ "review_id": review_id, "reason": reason })),
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Complete a review and apply its decision to the submission.
    pub async fn submit(
        &self,
        review_id: Uuid,
        reviewer_user_id: Uuid,
        input: SubmitReview,
    ) -> Result<Review> {
        let mut tx = self.pool.begin().await?;
        let (review, submission, reviewer) =
            lock_review_for_reviewer(&mut tx, review_id, reviewer_user_id).await?;

        if !review.status.is_active() {
            return Err(Error::InvalidState(format!(
                "review {} is {:?}, expected assigned or in_progress",
                review_id, review.status
            )));
        }

        let now = Utc::now();
        let time_spent = input
            .time_spent_minutes
            .unwrap_or_else(|| ((now - review.created_at).num_minutes().max(0)) as i32);
        let feedback = input
            .feedback
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| Error::InvalidState(format!("unserializable feedback: {e}")))?;

        let updated = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET status = 'completed', decision = $2, feedback = $3, quality_score = $4,
                completed_at = $5, time_spent_minutes = $6, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(review_id)
        .bind(input.decision)
        .bind(&feedback)
        .bind(input.quality_score)
        .bind(now)
        .bind(time_spent)
        .fetch_one(&mut *tx)
        .await?;

        // Release capacity and roll the completion into performance stats.
        // The quality average is recomputed over scored reviews only, so
        // completions without a score never dilute it; the review row above
        // is already updated, so the aggregate sees the new score.
        reviewers::adjust_active_count_on(&mut tx, reviewer.id, -1).await?;
        let on_time = now <= review.due_date;
        sqlx::query(
            r#"
            UPDATE reviewers
            SET total_reviews_completed = total_reviews_completed + 1,
                reviews_on_time = reviews_on_time + CASE WHEN $2 THEN 1 ELSE 0 END,
                average_quality_score = (
                    SELECT AVG(quality_score)::float8 FROM reviews
                    WHERE reviewer_id = $1 AND quality_score IS NOT NULL
                ),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(reviewer.id)
        .bind(on_time)
        .execute(&mut *tx)
        .await?;

        // Completion is recorded before its consequences so the trail reads
        // cause first.
        history::record(
            &mut tx,
            NewHistoryEntry::new(
                review.submission_id,
                WorkflowAction::ReviewCompleted,
                reviewer_user_id,
                format!("{:?} review completed: {:?}", review.review_type, input.decision),
            )
            .details(serde_json::json!({
                "review_id": review_id,
                "decision": input.decision,
                "on_time": on_time,
                "time_spent_minutes": time_spent,
            })),
        )
        .await?;

        apply_decision(&mut tx, &submission, &updated, reviewer_user_id).await?;

        tx.commit().await?;
        tracing::info!(
            review_id = %review_id,
            decision = ?input.decision,
            "review completed"
        );
        Ok(updated)
    }

    pub async fn get(&self, review_id: Uuid) -> Result<Review> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("review {review_id}")))
    }

    pub async fn list_for_submission(&self, submission_id: Uuid) -> Result<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE submission_id = $1 ORDER BY created_at",
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }
}

/// Lock the review, its submission and its reviewer (always in that order),
/// and verify the acting user is the assigned reviewer.
async fn lock_review_for_reviewer(
    conn: &mut PgConnection,
    review_id: Uuid,
    reviewer_user_id: Uuid,
) -> Result<(Review, Submission, Reviewer)> {
    let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1 FOR UPDATE")
        .bind(review_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("review {review_id}")))?;

    let submission = lock_submission(conn, review.submission_id).await?;
    let reviewer = reviewers::lock_reviewer(conn, review.reviewer_id).await?;
    if reviewer.user_id != reviewer_user_id {
        return Err(Error::Unauthorized(format!(
            "user {reviewer_user_id} is not the assigned reviewer for review {review_id}"
        )));
    }
    Ok((review, submission, reviewer))
}

/// What a completed review's decision does to the submission.
#[derive(Debug, PartialEq, Eq)]
enum DecisionEffect {
    /// Count the approval; optionally advance the stage or approve outright.
    CountApproval { advance: bool, approve: bool },
    RequestChanges,
    Reject,
    /// History entry only; senior routing is a manual follow-up.
    EscalateOnly,
    /// The submission reached a terminal status while this review was still
    /// open. The review itself stays completed and capacity is released, but
    /// a closed submission is only ever reopened by a decided appeal.
    AlreadyClosed,
}

fn decision_effect(
    decision: ReviewDecision,
    status: SubmissionStatus,
    current_approvals: i32,
    required_approvals: i32,
    stage: ReviewStage,
) -> DecisionEffect {
    if status.is_terminal() {
        return DecisionEffect::AlreadyClosed;
    }
    match decision {
        ReviewDecision::Approve | ReviewDecision::ApproveWithChanges => {
            let threshold_met = current_approvals + 1 >= required_approvals;
            let at_final = stage == ReviewStage::FinalApproval;
            DecisionEffect::CountApproval {
                advance: threshold_met && !at_final,
                approve: threshold_met && at_final,
            }
        }
        ReviewDecision::RequestChanges => DecisionEffect::RequestChanges,
        ReviewDecision::Reject => DecisionEffect::Reject,
        ReviewDecision::Escalate => DecisionEffect::EscalateOnly,
    }
}

async fn apply_decision(
    conn: &mut PgConnection,
    submission: &Submission,
    review: &Review,
    actor_id: Uuid,
) -> Result<()> {
    let decision = review
        .decision
        .ok_or_else(|| Error::InvalidState(format!("review {} has no decision", review.id)))?;

    match decision_effect(
        decision,
        submission.status,
        submission.current_approvals,
        submission.required_approvals,
        submission.current_stage,
    ) {
        DecisionEffect::CountApproval { advance, approve } => {
            sqlx::query(
                "UPDATE submissions SET current_approvals = current_approvals + 1, updated_at = now() WHERE id = $1",
            )
            .bind(submission.id)
            .execute(&mut *conn)
            .await?;

            if approve {
                set_status_on(
                    conn,
                    submission,
                    SubmissionStatus::Approved,
                    actor_id,
                    WorkflowAction::SubmissionApproved,
                    "final approval threshold reached".to_string(),
                )
                .await?;
            } else if advance {
                // Resets current_approvals back to zero for the new stage.
                advance_stage_on(conn, submission, actor_id).await?;
            }
        }
        DecisionEffect::RequestChanges => {
            set_status_on(
                conn,
                submission,
                SubmissionStatus::ChangesRequested,
                actor_id,
                WorkflowAction::ChangesRequested,
                "reviewer requested changes".to_string(),
            )
            .await?;
        }
        DecisionEffect::Reject => {
            set_status_on(
                conn,
                submission,
                SubmissionStatus::Rejected,
                actor_id,
                WorkflowAction::SubmissionRejected,
                "submission rejected by reviewer".to_string(),
            )
            .await?;
        }
        DecisionEffect::EscalateOnly => {
            history::record(
                conn,
                NewHistoryEntry::new(
                    submission.id,
                    WorkflowAction::ReviewEscalated,
                    actor_id,
                    format!("{:?} review escalated for senior attention", review.review_type),
                )
                .details(serde_json::json!({ "review_id": review.id })),
            )
            .await?;
        }
        // The review_completed entry already in the trail is the whole
        // outcome; the terminal status stays untouched.
        DecisionEffect::AlreadyClosed => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_below_threshold_only_counts() {
        let effect = decision_effect(
            ReviewDecision::Approve,
            SubmissionStatus::InReview,
            0,
            3,
            ReviewStage::PeerReview,
        );
        assert_eq!(effect, DecisionEffect::CountApproval { advance: false, approve: false });
    }

    #[test]
    fn third_of_three_approvals_advances_the_stage() {
        let effect = decision_effect(
            ReviewDecision::Approve,
            SubmissionStatus::InReview,
            2,
            3,
            ReviewStage::PeerReview,
        );
        assert_eq!(effect, DecisionEffect::CountApproval { advance: true, approve: false });
    }

    #[test]
    fn threshold_at_final_stage_approves_outright() {
        let effect = decision_effect(
            ReviewDecision::ApproveWithChanges,
            SubmissionStatus::InReview,
            0,
            1,
            ReviewStage::FinalApproval,
        );
        assert_eq!(effect, DecisionEffect::CountApproval { advance: false, approve: true });
    }

    #[test]
    fn reject_terminates_regardless_of_approvals() {
        let effect = decision_effect(
            ReviewDecision::Reject,
            SubmissionStatus::InReview,
            2,
            3,
            ReviewStage::EditorialReview,
        );
        assert_eq!(effect, DecisionEffect::Reject);
    }

    #[test]
    fn request_changes_and_escalate_do_not_count_approvals() {
        assert_eq!(
            decision_effect(
                ReviewDecision::RequestChanges,
                SubmissionStatus::InReview,
                0,
                1,
                ReviewStage::PeerReview,
            ),
            DecisionEffect::RequestChanges
        );
        assert_eq!(
            decision_effect(
                ReviewDecision::Escalate,
                SubmissionStatus::InReview,
                0,
                1,
                ReviewStage::FinalApproval,
            ),
            DecisionEffect::EscalateOnly
        );
    }

    #[test]
    fn no_decision_touches_a_closed_submission() {
        // A review left open across withdrawal or rejection still completes,
        // but its decision must not pull the submission out of a terminal
        // status.
        for status in [
            SubmissionStatus::Withdrawn,
            SubmissionStatus::Rejected,
            SubmissionStatus::Approved,
        ] {
            assert_eq!(
                decision_effect(ReviewDecision::Reject, status, 0, 1, ReviewStage::PeerReview),
                DecisionEffect::AlreadyClosed
            );
            assert_eq!(
                decision_effect(
                    ReviewDecision::Approve,
                    status,
                    0,
                    1,
                    ReviewStage::FinalApproval,
                ),
                DecisionEffect::AlreadyClosed
            );
        }
    }
}
