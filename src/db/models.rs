use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::types::*;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reviewer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub community_id: Option<Uuid>,
    pub specialization: ReviewerSpecialization,
    pub status: ReviewerStatus,
    pub max_active_reviews: i32,
    pub current_active_reviews: i32,
    pub is_available: bool,
    pub total_reviews_completed: i32,
    pub reviews_on_time: i32,
    pub average_quality_score: Option<f64>,
    pub consistency_score: Option<f64>,
    pub appeal_reversal_count: i32,
    pub activated_by: Option<Uuid>,
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Submission {
    pub id: Uuid,
    pub content_type: String,
    pub content_id: Uuid,
    pub community_id: Option<Uuid>,
    pub submitted_by: Uuid,
    pub version: i32,
    pub status: SubmissionStatus,
    pub current_stage: ReviewStage,
    pub completed_stages: Vec<ReviewStage>,
    pub required_approvals: i32,
    pub current_approvals: i32,
    pub priority: SubmissionPriority,
    pub sla_deadline: DateTime<Utc>,
    pub plagiarism_checked: bool,
    pub plagiarism_score: Option<f64>,
    pub accessibility_checked: bool,
    pub accessibility_score: Option<f64>,
    pub accessibility_passed: bool,
    pub auto_checks_passed: bool,
    pub content_snapshot: Value,
    pub content_hash: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Review {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    pub review_type: ReviewType,
    pub status: ReviewStatus,
    pub decision: Option<ReviewDecision>,
    pub feedback: Option<Value>,
    pub quality_score: Option<f64>,
    pub assigned_by: Option<Uuid>,
    pub due_date: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_minutes: Option<i32>,
    pub decline_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewComment {
    pub id: Uuid,
    pub review_id: Uuid,
    pub author_id: Uuid,
    pub location: Option<String>,
    pub severity: CommentSeverity,
    pub comment_type: CommentType,
    pub body: String,
    pub status: CommentStatus,
    pub parent_id: Option<Uuid>,
    pub thread_depth: i32,
    pub resolved_by: Option<Uuid>,
    pub resolution_note: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AutomatedCheck {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub kind: CheckKind,
    pub status: CheckStatus,
    pub result: Option<Value>,
    pub similarity_score: Option<f64>,
    pub accessibility_score: Option<f64>,
    pub issues_found: Option<i32>,
    pub needs_human_review: bool,
    pub requested_by: Uuid,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Appeal {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub appellant_id: Uuid,
    pub appeal_type: AppealType,
    pub reason: String,
    pub original_review_id: Option<Uuid>,
    pub status: AppealStatus,
    pub decision: Option<AppealDecision>,
    pub decided_by: Option<Uuid>,
    pub rationale: Option<String>,
    pub sla_deadline: DateTime<Utc>,
    pub sla_met: Option<bool>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowHistoryEntry {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub action: WorkflowAction,
    pub actor_id: Uuid,
    pub from_status: Option<SubmissionStatus>,
    pub to_status: Option<SubmissionStatus>,
    pub from_stage: Option<ReviewStage>,
    pub to_stage: Option<ReviewStage>,
    pub description: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

/// Structured reviewer feedback, tagged by shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewFeedback {
    /// Free-form narrative with explicit strengths and concerns.
    Summary {
        text: String,
        #[serde(default)]
        strengths: Vec<String>,
        #[serde(default)]
        concerns: Vec<String>,
    },
    /// Scored rubric criteria.
    Rubric { criteria: Vec<RubricCriterion> },
    /// A short note, typically alongside inline comments.
    Inline { note: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub name: String,
    pub score: f64,
    pub comment: Option<String>,
}

/// Result payload an external scanner posts back, tagged by check kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckOutcome {
    Plagiarism {
        /// Percent similarity against the corpus, 0..=100.
        similarity_score: f64,
        sources_matched: i32,
        #[serde(default)]
        needs_human_review: bool,
    },
    Accessibility {
        score: f64,
        issues_found: i32,
        passed: bool,
        #[serde(default)]
        needs_human_review: bool,
    },
    /// The scanner could not complete the run.
    Failure { error: String },
}

// ---- Request inputs --------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterReviewer {
    pub user_id: Uuid,
    pub community_id: Option<Uuid>,
    pub specialization: ReviewerSpecialization,
    pub max_active_reviews: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EligibleReviewerFilter {
    pub specialization: Option<ReviewerSpecialization>,
    pub community_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubmission {
    pub content_type: String,
    pub content_id: Uuid,
    pub community_id: Option<Uuid>,
    pub version: Option<i32>,
    pub priority: Option<SubmissionPriority>,
    pub required_approvals: Option<i32>,
    pub content_snapshot: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    pub stage: Option<ReviewStage>,
    pub community_id: Option<Uuid>,
    pub submitted_by: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AssignReview {
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    pub review_type: ReviewType,
}

#[derive(Debug, Deserialize)]
pub struct SubmitReview {
    pub decision: ReviewDecision,
    pub feedback: Option<ReviewFeedback>,
    pub quality_score: Option<f64>,
    pub time_spent_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct AddComment {
    pub location: Option<String>,
    pub severity: Option<CommentSeverity>,
    pub comment_type: Option<CommentType>,
    pub body: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppeal {
    pub submission_id: Uuid,
    pub appeal_type: AppealType,
    pub reason: String,
    pub original_review_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DecideAppeal {
    pub decision: AppealDecision,
    pub rationale: String,
}

// ---- Aggregate statistics ---------------------------------------------------

#[derive(Debug, Serialize)]
pub struct WorkflowStats {
    pub submissions_by_status: Vec<StatusCount>,
    pub submissions_by_stage: Vec<StageCount>,
    pub reviewer_on_time_rate: Option<f64>,
    pub average_review_minutes: Option<f64>,
    pub appeal_reversal_rate: Option<f64>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct StatusCount {
    pub status: SubmissionStatus,
    pub count: i64,
}

#[derive(Debug, FromRow, Serialize)]
pub struct StageCount {
    pub stage: ReviewStage,
    pub count: i64,
}
