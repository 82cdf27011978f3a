//! Workflow enums and the fixed lookup tables between them.
//!
//! Every table is an exhaustive `match` so that adding a priority, stage or
//! review type refuses to compile until it is handled everywhere.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "reviewer_specialization", rename_all = "snake_case")]
pub enum ReviewerSpecialization {
    PeerReviewer,
    TechnicalReviewer,
    PedagogicalReviewer,
    AccessibilityReviewer,
    EditorialReviewer,
    SeniorReviewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "reviewer_status", rename_all = "snake_case")]
pub enum ReviewerStatus {
    Pending,
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    InReview,
    ChangesRequested,
    Resubmitted,
    Approved,
    Rejected,
    Withdrawn,
}

impl SubmissionStatus {
    /// Terminal statuses close the submission; `completed_at` is set on entry.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Withdrawn)
    }

    /// Only rejected or changes-requested submissions can be appealed.
    pub fn is_appealable(self) -> bool {
        matches!(self, Self::Rejected | Self::ChangesRequested)
    }
}

/// The seven review stages, in the order a submission passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "review_stage", rename_all = "snake_case")]
pub enum ReviewStage {
    PeerReview,
    TechnicalAccuracy,
    PedagogicalQuality,
    AccessibilityCheck,
    PlagiarismCheck,
    EditorialReview,
    FinalApproval,
}

impl ReviewStage {
    pub const ORDERED: [ReviewStage; 7] = [
        ReviewStage::PeerReview,
        ReviewStage::TechnicalAccuracy,
        ReviewStage::PedagogicalQuality,
        ReviewStage::AccessibilityCheck,
        ReviewStage::PlagiarismCheck,
        ReviewStage::EditorialReview,
        ReviewStage::FinalApproval,
    ];

    /// The stage after this one; `None` at `final_approval`.
    pub fn next(self) -> Option<ReviewStage> {
        match self {
            ReviewStage::PeerReview => Some(ReviewStage::TechnicalAccuracy),
            ReviewStage::TechnicalAccuracy => Some(ReviewStage::PedagogicalQuality),
            ReviewStage::PedagogicalQuality => Some(ReviewStage::AccessibilityCheck),
            ReviewStage::AccessibilityCheck => Some(ReviewStage::PlagiarismCheck),
            ReviewStage::PlagiarismCheck => Some(ReviewStage::EditorialReview),
            ReviewStage::EditorialReview => Some(ReviewStage::FinalApproval),
            ReviewStage::FinalApproval => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "submission_priority", rename_all = "snake_case")]
pub enum SubmissionPriority {
    Urgent,
    High,
    Normal,
    Low,
}

impl SubmissionPriority {
    /// Days until the submission's SLA deadline.
    pub fn sla_days(self) -> i64 {
        match self {
            SubmissionPriority::Urgent => 2,
            SubmissionPriority::High => 3,
            SubmissionPriority::Normal => 7,
            SubmissionPriority::Low => 14,
        }
    }

    /// Days a reviewer gets for one review of a submission at this priority.
    pub fn review_due_days(self) -> i64 {
        match self {
            SubmissionPriority::Urgent => 1,
            SubmissionPriority::High => 2,
            SubmissionPriority::Normal => 3,
            SubmissionPriority::Low => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "review_type", rename_all = "snake_case")]
pub enum ReviewType {
    PeerReview,
    TechnicalAccuracy,
    PedagogicalQuality,
    AccessibilityCheck,
    PlagiarismCheck,
    EditorialReview,
    FinalApproval,
    AppealReview,
}

impl ReviewType {
    /// Which reviewer specialization may take on this kind of review.
    pub fn required_specialization(self) -> ReviewerSpecialization {
        match self {
            ReviewType::PeerReview => ReviewerSpecialization::PeerReviewer,
            ReviewType::TechnicalAccuracy => ReviewerSpecialization::TechnicalReviewer,
            ReviewType::PedagogicalQuality => ReviewerSpecialization::PedagogicalReviewer,
            ReviewType::AccessibilityCheck => ReviewerSpecialization::AccessibilityReviewer,
            ReviewType::PlagiarismCheck => ReviewerSpecialization::EditorialReviewer,
            ReviewType::EditorialReview => ReviewerSpecialization::EditorialReviewer,
            ReviewType::FinalApproval => ReviewerSpecialization::SeniorReviewer,
            ReviewType::AppealReview => ReviewerSpecialization::SeniorReviewer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "review_status", rename_all = "snake_case")]
pub enum ReviewStatus {
    Assigned,
    InProgress,
    Completed,
    Declined,
    Reassigned,
    Expired,
}

impl ReviewStatus {
    /// Active reviews hold a slot against reviewer capacity.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "review_decision", rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    ApproveWithChanges,
    RequestChanges,
    Reject,
    Escalate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "comment_severity", rename_all = "snake_case")]
pub enum CommentSeverity {
    Suggestion,
    Minor,
    Major,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "comment_type", rename_all = "snake_case")]
pub enum CommentType {
    Content,
    Structure,
    Factual,
    Accessibility,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "comment_status", rename_all = "snake_case")]
pub enum CommentStatus {
    Open,
    Acknowledged,
    Resolved,
    WontFix,
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "check_kind", rename_all = "snake_case")]
pub enum CheckKind {
    Plagiarism,
    Accessibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "check_status", rename_all = "snake_case")]
pub enum CheckStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "appeal_type", rename_all = "snake_case")]
pub enum AppealType {
    DecisionDispute,
    ProcessViolation,
    NewInformation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "appeal_status", rename_all = "snake_case")]
pub enum AppealStatus {
    Submitted,
    UnderReview,
    AdditionalInfoRequested,
    Decided,
    Withdrawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "appeal_decision", rename_all = "snake_case")]
pub enum AppealDecision {
    Upheld,
    Overturned,
    PartiallyOverturned,
    Remanded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "workflow_action", rename_all = "snake_case")]
pub enum WorkflowAction {
    SubmissionCreated,
    SubmittedForReview,
    StageAdvanced,
    StatusChanged,
    SubmissionWithdrawn,
    SubmissionApproved,
    SubmissionRejected,
    ChangesRequested,
    ReviewAssigned,
    ReviewStarted,
    ReviewDeclined,
    ReviewCompleted,
    ReviewEscalated,
    CheckRequested,
    CheckCompleted,
    AppealSubmitted,
    AppealDecided,
    AppealWithdrawn,
}

/// Similarity at or above this is treated as a plagiarism gate failure.
pub const PLAGIARISM_SIMILARITY_LIMIT: f64 = 20.0;

/// Advisory gate: plagiarism similarity under the limit and accessibility
/// passed. Computed and stored, never enforced by the engine itself.
pub fn auto_checks_passed(plagiarism_score: Option<f64>, accessibility_passed: bool) -> bool {
    let plagiarism_ok = matches!(plagiarism_score, Some(s) if s < PLAGIARISM_SIMILARITY_LIMIT);
    plagiarism_ok && accessibility_passed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_fixed_and_exhaustive() {
        let mut walked = vec![ReviewStage::PeerReview];
        let mut cur = ReviewStage::PeerReview;
        while let Some(next) = cur.next() {
            walked.push(next);
            cur = next;
        }
        assert_eq!(walked, ReviewStage::ORDERED);
        assert_eq!(cur, ReviewStage::FinalApproval);
        assert_eq!(ReviewStage::FinalApproval.next(), None);
    }

    #[test]
    fn sla_days_follow_priority() {
        assert_eq!(SubmissionPriority::Urgent.sla_days(), 2);
        assert_eq!(SubmissionPriority::High.sla_days(), 3);
        assert_eq!(SubmissionPriority::Normal.sla_days(), 7);
        assert_eq!(SubmissionPriority::Low.sla_days(), 14);
    }

    #[test]
    fn review_due_days_follow_priority() {
        assert_eq!(SubmissionPriority::Urgent.review_due_days(), 1);
        assert_eq!(SubmissionPriority::High.review_due_days(), 2);
        assert_eq!(SubmissionPriority::Normal.review_due_days(), 3);
        assert_eq!(SubmissionPriority::Low.review_due_days(), 5);
    }

    #[test]
    fn specialization_table_matches_review_kinds() {
        use ReviewerSpecialization as S;
        assert_eq!(ReviewType::PeerReview.required_specialization(), S::PeerReviewer);
        assert_eq!(ReviewType::FinalApproval.required_specialization(), S::SeniorReviewer);
        assert_eq!(ReviewType::AppealReview.required_specialization(), S::SeniorReviewer);
        assert_eq!(ReviewType::AccessibilityCheck.required_specialization(), S::AccessibilityReviewer);
    }

    #[test]
    fn terminal_statuses() {
        assert!(SubmissionStatus::Approved.is_terminal());
        assert!(SubmissionStatus::Rejected.is_terminal());
        assert!(SubmissionStatus::Withdrawn.is_terminal());
        assert!(!SubmissionStatus::InReview.is_terminal());
        assert!(!SubmissionStatus::ChangesRequested.is_terminal());
    }

    #[test]
    fn only_rejected_or_changes_requested_can_be_appealed() {
        assert!(SubmissionStatus::Rejected.is_appealable());
        assert!(SubmissionStatus::ChangesRequested.is_appealable());
        assert!(!SubmissionStatus::Approved.is_appealable());
        assert!(!SubmissionStatus::InReview.is_appealable());
        assert!(!SubmissionStatus::Draft.is_appealable());
    }

    #[test]
    fn auto_check_gate_requires_both_signals() {
        assert!(auto_checks_passed(Some(5.0), true));
        assert!(!auto_checks_passed(Some(20.0), true));
        assert!(!auto_checks_passed(Some(35.5), true));
        assert!(!auto_checks_passed(Some(5.0), false));
        assert!(!auto_checks_passed(None, true));
    }

    #[test]
    fn active_review_statuses_hold_capacity() {
        assert!(ReviewStatus::Assigned.is_active());
        assert!(ReviewStatus::InProgress.is_active());
        assert!(!ReviewStatus::Completed.is_active());
        assert!(!ReviewStatus::Declined.is_active());
    }
}
