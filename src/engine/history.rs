//! Append-only workflow history. Every lifecycle transition writes an entry
//! through [`record`] on the open transaction, so the audit record commits
//! atomically with the transition it describes. There is no update or delete
//! path.

use serde_json::Value;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::{DbPool, SubmissionStatus, ReviewStage, WorkflowAction, WorkflowHistoryEntry};
use crate::error::Result;

#[derive(Debug)]
pub struct NewHistoryEntry {
    pub submission_id: Uuid,
    pub action: WorkflowAction,
    pub actor_id: Uuid,
    pub from_status: Option<SubmissionStatus>,
    pub to_status: Option<SubmissionStatus>,
    pub from_stage: Option<ReviewStage>,
    pub to_stage: Option<ReviewStage>,
    pub description: String,
    pub details: Value,
}

impl NewHistoryEntry {
    pub fn new(
        submission_id: Uuid,
        action: WorkflowAction,
        actor_id: Uuid,
        description: impl Into<String>,
    ) -> Self {
        Self {
            submission_id,
            action,
            actor_id,
            from_status: None,
            to_status: None,
            from_stage: None,
            to_stage: None,
            description: description.into(),
            details: Value::Object(Default::default()),
        }
    }

    pub fn status_change(mut self, from: SubmissionStatus, to: SubmissionStatus) -> Self {
        self.from_status = Some(from);
        self.to_status = Some(to);
        self
    }

    pub fn stage_change(mut self, from: ReviewStage, to: ReviewStage) -> Self {
        self.from_stage = Some(from);
        self.to_stage = Some(to);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

/// Append one entry inside the caller's transaction.
pub async fn record(conn: &mut PgConnection, entry: NewHistoryEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO workflow_history
            (id, submission_id, action, actor_id, from_status, to_status,
             from_stage, to_stage, description, details)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.submission_id)
    .bind(entry.action)
    .bind(entry.actor_id)
    .bind(entry.from_status)
    .bind(entry.to_status)
    .bind(entry.from_stage)
    .bind(entry.to_stage)
    .bind(&entry.description)
    .bind(&entry.details)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct HistoryLog {
    pool: DbPool,
}

impl HistoryLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Full trail for one submission, oldest first.
    pub async fn list(&self, submission_id: Uuid) -> Result<Vec<WorkflowHistoryEntry>> {
        let entries = sqlx::query_as::<_, WorkflowHistoryEntry>(
            "SELECT * FROM workflow_history WHERE submission_id = $1 ORDER BY created_at, id",
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
