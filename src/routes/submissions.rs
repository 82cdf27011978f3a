use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use super::ActorId;
use crate::db::{
    Appeal, AutomatedCheck, CreateSubmission, Review, Submission, SubmissionFilter,
    WorkflowHistoryEntry,
};
use crate::error::Result;
use crate::state::AppState;

pub async fn create(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Json(input): Json<CreateSubmission>,
) -> Result<Json<Submission>> {
    Ok(Json(state.submissions.create(actor, input).await?))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<SubmissionFilter>,
) -> Result<Json<Vec<Submission>>> {
    Ok(Json(state.submissions.list(filter).await?))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<Uuid>,
) -> Result<Json<Submission>> {
    Ok(Json(state.submissions.get(submission_id).await?))
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Path(submission_id): Path<Uuid>,
) -> Result<Json<Submission>> {
    Ok(Json(state.submissions.submit(submission_id, actor).await?))
}

pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Path(submission_id): Path<Uuid>,
) -> Result<Json<Submission>> {
    Ok(Json(state.submissions.withdraw(submission_id, actor).await?))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<Uuid>,
) -> Result<Json<Vec<WorkflowHistoryEntry>>> {
    // Ensures unknown ids report NotFound rather than an empty trail.
    state.submissions.get(submission_id).await?;
    Ok(Json(state.history.list(submission_id).await?))
}

pub async fn checks(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<Uuid>,
) -> Result<Json<Vec<AutomatedCheck>>> {
    state.submissions.get(submission_id).await?;
    Ok(Json(state.checks.list_for_submission(submission_id).await?))
}

pub async fn reviews(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<Uuid>,
) -> Result<Json<Vec<Review>>> {
    state.submissions.get(submission_id).await?;
    Ok(Json(state.reviews.list_for_submission(submission_id).await?))
}

pub async fn appeals(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<Uuid>,
) -> Result<Json<Vec<Appeal>>> {
    state.submissions.get(submission_id).await?;
    Ok(Json(state.appeals.list_for_submission(submission_id).await?))
}
