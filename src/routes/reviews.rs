use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::ActorId;
use crate::db::{AddComment, AssignReview, Review, ReviewComment, SubmitReview};
use crate::error::Result;
use crate::state::AppState;

pub async fn assign(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Json(input): Json<AssignReview>,
) -> Result<Json<Review>> {
    Ok(Json(state.reviews.assign(actor, input).await?))
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Path(review_id): Path<Uuid>,
) -> Result<Json<Review>> {
    Ok(Json(state.reviews.start(review_id, actor).await?))
}

#[derive(Default, Deserialize)]
pub struct DeclineBody {
    pub reason: Option<String>,
}

pub async fn decline(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Path(review_id): Path<Uuid>,
    body: Option<Json<DeclineBody>>,
) -> Result<Json<Review>> {
    let reason = body.and_then(|Json(b)| b.reason);
    Ok(Json(state.reviews.decline(review_id, actor, reason).await?))
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Path(review_id): Path<Uuid>,
    Json(input): Json<SubmitReview>,
) -> Result<Json<Review>> {
    Ok(Json(state.reviews.submit(review_id, actor, input).await?))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(review_id): Path<Uuid>,
) -> Result<Json<Review>> {
    Ok(Json(state.reviews.get(review_id).await?))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Path(review_id): Path<Uuid>,
    Json(input): Json<AddComment>,
) -> Result<Json<ReviewComment>> {
    Ok(Json(state.comments.add(review_id, actor, input).await?))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(review_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewComment>>> {
    state.reviews.get(review_id).await?;
    Ok(Json(state.comments.list_for_review(review_id).await?))
}

#[derive(Default, Deserialize)]
pub struct ResolveBody {
    pub note: Option<String>,
}

pub async fn resolve_comment(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Path(comment_id): Path<Uuid>,
    body: Option<Json<ResolveBody>>,
) -> Result<Json<ReviewComment>> {
    let note = body.and_then(|Json(b)| b.note);
    Ok(Json(state.comments.resolve(comment_id, actor, note).await?))
}
