use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use super::ActorId;
use crate::db::{Appeal, CreateAppeal, DecideAppeal};
use crate::error::Result;
use crate::state::AppState;

pub async fn create(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Json(input): Json<CreateAppeal>,
) -> Result<Json<Appeal>> {
    Ok(Json(state.appeals.create(actor, input).await?))
}

pub async fn decide(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Path(appeal_id): Path<Uuid>,
    Json(input): Json<DecideAppeal>,
) -> Result<Json<Appeal>> {
    Ok(Json(state.appeals.decide(appeal_id, actor, input).await?))
}

pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Path(appeal_id): Path<Uuid>,
) -> Result<Json<Appeal>> {
    Ok(Json(state.appeals.withdraw(appeal_id, actor).await?))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(appeal_id): Path<Uuid>,
) -> Result<Json<Appeal>> {
    Ok(Json(state.appeals.get(appeal_id).await?))
}
