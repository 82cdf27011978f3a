use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::ActorId;
use crate::db::{AutomatedCheck, CheckKind, CheckOutcome};
use crate::error::Result;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RequestCheckBody {
    pub submission_id: Uuid,
    pub kind: CheckKind,
}

pub async fn request(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Json(body): Json<RequestCheckBody>,
) -> Result<Json<AutomatedCheck>> {
    Ok(Json(
        state
            .checks
            .request_check(body.submission_id, body.kind, actor)
            .await?,
    ))
}

/// Callback endpoint for external scanners.
pub async fn record_result(
    State(state): State<Arc<AppState>>,
    ActorId(actor): ActorId,
    Path(check_id): Path<Uuid>,
    Json(outcome): Json<CheckOutcome>,
) -> Result<Json<AutomatedCheck>> {
    Ok(Json(state.checks.record_result(check_id, actor, outcome).await?))
}
