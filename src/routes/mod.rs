pub mod appeals;
pub mod checks;
pub mod reviewers;
pub mod reviews;
pub mod submissions;

use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::WorkflowStats;
use crate::error::Result;
use crate::state::AppState;

/// Authenticated actor id, supplied by the external identity system as the
/// `X-Actor-Id` header on every mutating call.
pub struct ActorId(pub Uuid);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ActorId {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-actor-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(ActorId)
            .ok_or((
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "missing or invalid X-Actor-Id header" })),
            ))
    }
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<WorkflowStats>> {
    Ok(Json(state.stats.overview().await?))
}
