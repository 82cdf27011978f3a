use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::ActorId;
use crate::db::{
    EligibleReviewerFilter, RegisterReviewer, Reviewer, ReviewerSpecialization, ReviewType,
};
use crate::error::Result;
use crate::state::AppState;

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(input): Json<RegisterReviewer>,
) -> Result<Json<Reviewer>> {
    Ok(Json(state.reviewers.register(input).await?))
}

pub async fn activate(
    State(state): State<Arc<AppState>>,
    ActorId(approver): ActorId,
    Path(reviewer_id): Path<Uuid>,
) -> Result<Json<Reviewer>> {
    Ok(Json(state.reviewers.activate(reviewer_id, approver).await?))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(reviewer_id): Path<Uuid>,
) -> Result<Json<Reviewer>> {
    Ok(Json(state.reviewers.get(reviewer_id).await?))
}

#[derive(Deserialize)]
pub struct AvailabilityBody {
    pub available: bool,
}

pub async fn set_availability(
    State(state): State<Arc<AppState>>,
    Path(reviewer_id): Path<Uuid>,
    Json(body): Json<AvailabilityBody>,
) -> Result<Json<Reviewer>> {
    Ok(Json(
        state
            .reviewers
            .set_availability(reviewer_id, body.available)
            .await?,
    ))
}

#[derive(Default, Deserialize)]
pub struct EligibleQuery {
    pub submission_id: Option<Uuid>,
    pub review_type: Option<ReviewType>,
    pub specialization: Option<ReviewerSpecialization>,
    pub community_id: Option<Uuid>,
}

/// With a submission and review type this applies the full assignment
/// eligibility rules; otherwise it is a plain registry listing.
pub async fn eligible(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EligibleQuery>,
) -> Result<Json<Vec<Reviewer>>> {
    let reviewers = match (query.submission_id, query.review_type) {
        (Some(submission_id), Some(review_type)) => {
            state
                .reviews
                .find_eligible_reviewers(submission_id, review_type)
                .await?
        }
        _ => {
            state
                .reviewers
                .list_eligible(EligibleReviewerFilter {
                    specialization: query.specialization,
                    community_id: query.community_id,
                })
                .await?
        }
    };
    Ok(Json(reviewers))
}
