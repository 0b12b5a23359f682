use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::{caller::SessionId, request_id::RequestId},
    models::{Caller, CarId, ScoredCar},
    routes::AppState,
    services::PersonalizedRequest,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedQuery {
    pub driving_condition: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub car_id: CarId,
    pub action: String,
    pub session_id: Option<String>,
}

/// Handler for cars similar to a given car
pub async fn similar(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(car_id): Path<CarId>,
) -> AppResult<Json<Vec<ScoredCar>>> {
    tracing::info!(request_id = %request_id, car_id, "Processing similar-cars request");

    let cars = state.recommender.similar(car_id).await?;
    Ok(Json(cars))
}

/// Handler for the caller's personalized feed
pub async fn personalized(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    caller: Caller,
    SessionId(session_id): SessionId,
    Query(query): Query<PersonalizedQuery>,
) -> AppResult<Json<Vec<ScoredCar>>> {
    tracing::info!(
        request_id = %request_id,
        driving_condition = ?query.driving_condition,
        "Processing personalized request"
    );

    let request = PersonalizedRequest {
        driving_condition: query.driving_condition,
        session_id,
    };
    let cars = state.recommender.personalized(&caller, request).await?;
    Ok(Json(cars))
}

/// Handler for recording a view, like or dismissal
///
/// An anonymous caller is rejected before the body is looked at; a body that
/// fails to deserialize is a 400.
pub async fn feedback(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    caller: Caller,
    SessionId(header_session): SessionId,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    caller.require_user()?;
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(request_id = %request_id, error = %rejection, "Malformed feedback body");
        AppError::InvalidInput(rejection.body_text())
    })?;

    tracing::info!(
        request_id = %request_id,
        car_id = request.car_id,
        action = %request.action,
        "Processing feedback"
    );

    let session_id = request.session_id.or(header_session);
    state
        .recommender
        .record_feedback(&caller, request.car_id, &request.action, session_id)
        .await?;

    Ok(Json(json!({ "status": "recorded" })))
}
