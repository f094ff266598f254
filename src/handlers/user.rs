use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::{required, AppState};
use crate::error::ReviewError;

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub user_id: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReviewsQuery {
    pub user_id: Option<String>,
}

pub async fn set_user_active(
    State(state): State<AppState>,
    payload: Result<Json<SetActiveRequest>, JsonRejection>,
) -> Result<Json<Value>, ReviewError> {
    let Json(request) = payload.map_err(|e| ReviewError::invalid_request(e.body_text()))?;

    let user = state
        .workflow
        .set_user_active(&request.user_id, request.is_active)
        .await?;

    Ok(Json(serde_json::json!({ "user": user })))
}

pub async fn get_user_reviews(
    State(state): State<AppState>,
    query: Result<Query<ReviewsQuery>, QueryRejection>,
) -> Result<Json<Value>, ReviewError> {
    let Query(query) = query.map_err(|e| ReviewError::invalid_request(e.body_text()))?;
    let user_id = required(query.user_id, "user_id")?;

    let pull_requests = state.workflow.get_user_reviews(&user_id).await?;

    Ok(Json(serde_json::json!({
        "user_id": user_id,
        "pull_requests": pull_requests
    })))
}
