use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::AppState;
use crate::error::ReviewError;

#[derive(Debug, Deserialize)]
pub struct CreatePullRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MergePullRequest {
    pub pull_request_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReassignReviewer {
    pub pull_request_id: String,
    pub old_user_id: String,
}

pub async fn create_pull_request(
    State(state): State<AppState>,
    payload: Result<Json<CreatePullRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ReviewError> {
    let Json(request) = payload.map_err(|e| ReviewError::invalid_request(e.body_text()))?;

    let pr = state
        .workflow
        .create_pull_request(
            &request.pull_request_id,
            &request.pull_request_name,
            &request.author_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "pr": pr }))))
}

pub async fn merge_pull_request(
    State(state): State<AppState>,
    payload: Result<Json<MergePullRequest>, JsonRejection>,
) -> Result<Json<Value>, ReviewError> {
    let Json(request) = payload.map_err(|e| ReviewError::invalid_request(e.body_text()))?;

    let pr = state
        .workflow
        .merge_pull_request(&request.pull_request_id)
        .await?;

    Ok(Json(serde_json::json!({ "pr": pr })))
}

pub async fn reassign_reviewer(
    State(state): State<AppState>,
    payload: Result<Json<ReassignReviewer>, JsonRejection>,
) -> Result<Json<Value>, ReviewError> {
    let Json(request) = payload.map_err(|e| ReviewError::invalid_request(e.body_text()))?;

    let result = state
        .workflow
        .reassign_reviewer(&request.pull_request_id, &request.old_user_id)
        .await?;

    Ok(Json(serde_json::json!({
        "pr": result.pr,
        "replaced_by": result.replaced_by
    })))
}
