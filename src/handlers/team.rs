use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::{required, AppState};
use crate::database::models::Team;
use crate::error::ReviewError;

#[derive(Debug, Deserialize)]
pub struct TeamQuery {
    pub team_name: Option<String>,
}

pub async fn create_team(
    State(state): State<AppState>,
    payload: Result<Json<Team>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ReviewError> {
    let Json(team) = payload.map_err(|e| ReviewError::invalid_request(e.body_text()))?;

    let team = state.workflow.create_team(team).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "team": team })),
    ))
}

pub async fn get_team(
    State(state): State<AppState>,
    query: Result<Query<TeamQuery>, QueryRejection>,
) -> Result<Json<Team>, ReviewError> {
    let Query(query) = query.map_err(|e| ReviewError::invalid_request(e.body_text()))?;
    let team_name = required(query.team_name, "team_name")?;

    let team = state.workflow.get_team(&team_name).await?;
    Ok(Json(team))
}
