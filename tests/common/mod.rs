#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use review_assigner::config::AppConfig;
use review_assigner::database::models::{Team, TeamMember};
use review_assigner::database::Database;
use review_assigner::handlers::{self, AppState};
use review_assigner::workflow::ReviewWorkflow;

/// Workflow over a fresh in-memory SQLite database.
pub async fn setup_workflow() -> ReviewWorkflow {
    let db = Database::new_in_memory()
        .await
        .expect("Failed to create test database");
    ReviewWorkflow::with_seed(Arc::new(db), 2024)
}

pub async fn setup_app() -> Router {
    let workflow = setup_workflow().await;
    handlers::router(AppState::new(AppConfig::default(), workflow))
}

pub fn member(id: &str, active: bool) -> TeamMember {
    TeamMember {
        user_id: id.to_string(),
        username: format!("user-{}", id),
        is_active: active,
    }
}

pub fn team(name: &str, members: Vec<TeamMember>) -> Team {
    Team {
        team_name: name.to_string(),
        members,
    }
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}
