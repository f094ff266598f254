//! HTTP API
//!
//! Thin axum handlers over `ReviewWorkflow`. Each route parses the request,
//! calls one workflow operation and maps `ReviewError` to a status code and
//! a `{"error": {"code", "message"}}` body.

pub mod pull_request;
pub mod team;
pub mod user;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, warn};

use crate::config::AppConfig;
use crate::error::ReviewError;
use crate::workflow::ReviewWorkflow;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub workflow: Arc<ReviewWorkflow>,
}

impl AppState {
    pub fn new(config: AppConfig, workflow: ReviewWorkflow) -> Self {
        Self {
            config,
            workflow: Arc::new(workflow),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let request_timeout = state.config.request_timeout();

    let routes = Router::new()
        .route("/health", get(health_check))
        .route("/team/add", post(team::create_team))
        .route("/team/get", get(team::get_team))
        .route("/users/setIsActive", post(user::set_user_active))
        .route("/users/getReview", get(user::get_user_reviews))
        .route("/pullRequest/create", post(pull_request::create_pull_request))
        .route("/pullRequest/merge", post(pull_request::merge_pull_request))
        .route("/pullRequest/reassign", post(pull_request::reassign_reviewer));

    with_middleware(routes, request_timeout).with_state(state)
}

fn with_middleware<S>(routes: Router<S>, request_timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(middleware::map_response(timeout_body))
            .layer(TimeoutLayer::new(request_timeout))
            .into_inner(),
    )
}

/// `TimeoutLayer` answers with a bare 408; give it the usual error body.
async fn timeout_body(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return ReviewError::Timeout.into_response();
    }
    response
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "review-assigner",
        "timestamp": chrono::Utc::now()
    }))
}

impl ReviewError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReviewError::TeamExists | ReviewError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ReviewError::PrExists
            | ReviewError::PrMerged
            | ReviewError::NotAssigned
            | ReviewError::NoCandidate => StatusCode::CONFLICT,
            ReviewError::NotFound | ReviewError::AuthorNotFound | ReviewError::TeamNotFound => {
                StatusCode::NOT_FOUND
            }
            ReviewError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ReviewError::ConfigError(_) | ReviewError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ReviewError::ConfigError(_) | ReviewError::Internal(_) => {
                error!("Request failed: {}", self);
                "Internal server error".to_string()
            }
            _ => {
                warn!("Request rejected: {} - {}", self.code(), self);
                self.to_string()
            }
        };

        (
            status,
            Json(serde_json::json!({
                "error": {
                    "code": self.code(),
                    "message": message
                }
            })),
        )
            .into_response()
    }
}

/// Reject a missing or blank required field.
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, ReviewError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ReviewError::invalid_request(format!("{} is required", field))),
    }
}
