// src/api.rs
//! HTTP trigger + review endpoints.

use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::ingest::cycle::{CycleRunner, CycleSummary};
use crate::ingest::scheduler::MANUAL_TRIGGER;
use crate::metrics::Metrics;
use crate::store::{Article, HumanFeedback};

/// Default page size of the review inbox.
pub const DEFAULT_INBOX_LIMIT: i64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<CycleRunner>,
}

pub fn router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/cycle/run", post(run_cycle_now))
        .route("/articles/inbox", get(inbox))
        .route("/articles/confirmed", get(confirmed))
        .route("/articles/{id}/feedback", post(set_feedback))
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match metrics {
        Some(m) => app.merge(m.router()),
        None => app,
    }
}

type ApiError = (StatusCode, String);

fn internal(e: sqlx::Error) -> ApiError {
    error!(target: "api", error = %e, "store error");
    (StatusCode::INTERNAL_SERVER_ERROR, "store error".to_string())
}

/// Synchronous "run one cycle now"; responds once every source has reported.
async fn run_cycle_now(State(state): State<AppState>) -> Json<CycleSummary> {
    Json(state.runner.run_cycle(MANUAL_TRIGGER).await)
}

#[derive(serde::Deserialize)]
struct LimitQuery {
    #[serde(default)]
    limit: Option<i64>,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_INBOX_LIMIT).clamp(1, 500)
}

async fn inbox(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let rows = state
        .runner
        .store()
        .inbox(clamp_limit(q.limit))
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

async fn confirmed(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let rows = state
        .runner
        .store()
        .confirmed(clamp_limit(q.limit))
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[derive(serde::Deserialize)]
struct FeedbackReq {
    feedback: HumanFeedback,
    #[serde(default)]
    bubbled: Option<bool>,
}

async fn set_feedback(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<FeedbackReq>,
) -> Result<StatusCode, ApiError> {
    let found = state
        .runner
        .store()
        .set_feedback(id, body.feedback, body.bubbled)
        .await
        .map_err(internal)?;
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("article {id} not found")))
    }
}
