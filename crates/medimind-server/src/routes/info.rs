//! Status and reference-data routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use medimind_core::{HealthCategory, Language};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/languages", get(get_languages))
        .route("/categories", get(get_categories))
}

/// GET /api/status: backend and session counters.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let limit = state.gateway.limiter().config();

    Json(serde_json::json!({
        "model": state.gateway.model(),
        "location": state.config.location,
        "project_id": state.config.project_id,
        "gateway_calls": state.gateway.calls(),
        "rate_limit": {
            "max_calls": limit.max_calls,
            "window_secs": limit.window.as_secs_f64(),
        },
        "session_id": state.ledger.session_id(),
        "synthesis_policy": state.orchestrator.policy(),
        "interactions": state.ledger.len(),
    }))
}

async fn get_languages() -> Json<serde_json::Value> {
    let languages: Vec<_> = Language::ALL
        .iter()
        .map(|l| serde_json::json!({ "code": l.code(), "name": l.display_name() }))
        .collect();
    Json(serde_json::json!({ "languages": languages }))
}

async fn get_categories() -> Json<serde_json::Value> {
    let categories: Vec<_> = HealthCategory::ALL.iter().map(|c| c.name()).collect();
    Json(serde_json::json!({ "categories": categories }))
}
