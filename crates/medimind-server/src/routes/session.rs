//! Session ledger routes: summary, history, save/load, export, reset.
//!
//! Snapshots and exports are addressed by file name only. Names resolve
//! inside the sessions and exports data directories.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use medimind_ledger::{Interaction, SessionSummary};
use serde::Deserialize;

use super::{error_response, ApiError};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session", get(get_summary))
        .route("/session/interactions", get(get_interactions))
        .route("/session/save", post(save))
        .route("/session/load", post(load))
        .route("/session/export", post(export))
        .route("/session/reset", post(reset))
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoadRequest {
    name: String,
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn get_summary(State(state): State<Arc<AppState>>) -> Json<SessionSummary> {
    Json(state.ledger.summarize())
}

async fn get_interactions(State(state): State<Arc<AppState>>) -> Json<Vec<Interaction>> {
    Json(state.ledger.interactions())
}

/// POST /api/session/save: write a snapshot into the sessions dir, named
/// `name` or `health_session_<unix>.json`.
async fn save(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let paths = &state.config.data_paths;
    let dest = match req.name.as_deref() {
        Some(name) => paths.session_file(name).map_err(|e| error_response(&e))?,
        None => paths.default_snapshot_path(AppState::unix_now()),
    };
    let path = state.ledger.persist(&dest).map_err(|e| error_response(&e))?;

    Ok(Json(serde_json::json!({
        "name": file_name(&path),
        "path": path,
        "session_id": state.ledger.session_id(),
        "interactions": state.ledger.len(),
    })))
}

/// POST /api/session/load: replace the active session with a snapshot.
async fn load(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoadRequest>,
) -> Result<Json<SessionSummary>, ApiError> {
    let source = state
        .config
        .data_paths
        .session_file(&req.name)
        .map_err(|e| error_response(&e))?;
    let session = state
        .ledger
        .restore(&source)
        .map_err(|e| error_response(&e))?;
    Ok(Json(session.summarize()))
}

/// POST /api/session/export: write the CSV view into the exports dir.
async fn export(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let paths = &state.config.data_paths;
    let dest = match req.name.as_deref() {
        Some(name) => paths.export_file(name).map_err(|e| error_response(&e))?,
        None => paths.default_export_path(AppState::unix_now()),
    };
    let path = state
        .ledger
        .export_tabular(&dest)
        .map_err(|e| error_response(&e))?;

    Ok(Json(serde_json::json!({
        "name": file_name(&path),
        "path": path,
        "rows": state.ledger.len(),
    })))
}

async fn reset(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let id = state.ledger.reset();
    Json(serde_json::json!({ "session_id": id }))
}
