//! Query and health-tip routes.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use medimind_core::{DataPaths, Error};
use medimind_runtime::{Answer, QueryRequest};
use serde::Deserialize;

use super::{error_response, ApiError};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/query", post(query))
        .route("/tips", post(tips))
}

/// Map an attachment file name onto the uploads dir. Blank values stay
/// blank so the orchestrator treats them as absent.
fn uploaded(
    paths: &DataPaths,
    name: Option<PathBuf>,
) -> medimind_core::Result<Option<PathBuf>> {
    match name {
        Some(name) if !name.as_os_str().is_empty() => {
            let name = name
                .to_str()
                .ok_or_else(|| Error::InvalidPath(name.display().to_string()))?;
            paths.upload_file(name.trim()).map(Some)
        }
        other => Ok(other),
    }
}

/// POST /api/query: run one orchestration.
///
/// `image` and `audio` name files previously sent to `PUT /api/uploads`.
/// Runs on its own task so a client disconnect cannot cut the orchestration
/// short before it is recorded.
async fn query(
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<QueryRequest>,
) -> Result<Json<Answer>, ApiError> {
    let paths = &state.config.data_paths;
    req.image = uploaded(paths, req.image.take()).map_err(|e| error_response(&e))?;
    req.audio = uploaded(paths, req.audio.take()).map_err(|e| error_response(&e))?;

    let task_state = state.clone();
    let outcome = tokio::spawn(async move { task_state.orchestrator.handle(req).await })
        .await
        .map_err(|e| error_response(&Error::Internal(format!("query task failed: {}", e))))?;

    outcome.map(Json).map_err(|e| error_response(&e))
}

#[derive(Debug, Deserialize)]
struct TipsRequest {
    #[serde(default)]
    category: Option<String>,
    #[serde(default = "default_language")]
    language: String,
}

fn default_language() -> String {
    "en".into()
}

/// POST /api/tips: health tips for one category.
async fn tips(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TipsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let tips = state
        .orchestrator
        .health_tips(req.category.as_deref(), &req.language)
        .await
        .map_err(|e| error_response(&e))?;

    Ok(Json(serde_json::json!({
        "category": req.category,
        "language": req.language,
        "tips": tips,
    })))
}
