//! Attachment uploads for the query route.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::routing::put;
use axum::{Json, Router};
use medimind_core::{Error, Modality};
use tracing::info;

use super::{error_response, ApiError};
use crate::state::AppState;

/// Largest accepted attachment.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/uploads/{name}", put(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// PUT /api/uploads/{name}: store an image or audio file in the uploads dir.
async fn upload(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let dest = state
        .config
        .data_paths
        .upload_file(&name)
        .map_err(|e| error_response(&e))?;

    let Some(modality) = [Modality::Image, Modality::Audio]
        .into_iter()
        .find(|m| m.mime_type_for(&dest).is_some())
    else {
        return Err(error_response(&Error::InvalidAttachment(format!(
            "{} is not a supported image or audio file",
            name
        ))));
    };
    if body.is_empty() {
        return Err(error_response(&Error::InvalidAttachment(format!(
            "{} is empty",
            name
        ))));
    }

    tokio::fs::write(&dest, &body)
        .await
        .map_err(|e| error_response(&Error::Io(e)))?;
    info!("Stored {} upload {} ({} bytes)", modality, name, body.len());

    Ok(Json(serde_json::json!({
        "name": name,
        "modality": modality,
        "bytes": body.len(),
    })))
}
