//! HTTP route handlers.

pub mod info;
pub mod query;
pub mod session;
pub mod uploads;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Json, Router};
use medimind_core::{Error, ErrorKind};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Error status plus `{error, kind}` body.
pub type ApiError = (StatusCode, Json<serde_json::Value>);

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(info::routes())
        .merge(query::routes())
        .merge(session::routes())
        .merge(uploads::routes())
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        k if k.is_validation() => StatusCode::BAD_REQUEST,
        ErrorKind::AuthenticationFailure => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::QuotaOrTransportFailure | ErrorKind::SynthesisFailure => {
            StatusCode::BAD_GATEWAY
        }
        ErrorKind::CorruptSnapshot | ErrorKind::UnsupportedInput => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(e: &Error) -> ApiError {
    let kind = e.kind();
    (
        status_for(kind),
        Json(serde_json::json!({
            "error": e.to_string(),
            "kind": kind,
        })),
    )
}
