use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::AppState;

/// Liveness probe: the process is up and serving.
async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}
