pub mod approvals;
pub mod health;

use axum::Router;

use crate::AppState;

/// Composes every HTTP route the service exposes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(approvals::routes())
}
