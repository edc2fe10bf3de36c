//! Restock API Library
//!
//! Reorder detection for spreadsheet-tracked inventory, routed through a
//! human-in-the-loop email approval step. The workflow is stateless between
//! requests: pending approvals live entirely inside signed, expiring tokens,
//! and outcomes land in the external ledger's append-only purchase-order log.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod notifications;
pub mod rules;
pub mod services;
pub mod tokens;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::services::ApprovalService;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub approvals: Arc<ApprovalService>,
}

/// Builds the full application router with tracing and a request timeout.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
