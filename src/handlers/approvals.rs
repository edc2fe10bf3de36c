//! HTTP surface of the approval workflow: the admin evaluation trigger, the
//! owner-facing confirmation form, and the resolution endpoint.

use axum::{
    extract::{Query, State},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::errors::ServiceError;
use crate::models::CandidateSummary;
use crate::services::Resolution;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct RunOnceParams {
    /// TTL hours for `last_checked`; defaults to the configured TTL.
    ttl_hours: Option<i64>,
    /// When true, evaluate only: no approval emails are sent.
    #[serde(default)]
    dry_run: bool,
}

async fn run_once(
    State(state): State<AppState>,
    Query(params): Query<RunOnceParams>,
) -> Result<Json<Value>, ServiceError> {
    let ttl_hours = params
        .ttl_hours
        .unwrap_or(state.approvals.settings().ttl_hours);
    if ttl_hours < 0 {
        return Err(ServiceError::Validation(format!(
            "ttl_hours must be non-negative, got {ttl_hours}"
        )));
    }

    let candidates = state.approvals.evaluate_cycle(ttl_hours).await?;
    let summaries: Vec<CandidateSummary> = candidates.iter().map(|c| c.summary()).collect();

    let emails_sent = if !params.dry_run && !candidates.is_empty() {
        state.approvals.initiate_approvals(&candidates).await
    } else {
        0
    };

    info!(count = summaries.len(), emails_sent, dry_run = params.dry_run, "run-once complete");
    Ok(Json(json!({
        "count": summaries.len(),
        "candidates": summaries,
        "emails_sent": emails_sent,
    })))
}

#[derive(Debug, Deserialize)]
struct ApproveParams {
    token: String,
}

/// Renders a minimal confirmation form. Both buttons post to the resolve
/// endpoint with the same token; only the decision parameter differs.
async fn approve_form(
    State(state): State<AppState>,
    Query(params): Query<ApproveParams>,
) -> Result<Html<String>, ServiceError> {
    let claims = state.approvals.verify_token(&params.token)?;
    Ok(Html(format!(
        r#"<html><body>
<h3>Approve SKU {sku}</h3>
<p>{item} — order qty {qty} from {supplier}</p>
<form method="post" action="/api/approval/resolve?token={token}&decision=confirm">
  <button>Confirm</button>
</form>
<form method="post" action="/api/approval/resolve?token={token}&decision=reject">
  <button>Reject</button>
</form>
</body></html>"#,
        sku = claims.sku,
        item = claims.item_name,
        qty = claims.qty,
        supplier = claims.supplier_name,
        token = params.token,
    )))
}

#[derive(Debug, Deserialize)]
struct ResolveParams {
    token: String,
    #[serde(default = "default_decision")]
    decision: String,
}

fn default_decision() -> String {
    "confirm".to_string()
}

async fn resolve(
    State(state): State<AppState>,
    Query(params): Query<ResolveParams>,
) -> Result<Json<Value>, ServiceError> {
    let outcome = state
        .approvals
        .resolve(&params.token, &params.decision)
        .await?;

    let body = match outcome {
        Resolution::Confirmed { po_status } => json!({
            "status": "ok",
            "result": "confirmed",
            "po_status": po_status,
        }),
        Resolution::Rejected => json!({
            "status": "ok",
            "result": "rejected",
        }),
    };
    Ok(Json(body))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/run-once", get(run_once))
        .route("/approve", get(approve_form))
        .route("/api/approval/resolve", post(resolve))
}
