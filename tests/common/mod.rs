use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;

use restock_api::{
    config::AppConfig,
    ledger::InMemoryLedger,
    notifications::InMemoryNotifier,
    services::{ApprovalService, ApprovalSettings},
    tokens::TokenCodec,
    AppState,
};

pub const OWNER: &str = "owner@example.com";
pub const SIGNING_KEY: &str = "integration-test-signing-key-0123456789";

/// Helper harness wiring the full router to in-memory gateway backends.
pub struct TestApp {
    pub router: Router,
    pub ledger: Arc<InMemoryLedger>,
    pub notifier: Arc<InMemoryNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_single_use(false)
    }

    pub fn with_single_use(single_use_tokens: bool) -> Self {
        let cfg = test_config(single_use_tokens);
        let ledger = Arc::new(InMemoryLedger::with_standard_headers());
        let notifier = Arc::new(InMemoryNotifier::new());

        let approvals = Arc::new(ApprovalService::new(
            ledger.clone(),
            notifier.clone(),
            TokenCodec::new(cfg.signing_key.clone()),
            ApprovalSettings {
                ttl_hours: cfg.ttl_hours,
                base_url: cfg.base_url.clone(),
                owner_email: cfg.owner_email.clone(),
                single_use_tokens: cfg.single_use_tokens,
            },
        ));

        let state = AppState {
            config: cfg,
            approvals,
        };
        Self {
            router: restock_api::app_router(state),
            ledger,
            notifier,
        }
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri).await
    }

    pub async fn post(&self, uri: &str) -> Response {
        self.request(Method::POST, uri).await
    }

    pub async fn request(&self, method: Method, uri: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    /// Seeds one inventory row with the standard columns.
    pub async fn seed_row(
        &self,
        sku: &str,
        qty: &str,
        threshold: &str,
        hours_since_checked: i64,
        supplier_email: &str,
    ) {
        let last_checked = (Utc::now() - Duration::hours(hours_since_checked)).to_rfc3339();
        self.ledger
            .push_row(vec![
                sku.to_string(),
                format!("Item {sku}"),
                qty.to_string(),
                threshold.to_string(),
                last_checked,
                format!("Supplier {sku}"),
                supplier_email.to_string(),
                "25".to_string(),
                String::new(),
            ])
            .await;
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Pulls the approval token out of an owner notification body.
pub fn extract_token(body: &str) -> String {
    let start = body.find("token=").expect("token link in email body") + "token=".len();
    body[start..]
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect()
}

fn test_config(single_use_tokens: bool) -> AppConfig {
    AppConfig {
        signing_key: SIGNING_KEY.to_string(),
        ttl_hours: 24,
        base_url: "http://localhost:8000".to_string(),
        owner_email: OWNER.to_string(),
        single_use_tokens,
        ledger_backend: "in-memory".to_string(),
        sheet_id: String::new(),
        inventory_tab: "Sheet1".to_string(),
        po_log_tab: "po_log".to_string(),
        mailer_backend: "in-memory".to_string(),
        mail_relay_url: String::new(),
        mail_relay_token: None,
        mail_from: "restock@example.com".to_string(),
        host: "127.0.0.1".to_string(),
        port: 18_000,
        environment: "test".to_string(),
        log_level: "info".to_string(),
        log_json: false,
    }
}
