mod common;

use common::{extract_token, response_json, response_text, TestApp, OWNER};

#[tokio::test]
async fn healthz_reports_ok() {
    let app = TestApp::new();
    let response = app.get("/healthz").await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn dry_run_evaluates_without_sending() {
    let app = TestApp::new();
    app.seed_row("X1", "2", "10", 30, "s@x.com").await;
    app.seed_row("Y2", "99", "10", 30, "s2@x.com").await;

    let response = app.get("/admin/run-once?ttl_hours=24&dry_run=true").await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;

    assert_eq!(body["count"], 1);
    assert_eq!(body["emails_sent"], 0);
    assert_eq!(body["candidates"][0]["item_sku"], "X1");
    assert_eq!(body["candidates"][0]["on_hand_qty"], "2");
    assert_eq!(body["candidates"][0]["reorder_threshold"], "10");
    assert_eq!(body["candidates"][0]["supplier_email"], "s@x.com");

    assert!(app.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn run_once_defaults_to_configured_ttl() {
    let app = TestApp::new();
    // 20h old: stale for ttl_hours=1, fresh for the configured 24.
    app.seed_row("X1", "2", "10", 20, "s@x.com").await;

    let body = response_json(app.get("/admin/run-once?dry_run=true").await).await;
    assert_eq!(body["count"], 0);

    let body = response_json(app.get("/admin/run-once?ttl_hours=1&dry_run=true").await).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn negative_ttl_is_a_client_error() {
    let app = TestApp::new();
    app.seed_row("X1", "2", "10", 30, "s@x.com").await;

    let response = app.get("/admin/run-once?ttl_hours=-5&dry_run=true").await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Bad Request");

    assert!(app.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn end_to_end_confirm_flow() {
    let app = TestApp::new();
    app.seed_row("X1", "2", "10", 30, "s@x.com").await;

    // Detection: one candidate, one owner notification.
    let body = response_json(app.get("/admin/run-once?ttl_hours=24&dry_run=false").await).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["emails_sent"], 1);

    let emails = app.notifier.sent().await;
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].to, OWNER);
    let token = extract_token(&emails[0].body);

    // The approval form renders for a valid token.
    let response = app.get(&format!("/approve?token={token}")).await;
    assert_eq!(response.status(), 200);
    let html = response_text(response).await;
    assert!(html.contains("Approve SKU X1"));
    assert!(html.contains("decision=confirm"));
    assert!(html.contains("decision=reject"));

    // Confirm: PO goes to the supplier with the owner copied.
    let response = app
        .post(&format!(
            "/api/approval/resolve?token={token}&decision=confirm"
        ))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["result"], "confirmed");
    assert_eq!(body["po_status"], "sent");

    let emails = app.notifier.sent().await;
    assert_eq!(emails.len(), 2);
    assert_eq!(emails[1].to, "s@x.com");
    assert_eq!(emails[1].cc.as_deref(), Some(OWNER));
    assert!(emails[1].subject.starts_with("[PO] X1"));

    // Ledger: one log entry, row annotated.
    let log = app.ledger.log_entries().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].sku, "X1");
    assert_eq!(log[0].to_cells()[4], "sent");
    assert_eq!(log[0].to_cells()[5], "confirmed");
    assert_eq!(
        app.ledger.cell("X1", "notes").await.as_deref(),
        Some("Confirmed by owner")
    );

    // last_checked advanced, so the next cycle finds nothing.
    let body = response_json(app.get("/admin/run-once?ttl_hours=24&dry_run=true").await).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn reject_flow_logs_without_contacting_supplier() {
    let app = TestApp::new();
    app.seed_row("X1", "2", "10", 30, "s@x.com").await;

    response_json(app.get("/admin/run-once").await).await;
    let token = extract_token(&app.notifier.sent().await[0].body);

    let response = app
        .post(&format!(
            "/api/approval/resolve?token={token}&decision=reject"
        ))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["result"], "rejected");
    assert!(body.get("po_status").is_none());

    // Only the original approval email; no supplier contact.
    assert_eq!(app.notifier.sent().await.len(), 1);

    let log = app.ledger.log_entries().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].to_cells()[4], "n/a");
    assert_eq!(log[0].to_cells()[5], "rejected");
    assert_eq!(
        app.ledger.cell("X1", "notes").await.as_deref(),
        Some("Rejected by owner")
    );
}

#[tokio::test]
async fn decision_defaults_to_confirm() {
    let app = TestApp::new();
    app.seed_row("X1", "2", "10", 30, "s@x.com").await;
    response_json(app.get("/admin/run-once").await).await;
    let token = extract_token(&app.notifier.sent().await[0].body);

    let response = app.post(&format!("/api/approval/resolve?token={token}")).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["result"], "confirmed");
}

#[tokio::test]
async fn invalid_token_is_a_client_error() {
    let app = TestApp::new();

    let response = app.get("/approve?token=bogus").await;
    assert_eq!(response.status(), 400);

    let response = app
        .post("/api/approval/resolve?token=bogus&decision=confirm")
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["message"], "invalid or expired token");
}

#[tokio::test]
async fn invalid_decision_is_a_client_error() {
    let app = TestApp::new();
    app.seed_row("X1", "2", "10", 30, "s@x.com").await;
    response_json(app.get("/admin/run-once").await).await;
    let token = extract_token(&app.notifier.sent().await[0].body);

    let response = app
        .post(&format!("/api/approval/resolve?token={token}&decision=maybe"))
        .await;
    assert_eq!(response.status(), 400);
    assert!(app.ledger.log_entries().await.is_empty());
}

#[tokio::test]
async fn supplier_send_failure_falls_back_to_owner_alert() {
    let app = TestApp::new();
    app.seed_row("X1", "2", "10", 30, "s@x.com").await;
    response_json(app.get("/admin/run-once").await).await;
    let token = extract_token(&app.notifier.sent().await[0].body);

    app.notifier.fail_recipient("s@x.com").await;

    let response = app
        .post(&format!(
            "/api/approval/resolve?token={token}&decision=confirm"
        ))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["result"], "confirmed");
    assert_eq!(body["po_status"], "failed");

    let emails = app.notifier.sent().await;
    assert_eq!(emails.len(), 2);
    assert!(emails[1].subject.contains("[ALERT] Supplier email failed for X1"));

    let log = app.ledger.log_entries().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].to_cells()[4], "failed");
}

#[tokio::test]
async fn single_use_guard_blocks_replays_when_enabled() {
    let app = TestApp::with_single_use(true);
    app.seed_row("X1", "2", "10", 30, "s@x.com").await;
    response_json(app.get("/admin/run-once").await).await;
    let token = extract_token(&app.notifier.sent().await[0].body);

    let first = app
        .post(&format!(
            "/api/approval/resolve?token={token}&decision=confirm"
        ))
        .await;
    assert_eq!(first.status(), 200);

    let second = app
        .post(&format!(
            "/api/approval/resolve?token={token}&decision=confirm"
        ))
        .await;
    assert_eq!(second.status(), 400);
    assert_eq!(app.ledger.log_entries().await.len(), 1);
}
