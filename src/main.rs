use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};

use restock_api as api;

use api::ledger::{InMemoryLedger, LedgerGateway};
use api::notifications::{InMemoryNotifier, NotificationGateway, RelayMailer};
use api::services::{ApprovalService, ApprovalSettings};
use api::tokens::TokenCodec;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    // Ledger backend. The spreadsheet-backed store is an external
    // collaborator; anything that speaks the gateway contract plugs in here.
    let ledger: Arc<dyn LedgerGateway> = match cfg.ledger_backend.as_str() {
        "in-memory" => Arc::new(InMemoryLedger::with_standard_headers()),
        other => {
            warn!(
                backend = other,
                "unknown ledger backend, falling back to in-memory"
            );
            Arc::new(InMemoryLedger::with_standard_headers())
        }
    };
    if !cfg.sheet_id.is_empty() {
        info!(
            sheet_id = %cfg.sheet_id,
            inventory_tab = %cfg.inventory_tab,
            po_log_tab = %cfg.po_log_tab,
            "external ledger document configured"
        );
    }

    // Notification backend.
    let notifier: Arc<dyn NotificationGateway> =
        if cfg.mailer_backend == "relay" && !cfg.mail_relay_url.is_empty() {
            info!(endpoint = %cfg.mail_relay_url, "mail relay delivery enabled");
            Arc::new(RelayMailer::new(
                cfg.mail_relay_url.clone(),
                cfg.mail_relay_token.clone(),
                cfg.mail_from.clone(),
            ))
        } else {
            info!("mail relay not configured; capturing outbound mail in memory");
            Arc::new(InMemoryNotifier::new())
        };

    let approvals = Arc::new(ApprovalService::new(
        ledger,
        notifier,
        TokenCodec::new(cfg.signing_key.clone()),
        ApprovalSettings {
            ttl_hours: cfg.ttl_hours,
            base_url: cfg.base_url.clone(),
            owner_email: cfg.owner_email.clone(),
            single_use_tokens: cfg.single_use_tokens,
        },
    ));

    let state = api::AppState {
        config: cfg.clone(),
        approvals,
    };
    let app = api::app_router(state);

    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("🚀 restock-api listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
