//! Approval workflow controller.
//!
//! Drives a reorder candidate through detected -> awaiting approval ->
//! confirmed/rejected. No workflow state is held between requests: everything
//! a resolution needs rides inside the signed token, and the externally
//! stored ledger carries the durable outcome. An expired, unresolved token
//! never transitions; the candidate is simply re-detected on a later cycle if
//! it still qualifies.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::errors::ServiceError;
use crate::ledger::{AnnotateOutcome, LedgerGateway};
use crate::models::{
    ApprovalClaims, Decision, InventoryRow, OwnerDecision, PoLogEntry, PoStatus, ReorderCandidate,
    COL_ITEM_NAME, COL_ITEM_SKU, COL_ON_HAND_QTY, COL_ORDER_QTY, COL_REORDER_THRESHOLD,
    COL_SUPPLIER_EMAIL, COL_SUPPLIER_NAME,
};
use crate::notifications::{NotificationGateway, OutboundEmail};
use crate::rules;
use crate::tokens::TokenCodec;

const NOTE_CONFIRMED: &str = "Confirmed by owner";
const NOTE_REJECTED: &str = "Rejected by owner";

/// Process-wide, read-only workflow settings.
#[derive(Debug, Clone)]
pub struct ApprovalSettings {
    pub ttl_hours: i64,
    pub base_url: String,
    pub owner_email: String,
    /// When enabled, a resolved token is remembered (content-addressed by
    /// its signature) until its own expiry, and a second resolution fails as
    /// invalid. Off by default: the stock behavior tolerates a double-click
    /// by appending two log entries.
    pub single_use_tokens: bool,
}

/// Terminal outcome of one resolution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Confirmed { po_status: PoStatus },
    Rejected,
}

pub struct ApprovalService {
    ledger: Arc<dyn LedgerGateway>,
    notifier: Arc<dyn NotificationGateway>,
    codec: TokenCodec,
    settings: ApprovalSettings,
    /// Signature-hex -> token expiry, populated only when single-use
    /// enforcement is on. Entries past their expiry are evicted lazily, so
    /// memory stays bounded by the token TTL.
    consumed: DashMap<String, i64>,
}

impl ApprovalService {
    pub fn new(
        ledger: Arc<dyn LedgerGateway>,
        notifier: Arc<dyn NotificationGateway>,
        codec: TokenCodec,
        settings: ApprovalSettings,
    ) -> Self {
        Self {
            ledger,
            notifier,
            codec,
            settings,
            consumed: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &ApprovalSettings {
        &self.settings
    }

    /// Reads all inventory rows and returns the ones qualifying for reorder,
    /// in original row order. No ledger mutation and no notifications; rows
    /// that fail to parse are excluded and logged.
    #[instrument(skip(self))]
    pub async fn evaluate_cycle(
        &self,
        ttl_hours: i64,
    ) -> Result<Vec<ReorderCandidate>, ServiceError> {
        let rows = self.ledger.read_inventory_rows().await?;
        let now = Utc::now();

        let mut candidates = Vec::new();
        for row in rows {
            match rules::try_needs_reorder(&row, now, ttl_hours) {
                Ok(true) => candidates.push(ReorderCandidate::new(row)),
                Ok(false) => {}
                Err(err) => {
                    warn!(sku = row.sku(), error = %err, "row excluded from evaluation");
                }
            }
        }
        info!(count = candidates.len(), ttl_hours, "evaluation cycle complete");
        Ok(candidates)
    }

    /// Mints one approval token per candidate and emails the owner a summary
    /// with confirm/reject links. Each candidate's outcome is independent: a
    /// failed send is logged and the batch continues. Returns the number of
    /// notifications actually sent.
    #[instrument(skip(self, candidates), fields(count = candidates.len()))]
    pub async fn initiate_approvals(&self, candidates: &[ReorderCandidate]) -> usize {
        let mut sent = 0;
        for candidate in candidates {
            let row = &candidate.row;
            let claims = ApprovalClaims::from_row(row);
            let token = self.codec.mint(
                &claims_to_map(&claims),
                Duration::hours(self.settings.ttl_hours),
            );
            // Confirm and reject resolve through the same endpoint; the
            // decision is an explicit parameter, not a second token.
            let approve_url = format!("{}/approve?token={}", self.settings.base_url, token);

            let email = OutboundEmail {
                to: self.settings.owner_email.clone(),
                cc: None,
                subject: format!(
                    "[Approval] Reorder {} — {}",
                    row.field(COL_ITEM_SKU),
                    row.field(COL_ITEM_NAME)
                ),
                body: build_approval_email_body(row, &approve_url, &approve_url),
            };
            match self.notifier.send(&email).await {
                Ok(()) => sent += 1,
                Err(err) => {
                    warn!(sku = row.sku(), error = %err, "approval notification failed");
                }
            }
        }
        sent
    }

    /// Verifies a token and returns its claims without side effects.
    pub fn verify_token(&self, token: &str) -> Result<ApprovalClaims, ServiceError> {
        let claims = self
            .codec
            .verify(token)
            .ok_or(ServiceError::InvalidOrExpiredToken)?;
        serde_json::from_value(Value::Object(claims))
            .map_err(|_| ServiceError::InvalidOrExpiredToken)
    }

    /// Resolves an approval: verifies the token, applies the owner's
    /// decision, records exactly one purchase-order log entry, and annotates
    /// the inventory row. A vanished row is logged and skipped, never fatal.
    #[instrument(skip(self, token))]
    pub async fn resolve(&self, token: &str, decision: &str) -> Result<Resolution, ServiceError> {
        let claims = self.verify_token(token)?;
        let decision: Decision = decision.parse().map_err(ServiceError::InvalidDecision)?;

        if self.settings.single_use_tokens {
            self.consume(token, claims.exp)?;
        }

        match decision {
            Decision::Confirm => self.confirm(&claims).await,
            Decision::Reject => self.reject(&claims).await,
        }
    }

    async fn confirm(&self, claims: &ApprovalClaims) -> Result<Resolution, ServiceError> {
        let po_text = draft_po_text(claims);
        let po_email = OutboundEmail {
            to: claims.supplier_email.clone(),
            cc: Some(self.settings.owner_email.clone()),
            subject: format!(
                "[PO] {} — {} (Qty {})",
                claims.sku, claims.item_name, claims.qty
            ),
            body: po_text.clone(),
        };

        let status = match self.notifier.send(&po_email).await {
            Ok(()) => PoStatus::Sent,
            Err(err) => {
                warn!(sku = %claims.sku, error = %err, "supplier PO send failed, alerting owner");
                let alert = OutboundEmail {
                    to: self.settings.owner_email.clone(),
                    cc: None,
                    subject: format!("[ALERT] Supplier email failed for {}", claims.sku),
                    body: format!("Error: {}\n\nPO draft:\n{}", err, po_text),
                };
                // Best-effort: the alert's own failure is not escalated further.
                if let Err(alert_err) = self.notifier.send(&alert).await {
                    warn!(sku = %claims.sku, error = %alert_err, "owner alert also failed");
                }
                PoStatus::Failed
            }
        };

        let now = Utc::now();
        let entry = PoLogEntry::new(claims, status, OwnerDecision::Confirmed, now);
        self.ledger.append_log_entry(&entry).await?;
        self.annotate(&claims.sku, NOTE_CONFIRMED).await?;

        info!(sku = %claims.sku, po_id = %entry.po_id, status = %status, "reorder confirmed");
        Ok(Resolution::Confirmed { po_status: status })
    }

    async fn reject(&self, claims: &ApprovalClaims) -> Result<Resolution, ServiceError> {
        self.annotate(&claims.sku, NOTE_REJECTED).await?;

        let entry = PoLogEntry::new(
            claims,
            PoStatus::NotApplicable,
            OwnerDecision::Rejected,
            Utc::now(),
        );
        self.ledger.append_log_entry(&entry).await?;

        info!(sku = %claims.sku, po_id = %entry.po_id, "reorder rejected");
        Ok(Resolution::Rejected)
    }

    async fn annotate(&self, sku: &str, note: &str) -> Result<(), ServiceError> {
        match self.ledger.annotate_row(sku, Utc::now(), Some(note)).await? {
            AnnotateOutcome::Updated => {}
            AnnotateOutcome::NotFound => {
                // Row deleted between detection and resolution: the log entry
                // still stands, only the annotation is skipped.
                warn!(sku, "inventory row not found during annotation");
            }
        }
        Ok(())
    }

    /// Marks a token as consumed; a token seen before (and not yet expired)
    /// fails as invalid. Insertion is atomic, so two racing resolutions for
    /// one token settle to a single winner.
    fn consume(&self, token: &str, exp: i64) -> Result<(), ServiceError> {
        let now = Utc::now().timestamp();
        self.consumed.retain(|_, entry_exp| *entry_exp > now);

        let sig = TokenCodec::signature_bytes(token).ok_or(ServiceError::InvalidOrExpiredToken)?;
        if self.consumed.insert(hex::encode(sig), exp).is_some() {
            return Err(ServiceError::InvalidOrExpiredToken);
        }
        Ok(())
    }
}

fn claims_to_map(claims: &ApprovalClaims) -> Map<String, Value> {
    match serde_json::to_value(claims) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Human-readable approval request sent to the process owner.
pub fn build_approval_email_body(row: &InventoryRow, confirm_url: &str, reject_url: &str) -> String {
    format!(
        "🔔 Reorder Approval Needed\n\n\
         SKU: {}\n\
         Item: {}\n\
         On hand: {} (threshold: {})\n\
         Suggested order qty: {}\n\n\
         Supplier: {} <{}>\n\n\
         [Confirm] {}\n\
         [Reject]  {}\n",
        row.field(COL_ITEM_SKU),
        row.field(COL_ITEM_NAME),
        row.field(COL_ON_HAND_QTY),
        row.field(COL_REORDER_THRESHOLD),
        row.field(COL_ORDER_QTY),
        row.field(COL_SUPPLIER_NAME),
        row.field(COL_SUPPLIER_EMAIL),
        confirm_url,
        reject_url,
    )
}

/// Plain-text purchase-order document composed from the token payload.
pub fn draft_po_text(claims: &ApprovalClaims) -> String {
    format!(
        "Purchase Order (Draft)\n\
         SKU: {}\n\
         Item: {}\n\
         Quantity: {}\n\
         Ship-to: <YOUR ADDRESS HERE>\n\
         Provider: {} <{}>\n",
        claims.sku, claims.item_name, claims.qty, claims.supplier_name, claims.supplier_email,
    )
}
