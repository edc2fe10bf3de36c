//! Domain types shared across the reorder workflow: inventory rows as they
//! come off the ledger, approval token claims, and purchase-order log entries.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical column names the workflow reads from the inventory ledger.
pub const COL_ITEM_SKU: &str = "item_sku";
pub const COL_ITEM_NAME: &str = "item_name";
pub const COL_ON_HAND_QTY: &str = "on_hand_qty";
pub const COL_REORDER_THRESHOLD: &str = "reorder_threshold";
pub const COL_LAST_CHECKED: &str = "last_checked";
pub const COL_SUPPLIER_NAME: &str = "supplier_name";
pub const COL_SUPPLIER_EMAIL: &str = "supplier_email";
pub const COL_ORDER_QTY: &str = "order_qty";
pub const COL_NOTES: &str = "notes";

/// One inventory row, keyed by the ledger's header row. All values are kept
/// as strings; numeric and timestamp interpretation happens in the rule
/// evaluator so a malformed cell can exclude a row instead of failing a cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryRow {
    #[serde(flatten)]
    fields: HashMap<String, String>,
}

impl InventoryRow {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    /// Builds a row from a header row zipped with cell values. Short rows are
    /// padded with empty cells, matching how the spreadsheet reports them.
    pub fn from_header_and_cells(headers: &[String], cells: &[String]) -> Self {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let value = cells.get(i).cloned().unwrap_or_default();
                (h.trim().to_string(), value)
            })
            .collect();
        Self { fields }
    }

    /// Returns the raw cell value, or an empty string when the column is
    /// absent. Mirrors the lenient reads the rest of the workflow relies on.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn sku(&self) -> &str {
        self.field(COL_ITEM_SKU)
    }
}

/// A row that passed the reorder rule in the current evaluation cycle.
/// Ephemeral: once a token is minted for it, all later state lives inside
/// the token and the external ledger.
#[derive(Debug, Clone)]
pub struct ReorderCandidate {
    pub row: InventoryRow,
}

impl ReorderCandidate {
    pub fn new(row: InventoryRow) -> Self {
        Self { row }
    }

    pub fn summary(&self) -> CandidateSummary {
        let r = &self.row;
        CandidateSummary {
            item_sku: r.field(COL_ITEM_SKU).to_string(),
            item_name: r.field(COL_ITEM_NAME).to_string(),
            supplier_name: r.field(COL_SUPPLIER_NAME).to_string(),
            supplier_email: r.field(COL_SUPPLIER_EMAIL).to_string(),
            on_hand_qty: r.field(COL_ON_HAND_QTY).to_string(),
            reorder_threshold: r.field(COL_REORDER_THRESHOLD).to_string(),
            order_qty: r.field(COL_ORDER_QTY).to_string(),
            last_checked: r.field(COL_LAST_CHECKED).to_string(),
        }
    }
}

/// Simplified candidate view returned by the run-once admin endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub item_sku: String,
    pub item_name: String,
    pub supplier_name: String,
    pub supplier_email: String,
    pub on_hand_qty: String,
    pub reorder_threshold: String,
    pub order_qty: String,
    pub last_checked: String,
}

/// Payload carried inside a signed approval token: the minimum needed to
/// complete a resolution without re-reading the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalClaims {
    pub sku: String,
    pub qty: String,
    pub supplier_email: String,
    pub supplier_name: String,
    pub item_name: String,
    /// Absolute expiry, epoch seconds. Injected by the token codec at mint
    /// time; callers never set it.
    #[serde(default)]
    pub exp: i64,
}

impl ApprovalClaims {
    pub fn from_row(row: &InventoryRow) -> Self {
        Self {
            sku: row.field(COL_ITEM_SKU).to_string(),
            qty: row.field(COL_ORDER_QTY).to_string(),
            supplier_email: row.field(COL_SUPPLIER_EMAIL).to_string(),
            supplier_name: row.field(COL_SUPPLIER_NAME).to_string(),
            item_name: row.field(COL_ITEM_NAME).to_string(),
            exp: 0,
        }
    }
}

/// Outcome of the supplier purchase-order send on the confirm path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoStatus {
    Sent,
    Failed,
    /// Reject path: no purchase order is ever sent.
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl fmt::Display for PoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoStatus::Sent => write!(f, "sent"),
            PoStatus::Failed => write!(f, "failed"),
            PoStatus::NotApplicable => write!(f, "n/a"),
        }
    }
}

/// The owner's recorded decision for a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerDecision {
    Confirmed,
    Rejected,
}

impl fmt::Display for OwnerDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerDecision::Confirmed => write!(f, "confirmed"),
            OwnerDecision::Rejected => write!(f, "rejected"),
        }
    }
}

/// Decision submitted by the owner on the resolve endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Reject,
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirm" => Ok(Decision::Confirm),
            "reject" => Ok(Decision::Reject),
            other => Err(other.to_string()),
        }
    }
}

/// Fixed column order of the append-only purchase-order log.
pub const PO_LOG_HEADERS: [&str; 8] = [
    "po_id",
    "sku",
    "qty",
    "created_at",
    "status",
    "owner_decision",
    "supplier_email",
    "metadata",
];

/// One audit record in the purchase-order log. Created exactly once per
/// resolution and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoLogEntry {
    pub po_id: String,
    pub sku: String,
    pub qty: String,
    pub created_at: DateTime<Utc>,
    pub status: PoStatus,
    pub owner_decision: OwnerDecision,
    pub supplier_email: String,
    /// Serialized small mapping, currently just `{"item_name": ...}`.
    pub metadata: String,
}

impl PoLogEntry {
    /// Derives a best-effort unique id from the sku and the wall clock.
    /// Sub-second duplicate resolutions for one sku can collide; the log is
    /// append-only so both rows are kept either way.
    pub fn new(
        claims: &ApprovalClaims,
        status: PoStatus,
        owner_decision: OwnerDecision,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            po_id: format!("{}-{}", claims.sku, now.timestamp()),
            sku: claims.sku.clone(),
            qty: claims.qty.clone(),
            created_at: now,
            status,
            owner_decision,
            supplier_email: claims.supplier_email.clone(),
            metadata: serde_json::json!({ "item_name": claims.item_name }).to_string(),
        }
    }

    /// Cells in `PO_LOG_HEADERS` order, as written to the tabular log.
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.po_id.clone(),
            self.sku.clone(),
            self.qty.clone(),
            self.created_at.to_rfc3339(),
            self.status.to_string(),
            self.owner_decision.to_string(),
            self.supplier_email.clone(),
            self.metadata.clone(),
        ]
    }
}
