//! Ledger gateway: the seam between the workflow and the external tabular
//! store holding inventory rows and the append-only purchase-order log.
//!
//! The real spreadsheet client lives outside this service; the crate ships
//! the contract plus an in-memory backend with the same shape (header row,
//! string cells, linear sku scan) used for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{InventoryRow, PoLogEntry, COL_ITEM_SKU, COL_LAST_CHECKED, COL_NOTES};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger backend error: {0}")]
    Backend(String),
}

/// Result of annotating a row. A vanished sku (row deleted between detection
/// and resolution) is reported, not raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotateOutcome {
    Updated,
    NotFound,
}

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// All inventory rows, in sheet order.
    async fn read_inventory_rows(&self) -> Result<Vec<InventoryRow>, LedgerError>;

    /// Sets `last_checked` (and, when `note` is given and a notes column
    /// exists, the note cell) on the row with the given sku. Lookup is a
    /// linear scan; an absent sku yields `NotFound`.
    async fn annotate_row(
        &self,
        sku: &str,
        last_checked: DateTime<Utc>,
        note: Option<&str>,
    ) -> Result<AnnotateOutcome, LedgerError>;

    /// Appends one entry to the purchase-order log.
    async fn append_log_entry(&self, entry: &PoLogEntry) -> Result<(), LedgerError>;
}

#[derive(Debug, Default)]
struct TabularState {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    po_log: Vec<PoLogEntry>,
}

/// Seedable in-memory ledger with the same header-row layout as the external
/// spreadsheet.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<TabularState>,
}

impl InMemoryLedger {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            state: RwLock::new(TabularState {
                headers,
                rows,
                po_log: Vec::new(),
            }),
        }
    }

    /// Empty ledger with the standard inventory columns.
    pub fn with_standard_headers() -> Self {
        let headers = [
            COL_ITEM_SKU,
            "item_name",
            "on_hand_qty",
            "reorder_threshold",
            COL_LAST_CHECKED,
            "supplier_name",
            "supplier_email",
            "order_qty",
            COL_NOTES,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        Self::new(headers, Vec::new())
    }

    pub async fn push_row(&self, cells: Vec<String>) {
        self.state.write().await.rows.push(cells);
    }

    /// Snapshot of the PO log, oldest first.
    pub async fn log_entries(&self) -> Vec<PoLogEntry> {
        self.state.read().await.po_log.clone()
    }

    /// Current value of one cell, addressed by sku and column name.
    pub async fn cell(&self, sku: &str, column: &str) -> Option<String> {
        let state = self.state.read().await;
        let sku_col = state.headers.iter().position(|h| h == COL_ITEM_SKU)?;
        let col = state.headers.iter().position(|h| h == column)?;
        state
            .rows
            .iter()
            .find(|r| r.get(sku_col).map(String::as_str) == Some(sku))
            .and_then(|r| r.get(col).cloned())
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn read_inventory_rows(&self) -> Result<Vec<InventoryRow>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .iter()
            .map(|cells| InventoryRow::from_header_and_cells(&state.headers, cells))
            .collect())
    }

    async fn annotate_row(
        &self,
        sku: &str,
        last_checked: DateTime<Utc>,
        note: Option<&str>,
    ) -> Result<AnnotateOutcome, LedgerError> {
        let mut state = self.state.write().await;
        let sku_col = match state.headers.iter().position(|h| h == COL_ITEM_SKU) {
            Some(i) => i,
            None => return Ok(AnnotateOutcome::NotFound),
        };
        let last_checked_col = state.headers.iter().position(|h| h == COL_LAST_CHECKED);
        let notes_col = state.headers.iter().position(|h| h == COL_NOTES);

        let row = state
            .rows
            .iter_mut()
            .find(|r| r.get(sku_col).map(String::as_str) == Some(sku));
        let Some(row) = row else {
            return Ok(AnnotateOutcome::NotFound);
        };

        if let Some(col) = last_checked_col {
            if row.len() <= col {
                row.resize(col + 1, String::new());
            }
            row[col] = last_checked.to_rfc3339();
        }
        if let (Some(col), Some(note)) = (notes_col, note.filter(|n| !n.is_empty())) {
            if row.len() <= col {
                row.resize(col + 1, String::new());
            }
            row[col] = note.to_string();
        }
        Ok(AnnotateOutcome::Updated)
    }

    async fn append_log_entry(&self, entry: &PoLogEntry) -> Result<(), LedgerError> {
        self.state.write().await.po_log.push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> InMemoryLedger {
        InMemoryLedger::new(
            vec![
                "item_sku".into(),
                "item_name".into(),
                "last_checked".into(),
                "notes".into(),
            ],
            vec![
                vec!["A1".into(), "Bolt".into(), "2024-01-01T00:00:00Z".into(), "".into()],
                vec!["B2".into(), "Nut".into()], // short row
            ],
        )
    }

    #[tokio::test]
    async fn short_rows_are_padded_on_read() {
        let ledger = seeded();
        let rows = ledger.read_inventory_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].field("item_sku"), "B2");
        assert_eq!(rows[1].field("last_checked"), "");
    }

    #[tokio::test]
    async fn annotate_updates_last_checked_and_note() {
        let ledger = seeded();
        let now = Utc::now();
        let outcome = ledger.annotate_row("A1", now, Some("Confirmed by owner")).await.unwrap();
        assert_eq!(outcome, AnnotateOutcome::Updated);
        assert_eq!(ledger.cell("A1", "last_checked").await.unwrap(), now.to_rfc3339());
        assert_eq!(ledger.cell("A1", "notes").await.unwrap(), "Confirmed by owner");
    }

    #[tokio::test]
    async fn annotate_extends_short_rows() {
        let ledger = seeded();
        let now = Utc::now();
        assert_eq!(
            ledger.annotate_row("B2", now, Some("Rejected by owner")).await.unwrap(),
            AnnotateOutcome::Updated
        );
        assert_eq!(ledger.cell("B2", "notes").await.unwrap(), "Rejected by owner");
    }

    #[tokio::test]
    async fn missing_sku_reports_not_found() {
        let ledger = seeded();
        let outcome = ledger.annotate_row("ZZ", Utc::now(), None).await.unwrap();
        assert_eq!(outcome, AnnotateOutcome::NotFound);
    }
}
