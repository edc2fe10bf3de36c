// Approval workflow orchestration
pub mod approvals;

pub use approvals::{ApprovalService, ApprovalSettings, Resolution};
