//! 业务服务层
//!
//! - [`ValidationGate`]: staged-object checks backed by the head cache
//! - [`ReconciliationPlanner`]: request vs. persisted receipt diff
//! - [`CommitExecutor`]: applies a plan to the object store
//! - [`ExpenseReceiptService`]: wires the three together

pub mod commit_executor;
pub mod receipt_service;
pub mod reconciliation_planner;
pub mod validation_gate;

pub use commit_executor::CommitExecutor;
pub use receipt_service::{ExpenseReceiptService, ReceiptUpdate};
pub use reconciliation_planner::ReconciliationPlanner;
pub use validation_gate::ValidationGate;
