//! 费用收据对账库
//!
//! Keeps the receipt attachments of an expense in sync with the object
//! store when the expense is added, updated, deleted or un-deleted:
//!
//! - 验证：staged uploads are checked for existence, content type and size
//! - 对账：request receipts are diffed against persisted ones
//! - 提交：new receipts are promoted, removed ones are soft-deleted by tag
//!
//! ```no_run
//! use std::sync::Arc;
//! use expense_receipts::{ExpenseReceiptService, InMemoryObjectStore, ReceiptsConfig};
//!
//! # fn main() -> expense_receipts::Result<()> {
//! let store = Arc::new(InMemoryObjectStore::new());
//! let service = ExpenseReceiptService::with_uuid_ids(ReceiptsConfig::load(None)?, store)?;
//! # let _ = service;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use error::{AppError, Result};
pub use infrastructure::config::{ConfigError, ReceiptsConfig};
pub use models::{
    ExpenseReceiptsRequest, PlanOutcome, ReceiptCategory, ReceiptContentType, ReceiptRecord,
    ReceiptRequestEntry, ReconciliationPlan,
};
pub use services::{
    CommitExecutor, ExpenseReceiptService, ReceiptUpdate, ReconciliationPlanner, ValidationGate,
};
pub use storage::{InMemoryObjectStore, ObjectStat, ObjectStore, ReceiptPathKeys, SourceDestKeyMap};
pub use utils::{init_tracing, HeadDetailsCache, IdGenerator, LogFormat, UuidV4Generator};
