//! 数据模型
//!
//! Receipt records and requests, the reconciliation plan, and the
//! stateless validation rules applied to them.

pub mod plan;
pub mod receipt;
pub mod validated;

pub use plan::{PlanBucketIds, PlanOutcome, ReconciliationPlan};
pub use receipt::{
    ExpenseReceiptsRequest, ReceiptCategory, ReceiptContentType, ReceiptRecord,
    ReceiptRequestEntry,
};
pub use validated::{
    are_valid_receipts, is_valid_file_extension, is_valid_file_size, is_valid_filename,
    is_valid_receipt_id, is_valid_receipt_type, RECEIPTS_MAX_ALLOWED,
};
