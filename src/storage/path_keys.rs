//! Object key layout
//!
//! ```text
//! <tempPrefix><category>/<userId>/<expenseId>/<receiptId>      staged upload
//! <receiptPrefix><category>/<userId>/<expenseId>/<receiptId>   confirmed receipt
//! ```
//!
//! Bucket lifecycle rules match on these prefixes, so the layout must not
//! change.

use crate::infrastructure::config::ReceiptsConfig;
use crate::models::ReceiptCategory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptPathKeys {
    temp_prefix: String,
    receipt_prefix: String,
}

impl ReceiptPathKeys {
    pub fn new(temp_prefix: impl Into<String>, receipt_prefix: impl Into<String>) -> Self {
        Self {
            temp_prefix: temp_prefix.into(),
            receipt_prefix: receipt_prefix.into(),
        }
    }

    pub fn from_config(config: &ReceiptsConfig) -> Self {
        Self::new(
            config.temp_key_prefix.clone(),
            config.receipt_key_prefix.clone(),
        )
    }

    pub fn staged_key(
        &self,
        category: ReceiptCategory,
        user_id: &str,
        expense_id: &str,
        receipt_id: &str,
    ) -> String {
        build_key(&self.temp_prefix, category, user_id, expense_id, receipt_id)
    }

    pub fn persisted_key(
        &self,
        category: ReceiptCategory,
        user_id: &str,
        expense_id: &str,
        receipt_id: &str,
    ) -> String {
        build_key(&self.receipt_prefix, category, user_id, expense_id, receipt_id)
    }
}

fn build_key(
    prefix: &str,
    category: ReceiptCategory,
    user_id: &str,
    expense_id: &str,
    receipt_id: &str,
) -> String {
    format!(
        "{}{}/{}/{}/{}",
        prefix,
        category.as_str(),
        user_id,
        expense_id,
        receipt_id
    )
}
