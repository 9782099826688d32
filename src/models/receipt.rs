//! 收据数据模型
//!
//! Persisted receipt records, client request entries and the closed sets
//! of content types and categories they draw from.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::validated::{
    validate_receipt_content_type, validate_receipt_id, validate_receipt_name,
};

/// 收据内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptContentType {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "application/pdf")]
    Pdf,
}

impl ReceiptContentType {
    pub const ALL: [ReceiptContentType; 3] = [
        ReceiptContentType::Png,
        ReceiptContentType::Jpeg,
        ReceiptContentType::Pdf,
    ];

    pub fn as_mime(&self) -> &'static str {
        match self {
            ReceiptContentType::Png => "image/png",
            ReceiptContentType::Jpeg => "image/jpeg",
            ReceiptContentType::Pdf => "application/pdf",
        }
    }

    /// Exact match against the three allowed MIME strings.
    pub fn from_mime(value: &str) -> Option<Self> {
        match value {
            "image/png" => Some(ReceiptContentType::Png),
            "image/jpeg" => Some(ReceiptContentType::Jpeg),
            "application/pdf" => Some(ReceiptContentType::Pdf),
            _ => None,
        }
    }
}

impl fmt::Display for ReceiptContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_mime())
    }
}

/// Logical attachment group an expense (and so its receipts) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptCategory {
    Purchase,
    Refund,
    Income,
    Investment,
}

impl ReceiptCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptCategory::Purchase => "purchase",
            ReceiptCategory::Refund => "refund",
            ReceiptCategory::Income => "income",
            ReceiptCategory::Investment => "investment",
        }
    }
}

impl fmt::Display for ReceiptCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 持久化的收据记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRecord {
    pub id: String,
    pub name: String,
    pub content_type: ReceiptContentType,
    /// Absent on records written before sizes were captured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ReceiptRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        content_type: ReceiptContentType,
        size: Option<u64>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content_type,
            size,
        }
    }

    /// Render the record as a client-facing resource of the given expense.
    pub fn to_request_entry(
        &self,
        expense_id: &str,
        belongs_to: ReceiptCategory,
    ) -> Result<ReceiptRequestEntry> {
        if expense_id.trim().is_empty() {
            return Err(AppError::invalid_argument("expenseId is empty"));
        }

        Ok(ReceiptRequestEntry {
            id: Some(self.id.clone()),
            name: self.name.clone(),
            content_type: self.content_type.as_mime().to_string(),
            relation_id: Some(expense_id.to_string()),
            belongs_to,
            size: self.size,
        })
    }
}

/// 客户端请求中的收据条目
///
/// `content_type` keeps the wire value so unknown types reach the
/// validation gate instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRequestEntry {
    #[serde(default)]
    #[validate(custom(function = "validate_receipt_id"))]
    pub id: Option<String>,

    #[validate(custom(function = "validate_receipt_name"))]
    pub name: String,

    #[validate(custom(function = "validate_receipt_content_type"))]
    pub content_type: String,

    #[serde(default)]
    pub relation_id: Option<String>,

    pub belongs_to: ReceiptCategory,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ReceiptRequestEntry {
    /// Entry for a fresh upload: no identity yet.
    pub fn new_upload(
        name: impl Into<String>,
        content_type: ReceiptContentType,
        relation_id: impl Into<String>,
        belongs_to: ReceiptCategory,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            content_type: content_type.as_mime().to_string(),
            relation_id: Some(relation_id.into()),
            belongs_to,
            size: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn content_type(&self) -> Option<ReceiptContentType> {
        ReceiptContentType::from_mime(&self.content_type)
    }

    /// Last segment of the staged object key: the client-side identity
    /// when present, otherwise the uploaded file name.
    pub fn staged_object_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}

/// The receipt part of an expense add/update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseReceiptsRequest {
    /// Absent while the expense itself has not been created yet
    #[serde(default)]
    pub expense_id: Option<String>,
    pub belongs_to: ReceiptCategory,
    #[serde(default)]
    pub receipts: Vec<ReceiptRequestEntry>,
}

impl ExpenseReceiptsRequest {
    pub fn new(
        expense_id: Option<String>,
        belongs_to: ReceiptCategory,
        receipts: Vec<ReceiptRequestEntry>,
    ) -> Self {
        Self {
            expense_id,
            belongs_to,
            receipts,
        }
    }

    /// Non-empty identities carried by the request.
    pub fn receipt_ids(&self) -> impl Iterator<Item = &str> {
        self.receipts
            .iter()
            .filter_map(|rct| rct.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}
