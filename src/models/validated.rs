//! 收据验证规则
//!
//! Stateless predicates on receipt names, extensions, content types and
//! sizes, plus the list-level `are_valid_receipts` check. Entry-level rules
//! are wired into `ReceiptRequestEntry` through `validator` attributes.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::models::receipt::{ReceiptCategory, ReceiptContentType, ReceiptRequestEntry};

/// 每个费用允许的最大收据数
pub const RECEIPTS_MAX_ALLOWED: usize = 5;

pub const FILENAME_MIN_LENGTH: usize = 2;
pub const FILENAME_MAX_LENGTH: usize = 50;

const ONE_KB: u64 = 1024;
const ONE_MB: u64 = 1024 * ONE_KB;

/// Smallest rejected size; valid sizes are strictly greater.
pub const FILESIZE_MIN_BYTES: u64 = ONE_KB;
/// 10 MB upper bound (exclusive), imposed by the upload gateway.
pub const FILESIZE_MAX_BYTES: u64 = 10 * ONE_MB;

/// Accepted file extensions, compared case-sensitively.
pub const ALLOWED_FILE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];

static FILENAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_\s\-+.,@#$%^&]+$").expect("filename pattern is valid")
});

/// Split `name.ext` at the last dot. A name without dots has no extension.
pub fn split_filename_and_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rsplit_once('.') {
        Some((name, extension)) => (name, Some(extension)),
        None => (file_name, None),
    }
}

/// 校验文件名（不含扩展名）
pub fn is_valid_filename(file_name: Option<&str>) -> bool {
    let Some(file_name) = file_name else {
        return false;
    };
    let (name, _) = split_filename_and_extension(file_name);
    if name.is_empty() {
        return false;
    }

    let length = name.chars().count();
    if !(FILENAME_MIN_LENGTH..=FILENAME_MAX_LENGTH).contains(&length) {
        return false;
    }

    FILENAME_REGEX.is_match(name)
}

/// The extension is optional; when present it must be one of the allowed values.
pub fn is_valid_file_extension(file_name: Option<&str>) -> bool {
    let Some(file_name) = file_name else {
        return true;
    };
    match split_filename_and_extension(file_name).1 {
        Some(extension) if !extension.is_empty() => ALLOWED_FILE_EXTENSIONS.contains(&extension),
        _ => true,
    }
}

pub fn is_valid_receipt_type(receipt_type: Option<&str>) -> bool {
    receipt_type
        .and_then(ReceiptContentType::from_mime)
        .is_some()
}

pub fn is_valid_file_size(size: u64) -> bool {
    size > FILESIZE_MIN_BYTES && size < FILESIZE_MAX_BYTES
}

/// Receipt identities are hyphenated UUID v4 strings.
pub fn is_valid_receipt_id(id: &str) -> bool {
    if id.len() != 36 {
        return false;
    }
    uuid::Uuid::parse_str(id)
        .map(|uuid| uuid.get_version_num() == 4)
        .unwrap_or(false)
}

pub(crate) fn validate_receipt_name(name: &str) -> Result<(), ValidationError> {
    if !is_valid_filename(Some(name)) {
        return Err(ValidationError::new("invalid_receipt_name"));
    }
    if !is_valid_file_extension(Some(name)) {
        return Err(ValidationError::new("invalid_receipt_extension"));
    }
    Ok(())
}

pub(crate) fn validate_receipt_content_type(content_type: &str) -> Result<(), ValidationError> {
    if !is_valid_receipt_type(Some(content_type)) {
        return Err(ValidationError::new("invalid_receipt_content_type"));
    }
    Ok(())
}

pub(crate) fn validate_receipt_id(id: &str) -> Result<(), ValidationError> {
    if !is_valid_receipt_id(id) {
        return Err(ValidationError::new("invalid_receipt_id"));
    }
    Ok(())
}

/// 校验整个收据列表
///
/// The list is accepted only when every entry passes; there is no partial
/// acceptance.
pub fn are_valid_receipts(
    receipts: Option<&[ReceiptRequestEntry]>,
    expense_id: Option<&str>,
    belongs_to: ReceiptCategory,
) -> bool {
    let Some(receipts) = receipts else {
        return false;
    };
    if receipts.len() > RECEIPTS_MAX_ALLOWED {
        return false;
    }
    if expense_id.is_none() && !receipts.is_empty() {
        return false;
    }

    let valid_count = receipts
        .iter()
        .filter(|rct| {
            if let Err(errors) = rct.validate() {
                debug!(receipt = ?rct, %errors, "receipt failed field validation");
                return false;
            }
            rct.relation_id.as_deref() == expense_id && rct.belongs_to == belongs_to
        })
        .count();

    debug!(
        valid_count,
        total = receipts.len(),
        "validated receipt list"
    );
    valid_count == receipts.len()
}
