//! 暂存对象验证
//!
//! Object-level checks on staged uploads. Every check reads the stat
//! through the shared [`HeadDetailsCache`], so validating one object three
//! ways costs a single store lookup.

use tracing::debug;

use crate::models::{is_valid_file_size, ReceiptContentType};
use crate::storage::ObjectStat;
use crate::utils::HeadDetailsCache;

#[derive(Debug, Clone)]
pub struct ValidationGate {
    cache: HeadDetailsCache,
}

impl ValidationGate {
    pub fn new(cache: HeadDetailsCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &HeadDetailsCache {
        &self.cache
    }

    /// The object exists with a non-zero length and a modification time.
    pub async fn is_valid_path_key(&self, key: &str) -> bool {
        let valid = self
            .cache
            .get(key)
            .await
            .map(|stat| has_content(&stat))
            .unwrap_or(false);
        debug!(key = %key, valid, "checked staged path");
        valid
    }

    pub async fn is_valid_content_type(&self, key: &str) -> bool {
        self.cache
            .get(key)
            .await
            .and_then(|stat| stat.content_type)
            .and_then(|content_type| ReceiptContentType::from_mime(&content_type))
            .is_some()
    }

    pub async fn get_file_size(&self, key: &str) -> u64 {
        self.cache.get_size(key).await
    }

    /// Path, content type and size checks in that order; stops at the
    /// first failure.
    pub async fn is_valid_staged_object(&self, key: &str) -> bool {
        if !self.is_valid_path_key(key).await {
            return false;
        }
        if !self.is_valid_content_type(key).await {
            return false;
        }
        is_valid_file_size(self.get_file_size(key).await)
    }
}

fn has_content(stat: &ObjectStat) -> bool {
    stat.content_length.is_some_and(|length| length > 0) && stat.last_modified.is_some()
}
