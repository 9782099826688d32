//! Object store port
//!
//! The reconciliation core only needs four object-store capabilities:
//! metadata lookup, batch copy, and adding/removing object tags. Any
//! backend (S3-compatible client, local emulator, in-memory store) plugs in
//! by implementing [`ObjectStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Metadata returned by a stat (HEAD) call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStat {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One copy instruction within a batch copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDestKeyMap {
    pub source_key: String,
    pub destination_key: String,
}

impl SourceDestKeyMap {
    pub fn new(source_key: impl Into<String>, destination_key: impl Into<String>) -> Self {
        Self {
            source_key: source_key.into(),
            destination_key: destination_key.into(),
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns `Ok(None)` when the object does not exist.
    async fn stat(&self, bucket: &str, key: &str) -> Result<Option<ObjectStat>>;

    /// Copy every source to its destination within `bucket`.
    async fn copy(&self, bucket: &str, key_maps: &[SourceDestKeyMap]) -> Result<()>;

    /// Replace the tag set of every key with `tags`.
    async fn add_tags(
        &self,
        bucket: &str,
        keys: &[String],
        tags: &HashMap<String, String>,
    ) -> Result<()>;

    /// Remove all tags from every key.
    async fn delete_tags(&self, bucket: &str, keys: &[String]) -> Result<()>;
}
