//! In-memory [`ObjectStore`] implementation
//!
//! Backs local runs and tests. Every call is counted, stat calls can be
//! slowed down to exercise lookup coalescing, and copy/tag calls can be
//! made to fail to exercise partial-commit behaviour.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::storage::object_store::{ObjectStat, ObjectStore, SourceDestKeyMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: Option<String>,
    pub content_length: u64,
    pub last_modified: DateTime<Utc>,
    pub tags: HashMap<String, String>,
}

impl StoredObject {
    fn stat(&self) -> ObjectStat {
        ObjectStat {
            content_type: self.content_type.clone(),
            content_length: Some(self.content_length),
            last_modified: Some(self.last_modified),
        }
    }
}

/// Per-operation call counters
#[derive(Debug, Default)]
struct CallCounters {
    stat: AtomicU64,
    copy: AtomicU64,
    add_tags: AtomicU64,
    delete_tags: AtomicU64,
}

type ObjectKey = (String, String);

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: DashMap<ObjectKey, StoredObject>,
    calls: CallCounters,
    stat_latency: Option<Duration>,
    fail_copies: AtomicBool,
    fail_tagging: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every stat call by `latency`.
    pub fn with_stat_latency(mut self, latency: Duration) -> Self {
        self.stat_latency = Some(latency);
        self
    }

    pub fn put_object(&self, bucket: &str, key: &str, content_type: &str, content_length: u64) {
        self.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                content_type: Some(content_type.to_string()),
                content_length,
                last_modified: Utc::now(),
                tags: HashMap::new(),
            },
        );
    }

    pub fn remove_object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .remove(&(bucket.to_string(), key.to_string()))
            .map(|(_, object)| object)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn tags(&self, bucket: &str, key: &str) -> Option<HashMap<String, String>> {
        self.object(bucket, key).map(|object| object.tags)
    }

    pub fn fail_copies(&self, fail: bool) {
        self.fail_copies.store(fail, Ordering::SeqCst);
    }

    pub fn fail_tagging(&self, fail: bool) {
        self.fail_tagging.store(fail, Ordering::SeqCst);
    }

    pub fn stat_calls(&self) -> u64 {
        self.calls.stat.load(Ordering::SeqCst)
    }

    pub fn copy_calls(&self) -> u64 {
        self.calls.copy.load(Ordering::SeqCst)
    }

    pub fn add_tags_calls(&self) -> u64 {
        self.calls.add_tags.load(Ordering::SeqCst)
    }

    pub fn delete_tags_calls(&self) -> u64 {
        self.calls.delete_tags.load(Ordering::SeqCst)
    }

    /// Total number of mutating calls (copy + tag operations).
    pub fn mutation_calls(&self) -> u64 {
        self.copy_calls() + self.add_tags_calls() + self.delete_tags_calls()
    }

    fn ensure_exists(&self, bucket: &str, key: &str) -> Result<()> {
        if self.contains(bucket, key) {
            Ok(())
        } else {
            Err(AppError::storage_error(
                format!("NoSuchKey: {}/{}", bucket, key),
                Some(key.to_string()),
            ))
        }
    }

    fn check_tagging_enabled(&self, keys: &[String]) -> Result<()> {
        if self.fail_tagging.load(Ordering::SeqCst) {
            return Err(AppError::storage_error(
                "tagging rejected by store",
                keys.first().cloned(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn stat(&self, bucket: &str, key: &str) -> Result<Option<ObjectStat>> {
        self.calls.stat.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.stat_latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.object(bucket, key).map(|object| object.stat()))
    }

    async fn copy(&self, bucket: &str, key_maps: &[SourceDestKeyMap]) -> Result<()> {
        self.calls.copy.fetch_add(1, Ordering::SeqCst);
        if self.fail_copies.load(Ordering::SeqCst) {
            return Err(AppError::storage_error(
                "copy rejected by store",
                key_maps.first().map(|km| km.source_key.clone()),
            ));
        }

        for km in key_maps {
            self.ensure_exists(bucket, &km.source_key)?;
        }
        for km in key_maps {
            if let Some(mut object) = self.object(bucket, &km.source_key) {
                object.last_modified = Utc::now();
                self.objects
                    .insert((bucket.to_string(), km.destination_key.clone()), object);
            }
            debug!(source = %km.source_key, destination = %km.destination_key, "copied object");
        }
        Ok(())
    }

    async fn add_tags(
        &self,
        bucket: &str,
        keys: &[String],
        tags: &HashMap<String, String>,
    ) -> Result<()> {
        self.calls.add_tags.fetch_add(1, Ordering::SeqCst);
        self.check_tagging_enabled(keys)?;
        for key in keys {
            self.ensure_exists(bucket, key)?;
        }
        for key in keys {
            if let Some(mut object) = self.objects.get_mut(&(bucket.to_string(), key.clone())) {
                object.tags = tags.clone();
            }
        }
        Ok(())
    }

    async fn delete_tags(&self, bucket: &str, keys: &[String]) -> Result<()> {
        self.calls.delete_tags.fetch_add(1, Ordering::SeqCst);
        self.check_tagging_enabled(keys)?;
        for key in keys {
            self.ensure_exists(bucket, key)?;
        }
        for key in keys {
            if let Some(mut object) = self.objects.get_mut(&(bucket.to_string(), key.clone())) {
                object.tags.clear();
            }
        }
        Ok(())
    }
}
