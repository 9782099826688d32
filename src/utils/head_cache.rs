//! 对象元数据缓存
//!
//! Short-lived cache of staged-object stat results, shared by the validation
//! gate, the dedup pass and promotion so one request stats each staged
//! object once.
//!
//! - 命中：直接返回缓存的元数据
//! - 未命中：恰好一次底层 stat 调用，并发的相同 key 请求合并为一次
//! - 对象不存在或 stat 失败：不缓存，稍后出现的对象在下次查询时可见

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::models::RECEIPTS_MAX_ALLOWED;
use crate::storage::{ObjectStat, ObjectStore};

/// Capacity covers the staged objects of one request plus the same number
/// again for a concurrent request.
pub const HEAD_CACHE_CAPACITY: u64 = 2 * RECEIPTS_MAX_ALLOWED as u64;
pub const DEFAULT_HEAD_CACHE_TTL: Duration = Duration::from_secs(30);

/// Why a lookup produced no stat. Never stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StatMiss {
    Absent,
    Failed(String),
}

#[derive(Clone)]
pub struct HeadDetailsCache {
    cache: Cache<String, ObjectStat>,
    store: Arc<dyn ObjectStore>,
    bucket: String,
    loads: Arc<AtomicU64>,
}

impl HeadDetailsCache {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self::with_ttl(store, bucket, DEFAULT_HEAD_CACHE_TTL)
    }

    pub fn with_ttl(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(HEAD_CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            store,
            bucket: bucket.into(),
            loads: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Stat of `key`, or `None` when the object is absent or the lookup failed.
    pub async fn get(&self, key: &str) -> Option<ObjectStat> {
        let store = Arc::clone(&self.store);
        let bucket = self.bucket.clone();
        let loads = Arc::clone(&self.loads);
        let owned_key = key.to_string();

        let result = self
            .cache
            .try_get_with(key.to_string(), async move {
                loads.fetch_add(1, Ordering::Relaxed);
                match store.stat(&bucket, &owned_key).await {
                    Ok(Some(stat)) => Ok(stat),
                    Ok(None) => Err(StatMiss::Absent),
                    Err(e) => Err(StatMiss::Failed(e.to_string())),
                }
            })
            .await;

        match result {
            Ok(stat) => Some(stat),
            Err(miss) => {
                match miss.as_ref() {
                    StatMiss::Absent => debug!(key = %key, "object not found"),
                    StatMiss::Failed(reason) => {
                        error!(key = %key, error = %reason, "failed to stat object")
                    }
                }
                None
            }
        }
    }

    /// Content length of `key`, or 0 when unknown.
    pub async fn get_size(&self, key: &str) -> u64 {
        self.get(key)
            .await
            .and_then(|stat| stat.content_length)
            .unwrap_or(0)
    }

    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    /// Number of underlying stat lookups started by this cache.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl std::fmt::Debug for HeadDetailsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadDetailsCache")
            .field("bucket", &self.bucket)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
