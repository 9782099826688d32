//! 对账计划执行
//!
//! Applies a [`ReconciliationPlan`] to the object store in a fixed order:
//!
//! 1. soft-delete tags on `to_remove`
//! 2. promotion of `to_add` (new identity, one batch copy)
//! 3. tag removal on `to_restore`
//!
//! The steps are not atomic. A failure leaves earlier steps applied and
//! nothing is retried or rolled back.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::{
    ExpenseReceiptsRequest, ReceiptCategory, ReceiptContentType, ReceiptRecord,
    ReceiptRequestEntry, ReconciliationPlan,
};
use crate::storage::{ObjectStore, ReceiptPathKeys, SourceDestKeyMap};
use crate::utils::{HeadDetailsCache, IdGenerator};

pub struct CommitExecutor {
    store: Arc<dyn ObjectStore>,
    cache: HeadDetailsCache,
    path_keys: ReceiptPathKeys,
    bucket: String,
    soft_delete_tags: HashMap<String, String>,
    id_generator: Arc<dyn IdGenerator>,
}

impl CommitExecutor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        cache: HeadDetailsCache,
        path_keys: ReceiptPathKeys,
        soft_delete_tags: HashMap<String, String>,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Self {
        let bucket = cache.bucket().to_string();
        Self {
            store,
            cache,
            path_keys,
            bucket,
            soft_delete_tags,
            id_generator,
        }
    }

    /// Returns the receipts the expense holds afterwards:
    /// `unchanged`, then the promoted ones, then the restored ones.
    pub async fn commit(
        &self,
        plan: &ReconciliationPlan,
        request: Option<&ExpenseReceiptsRequest>,
        category: ReceiptCategory,
        expense_id: &str,
        user_id: &str,
    ) -> Result<Vec<ReceiptRecord>> {
        let remove_keys = self.persisted_keys(&plan.to_remove, category, expense_id, user_id);
        if !remove_keys.is_empty() {
            self.store
                .add_tags(&self.bucket, &remove_keys, &self.soft_delete_tags)
                .await
                .map_err(|e| e.with_context("soft-delete receipts"))?;
            info!(count = remove_keys.len(), "soft-deleted receipts");
        }

        let promoted = match request {
            None if !plan.to_add.is_empty() => {
                return Err(AppError::missing_prerequisite(
                    "expense request is missing, so receipts cannot be added",
                ));
            }
            Some(request) if !plan.to_add.is_empty() => {
                self.promote(&plan.to_add, request, category, expense_id, user_id)
                    .await?
            }
            _ => Vec::new(),
        };

        let restore_keys = self.persisted_keys(&plan.to_restore, category, expense_id, user_id);
        if !restore_keys.is_empty() {
            self.store
                .delete_tags(&self.bucket, &restore_keys)
                .await
                .map_err(|e| e.with_context("restore receipts"))?;
            info!(count = restore_keys.len(), "restored receipts");
        }

        Ok(plan
            .unchanged
            .iter()
            .cloned()
            .chain(promoted)
            .chain(plan.to_restore.iter().cloned())
            .collect())
    }

    async fn promote(
        &self,
        to_add: &[ReceiptRequestEntry],
        request: &ExpenseReceiptsRequest,
        category: ReceiptCategory,
        expense_id: &str,
        user_id: &str,
    ) -> Result<Vec<ReceiptRecord>> {
        let staged_expense_id = request.expense_id.as_deref().ok_or_else(|| {
            AppError::missing_prerequisite("expense request has no id to locate staged receipts")
        })?;

        let promotions = to_add.iter().map(|entry| async move {
            let source_key = self.path_keys.staged_key(
                category,
                user_id,
                staged_expense_id,
                entry.staged_object_id(),
            );
            let stat = self
                .cache
                .get(&source_key)
                .await
                .ok_or_else(|| AppError::not_found(source_key.clone()))?;
            let content_type = stat
                .content_type
                .as_deref()
                .and_then(ReceiptContentType::from_mime)
                .ok_or_else(|| AppError::not_found(source_key.clone()))?;

            let record = ReceiptRecord::new(
                self.id_generator.generate(),
                entry.name.clone(),
                content_type,
                stat.content_length,
            );
            let destination_key =
                self.path_keys
                    .persisted_key(category, user_id, expense_id, &record.id);
            Ok::<_, AppError>((record, SourceDestKeyMap::new(source_key, destination_key)))
        });

        let (records, key_maps): (Vec<ReceiptRecord>, Vec<SourceDestKeyMap>) =
            join_all(promotions)
                .await
                .into_iter()
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .unzip();

        self.store
            .copy(&self.bucket, &key_maps)
            .await
            .map_err(|e| e.with_context("promote receipts"))?;
        debug!(count = records.len(), "promoted staged receipts");
        Ok(records)
    }

    fn persisted_keys(
        &self,
        records: &[ReceiptRecord],
        category: ReceiptCategory,
        expense_id: &str,
        user_id: &str,
    ) -> Vec<String> {
        records
            .iter()
            .map(|rct| {
                self.path_keys
                    .persisted_key(category, user_id, expense_id, &rct.id)
            })
            .collect()
    }
}

impl std::fmt::Debug for CommitExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitExecutor")
            .field("bucket", &self.bucket)
            .field("path_keys", &self.path_keys)
            .field("soft_delete_tags", &self.soft_delete_tags)
            .finish()
    }
}
