//! 费用收据服务
//!
//! Entry points used by the expense handlers: request validation, receipt
//! reconciliation on add/update, and bulk soft-delete / restore when the
//! owning expense is deleted or un-deleted.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result};
use crate::infrastructure::config::ReceiptsConfig;
use crate::models::{
    are_valid_receipts, ExpenseReceiptsRequest, PlanOutcome, ReceiptCategory, ReceiptRecord,
    ReconciliationPlan,
};
use crate::services::commit_executor::CommitExecutor;
use crate::services::reconciliation_planner::ReconciliationPlanner;
use crate::services::validation_gate::ValidationGate;
use crate::storage::{ObjectStore, ReceiptPathKeys};
use crate::utils::{HeadDetailsCache, IdGenerator, UuidV4Generator};

/// Result of a receipt update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptUpdate {
    /// Receipts the expense holds after the update
    Applied(Vec<ReceiptRecord>),
    /// At least one new receipt failed staged-object validation; nothing
    /// was changed in the store
    Rejected { invalid_count: usize },
}

impl ReceiptUpdate {
    pub fn receipts(&self) -> Option<&[ReceiptRecord]> {
        match self {
            ReceiptUpdate::Applied(records) => Some(records),
            ReceiptUpdate::Rejected { .. } => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ReceiptUpdate::Rejected { .. })
    }
}

#[derive(Debug)]
pub struct ExpenseReceiptService {
    config: ReceiptsConfig,
    cache: HeadDetailsCache,
    planner: ReconciliationPlanner,
    executor: CommitExecutor,
}

impl ExpenseReceiptService {
    pub fn new(
        config: ReceiptsConfig,
        store: Arc<dyn ObjectStore>,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        let config = config.validated()?;
        let path_keys = ReceiptPathKeys::from_config(&config);
        let cache = HeadDetailsCache::with_ttl(
            Arc::clone(&store),
            config.bucket_name.clone(),
            config.head_cache_ttl(),
        );

        let planner =
            ReconciliationPlanner::new(ValidationGate::new(cache.clone()), path_keys.clone());
        let executor = CommitExecutor::new(
            store,
            cache.clone(),
            path_keys,
            config.soft_delete_tags.clone(),
            id_generator,
        );

        info!(bucket = %config.bucket_name, "receipt service ready");
        Ok(Self {
            config,
            cache,
            planner,
            executor,
        })
    }

    /// Service assigning UUID v4 identities to promoted receipts.
    pub fn with_uuid_ids(config: ReceiptsConfig, store: Arc<dyn ObjectStore>) -> Result<Self> {
        Self::new(config, store, Arc::new(UuidV4Generator))
    }

    pub fn config(&self) -> &ReceiptsConfig {
        &self.config
    }

    pub fn cache(&self) -> &HeadDetailsCache {
        &self.cache
    }

    /// Field-level and context checks on the request's receipt list.
    pub fn validate_request(&self, request: &ExpenseReceiptsRequest) -> bool {
        are_valid_receipts(
            Some(&request.receipts),
            request.expense_id.as_deref(),
            request.belongs_to,
        )
    }

    /// [`Self::validate_request`] as an error for handlers that reject the
    /// whole request.
    pub fn require_valid_request(&self, request: &ExpenseReceiptsRequest) -> Result<()> {
        if self.validate_request(request) {
            return Ok(());
        }
        Err(AppError::validation_error(format!(
            "{} receipt(s) for expense {:?} failed validation",
            request.receipts.len(),
            request.expense_id.as_deref().unwrap_or("<new>")
        )))
    }

    /// Plan without committing.
    pub async fn plan(
        &self,
        request: &ExpenseReceiptsRequest,
        persisted: &[ReceiptRecord],
        user_id: &str,
    ) -> PlanOutcome {
        self.planner.plan(request, persisted, user_id).await
    }

    /// Reconcile an existing expense's receipts with the request.
    pub async fn update_receipts(
        &self,
        request: &ExpenseReceiptsRequest,
        persisted: &[ReceiptRecord],
        user_id: &str,
    ) -> Result<ReceiptUpdate> {
        let expense_id = request
            .expense_id
            .as_deref()
            .ok_or_else(|| AppError::missing_prerequisite("expense id is missing"))?;
        self.update_receipts_for(request, persisted, expense_id, user_id)
            .await
    }

    /// Like [`Self::update_receipts`], storing promoted receipts under
    /// `expense_id`.
    #[instrument(skip(self, request, persisted), fields(receipts = request.receipts.len(), persisted = persisted.len()))]
    pub async fn update_receipts_for(
        &self,
        request: &ExpenseReceiptsRequest,
        persisted: &[ReceiptRecord],
        expense_id: &str,
        user_id: &str,
    ) -> Result<ReceiptUpdate> {
        let plan = match self.planner.plan(request, persisted, user_id).await {
            PlanOutcome::Planned(plan) => plan,
            PlanOutcome::Rejected { invalid_count } => {
                warn!(invalid_count, "receipt update rejected");
                return Ok(ReceiptUpdate::Rejected { invalid_count });
            }
        };

        let records = self
            .executor
            .commit(&plan, Some(request), request.belongs_to, expense_id, user_id)
            .await?;
        info!(
            added = plan.to_add.len(),
            removed = plan.to_remove.len(),
            total = records.len(),
            "receipts updated"
        );
        Ok(ReceiptUpdate::Applied(records))
    }

    /// Soft-delete every receipt of a deleted expense.
    #[instrument(skip(self, persisted), fields(count = persisted.len()))]
    pub async fn remove_all(
        &self,
        persisted: &[ReceiptRecord],
        category: ReceiptCategory,
        expense_id: &str,
        user_id: &str,
    ) -> Result<Vec<ReceiptRecord>> {
        let plan = ReconciliationPlan::remove_all(persisted);
        self.executor
            .commit(&plan, None, category, expense_id, user_id)
            .await
    }

    /// Clear the soft-delete tags of every receipt of an un-deleted expense.
    #[instrument(skip(self, persisted), fields(count = persisted.len()))]
    pub async fn restore_all(
        &self,
        persisted: &[ReceiptRecord],
        category: ReceiptCategory,
        expense_id: &str,
        user_id: &str,
    ) -> Result<Vec<ReceiptRecord>> {
        let plan = ReconciliationPlan::restore_all(persisted);
        self.executor
            .commit(&plan, None, category, expense_id, user_id)
            .await
    }
}
