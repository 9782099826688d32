//! 收据对账计划
//!
//! Compares the receipts of an expense update request with the persisted
//! receipts and decides which to add, soft-delete and keep.
//!
//! 1. Split request and persisted receipts by identity
//! 2. Validate every add candidate's staged object, in request order
//! 3. Re-upload detection: a candidate whose staged object has the same
//!    content type and name as a persisted receipt keeps that receipt
//!
//! Any invalid candidate rejects the whole plan.

use futures::future::join_all;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::models::{
    ExpenseReceiptsRequest, PlanOutcome, ReceiptRecord, ReceiptRequestEntry, ReconciliationPlan,
};
use crate::services::validation_gate::ValidationGate;
use crate::storage::ReceiptPathKeys;

#[derive(Debug, Clone)]
pub struct ReconciliationPlanner {
    gate: ValidationGate,
    path_keys: ReceiptPathKeys,
}

impl ReconciliationPlanner {
    pub fn new(gate: ValidationGate, path_keys: ReceiptPathKeys) -> Self {
        Self { gate, path_keys }
    }

    pub async fn plan(
        &self,
        request: &ExpenseReceiptsRequest,
        persisted: &[ReceiptRecord],
        user_id: &str,
    ) -> PlanOutcome {
        let persisted_ids: HashSet<&str> = persisted.iter().map(|r| r.id.as_str()).collect();
        let request_ids: HashSet<&str> = request.receipt_ids().collect();

        let add_candidates: Vec<&ReceiptRequestEntry> = request
            .receipts
            .iter()
            .filter(|rct| match rct.id.as_deref() {
                Some(id) if !id.is_empty() => !persisted_ids.contains(id),
                _ => true,
            })
            .collect();

        let (unchanged, to_remove): (Vec<&ReceiptRecord>, Vec<&ReceiptRecord>) = persisted
            .iter()
            .partition(|rct| request_ids.contains(rct.id.as_str()));

        let invalid_count = self.count_invalid_candidates(request, &add_candidates, user_id).await;
        if invalid_count > 0 {
            warn!(invalid_count, "rejecting receipt update with invalid additions");
            return PlanOutcome::Rejected { invalid_count };
        }

        let matches = self
            .find_reuploads(request, &add_candidates, persisted, user_id)
            .await;

        let mut plan = ReconciliationPlan::default();
        let mut matched_ids: HashSet<&str> = HashSet::new();
        for (candidate, matched) in add_candidates.iter().zip(&matches) {
            match matched {
                Some(record) => {
                    matched_ids.insert(record.id.as_str());
                }
                None => plan.to_add.push((*candidate).clone()),
            }
        }

        plan.to_remove = to_remove
            .into_iter()
            .filter(|rct| !matched_ids.contains(rct.id.as_str()))
            .cloned()
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        plan.unchanged = unchanged
            .into_iter()
            .chain(matches.iter().flatten().copied())
            .filter(|&rct| seen.insert(rct.id.as_str()))
            .cloned()
            .collect();

        debug!(
            to_add = plan.to_add.len(),
            to_remove = plan.to_remove.len(),
            unchanged = plan.unchanged.len(),
            "receipt plan ready"
        );
        PlanOutcome::Planned(plan)
    }

    fn staged_key(
        &self,
        request: &ExpenseReceiptsRequest,
        entry: &ReceiptRequestEntry,
        user_id: &str,
    ) -> Option<String> {
        let expense_id = request.expense_id.as_deref()?;
        Some(self.path_keys.staged_key(
            request.belongs_to,
            user_id,
            expense_id,
            entry.staged_object_id(),
        ))
    }

    async fn count_invalid_candidates(
        &self,
        request: &ExpenseReceiptsRequest,
        candidates: &[&ReceiptRequestEntry],
        user_id: &str,
    ) -> usize {
        let mut invalid_count = 0;
        for entry in candidates {
            let valid = match self.staged_key(request, entry, user_id) {
                Some(key) => self.gate.is_valid_staged_object(&key).await,
                None => false,
            };
            if !valid {
                warn!(receipt = ?entry, "found invalid add action");
                invalid_count += 1;
            }
        }
        invalid_count
    }

    async fn find_reuploads<'a>(
        &self,
        request: &ExpenseReceiptsRequest,
        candidates: &[&ReceiptRequestEntry],
        persisted: &'a [ReceiptRecord],
        user_id: &str,
    ) -> Vec<Option<&'a ReceiptRecord>> {
        let lookups = candidates.iter().map(|entry| async move {
            let key = self.staged_key(request, entry, user_id)?;
            let stat = self.gate.cache().get(&key).await?;
            let content_type = stat.content_type?;
            persisted
                .iter()
                .find(|rct| rct.content_type.as_mime() == content_type && rct.name == entry.name)
        });
        join_all(lookups).await
    }
}
