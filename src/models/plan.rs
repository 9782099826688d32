//! Reconciliation plan: the add / remove / unchanged / restore split for
//! one expense update.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::receipt::{ReceiptRecord, ReceiptRequestEntry};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationPlan {
    /// New uploads to promote from the staging area
    pub to_add: Vec<ReceiptRequestEntry>,
    /// Persisted receipts to soft-delete
    pub to_remove: Vec<ReceiptRecord>,
    pub unchanged: Vec<ReceiptRecord>,
    /// Soft-deleted receipts to bring back
    pub to_restore: Vec<ReceiptRecord>,
}

impl ReconciliationPlan {
    /// Plan for deleting the owning expense: every receipt is soft-deleted.
    pub fn remove_all(persisted: &[ReceiptRecord]) -> Self {
        Self {
            to_remove: persisted.to_vec(),
            ..Self::default()
        }
    }

    /// Plan for un-deleting the owning expense: every receipt loses its
    /// soft-delete tags.
    pub fn restore_all(persisted: &[ReceiptRecord]) -> Self {
        Self {
            to_restore: persisted.to_vec(),
            ..Self::default()
        }
    }

    /// True when committing the plan would not touch the object store.
    pub fn has_no_store_changes(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty() && self.to_restore.is_empty()
    }

    /// Identities referenced by the plan, per bucket. Add entries without an
    /// identity are skipped.
    pub fn bucket_ids(&self) -> PlanBucketIds {
        let records = |list: &[ReceiptRecord]| list.iter().map(|r| r.id.clone()).collect();
        PlanBucketIds {
            to_add: self.to_add.iter().filter_map(|r| r.id.clone()).collect(),
            to_remove: records(&self.to_remove),
            unchanged: records(&self.unchanged),
            to_restore: records(&self.to_restore),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanBucketIds {
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
    pub unchanged: BTreeSet<String>,
    pub to_restore: BTreeSet<String>,
}

impl PlanBucketIds {
    pub fn union(&self) -> BTreeSet<String> {
        self.to_add
            .iter()
            .chain(&self.to_remove)
            .chain(&self.unchanged)
            .chain(&self.to_restore)
            .cloned()
            .collect()
    }

    /// True when no identity sits in more than one bucket.
    pub fn is_disjoint(&self) -> bool {
        let total =
            self.to_add.len() + self.to_remove.len() + self.unchanged.len() + self.to_restore.len();
        total == self.union().len()
    }
}

/// Result of planning. A rejection is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Planned(ReconciliationPlan),
    Rejected { invalid_count: usize },
}

impl PlanOutcome {
    pub fn plan(&self) -> Option<&ReconciliationPlan> {
        match self {
            PlanOutcome::Planned(plan) => Some(plan),
            PlanOutcome::Rejected { .. } => None,
        }
    }

    pub fn into_plan(self) -> Option<ReconciliationPlan> {
        match self {
            PlanOutcome::Planned(plan) => Some(plan),
            PlanOutcome::Rejected { .. } => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, PlanOutcome::Rejected { .. })
    }
}
