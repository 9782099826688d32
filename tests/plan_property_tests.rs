//! 对账计划属性测试
//!
//! Random mixes of kept, dropped, new and re-uploaded receipts must always
//! produce a disjoint plan that is stable once committed.

use expense_receipts::{
    ExpenseReceiptService, ExpenseReceiptsRequest, InMemoryObjectStore, ReceiptCategory,
    ReceiptContentType, ReceiptRecord, ReceiptRequestEntry, ReceiptsConfig,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

const BUCKET: &str = "bucket";
const USER: &str = "u";
const EXPENSE: &str = "e";

#[derive(Debug, Clone)]
struct Case {
    /// One flag per persisted receipt: still referenced by the request
    kept: Vec<bool>,
    /// Sizes of brand new uploads
    new_uploads: Vec<u64>,
    /// Indices of persisted receipts uploaded again under a new name slot
    reuploads: Vec<usize>,
}

fn case_strategy() -> impl Strategy<Value = Case> {
    prop::collection::vec(any::<bool>(), 0..=3).prop_flat_map(|kept| {
        let persisted = kept.len();
        let reuploads = if persisted == 0 {
            Just(Vec::new()).boxed()
        } else {
            prop::collection::vec(0..persisted, 0..=2).boxed()
        };
        (
            Just(kept),
            prop::collection::vec(1025u64..10 * 1024 * 1024, 0..=2),
            reuploads,
        )
            .prop_map(|(kept, new_uploads, reuploads)| Case {
                kept,
                new_uploads,
                reuploads,
            })
    })
}

fn staged_key(segment: &str) -> String {
    format!("temp/purchase/{}/{}/{}", USER, EXPENSE, segment)
}

fn build(case: &Case, store: &InMemoryObjectStore) -> (Vec<ReceiptRecord>, ExpenseReceiptsRequest) {
    let persisted: Vec<ReceiptRecord> = (0..case.kept.len())
        .map(|i| {
            ReceiptRecord::new(
                format!("p{}", i),
                format!("file{}.pdf", i),
                ReceiptContentType::Pdf,
                Some(4096),
            )
        })
        .collect();
    for rct in &persisted {
        let key = format!("receipts/purchase/{}/{}/{}", USER, EXPENSE, rct.id);
        store.put_object(BUCKET, &key, "application/pdf", 4096);
    }

    let mut receipts: Vec<ReceiptRequestEntry> = persisted
        .iter()
        .zip(&case.kept)
        .filter(|(_, kept)| **kept)
        .map(|(rct, _)| rct.to_request_entry(EXPENSE, ReceiptCategory::Purchase).unwrap())
        .collect();

    for (j, size) in case.new_uploads.iter().enumerate() {
        let name = format!("new{}.png", j);
        store.put_object(BUCKET, &staged_key(&name), "image/png", *size);
        receipts.push(ReceiptRequestEntry::new_upload(
            name,
            ReceiptContentType::Png,
            EXPENSE,
            ReceiptCategory::Purchase,
        ));
    }

    for (j, index) in case.reuploads.iter().enumerate() {
        let id = format!("re-{}", j);
        store.put_object(BUCKET, &staged_key(&id), "application/pdf", 4096);
        receipts.push(
            ReceiptRequestEntry::new_upload(
                persisted[*index].name.clone(),
                ReceiptContentType::Pdf,
                EXPENSE,
                ReceiptCategory::Purchase,
            )
            .with_id(id),
        );
    }

    let request =
        ExpenseReceiptsRequest::new(Some(EXPENSE.to_string()), ReceiptCategory::Purchase, receipts);
    (persisted, request)
}

fn ids(records: &[ReceiptRecord]) -> BTreeSet<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_plan_partitions_persisted_receipts(case in case_strategy()) {
        let store = Arc::new(InMemoryObjectStore::new());
        let (persisted, request) = build(&case, &store);
        let service =
            ExpenseReceiptService::with_uuid_ids(ReceiptsConfig::for_bucket(BUCKET), store).unwrap();

        let plan = tokio_test::block_on(service.plan(&request, &persisted, USER))
            .into_plan()
            .expect("all staged objects are valid");

        prop_assert!(plan.bucket_ids().is_disjoint());
        prop_assert!(plan.to_restore.is_empty());

        let mut covered = ids(&plan.unchanged);
        covered.extend(ids(&plan.to_remove));
        prop_assert_eq!(covered, ids(&persisted));

        let reuploaded: BTreeSet<usize> = case.reuploads.iter().copied().collect();
        prop_assert_eq!(plan.to_add.len(), case.new_uploads.len());
        for index in reuploaded {
            prop_assert!(plan.unchanged.iter().any(|r| r.id == persisted[index].id));
        }
    }

    #[test]
    fn prop_committed_state_replans_to_no_changes(case in case_strategy()) {
        let store = Arc::new(InMemoryObjectStore::new());
        let (persisted, request) = build(&case, &store);
        let service =
            ExpenseReceiptService::with_uuid_ids(ReceiptsConfig::for_bucket(BUCKET), store).unwrap();

        let committed = tokio_test::block_on(service.update_receipts(&request, &persisted, USER))
            .unwrap()
            .receipts()
            .expect("update is applied")
            .to_vec();
        let echoed: Vec<ReceiptRequestEntry> = committed
            .iter()
            .map(|r| r.to_request_entry(EXPENSE, ReceiptCategory::Purchase).unwrap())
            .collect();
        let again = ExpenseReceiptsRequest::new(
            Some(EXPENSE.to_string()),
            ReceiptCategory::Purchase,
            echoed,
        );

        let plan = tokio_test::block_on(service.plan(&again, &committed, USER))
            .into_plan()
            .unwrap();
        prop_assert!(plan.to_add.is_empty());
        prop_assert!(plan.to_remove.is_empty());
        prop_assert_eq!(ids(&plan.unchanged), ids(&committed));

        // Same request again: uploads are matched to the records they produced.
        let plan = tokio_test::block_on(service.plan(&request, &committed, USER))
            .into_plan()
            .unwrap();
        prop_assert!(plan.to_add.is_empty());
        prop_assert!(plan.to_remove.is_empty());
        prop_assert_eq!(ids(&plan.unchanged), ids(&committed));
    }
}
