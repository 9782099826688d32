//! 收据对账集成测试
//!
//! Drives `ExpenseReceiptService` end to end against the in-memory store.

use expense_receipts::{
    AppError, ExpenseReceiptService, ExpenseReceiptsRequest, InMemoryObjectStore, PlanOutcome,
    ReceiptCategory, ReceiptContentType, ReceiptRecord, ReceiptRequestEntry, ReceiptUpdate,
    ReceiptsConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const BUCKET: &str = "expense-receipts";
const USER: &str = "user-42";
const EXPENSE: &str = "5b1c7a8e-2f3d-4e5a-9b6c-7d8e9f0a1b2c";

struct Fixture {
    store: Arc<InMemoryObjectStore>,
    service: ExpenseReceiptService,
}

fn setup() -> Fixture {
    let store = Arc::new(InMemoryObjectStore::new());
    let counter = AtomicUsize::new(0);
    let service = ExpenseReceiptService::new(
        ReceiptsConfig::for_bucket(BUCKET),
        store.clone(),
        Arc::new(move || format!("new-{}", counter.fetch_add(1, Ordering::SeqCst))),
    )
    .unwrap();
    Fixture { store, service }
}

fn staged_key(segment: &str) -> String {
    format!("temp/purchase/{}/{}/{}", USER, EXPENSE, segment)
}

fn persisted_key(id: &str) -> String {
    format!("receipts/purchase/{}/{}/{}", USER, EXPENSE, id)
}

fn record(id: &str, name: &str, content_type: ReceiptContentType) -> ReceiptRecord {
    ReceiptRecord::new(id, name, content_type, Some(4096))
}

fn upload(name: &str, content_type: ReceiptContentType) -> ReceiptRequestEntry {
    ReceiptRequestEntry::new_upload(name, content_type, EXPENSE, ReceiptCategory::Purchase)
}

fn request(receipts: Vec<ReceiptRequestEntry>) -> ExpenseReceiptsRequest {
    ExpenseReceiptsRequest::new(Some(EXPENSE.to_string()), ReceiptCategory::Purchase, receipts)
}

fn echo(records: &[ReceiptRecord]) -> Vec<ReceiptRequestEntry> {
    records
        .iter()
        .map(|rct| rct.to_request_entry(EXPENSE, ReceiptCategory::Purchase).unwrap())
        .collect()
}

#[tokio::test]
async fn test_unchanged_receipt_makes_no_store_calls() {
    let fx = setup();
    let persisted = vec![record("a", "x.pdf", ReceiptContentType::Pdf)];

    let outcome = fx.service.plan(&request(echo(&persisted)), &persisted, USER).await;
    let plan = outcome.plan().unwrap();
    assert_eq!(plan.unchanged, persisted);
    assert!(plan.to_add.is_empty() && plan.to_remove.is_empty());

    let update = fx
        .service
        .update_receipts(&request(echo(&persisted)), &persisted, USER)
        .await
        .unwrap();
    assert_eq!(update, ReceiptUpdate::Applied(persisted));
    assert_eq!(fx.store.mutation_calls(), 0);
    assert_eq!(fx.store.stat_calls(), 0);
}

#[tokio::test]
async fn test_dropped_receipt_is_soft_deleted() {
    let fx = setup();
    fx.store.put_object(BUCKET, &persisted_key("a"), "application/pdf", 4096);
    let persisted = vec![record("a", "x.pdf", ReceiptContentType::Pdf)];

    let update = fx
        .service
        .update_receipts(&request(vec![]), &persisted, USER)
        .await
        .unwrap();

    assert_eq!(update, ReceiptUpdate::Applied(vec![]));
    let tags = fx.store.tags(BUCKET, &persisted_key("a")).unwrap();
    assert_eq!(tags.get("delete").map(String::as_str), Some("schedule"));
    assert_eq!(fx.store.copy_calls(), 0);
}

#[tokio::test]
async fn test_new_upload_is_promoted() {
    let fx = setup();
    fx.store.put_object(BUCKET, &staged_key("y.png"), "image/png", 20_000);

    let update = fx
        .service
        .update_receipts(&request(vec![upload("y.png", ReceiptContentType::Png)]), &[], USER)
        .await
        .unwrap();

    assert_eq!(
        update,
        ReceiptUpdate::Applied(vec![ReceiptRecord::new(
            "new-0",
            "y.png",
            ReceiptContentType::Png,
            Some(20_000)
        )])
    );
    assert!(fx.store.contains(BUCKET, &persisted_key("new-0")));
    assert_eq!(fx.store.copy_calls(), 1);
    assert_eq!(fx.store.add_tags_calls(), 0);
}

#[tokio::test]
async fn test_absent_staged_object_rejects_update() {
    let fx = setup();
    fx.store.put_object(BUCKET, &persisted_key("a"), "application/pdf", 4096);
    let persisted = vec![record("a", "x.pdf", ReceiptContentType::Pdf)];

    let update = fx
        .service
        .update_receipts(&request(vec![upload("y.png", ReceiptContentType::Png)]), &persisted, USER)
        .await
        .unwrap();

    assert_eq!(update, ReceiptUpdate::Rejected { invalid_count: 1 });
    assert_eq!(fx.store.mutation_calls(), 0);
    assert!(fx.store.tags(BUCKET, &persisted_key("a")).unwrap().is_empty());
}

#[tokio::test]
async fn test_one_invalid_upload_rejects_all() {
    let fx = setup();
    fx.store.put_object(BUCKET, &staged_key("good.png"), "image/png", 20_000);
    fx.store.put_object(BUCKET, &staged_key("huge.pdf"), "application/pdf", 11 * 1024 * 1024);

    let outcome = fx
        .service
        .plan(
            &request(vec![
                upload("good.png", ReceiptContentType::Png),
                upload("huge.pdf", ReceiptContentType::Pdf),
            ]),
            &[],
            USER,
        )
        .await;

    assert_eq!(outcome, PlanOutcome::Rejected { invalid_count: 1 });
    assert_eq!(fx.store.mutation_calls(), 0);
}

#[tokio::test]
async fn test_replanning_after_commit_is_idempotent() {
    let fx = setup();
    fx.store.put_object(BUCKET, &persisted_key("a"), "application/pdf", 4096);
    fx.store.put_object(BUCKET, &persisted_key("b"), "image/jpeg", 4096);
    fx.store.put_object(BUCKET, &staged_key("c.png"), "image/png", 20_000);
    let persisted = vec![
        record("a", "a.pdf", ReceiptContentType::Pdf),
        record("b", "b.jpg", ReceiptContentType::Jpeg),
    ];

    let mut receipts = echo(&persisted[..1]);
    receipts.push(upload("c.png", ReceiptContentType::Png));
    let first = fx
        .service
        .update_receipts(&request(receipts), &persisted, USER)
        .await
        .unwrap();
    let committed = first.receipts().unwrap().to_vec();
    assert_eq!(committed.len(), 2);

    let replanned = fx
        .service
        .plan(&request(echo(&committed)), &committed, USER)
        .await
        .into_plan()
        .unwrap();
    assert!(replanned.to_add.is_empty());
    assert!(replanned.to_remove.is_empty());
    assert_eq!(replanned.unchanged, committed);
}

#[tokio::test]
async fn test_same_request_replans_to_no_changes() {
    let fx = setup();
    let client_id = "8f14e45f-ceea-4e7a-9b1c-2d3e4f5a6b7c";
    fx.store.put_object(BUCKET, &persisted_key("a"), "application/pdf", 4096);
    fx.store.put_object(BUCKET, &staged_key("c.png"), "image/png", 20_000);
    fx.store.put_object(BUCKET, &staged_key(client_id), "application/pdf", 30_000);
    let persisted = vec![record("a", "a.pdf", ReceiptContentType::Pdf)];

    let mut receipts = echo(&persisted);
    receipts.push(upload("c.png", ReceiptContentType::Png));
    receipts.push(upload("d.pdf", ReceiptContentType::Pdf).with_id(client_id));
    let same = request(receipts);

    let committed = fx
        .service
        .update_receipts(&same, &persisted, USER)
        .await
        .unwrap()
        .receipts()
        .unwrap()
        .to_vec();
    assert_eq!(committed.len(), 3);

    let replanned = fx
        .service
        .plan(&same, &committed, USER)
        .await
        .into_plan()
        .unwrap();
    assert!(replanned.to_add.is_empty());
    assert!(replanned.to_remove.is_empty());
    let mut unchanged: Vec<&str> = replanned.unchanged.iter().map(|r| r.id.as_str()).collect();
    unchanged.sort_unstable();
    assert_eq!(unchanged, vec!["a", "new-0", "new-1"]);
}

#[tokio::test]
async fn test_tags_stay_when_copy_fails() {
    let fx = setup();
    fx.store.put_object(BUCKET, &persisted_key("a"), "application/pdf", 4096);
    fx.store.put_object(BUCKET, &staged_key("y.png"), "image/png", 20_000);
    fx.store.fail_copies(true);
    let persisted = vec![record("a", "x.pdf", ReceiptContentType::Pdf)];

    let result = fx
        .service
        .update_receipts(&request(vec![upload("y.png", ReceiptContentType::Png)]), &persisted, USER)
        .await;

    assert!(matches!(result, Err(AppError::Storage { .. })));
    assert!(!fx.store.tags(BUCKET, &persisted_key("a")).unwrap().is_empty());
}

#[tokio::test]
async fn test_tagging_failure_propagates() {
    let fx = setup();
    fx.store.put_object(BUCKET, &persisted_key("a"), "application/pdf", 4096);
    fx.store.fail_tagging(true);

    let result = fx
        .service
        .remove_all(
            &[record("a", "x.pdf", ReceiptContentType::Pdf)],
            ReceiptCategory::Purchase,
            EXPENSE,
            USER,
        )
        .await;

    match result {
        Err(AppError::Storage { message, .. }) => assert!(message.contains("soft-delete")),
        other => panic!("expected storage error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_then_undelete_expense() {
    let fx = setup();
    let persisted = vec![
        record("a", "a.pdf", ReceiptContentType::Pdf),
        record("b", "b.png", ReceiptContentType::Png),
    ];
    for rct in &persisted {
        fx.store.put_object(BUCKET, &persisted_key(&rct.id), rct.content_type.as_mime(), 4096);
    }

    let remaining = fx
        .service
        .remove_all(&persisted, ReceiptCategory::Purchase, EXPENSE, USER)
        .await
        .unwrap();
    assert!(remaining.is_empty());
    for rct in &persisted {
        assert!(!fx.store.tags(BUCKET, &persisted_key(&rct.id)).unwrap().is_empty());
    }

    let restored = fx
        .service
        .restore_all(&persisted, ReceiptCategory::Purchase, EXPENSE, USER)
        .await
        .unwrap();
    assert_eq!(restored, persisted);
    for rct in &persisted {
        assert!(fx.store.tags(BUCKET, &persisted_key(&rct.id)).unwrap().is_empty());
    }
    assert_eq!(fx.store.add_tags_calls(), 1);
    assert_eq!(fx.store.delete_tags_calls(), 1);
}

#[tokio::test]
async fn test_new_expense_uses_caller_expense_id() {
    let fx = setup();
    fx.store.put_object(BUCKET, &staged_key("y.png"), "image/png", 20_000);

    let update = fx
        .service
        .update_receipts_for(
            &request(vec![upload("y.png", ReceiptContentType::Png)]),
            &[],
            "final-expense",
            USER,
        )
        .await
        .unwrap();

    assert!(!update.is_rejected());
    assert!(fx
        .store
        .contains(BUCKET, &format!("receipts/purchase/{}/final-expense/new-0", USER)));
}

#[tokio::test]
async fn test_staged_lookups_are_shared_across_checks() {
    let fx = setup();
    fx.store.put_object(BUCKET, &staged_key("y.png"), "image/png", 20_000);

    fx.service
        .update_receipts(&request(vec![upload("y.png", ReceiptContentType::Png)]), &[], USER)
        .await
        .unwrap();

    assert_eq!(fx.store.stat_calls(), 1);
}
