use crate::error::VerificationError;
use crate::models::{ApprovedChangeSet, ChangeFailure, ChangeOp, MissingReason};
use crate::service::ChangeApplier;
use crate::db::InMemoryOrderStore;
use crate::tests::helpers::{item, service, store_with, DELIVERY};

fn approve(link: &[usize], unlink: &[i64]) -> ApprovedChangeSet {
    ApprovedChangeSet {
        link: link.to_vec(),
        unlink: unlink.to_vec(),
    }
}

/// 53714 linked, 53715 known but not linked, 53800 linked but not on the list
fn fixture() -> InMemoryOrderStore {
    store_with(&[
        ("53714", None, 1, true),
        ("53715", None, 2, false),
        ("53800", None, 1, true),
    ])
}

#[tokio::test]
async fn test_apply_links_missing_and_unlinks_excess() {
    let store = fixture();
    let svc = service(&store);
    let items = vec![item("53714", 1), item("53715", 2)];

    let result = svc.compare(&items, DELIVERY).await.unwrap();
    assert_eq!(result.missing.len(), 1);
    assert_eq!(result.excess.len(), 1);
    let excess_id = result.excess[0].line.order_id;

    let applied = svc.apply(&result, &approve(&[2], &[excess_id])).await.unwrap();

    assert!(applied.committed);
    assert_eq!(applied.linked, 1);
    assert_eq!(applied.unlinked, 1);
    assert!(applied.failed.is_empty());

    let again = svc.compare(&items, DELIVERY).await.unwrap();
    assert!(again.is_clean());
    assert_eq!(again.summary.matched, 2);
}

#[tokio::test]
async fn test_concurrent_link_conflicts_and_nothing_changes() {
    let store = fixture();
    let svc = service(&store);
    let items = vec![item("53714", 1), item("53715", 2)];

    let result = svc.compare(&items, DELIVERY).await.unwrap();
    let excess_id = result.excess[0].line.order_id;

    // another writer links 53715 after the comparison
    store.link_now(DELIVERY, "53715", None).unwrap();
    let before = store.snapshot();

    let applied = svc.apply(&result, &approve(&[2], &[excess_id])).await.unwrap();

    assert!(!applied.committed);
    assert_eq!(applied.linked, 0);
    assert_eq!(applied.unlinked, 0);
    assert_eq!(applied.failed.len(), 2);
    assert!(matches!(applied.failed[0].reason, ChangeFailure::Conflict(_)));
    assert!(matches!(applied.failed[0].op, Some(ChangeOp::Link { position: 2, .. })));
    assert_eq!(applied.failed[1].reason, ChangeFailure::RolledBack);
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_unlink_of_already_removed_line_rolls_back() {
    let store = fixture();
    let svc = service(&store);
    let items = vec![item("53714", 1), item("53715", 2)];

    let result = svc.compare(&items, DELIVERY).await.unwrap();
    let excess_id = result.excess[0].line.order_id;
    store.unlink_now(DELIVERY, "53800", None).unwrap();
    let before = store.snapshot();

    let applied = svc.apply(&result, &approve(&[2], &[excess_id])).await.unwrap();

    assert!(!applied.committed);
    assert_eq!(applied.failed[0].reason, ChangeFailure::RolledBack);
    assert!(matches!(applied.failed[1].reason, ChangeFailure::NotFound(_)));
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_retry_after_rollback_is_idempotent() {
    let store = fixture();
    let svc = service(&store);
    let items = vec![item("53714", 1), item("53715", 2)];

    let result = svc.compare(&items, DELIVERY).await.unwrap();
    store.link_now(DELIVERY, "53715", None).unwrap();
    let before = store.snapshot();
    let approved = approve(&[2], &[]);

    let first = svc.apply(&result, &approved).await.unwrap();
    let second = svc.apply(&result, &approved).await.unwrap();

    assert!(!first.committed);
    assert_eq!(first.failed, second.failed);
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_selection_outside_result_is_rejected_without_transaction() {
    let store = fixture();
    let svc = service(&store);
    let result = svc.compare(&[item("53714", 1), item("53715", 2)], DELIVERY).await.unwrap();
    let before = store.snapshot();

    // position 1 is matched, not missing; order 999 is not excess
    let applied = svc.apply(&result, &approve(&[1, 2], &[999])).await.unwrap();

    assert!(!applied.committed);
    assert_eq!(applied.failed.len(), 2);
    assert!(applied
        .failed
        .iter()
        .all(|f| f.op.is_none() && matches!(f.reason, ChangeFailure::NotInResult(_))));
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_repeated_selection_collapses_into_one_operation() {
    let store = fixture();
    let svc = service(&store);
    let result = svc.compare(&[item("53714", 1), item("53715", 2)], DELIVERY).await.unwrap();

    let plan = ChangeApplier::<InMemoryOrderStore>::plan(&result, &approve(&[2, 2, 2], &[]));
    assert_eq!(plan.ops.len(), 1);
    assert!(plan.rejected.is_empty());

    let applied = svc.apply(&result, &approve(&[2, 2], &[])).await.unwrap();
    assert!(applied.committed);
    assert_eq!(applied.linked, 1);
}

#[tokio::test]
async fn test_linking_unknown_variant_fails_with_not_found() {
    let store = store_with(&[("53716", Some('A'), 5, false), ("53716", Some('B'), 3, false)]);
    let svc = service(&store);

    let result = svc.compare(&[item("53716", 3)], DELIVERY).await.unwrap();
    assert_eq!(result.missing[0].reason, MissingReason::NotInDelivery);

    // no variant-less 53716 exists, so the link has nothing to attach
    let applied = svc.apply(&result, &approve(&[1], &[])).await.unwrap();
    assert!(!applied.committed);
    assert!(matches!(applied.failed[0].reason, ChangeFailure::NotFound(_)));
}

#[tokio::test]
async fn test_empty_approval_commits_nothing() {
    let store = fixture();
    let svc = service(&store);
    let result = svc.compare(&[item("53714", 1)], DELIVERY).await.unwrap();
    let before = store.snapshot();

    let applied = svc.apply(&result, &ApprovedChangeSet::default()).await.unwrap();

    assert!(applied.committed);
    assert_eq!(applied.linked + applied.unlinked, 0);
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_store_outage_is_fatal_for_apply() {
    let store = fixture();
    let svc = service(&store);
    let result = svc.compare(&[item("53714", 1), item("53715", 2)], DELIVERY).await.unwrap();
    let before = store.snapshot();
    store.set_unavailable(true);

    let err = svc.apply(&result, &approve(&[2], &[])).await.unwrap_err();

    assert!(matches!(err, VerificationError::RepositoryUnavailable(_)));
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_link_of_claimed_order_is_rejected_before_transaction() {
    let store = store_with(&[("53714", Some('A'), 1, true), ("53800", None, 1, true)]);
    let svc = service(&store);
    let items = vec![item("53714", 1), item("53714A", 1)];

    let result = svc.compare(&items, DELIVERY).await.unwrap();
    assert_eq!(result.missing[0].position, 2);
    assert_eq!(result.missing[0].reason, MissingReason::CandidatesClaimed);
    let excess_id = result.excess[0].line.order_id;
    let before = store.snapshot();

    let plan = ChangeApplier::<InMemoryOrderStore>::plan(&result, &approve(&[2], &[excess_id]));
    assert_eq!(plan.ops.len(), 1);
    assert_eq!(plan.rejected.len(), 1);

    let applied = svc.apply(&result, &approve(&[2], &[excess_id])).await.unwrap();

    assert!(!applied.committed);
    assert_eq!(applied.failed.len(), 1);
    assert!(matches!(applied.failed[0].reason, ChangeFailure::NotLinkable(_)));
    assert!(matches!(applied.failed[0].op, Some(ChangeOp::Link { position: 2, .. })));
    assert_eq!(store.snapshot(), before);

    // the valid unlink alone goes through
    let applied = svc.apply(&result, &approve(&[], &[excess_id])).await.unwrap();
    assert!(applied.committed);
    assert_eq!(applied.unlinked, 1);
}

#[tokio::test]
async fn test_link_of_ambiguous_entry_is_rejected() {
    let store = store_with(&[
        ("53716", Some('A'), 3, true),
        ("53716", Some('B'), 3, true),
        ("53717", None, 1, false),
    ]);
    let svc = service(&store);
    let result = svc
        .compare(&[item("53716", 3), item("53717", 1)], DELIVERY)
        .await
        .unwrap();
    assert!(matches!(result.missing[0].reason, MissingReason::Ambiguous { .. }));
    let before = store.snapshot();

    let applied = svc.apply(&result, &approve(&[1, 2], &[])).await.unwrap();

    assert!(!applied.committed);
    assert_eq!(applied.failed.len(), 1);
    assert!(matches!(applied.failed[0].reason, ChangeFailure::NotLinkable(_)));
    assert_eq!(store.snapshot(), before);

    let applied = svc.apply(&result, &approve(&[2], &[])).await.unwrap();
    assert!(applied.committed);
    assert_eq!(applied.linked, 1);
}
