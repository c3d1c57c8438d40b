//! Re-offer resolution: races, idempotence, validation

use super::*;
use crate::db::models::{ReofferResolution, ReofferSubmit};
use crate::orders::lifecycle::Trigger;
use crate::orders::sweep;
use crate::utils::time::now_millis;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_accept_sets_resolution_exactly_once() {
    let harness = create_test_harness();

    let order = order_in_reoffer(&harness).await;
    let id = order.id_string();

    let order = harness.lifecycle.apply(&id, Trigger::Accept).await.unwrap();
    assert_eq!(order.status, OrderStatus::OfferAccepted);
    assert!(order.accepted_at.is_some());
    let reoffer = order.reoffer.clone().unwrap();
    assert_eq!(reoffer.resolution, Some(ReofferResolution::Accepted));
    let resolved_at = reoffer.resolved_at.unwrap();

    // Second accept loses to the first: conflict, nothing re-written
    let err = harness.lifecycle.apply(&id, Trigger::Accept).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let order = harness.store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(order.reoffer.unwrap().resolved_at, Some(resolved_at));
}

#[tokio::test]
async fn test_decline_then_accept_conflicts() {
    let harness = create_test_harness();

    let order = order_in_reoffer(&harness).await;
    let id = order.id_string();

    harness.lifecycle.apply(&id, Trigger::Decline).await.unwrap();

    let err = harness.lifecycle.apply(&id, Trigger::Accept).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let order = harness.store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::ReturnRequested);
}

/// Buyer click and sweeper fire concurrently: exactly one wins, the loser
/// observes a conflict, and the order lands in exactly one terminal state.
#[tokio::test(flavor = "multi_thread")]
async fn test_double_resolution_race() {
    for _ in 0..10 {
        let harness = create_test_harness();

        let order = order_in_reoffer(&harness).await;
        let id = order.id_string();
        harness.store.set_reoffer_deadline(&id, now_millis() - 1);

        let accept = {
            let lifecycle = harness.lifecycle.clone();
            let id = id.clone();
            tokio::spawn(async move { lifecycle.apply(&id, Trigger::Accept).await })
        };
        let auto = {
            let lifecycle = harness.lifecycle.clone();
            let id = id.clone();
            tokio::spawn(async move { lifecycle.apply(&id, Trigger::AutoResolve).await })
        };

        let accept = accept.await.unwrap();
        let auto = auto.await.unwrap();

        let winners = [accept.is_ok(), auto.is_ok()].iter().filter(|w| **w).count();
        assert_eq!(winners, 1, "exactly one resolution path must win");
        for result in [&accept, &auto] {
            if let Err(e) = result {
                assert!(matches!(e, AppError::Conflict(_)), "loser sees conflict: {e}");
            }
        }

        let order = harness.store.find_by_id(&id).await.unwrap().unwrap();
        if accept.is_ok() {
            assert_eq!(order.status, OrderStatus::OfferAccepted);
        } else {
            assert_eq!(order.status, OrderStatus::AutoAccepted);
        }
        // Exactly one resolution recorded either way
        assert!(order.reoffer.unwrap().resolved_at.is_some());
    }
}

#[tokio::test]
async fn test_auto_resolve_before_deadline_conflicts() {
    let harness = create_test_harness();

    let order = order_in_reoffer(&harness).await;
    let id = order.id_string();

    let err = harness
        .lifecycle
        .apply(&id, Trigger::AutoResolve)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let order = harness.store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::ReofferPending);
}

/// One order's failing notification must not block the rest of the sweep,
/// and the failing order's transition itself still commits.
#[tokio::test]
async fn test_sweep_isolates_per_order_failures() {
    let harness = create_test_harness();

    let first = order_in_reoffer(&harness).await;
    let second = order_in_reoffer(&harness).await;
    harness.store.set_reoffer_deadline(&first.id_string(), now_millis() - 1);
    harness.store.set_reoffer_deadline(&second.id_string(), now_millis() - 1);

    // Break comment delivery for the first order's thread only
    let first_thread = harness
        .store
        .find_by_id(&first.id_string())
        .await
        .unwrap()
        .unwrap()
        .thread_id
        .expect("thread bound during re-offer");
    harness
        .tickets
        .fail_comment_threads
        .lock()
        .unwrap()
        .insert(first_thread);

    let report = sweep::sweep_once(&harness.lifecycle).await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.resolved, 1);
    assert_eq!(report.failed, 1);

    // Both transitions committed despite the failed side effect
    for id in [first.id_string(), second.id_string()] {
        let order = harness.store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::AutoAccepted);
    }
}

#[tokio::test]
async fn test_reoffer_validation() {
    let harness = create_test_harness();

    let order = submit_order(&harness).await;
    let id = order.id_string();
    harness
        .lifecycle
        .apply(&id, Trigger::GenerateLabel)
        .await
        .unwrap();

    // Zero price
    let err = harness
        .lifecycle
        .apply(
            &id,
            Trigger::SubmitReoffer(ReofferSubmit {
                new_price: Decimal::ZERO,
                reasons: vec!["cracked screen".to_string()],
                comments: None,
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // No reasons
    let err = harness
        .lifecycle
        .apply(
            &id,
            Trigger::SubmitReoffer(ReofferSubmit {
                new_price: Decimal::new(35_000, 2),
                reasons: vec![],
                comments: None,
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let order = harness.store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::LabelGenerated);
    assert!(order.reoffer.is_none());
}

/// A failed offer message surfaces as 502 but the transition stays committed
#[tokio::test]
async fn test_offer_message_failure_keeps_committed_status() {
    let harness = create_test_harness();

    let order = submit_order(&harness).await;
    let id = order.id_string();
    harness
        .lifecycle
        .apply(&id, Trigger::GenerateLabel)
        .await
        .unwrap();

    // Offer message appends to the existing thread — break appends
    harness.tickets.fail_comments.store(true, Ordering::SeqCst);

    let err = harness
        .lifecycle
        .apply(
            &id,
            Trigger::SubmitReoffer(ReofferSubmit {
                new_price: Decimal::new(35_000, 2),
                reasons: vec!["cracked screen".to_string()],
                comments: None,
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));

    let order = harness.store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::ReofferPending);
    assert!(order.reoffer.is_some());
}
