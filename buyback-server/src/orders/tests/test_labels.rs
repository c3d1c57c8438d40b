//! Label direction and write-once behavior

use super::*;
use crate::orders::lifecycle::Trigger;
use crate::utils::time::now_millis;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_outbound_label_request_shape() {
    let harness = create_test_harness();

    let order = submit_order(&harness).await;
    harness
        .lifecycle
        .apply(&order.id_string(), Trigger::GenerateLabel)
        .await
        .unwrap();

    let requests = harness.labels.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    // Outbound ships customer → business
    assert_eq!(request.ship_from.name, "Jamie Rivera");
    assert_eq!(request.ship_from.city, "Portland");
    assert_eq!(request.ship_to, warehouse_address());
    // The printed reference is the human order number, not the store key
    assert_eq!(request.reference, order.order_number);
}

/// Given the same order, outbound and return address pairs are exact mirrors
#[tokio::test]
async fn test_direction_pairs_are_mirror_images() {
    let harness = create_test_harness();

    let order = order_in_reoffer(&harness).await;
    let id = order.id_string();
    harness.lifecycle.apply(&id, Trigger::Decline).await.unwrap();
    harness
        .lifecycle
        .apply(&id, Trigger::GenerateReturnLabel)
        .await
        .unwrap();

    let requests = harness.labels.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    let (outbound, ret) = (&requests[0], &requests[1]);

    assert_eq!(outbound.ship_from, ret.ship_to);
    assert_eq!(outbound.ship_to, ret.ship_from);
    assert_eq!(outbound.reference, ret.reference);
}

#[tokio::test]
async fn test_incomplete_shipping_fails_fast() {
    let harness = create_test_harness();

    // Bypass submission validation: seed a broken order directly
    let mut submit = test_submit();
    submit.shipping.postal_code = String::new();
    let order = BuybackOrder {
        id: None,
        order_number: "11-111".to_string(),
        status: OrderStatus::PendingShipment,
        shipping: submit.shipping,
        device: submit.device,
        estimated_quote: submit.estimated_quote,
        reoffer: None,
        thread_id: None,
        label_url: None,
        tracking_number: None,
        return_label_url: None,
        return_tracking_number: None,
        created_at: now_millis(),
        label_generated_at: None,
        accepted_at: None,
        return_requested_at: None,
    };
    let order = harness.store.create(order).await.unwrap();

    let err = harness
        .lifecycle
        .apply(&order.id_string(), Trigger::GenerateLabel)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Nothing mutated, nothing forwarded to the provider
    let order = harness.store.find_by_id(&order.id_string()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::PendingShipment);
    assert_eq!(harness.labels.request_count(), 0);
}

#[tokio::test]
async fn test_label_is_write_once_per_direction() {
    let harness = create_test_harness();

    let order = submit_order(&harness).await;
    let id = order.id_string();
    let order = harness.lifecycle.apply(&id, Trigger::GenerateLabel).await.unwrap();
    let first_url = order.label_url.clone().unwrap();

    // A second attempt is a precondition conflict, not a second provider call
    let err = harness.lifecycle.apply(&id, Trigger::GenerateLabel).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(harness.labels.request_count(), 1);

    let order = harness.store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(order.label_url.as_deref(), Some(first_url.as_str()));
}

/// Provider outage after the status write: the transition stays committed,
/// the retry re-runs only the side effect.
#[tokio::test]
async fn test_label_retry_after_provider_failure() {
    let harness = create_test_harness();

    let order = submit_order(&harness).await;
    let id = order.id_string();

    harness.labels.fail.store(true, Ordering::SeqCst);
    let err = harness.lifecycle.apply(&id, Trigger::GenerateLabel).await.unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));

    // Committed but incomplete: the recovery state the retry targets
    let order = harness.store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::LabelGenerated);
    assert!(order.label_url.is_none());

    harness.labels.fail.store(false, Ordering::SeqCst);
    let order = harness.lifecycle.apply(&id, Trigger::GenerateLabel).await.unwrap();
    assert_eq!(order.status, OrderStatus::LabelGenerated);
    assert!(order.label_url.is_some());
    assert_eq!(harness.labels.request_count(), 1);
}

/// The return pair never overwrites the outbound pair
#[tokio::test]
async fn test_return_label_leaves_outbound_fields() {
    let harness = create_test_harness();

    let order = order_in_reoffer(&harness).await;
    let id = order.id_string();
    harness.lifecycle.apply(&id, Trigger::Decline).await.unwrap();

    let before = harness.store.find_by_id(&id).await.unwrap().unwrap();
    let order = harness
        .lifecycle
        .apply(&id, Trigger::GenerateReturnLabel)
        .await
        .unwrap();

    assert_eq!(order.label_url, before.label_url);
    assert_eq!(order.tracking_number, before.tracking_number);
    assert_ne!(order.return_tracking_number, order.tracking_number);
}
