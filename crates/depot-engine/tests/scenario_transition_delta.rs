//! Reserved-to-reserved edits move only the per-kind difference, never the
//! whole requirement.

use depot_schemas::{AmmoKind, OrderStatus};
use depot_testkit::{ammo_on_hand, depot_with_stock, required};

#[tokio::test]
async fn scenario_growing_a_ready_order_debits_only_the_difference() {
    let (engine, store) = depot_with_stock(&[(AmmoKind::Mm9, 20)], &[]).await;

    let order = engine
        .create_order(required(&[(AmmoKind::Mm9, 10)]))
        .await
        .unwrap();
    assert_eq!(engine.get_order(order.id).await.unwrap().status, OrderStatus::Ready);
    assert_eq!(ammo_on_hand(&store, AmmoKind::Mm9).await, 10);

    // 10 -> 15 while ready: exactly 5 more leave the shelf.
    engine
        .update_order(order.id, Some(required(&[(AmmoKind::Mm9, 15)])), OrderStatus::Ready)
        .await
        .unwrap();
    assert_eq!(ammo_on_hand(&store, AmmoKind::Mm9).await, 5);

    // 15 -> 12 while ready: exactly 3 come back.
    engine
        .update_order(order.id, Some(required(&[(AmmoKind::Mm9, 12)])), OrderStatus::Ready)
        .await
        .unwrap();
    assert_eq!(ammo_on_hand(&store, AmmoKind::Mm9).await, 8);
}

#[tokio::test]
async fn scenario_ready_to_delivered_moves_no_stock() {
    let (engine, store) = depot_with_stock(&[(AmmoKind::Mm556, 9)], &[]).await;

    let order = engine
        .create_order(required(&[(AmmoKind::Mm556, 9)]))
        .await
        .unwrap();
    assert_eq!(ammo_on_hand(&store, AmmoKind::Mm556).await, 0);

    // Delivery hands over what was already reserved.
    let delivered = engine
        .update_order(order.id, None, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert_eq!(ammo_on_hand(&store, AmmoKind::Mm556).await, 0);
}
