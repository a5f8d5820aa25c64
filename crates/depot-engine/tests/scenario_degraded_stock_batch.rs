//! Transition stock batches are best-effort: a rejected adjustment is
//! logged and skipped, and the order-ledger write still happens.

use depot_schemas::{AmmoKind, OrderStatus};
use depot_testkit::{ammo_on_hand, depot_with_stock, required};

#[tokio::test]
async fn scenario_forced_promotion_with_short_stock_still_writes_status() {
    let (engine, store) = depot_with_stock(&[(AmmoKind::Mm9, 2)], &[]).await;

    let order = engine
        .create_order(required(&[(AmmoKind::Mm9, 5)]))
        .await
        .unwrap();
    assert_eq!(engine.get_order(order.id).await.unwrap().status, OrderStatus::Pending);

    // An operator forces the order ready even though the shelf is short.
    // The debit is rejected at the store (would go negative), but the
    // status write goes through regardless.
    let updated = engine
        .update_order(order.id, None, OrderStatus::Ready)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Ready);
    assert_eq!(engine.get_order(order.id).await.unwrap().status, OrderStatus::Ready);

    // Nothing moved; the ledger never goes negative.
    assert_eq!(ammo_on_hand(&store, AmmoKind::Mm9).await, 2);
}

#[tokio::test]
async fn scenario_multi_kind_batch_applies_the_satisfiable_items() {
    let (engine, store) = depot_with_stock(&[(AmmoKind::Mm9, 10), (AmmoKind::Mm556, 1)], &[]).await;

    let order = engine
        .create_order(required(&[(AmmoKind::Mm9, 4), (AmmoKind::Mm556, 4)]))
        .await
        .unwrap();
    // The scan cannot admit it (5.56mm short), so it waits.
    assert_eq!(engine.get_order(order.id).await.unwrap().status, OrderStatus::Pending);

    // Forced ready: the 9mm debit lands, the 5.56mm debit is rejected,
    // and the order is ready anyway.
    engine
        .update_order(order.id, None, OrderStatus::Ready)
        .await
        .unwrap();
    assert_eq!(engine.get_order(order.id).await.unwrap().status, OrderStatus::Ready);
    assert_eq!(ammo_on_hand(&store, AmmoKind::Mm9).await, 6);
    assert_eq!(ammo_on_hand(&store, AmmoKind::Mm556).await, 1);
}
