//! FIFO fairness: the admission scan halts at the first unsatisfiable
//! order and never lets a later, smaller order jump the queue.

use depot_schemas::{AmmoKind, OrderStatus};
use depot_testkit::{ammo_on_hand, depot_with_stock, required};

#[tokio::test]
async fn scenario_fifo_scan_halts_at_first_shortage() {
    // GIVEN: 3 rounds of 9mm on hand.
    let (engine, store) = depot_with_stock(&[(AmmoKind::Mm9, 3)], &[]).await;

    // O1 needs 5 (unsatisfiable), O2 needs 1 (satisfiable on its own).
    let o1 = engine
        .create_order(required(&[(AmmoKind::Mm9, 5)]))
        .await
        .unwrap();
    let o2 = engine
        .create_order(required(&[(AmmoKind::Mm9, 1)]))
        .await
        .unwrap();

    // THEN: neither is promoted. O2 could be satisfied, but it sits behind
    // O1 and the scan halts there.
    let report = engine.run_admission_scan().await.unwrap();
    assert!(report.promoted.is_empty());
    assert_eq!(report.halted_at, Some(o1.id));
    assert_eq!(engine.get_order(o1.id).await.unwrap().status, OrderStatus::Pending);
    assert_eq!(engine.get_order(o2.id).await.unwrap().status, OrderStatus::Pending);
    assert_eq!(ammo_on_hand(&store, AmmoKind::Mm9).await, 3);
}

#[tokio::test]
async fn scenario_restock_unblocks_queue_head_first() {
    let (engine, store) = depot_with_stock(&[(AmmoKind::Mm9, 3)], &[]).await;

    let o1 = engine
        .create_order(required(&[(AmmoKind::Mm9, 5)]))
        .await
        .unwrap();
    let o2 = engine
        .create_order(required(&[(AmmoKind::Mm9, 1)]))
        .await
        .unwrap();

    // Restock to 5. The post-adjustment scan promotes O1 (debiting all 5)
    // and then halts at O2.
    engine
        .adjust_stock(&depot_schemas::ResourceKey::ammo(AmmoKind::Mm9), 2)
        .await
        .unwrap();

    assert_eq!(engine.get_order(o1.id).await.unwrap().status, OrderStatus::Ready);
    assert_eq!(engine.get_order(o2.id).await.unwrap().status, OrderStatus::Pending);
    assert_eq!(ammo_on_hand(&store, AmmoKind::Mm9).await, 0);

    // One more round lets O2 through.
    engine
        .adjust_stock(&depot_schemas::ResourceKey::ammo(AmmoKind::Mm9), 1)
        .await
        .unwrap();
    assert_eq!(engine.get_order(o2.id).await.unwrap().status, OrderStatus::Ready);
    assert_eq!(ammo_on_hand(&store, AmmoKind::Mm9).await, 0);
}
