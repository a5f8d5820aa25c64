//! The ad-hoc withdrawal path is strictly guarded: non-positive and
//! over-available requests are rejected before any write.

use depot_engine::EngineError;
use depot_schemas::{AmmoKind, ResourceKey};
use depot_testkit::depot_with_stock;

#[tokio::test]
async fn scenario_withdrawal_guard_boundaries() {
    let (engine, _store) = depot_with_stock(&[], &[("Cordite", 10)]).await;
    let key = ResourceKey::material("Cordite");

    // Exactly-available succeeds and reports zero remaining.
    assert_eq!(engine.withdraw(&key, 4).await.unwrap(), 6);
    assert_eq!(engine.withdraw(&key, 6).await.unwrap(), 0);

    // Over-available is rejected with both sides of the comparison.
    let err = engine.withdraw(&key, 1).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientStock {
            resource: key.clone(),
            requested: 1,
            available: 0,
        }
    );
}

#[tokio::test]
async fn scenario_nonpositive_withdrawals_rejected_without_write() {
    let (engine, store) = depot_with_stock(&[], &[("Cordite", 10)]).await;
    let key = ResourceKey::material("Cordite");

    for qty in [0, -3] {
        assert_eq!(
            engine.withdraw(&key, qty).await.unwrap_err(),
            EngineError::InvalidQuantity { qty }
        );
    }

    let rows = depot_engine::StockStore::rows(store.as_ref()).await.unwrap();
    assert_eq!(rows[0].quantity, 10);
}

#[tokio::test]
async fn scenario_withdrawal_from_unknown_resource() {
    let (engine, _store) = depot_with_stock(&[(AmmoKind::Mm9, 5)], &[]).await;
    let key = ResourceKey::material("Tungsten");

    assert_eq!(
        engine.withdraw(&key, 1).await.unwrap_err(),
        EngineError::ResourceNotFound { resource: key }
    );
}
