//! In-process scenario tests for depot-daemon HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test builds an AppState over the deterministic in-memory store and
//! drives the router via `tower::ServiceExt::oneshot`. No network I/O and
//! no database required.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use depot_daemon::{routes, state};
use depot_engine::DepotEngine;
use depot_schemas::{AmmoKind, ResourceKey, StockRow};
use depot_store_mem::MemStore;
use http_body_util::BodyExt;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// AppState over a fresh in-memory store seeded with the given ammo rows.
async fn make_state(ammo: &[(AmmoKind, i64)]) -> Arc<state::AppState> {
    let store = Arc::new(MemStore::new());
    let rows = ammo
        .iter()
        .map(|(kind, qty)| StockRow::new(ResourceKey::ammo(*kind), *qty, 0))
        .collect();
    store.seed(rows).await;
    let engine = DepotEngine::new(store.clone(), store);
    Arc::new(state::AppState::new(engine, "TEST".to_string()))
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn json_req(method: &str, uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

/// Drive the router with a single request and return (status, body_bytes).
async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let st = make_state(&[]).await;
    let (status, body) = call(routes::build_router(st), get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "depot-daemon");
}

// ---------------------------------------------------------------------------
// Order lifecycle over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn order_create_is_admitted_when_stock_suffices() {
    let st = make_state(&[(AmmoKind::Mm9, 50)]).await;

    let (status, body) = call(
        routes::build_router(Arc::clone(&st)),
        json_req("POST", "/v1/orders", serde_json::json!({"required": {"9mm": 30}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let created = parse_json(body);
    let id = created["id"].as_str().expect("order id").to_string();

    // The post-create scan already promoted it; the stock row shows the debit.
    let (status, body) = call(routes::build_router(Arc::clone(&st)), get(&format!("/v1/orders/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["status"], "ready");

    let (_, body) = call(routes::build_router(st), get("/v1/stock")).await;
    let rows = parse_json(body);
    assert_eq!(rows[0]["quantity"], 20);
}

#[tokio::test]
async fn order_update_to_cancelled_releases_stock() {
    let st = make_state(&[(AmmoKind::Mm556, 10)]).await;

    let (_, body) = call(
        routes::build_router(Arc::clone(&st)),
        json_req("POST", "/v1/orders", serde_json::json!({"required": {"5.56mm": 10}})),
    )
    .await;
    let id = parse_json(body)["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        routes::build_router(Arc::clone(&st)),
        json_req(
            "PUT",
            &format!("/v1/orders/{id}"),
            serde_json::json!({"status": "cancelled"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["status"], "cancelled");

    let (_, body) = call(routes::build_router(st), get("/v1/stock")).await;
    assert_eq!(parse_json(body)[0]["quantity"], 10);
}

#[tokio::test]
async fn unknown_order_returns_404_with_kind() {
    let st = make_state(&[]).await;
    let id = uuid::Uuid::new_v4();

    let (status, body) = call(
        routes::build_router(st),
        get(&format!("/v1/orders/{id}")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["kind"], "order_not_found");
}

#[tokio::test]
async fn order_delete_returns_204_and_row_is_gone() {
    let st = make_state(&[(AmmoKind::Mm9, 5)]).await;

    let (_, body) = call(
        routes::build_router(Arc::clone(&st)),
        json_req("POST", "/v1/orders", serde_json::json!({"required": {"9mm": 5}})),
    )
    .await;
    let id = parse_json(body)["id"].as_str().unwrap().to_string();

    let del = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/orders/{id}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = call(routes::build_router(Arc::clone(&st)), del).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(routes::build_router(st), get(&format!("/v1/orders/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Stock guards over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn over_withdrawal_returns_409_conflict() {
    let st = make_state(&[(AmmoKind::Mm9, 3)]).await;

    let (status, body) = call(
        routes::build_router(st),
        json_req(
            "POST",
            "/v1/stock/withdraw",
            serde_json::json!({"category": "ammo", "name": "9mm", "qty": 4}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse_json(body)["kind"], "insufficient_stock");
}

#[tokio::test]
async fn zero_quantity_withdrawal_returns_422() {
    let st = make_state(&[(AmmoKind::Mm9, 3)]).await;

    let (status, body) = call(
        routes::build_router(st),
        json_req(
            "POST",
            "/v1/stock/withdraw",
            serde_json::json!({"category": "ammo", "name": "9mm", "qty": 0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(parse_json(body)["kind"], "invalid_quantity");
}

#[tokio::test]
async fn withdraw_reports_remaining() {
    let st = make_state(&[(AmmoKind::Mm762, 10)]).await;

    let (status, body) = call(
        routes::build_router(st),
        json_req(
            "POST",
            "/v1/stock/withdraw",
            serde_json::json!({"category": "ammo", "name": "7.62mm", "qty": 4}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["withdrawn"], 4);
    assert_eq!(json["remaining"], 6);
}

// ---------------------------------------------------------------------------
// POST /v1/scan
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scan_promotes_waiting_order_after_adjust() {
    let st = make_state(&[(AmmoKind::Mm9, 0)]).await;

    let (_, body) = call(
        routes::build_router(Arc::clone(&st)),
        json_req("POST", "/v1/orders", serde_json::json!({"required": {"9mm": 5}})),
    )
    .await;
    let id = parse_json(body)["id"].as_str().unwrap().to_string();

    // Restock; the post-adjust scan promotes the waiting order, so the
    // explicit scan that follows is a no-op.
    let (status, _) = call(
        routes::build_router(Arc::clone(&st)),
        json_req(
            "POST",
            "/v1/stock/adjust",
            serde_json::json!({"category": "ammo", "name": "9mm", "delta_units": 5}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        routes::build_router(Arc::clone(&st)),
        json_req("POST", "/v1/scan", serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let report = parse_json(body);
    assert_eq!(report["promoted"].as_array().unwrap().len(), 0);
    assert!(report["halted_at"].is_null());

    let (_, body) = call(routes::build_router(st), get(&format!("/v1/orders/{id}"))).await;
    assert_eq!(parse_json(body)["status"], "ready");
}

// ---------------------------------------------------------------------------
// Unknown routes return 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let st = make_state(&[]).await;
    let (status, _) = call(routes::build_router(st), get("/v1/does_not_exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
