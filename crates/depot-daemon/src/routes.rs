//! Axum router and all HTTP handlers for depot-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.  All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use depot_engine::{EngineError, ProductionBatch};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    api_types::{
        AdjustStockRequest, CreateOrderRequest, ErrorResponse, HealthResponse, ProduceRequest,
        ScanResponse, UpdateOrderRequest, WithdrawRequest, WithdrawResponse,
    },
    state::{uptime_secs, AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/orders", get(orders_list).post(order_create))
        .route(
            "/v1/orders/:id",
            get(order_show).put(order_update).delete(order_delete),
        )
        .route("/v1/stock", get(stock_show))
        .route("/v1/stock/adjust", post(stock_adjust))
        .route("/v1/stock/withdraw", post(stock_withdraw))
        .route("/v1/stock/produce", post(stock_produce))
        .route("/v1/scan", post(scan))
        .with_state(state)
}

/// Map an engine refusal to an HTTP response. Guard violations are client
/// errors; only store failures on the primary mutation are 500s.
fn refuse(err: EngineError) -> Response {
    let (status, kind) = match &err {
        EngineError::InsufficientStock { .. } => (StatusCode::CONFLICT, "insufficient_stock"),
        EngineError::OrderNotFound { .. } => (StatusCode::NOT_FOUND, "order_not_found"),
        EngineError::ResourceNotFound { .. } => (StatusCode::NOT_FOUND, "resource_not_found"),
        EngineError::InvalidQuantity { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "invalid_quantity")
        }
        EngineError::Persistence { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "persistence"),
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: kind.to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let mut snap = st.status.read().await.clone();
    snap.daemon_uptime_secs = uptime_secs();
    (StatusCode::OK, Json(snap))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub(crate) async fn orders_list(State(st): State<Arc<AppState>>) -> Response {
    match st.engine.list_orders().await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(err) => refuse(err),
    }
}

pub(crate) async fn order_create(
    State(st): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Response {
    match st.engine.create_order(req.required).await {
        Ok(record) => {
            info!(order_id = %record.id, "orders/create");
            let _ = st.bus.send(BusMsg::OrderChanged {
                id: record.id,
                status: record.status,
            });
            (StatusCode::CREATED, Json(record)).into_response()
        }
        Err(err) => refuse(err),
    }
}

pub(crate) async fn order_show(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match st.engine.get_order(id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => refuse(err),
    }
}

pub(crate) async fn order_update(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> Response {
    match st.engine.update_order(id, req.required, req.status).await {
        Ok(record) => {
            info!(order_id = %record.id, status = %record.status, "orders/update");
            let _ = st.bus.send(BusMsg::OrderChanged {
                id: record.id,
                status: record.status,
            });
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(err) => refuse(err),
    }
}

pub(crate) async fn order_delete(
    State(st): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match st.engine.delete_order(id).await {
        Ok(()) => {
            info!(order_id = %id, "orders/delete");
            (StatusCode::NO_CONTENT, ()).into_response()
        }
        Err(err) => refuse(err),
    }
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

pub(crate) async fn stock_show(State(st): State<Arc<AppState>>) -> Response {
    match st.engine.stock_rows().await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => refuse(err),
    }
}

pub(crate) async fn stock_adjust(
    State(st): State<Arc<AppState>>,
    Json(req): Json<AdjustStockRequest>,
) -> Response {
    match st.engine.adjust_stock(&req.resource, req.delta_units).await {
        Ok(()) => {
            info!(resource = %req.resource, delta_units = req.delta_units, "stock/adjust");
            let _ = st.bus.send(BusMsg::StockChanged {
                resource: req.resource,
                delta_units: req.delta_units,
            });
            (StatusCode::OK, ()).into_response()
        }
        Err(err) => refuse(err),
    }
}

pub(crate) async fn stock_withdraw(
    State(st): State<Arc<AppState>>,
    Json(req): Json<WithdrawRequest>,
) -> Response {
    match st.engine.withdraw(&req.resource, req.qty).await {
        Ok(remaining) => {
            info!(resource = %req.resource, qty = req.qty, remaining, "stock/withdraw");
            let _ = st.bus.send(BusMsg::StockChanged {
                resource: req.resource.clone(),
                delta_units: -req.qty,
            });
            (
                StatusCode::OK,
                Json(WithdrawResponse {
                    resource: req.resource,
                    withdrawn: req.qty,
                    remaining,
                }),
            )
                .into_response()
        }
        Err(err) => refuse(err),
    }
}

pub(crate) async fn stock_produce(
    State(st): State<Arc<AppState>>,
    Json(req): Json<ProduceRequest>,
) -> Response {
    let batch = ProductionBatch {
        consumes: req
            .consumes
            .into_iter()
            .map(|c| (c.resource, c.units))
            .collect(),
        output: req.output,
        output_units: req.output_units,
    };
    match st.engine.produce(batch).await {
        Ok(()) => {
            info!(output = %req.output, units = req.output_units, "stock/produce");
            let _ = st.bus.send(BusMsg::StockChanged {
                resource: depot_schemas::ResourceKey::ammo(req.output),
                delta_units: req.output_units,
            });
            (StatusCode::OK, ()).into_response()
        }
        Err(err) => refuse(err),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/scan
// ---------------------------------------------------------------------------

pub(crate) async fn scan(State(st): State<Arc<AppState>>) -> Response {
    match st.engine.run_admission_scan().await {
        Ok(report) => {
            info!(promoted = report.promoted.len(), "scan");
            st.record_scan(report.promoted.clone(), report.halted_at)
                .await;
            (
                StatusCode::OK,
                Json(ScanResponse {
                    promoted: report.promoted,
                    halted_at: report.halted_at,
                    write_failures: report.write_failures,
                }),
            )
                .into_response()
        }
        Err(err) => refuse(err),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::OrderChanged { .. } => "order",
                    BusMsg::StockChanged { .. } => "stock",
                    BusMsg::ScanCompleted { .. } => "scan",
                    BusMsg::LogLine { .. } => "log",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
