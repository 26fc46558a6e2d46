//! Axum router and all HTTP handlers for mtb-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers (CORS, tracing). The scenario tests in `tests/` drive the
//! bare router.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use mtb_terminal::{ops, HistoryWindow, TerminalRecord};
use tracing::info;

use crate::{
    api_types::{
        HealthResponse, HistoryQuery, HistoryResponse, OrderBody, OrderResponse,
        PositionsResponse,
    },
    auth,
    error::BridgeError,
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// `/health` is open; every other route sits behind the `x-api-key` gate.
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/order", post(place_order))
        .route("/positions", get(positions))
        .route("/history", get(history))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Re-runs `initialize()` on the worker. Any failure reads as disconnected.
pub(crate) async fn health(State(st): State<Arc<AppState>>) -> Json<HealthResponse> {
    let connected = st
        .terminal
        .call(ops::probe_connection)
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: "ok".to_string(),
        connected,
    })
}

// ---------------------------------------------------------------------------
// POST /order
// ---------------------------------------------------------------------------

pub(crate) async fn place_order(
    State(st): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<OrderResponse>, BridgeError> {
    let req = OrderBody::from_json(&body)?.into_order_request()?;

    info!(symbol = %req.symbol, side = %req.side, volume = req.volume, "order requested");

    let placed = st
        .terminal
        .call(move |t| ops::place_market_order(t, &req))
        .await??;

    Ok(Json(OrderResponse {
        order_result: placed.result.into_object_json(),
    }))
}

// ---------------------------------------------------------------------------
// GET /positions
// ---------------------------------------------------------------------------

pub(crate) async fn positions(
    State(st): State<Arc<AppState>>,
) -> Result<Json<PositionsResponse>, BridgeError> {
    let rows = st.terminal.call(ops::open_positions).await??;
    Ok(Json(PositionsResponse {
        positions: rows.into_iter().map(TerminalRecord::into_json).collect(),
    }))
}

// ---------------------------------------------------------------------------
// GET /history?days=N
// ---------------------------------------------------------------------------

pub(crate) async fn history(
    State(st): State<Arc<AppState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, BridgeError> {
    let Query(q) = query.map_err(|e| BridgeError::Validation(e.body_text()))?;
    let window = HistoryWindow::last_days(Utc::now(), q.lookback_days()?);

    let rows = st
        .terminal
        .call(move |t| ops::deal_history(t, window))
        .await??;

    Ok(Json(HistoryResponse {
        history: rows.into_iter().map(TerminalRecord::into_json).collect(),
    }))
}
