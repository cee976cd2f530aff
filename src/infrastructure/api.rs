//! API Server (Cold Path)
//!
//! REST surface over the engine state: latest spread snapshot, position
//! ledger, live P&L, engine metrics, plus manual position close and direct
//! basket submission. Runs beside the engine loop and only reads shared
//! state, except for the explicit mutation endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::gateway::{GatewayError, OrderGateway, OrderIntent};
use crate::infrastructure::metrics::MetricsCollector;
use crate::ledger::{Position, PositionLedger};
use crate::pnl::{LivePnlTracker, PositionPnl};
use crate::spread::SnapshotMap;
use crate::SpreadError;

/// Request body for manually closing an open position.
#[derive(Debug, Deserialize)]
pub struct ClosePositionDto {
    pub buy_exit_price: f64,
    pub sell_exit_price: f64,
}

/// One leg of a direct basket submission.
#[derive(Debug, Deserialize)]
pub struct BasketLegDto {
    pub instrument_id: String,
    pub quantity: u32,
    pub limit_price: f64,
}

/// Request body for direct basket submission.
#[derive(Debug, Deserialize)]
pub struct BasketDto {
    pub buy: BasketLegDto,
    pub sell: BasketLegDto,
}

/// Generic acknowledgement body.
#[derive(Debug, Serialize)]
pub struct AckDto {
    pub ok: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub snapshot: Arc<RwLock<SnapshotMap>>,
    pub ledger: Arc<Mutex<PositionLedger>>,
    pub pnl: Arc<LivePnlTracker>,
    pub gateway: Arc<OrderGateway>,
    pub metrics: Arc<MetricsCollector>,
}

/// Start the API server
pub async fn start_server(state: AppState, port: u16) -> Result<(), SpreadError> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("API Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(SpreadError::Io)?;

    axum::serve(listener, app).await.map_err(SpreadError::Io)?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/spreads", get(get_spreads))
        .route("/api/status", get(get_status))
        .route("/api/positions", get(get_positions))
        .route("/api/positions/:spread_id/close", post(close_position))
        .route("/api/pnl", get(get_pnl))
        .route("/api/orders/basket", post(submit_basket))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for /api/spreads
/// Returns the latest per-spread evaluation snapshot.
async fn get_spreads(State(state): State<AppState>) -> Json<SnapshotMap> {
    Json(state.snapshot.read().clone())
}

/// Handler for /api/status
async fn get_status(
    State(state): State<AppState>,
) -> Json<crate::infrastructure::metrics::MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Handler for /api/positions
/// Returns every ledger record, open and closed.
async fn get_positions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Position>>, (StatusCode, String)> {
    let ledger = state.ledger.lock().await;
    match ledger.positions() {
        Ok(positions) => Ok(Json(positions)),
        Err(e) => {
            tracing::error!(error = %e, "failed to read positions");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Handler for /api/positions/:spread_id/close
///
/// Marks the open position closed with the supplied exit prices. 404 when
/// no open position exists for the spread id; the spread becomes eligible
/// for re-entry afterwards.
async fn close_position(
    State(state): State<AppState>,
    Path(spread_id): Path<String>,
    Json(body): Json<ClosePositionDto>,
) -> Result<Json<AckDto>, (StatusCode, String)> {
    let ledger = state.ledger.lock().await;
    match ledger.close(&spread_id, body.buy_exit_price, body.sell_exit_price) {
        Ok(true) => Ok(Json(AckDto { ok: true })),
        Ok(false) => Err((
            StatusCode::NOT_FOUND,
            format!("no open position for spread {spread_id}"),
        )),
        Err(e) => {
            tracing::error!(error = %e, spread_id, "failed to close position");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Handler for /api/pnl
/// Returns live unrealized P&L for every open position with quotes.
async fn get_pnl(State(state): State<AppState>) -> Json<Vec<PositionPnl>> {
    Json(state.pnl.compute().await)
}

/// Handler for /api/orders/basket
///
/// Forwards a two-leg basket straight to the order gateway. No retry: a
/// failed submission must be re-issued by the caller and may duplicate.
async fn submit_basket(
    State(state): State<AppState>,
    Json(body): Json<BasketDto>,
) -> Result<Json<AckDto>, (StatusCode, String)> {
    let buy = OrderIntent {
        instrument_id: body.buy.instrument_id.into(),
        quantity: body.buy.quantity,
        limit_price: body.buy.limit_price,
    };
    let sell = OrderIntent {
        instrument_id: body.sell.instrument_id.into(),
        quantity: body.sell.quantity,
        limit_price: body.sell.limit_price,
    };

    let result = state.gateway.submit_basket(&buy, &sell).await;
    state.metrics.record_gateway(result.is_ok());

    match result {
        Ok(()) => Ok(Json(AckDto { ok: true })),
        Err(GatewayError::Rejected { status, body }) => Err((
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            body,
        )),
        Err(e) => Err((StatusCode::BAD_GATEWAY, e.to_string())),
    }
}
