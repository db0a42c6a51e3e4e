use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{market_repo, order_repo, trade_repo, user_repo};
use crate::engine::{pricing, resolution};
use crate::errors::EngineError;
use crate::models::{Market, Order, Outcome, Trade};
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct CreateMarketRequest {
    pub admin_id: Uuid,
    pub title: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub end_date: Option<DateTime<Utc>>,
    pub outcomes: Vec<String>,
}

fn default_category() -> String {
    "general".into()
}

#[derive(Serialize)]
pub struct MarketDetail {
    #[serde(flatten)]
    pub market: Market,
    pub outcomes: Vec<Outcome>,
}

/// POST /api/markets — create a market with an equal initial probability
/// split across its outcomes. Admin only.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateMarketRequest>,
) -> Result<Json<ApiResponse<MarketDetail>>, EngineError> {
    if req.title.trim().is_empty() {
        return Err(EngineError::Validation("title must not be empty".into()));
    }
    if req.outcomes.len() < 2 {
        return Err(EngineError::Validation(
            "a market needs at least two outcomes".into(),
        ));
    }

    let mut tx = state.db.begin().await?;

    let caller = user_repo::get_user(&mut *tx, req.admin_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("user {}", req.admin_id)))?;
    if !caller.is_admin {
        return Err(EngineError::Forbidden);
    }

    let probs = pricing::equal_split(req.outcomes.len());
    let labelled: Vec<(String, _)> = req
        .outcomes
        .iter()
        .map(|label| label.trim().to_string())
        .zip(probs)
        .collect();

    let (market, outcomes) = market_repo::create_market(
        &mut tx,
        req.title.trim(),
        &req.category,
        req.end_date,
        &labelled,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        market_id = %market.id,
        outcomes = outcomes.len(),
        "Market created"
    );

    Ok(Json(ApiResponse::ok(MarketDetail { market, outcomes })))
}

pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Market>>>, EngineError> {
    let markets = market_repo::list_markets(&state.db).await?;
    Ok(Json(ApiResponse::ok(markets)))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MarketDetail>>, EngineError> {
    let market = market_repo::get_market(&state.db, id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("market {id}")))?;
    let outcomes = market_repo::get_outcomes(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(MarketDetail { market, outcomes })))
}

pub async fn open_orders(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Order>>>, EngineError> {
    let market = market_repo::get_market(&state.db, id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("market {id}")))?;
    let orders = order_repo::list_open_orders(&state.db, market.id).await?;
    Ok(Json(ApiResponse::ok(orders)))
}

pub async fn recent_trades(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Trade>>>, EngineError> {
    let trades = trade_repo::get_trades_for_market(&state.db, id, 100).await?;
    Ok(Json(ApiResponse::ok(trades)))
}

#[derive(Deserialize)]
pub struct ResolveRequest {
    pub admin_id: Uuid,
    pub winning_outcome_id: Uuid,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub market: Market,
    pub winners_paid: usize,
    pub holdings_settled: usize,
    pub orders_cancelled: usize,
}

/// POST /api/markets/:id/resolve — terminal settlement of a market.
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ApiResponse<ResolveResponse>>, EngineError> {
    let result =
        resolution::resolve_market(&state.db, req.admin_id, id, req.winning_outcome_id).await?;

    let _ = state
        .ws_tx
        .send(crate::api::ws_types::WsMessage::MarketResolved(
            result.market.clone(),
        ));

    Ok(Json(ApiResponse::ok(ResolveResponse {
        market: result.market,
        winners_paid: result.winners_paid,
        holdings_settled: result.holdings_settled,
        orders_cancelled: result.orders_cancelled,
    })))
}
