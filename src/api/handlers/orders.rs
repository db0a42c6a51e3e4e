use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::ws_types::WsMessage;
use crate::engine::matching::{self, PlaceOrderRequest};
use crate::errors::EngineError;
use crate::models::{Order, OrderKind, Side};
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct PlaceOrderBody {
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub outcome_id: Uuid,
    pub side: String,
    pub kind: String,
    pub amount: Decimal,
    pub price: Option<Decimal>,
}

#[derive(Serialize)]
pub struct PlaceOrderResponse {
    pub order: Order,
    pub matched_order_ids: Vec<Uuid>,
    pub fully_filled: bool,
}

/// POST /api/orders
pub async fn place(
    State(state): State<AppState>,
    Json(body): Json<PlaceOrderBody>,
) -> Result<Json<ApiResponse<PlaceOrderResponse>>, EngineError> {
    let side = Side::from_str_loose(&body.side)
        .ok_or_else(|| EngineError::Validation(format!("unknown side {:?}", body.side)))?;
    let kind = OrderKind::from_str_loose(&body.kind)
        .ok_or_else(|| EngineError::Validation(format!("unknown order kind {:?}", body.kind)))?;

    let result = matching::place_order(
        &state.db,
        PlaceOrderRequest {
            user_id: body.user_id,
            market_id: body.market_id,
            outcome_id: body.outcome_id,
            side,
            kind,
            amount: body.amount,
            price: body.price,
        },
    )
    .await?;

    for trade in &result.trades {
        let _ = state.ws_tx.send(WsMessage::Trade(trade.clone()));
    }
    let _ = state.ws_tx.send(WsMessage::OrderUpdate(result.order.clone()));

    Ok(Json(ApiResponse::ok(PlaceOrderResponse {
        order: result.order,
        matched_order_ids: result.matched_order_ids,
        fully_filled: result.fully_filled,
    })))
}

#[derive(Deserialize)]
pub struct CancelOrderBody {
    pub user_id: Uuid,
}

/// POST /api/orders/:id/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CancelOrderBody>,
) -> Result<Json<ApiResponse<Order>>, EngineError> {
    let order = matching::cancel_order(&state.db, body.user_id, id).await?;
    let _ = state.ws_tx.send(WsMessage::OrderUpdate(order.clone()));
    Ok(Json(ApiResponse::ok(order)))
}
