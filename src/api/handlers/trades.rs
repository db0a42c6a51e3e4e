use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::ws_types::WsMessage;
use crate::engine::matching::{self, ExecuteTradeRequest};
use crate::errors::EngineError;
use crate::models::{Side, Trade};
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct ExecuteTradeBody {
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub outcome_id: Uuid,
    pub amount: Decimal,
    pub side: String,
    /// When true, `amount` is a share quantity instead of notional.
    #[serde(default)]
    pub shares_mode: bool,
}

#[derive(Serialize)]
pub struct ExecuteTradeResponse {
    pub trade: Trade,
    pub new_probability: Decimal,
}

/// POST /api/trades — direct execution against the current probability.
pub async fn execute(
    State(state): State<AppState>,
    Json(body): Json<ExecuteTradeBody>,
) -> Result<Json<ApiResponse<ExecuteTradeResponse>>, EngineError> {
    let side = Side::from_str_loose(&body.side)
        .ok_or_else(|| EngineError::Validation(format!("unknown side {:?}", body.side)))?;

    let result = matching::execute_trade(
        &state.db,
        ExecuteTradeRequest {
            user_id: body.user_id,
            market_id: body.market_id,
            outcome_id: body.outcome_id,
            amount: body.amount,
            side,
            shares_mode: body.shares_mode,
        },
    )
    .await?;

    let _ = state.ws_tx.send(WsMessage::Trade(result.trade.clone()));

    Ok(Json(ApiResponse::ok(ExecuteTradeResponse {
        trade: result.trade,
        new_probability: result.new_probability,
    })))
}
