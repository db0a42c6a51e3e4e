use serde::Serialize;

use crate::models::{Market, Order, Trade};

/// Messages broadcast to all connected WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "trade")]
    Trade(Trade),

    #[serde(rename = "order_update")]
    OrderUpdate(Order),

    #[serde(rename = "market_resolved")]
    MarketResolved(Market),
}
