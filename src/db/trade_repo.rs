use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{Side, Trade};

#[allow(clippy::too_many_arguments)]
pub async fn insert_trade(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
    counterparty_order_id: Option<Uuid>,
    market_id: Uuid,
    outcome_id: Uuid,
    side: Side,
    amount: Decimal,
    price: Decimal,
    notional: Decimal,
) -> sqlx::Result<Trade> {
    sqlx::query_as::<_, Trade>(
        r#"
        INSERT INTO trades (user_id, counterparty_order_id, market_id, outcome_id, side, amount, price, notional)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(counterparty_order_id)
    .bind(market_id)
    .bind(outcome_id)
    .bind(side.to_string())
    .bind(amount)
    .bind(price)
    .bind(notional)
    .fetch_one(exec)
    .await
}

pub async fn get_trades_for_market(
    exec: impl PgExecutor<'_>,
    market_id: Uuid,
    limit: i64,
) -> sqlx::Result<Vec<Trade>> {
    sqlx::query_as::<_, Trade>(
        "SELECT * FROM trades WHERE market_id = $1 ORDER BY executed_at DESC LIMIT $2",
    )
    .bind(market_id)
    .bind(limit)
    .fetch_all(exec)
    .await
}

pub async fn get_trades_by_user(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
) -> sqlx::Result<Vec<Trade>> {
    sqlx::query_as::<_, Trade>(
        "SELECT * FROM trades WHERE user_id = $1 ORDER BY executed_at DESC",
    )
    .bind(user_id)
    .fetch_all(exec)
    .await
}
