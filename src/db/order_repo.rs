use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{Order, OrderKind, Side};

#[allow(clippy::too_many_arguments)]
pub async fn insert_order(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
    market_id: Uuid,
    outcome_id: Uuid,
    side: Side,
    kind: OrderKind,
    amount: Decimal,
    price: Decimal,
) -> sqlx::Result<Order> {
    sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (user_id, market_id, outcome_id, side, kind, amount, price)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(market_id)
    .bind(outcome_id)
    .bind(side.to_string())
    .bind(kind.to_string())
    .bind(amount)
    .bind(price)
    .fetch_one(exec)
    .await
}

pub async fn get_order(exec: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<Order>> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(exec)
        .await
}

pub async fn get_order_for_update(
    exec: impl PgExecutor<'_>,
    id: Uuid,
) -> sqlx::Result<Option<Order>> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// Snapshot of the resting book one incoming MARKET order will walk:
/// opposite-side OPEN orders for the (market, outcome), best price first,
/// FIFO within a price level. Rows are locked so concurrent takers cannot
/// fill against the same maker twice.
pub async fn get_resting_orders(
    exec: impl PgExecutor<'_>,
    market_id: Uuid,
    outcome_id: Uuid,
    incoming_side: Side,
) -> sqlx::Result<Vec<Order>> {
    // An incoming BUY consumes resting SELLs cheapest-first; an incoming
    // SELL consumes resting BUYs highest-bid-first.
    let sql = match incoming_side {
        Side::Buy => {
            r#"
            SELECT * FROM orders
            WHERE market_id = $1 AND outcome_id = $2 AND side = 'SELL' AND status = 'OPEN'
            ORDER BY price ASC, created_at ASC
            FOR UPDATE
            "#
        }
        Side::Sell => {
            r#"
            SELECT * FROM orders
            WHERE market_id = $1 AND outcome_id = $2 AND side = 'BUY' AND status = 'OPEN'
            ORDER BY price DESC, created_at ASC
            FOR UPDATE
            "#
        }
    };

    sqlx::query_as::<_, Order>(sql)
        .bind(market_id)
        .bind(outcome_id)
        .fetch_all(exec)
        .await
}

pub async fn update_fill(
    exec: impl PgExecutor<'_>,
    id: Uuid,
    filled: Decimal,
    status: &str,
) -> sqlx::Result<Order> {
    sqlx::query_as::<_, Order>(
        "UPDATE orders SET filled = $2, status = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(filled)
    .bind(status)
    .fetch_one(exec)
    .await
}

pub async fn set_status(
    exec: impl PgExecutor<'_>,
    id: Uuid,
    status: &str,
) -> sqlx::Result<Order> {
    sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_one(exec)
    .await
}

/// Shares already promised to the user's resting OPEN SELL limit orders on
/// this outcome. Placement and disposal validate against
/// available = holding.quantity - reserved. MARKET orders never rest, so
/// only LIMIT orders count.
pub async fn reserved_sell_quantity(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
    outcome_id: Uuid,
) -> sqlx::Result<Decimal> {
    let row: (Option<Decimal>,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(amount - filled), 0)
        FROM orders
        WHERE user_id = $1 AND outcome_id = $2
          AND side = 'SELL' AND kind = 'LIMIT' AND status = 'OPEN'
        "#,
    )
    .bind(user_id)
    .bind(outcome_id)
    .fetch_one(exec)
    .await?;

    Ok(row.0.unwrap_or(Decimal::ZERO))
}

/// Read-only view of a market's open orders.
pub async fn list_open_orders(
    exec: impl PgExecutor<'_>,
    market_id: Uuid,
) -> sqlx::Result<Vec<Order>> {
    sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE market_id = $1 AND status = 'OPEN' ORDER BY created_at",
    )
    .bind(market_id)
    .fetch_all(exec)
    .await
}

/// All OPEN orders in a market, locked; resolution cancels them.
pub async fn get_open_orders_for_market(
    exec: impl PgExecutor<'_>,
    market_id: Uuid,
) -> sqlx::Result<Vec<Order>> {
    sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE market_id = $1 AND status = 'OPEN' ORDER BY created_at FOR UPDATE",
    )
    .bind(market_id)
    .fetch_all(exec)
    .await
}

pub async fn get_orders_by_user(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
) -> sqlx::Result<Vec<Order>> {
    sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(exec)
    .await
}
