use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::Holding;

pub async fn get_holding(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
    outcome_id: Uuid,
) -> sqlx::Result<Option<Holding>> {
    sqlx::query_as::<_, Holding>(
        "SELECT * FROM holdings WHERE user_id = $1 AND outcome_id = $2",
    )
    .bind(user_id)
    .bind(outcome_id)
    .fetch_optional(exec)
    .await
}

pub async fn get_holding_for_update(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
    outcome_id: Uuid,
) -> sqlx::Result<Option<Holding>> {
    sqlx::query_as::<_, Holding>(
        "SELECT * FROM holdings WHERE user_id = $1 AND outcome_id = $2 FOR UPDATE",
    )
    .bind(user_id)
    .bind(outcome_id)
    .fetch_optional(exec)
    .await
}

pub async fn insert_holding(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
    outcome_id: Uuid,
    market_id: Uuid,
    quantity: Decimal,
    avg_price: Decimal,
) -> sqlx::Result<Holding> {
    sqlx::query_as::<_, Holding>(
        r#"
        INSERT INTO holdings (user_id, outcome_id, market_id, quantity, avg_price)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(outcome_id)
    .bind(market_id)
    .bind(quantity)
    .bind(avg_price)
    .fetch_one(exec)
    .await
}

pub async fn update_holding(
    exec: impl PgExecutor<'_>,
    id: Uuid,
    quantity: Decimal,
    avg_price: Decimal,
) -> sqlx::Result<Holding> {
    sqlx::query_as::<_, Holding>(
        r#"
        UPDATE holdings
        SET quantity = $2, avg_price = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(avg_price)
    .fetch_one(exec)
    .await
}

pub async fn delete_holding(exec: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM holdings WHERE id = $1")
        .bind(id)
        .execute(exec)
        .await?;
    Ok(())
}

/// Every positive holding in a market, locked for settlement.
pub async fn get_positive_holdings_for_market(
    exec: impl PgExecutor<'_>,
    market_id: Uuid,
) -> sqlx::Result<Vec<Holding>> {
    sqlx::query_as::<_, Holding>(
        "SELECT * FROM holdings WHERE market_id = $1 AND quantity > 0 ORDER BY id FOR UPDATE",
    )
    .bind(market_id)
    .fetch_all(exec)
    .await
}

pub async fn zero_quantity(exec: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Holding> {
    sqlx::query_as::<_, Holding>(
        "UPDATE holdings SET quantity = 0, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(exec)
    .await
}

pub async fn get_holdings_by_user(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
) -> sqlx::Result<Vec<Holding>> {
    sqlx::query_as::<_, Holding>(
        "SELECT * FROM holdings WHERE user_id = $1 ORDER BY updated_at DESC",
    )
    .bind(user_id)
    .fetch_all(exec)
    .await
}
