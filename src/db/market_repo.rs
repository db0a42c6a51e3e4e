use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::models::{Market, Outcome};

/// Insert a market together with its outcomes, all at the given initial
/// probabilities. Runs multiple statements, so it takes a connection from
/// an open transaction.
pub async fn create_market(
    conn: &mut PgConnection,
    title: &str,
    category: &str,
    end_date: Option<DateTime<Utc>>,
    outcomes: &[(String, Decimal)],
) -> sqlx::Result<(Market, Vec<Outcome>)> {
    let market = sqlx::query_as::<_, Market>(
        r#"
        INSERT INTO markets (title, category, end_date)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(title)
    .bind(category)
    .bind(end_date)
    .fetch_one(&mut *conn)
    .await?;

    let mut created = Vec::with_capacity(outcomes.len());
    for (label, probability) in outcomes {
        let outcome = sqlx::query_as::<_, Outcome>(
            r#"
            INSERT INTO outcomes (market_id, label, probability)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(market.id)
        .bind(label)
        .bind(probability)
        .fetch_one(&mut *conn)
        .await?;
        created.push(outcome);
    }

    Ok((market, created))
}

pub async fn get_market(exec: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<Market>> {
    sqlx::query_as::<_, Market>("SELECT * FROM markets WHERE id = $1")
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// Lock the market row; serializes volume updates and resolution against
/// concurrent trades.
pub async fn get_market_for_update(
    exec: impl PgExecutor<'_>,
    id: Uuid,
) -> sqlx::Result<Option<Market>> {
    sqlx::query_as::<_, Market>("SELECT * FROM markets WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(exec)
        .await
}

pub async fn list_markets(exec: impl PgExecutor<'_>) -> sqlx::Result<Vec<Market>> {
    sqlx::query_as::<_, Market>("SELECT * FROM markets ORDER BY created_at DESC")
        .fetch_all(exec)
        .await
}

pub async fn add_volume(
    exec: impl PgExecutor<'_>,
    id: Uuid,
    notional: Decimal,
) -> sqlx::Result<Market> {
    sqlx::query_as::<_, Market>(
        "UPDATE markets SET volume = volume + $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(notional)
    .fetch_one(exec)
    .await
}

pub async fn mark_resolved(
    exec: impl PgExecutor<'_>,
    id: Uuid,
    winning_outcome_id: Uuid,
) -> sqlx::Result<Market> {
    sqlx::query_as::<_, Market>(
        r#"
        UPDATE markets
        SET is_resolved = TRUE, resolved_outcome_id = $2
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(winning_outcome_id)
    .fetch_one(exec)
    .await
}

pub async fn get_outcome(exec: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<Outcome>> {
    sqlx::query_as::<_, Outcome>("SELECT * FROM outcomes WHERE id = $1")
        .bind(id)
        .fetch_optional(exec)
        .await
}

pub async fn get_outcomes(exec: impl PgExecutor<'_>, market_id: Uuid) -> sqlx::Result<Vec<Outcome>> {
    sqlx::query_as::<_, Outcome>(
        "SELECT * FROM outcomes WHERE market_id = $1 ORDER BY created_at, id",
    )
    .bind(market_id)
    .fetch_all(exec)
    .await
}

/// Lock every outcome row of a market in a stable order. Two trades on the
/// same market serialize their probability read-modify-write here.
pub async fn get_outcomes_for_update(
    exec: impl PgExecutor<'_>,
    market_id: Uuid,
) -> sqlx::Result<Vec<Outcome>> {
    sqlx::query_as::<_, Outcome>(
        "SELECT * FROM outcomes WHERE market_id = $1 ORDER BY created_at, id FOR UPDATE",
    )
    .bind(market_id)
    .fetch_all(exec)
    .await
}

/// Compare-and-swap probability update: fails with zero rows affected when
/// another writer got there first.
pub async fn update_probability(
    exec: impl PgExecutor<'_>,
    outcome_id: Uuid,
    expected: Decimal,
    new: Decimal,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE outcomes SET probability = $3 WHERE id = $1 AND probability = $2",
    )
    .bind(outcome_id)
    .bind(expected)
    .bind(new)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn mark_outcome_resolved(
    exec: impl PgExecutor<'_>,
    outcome_id: Uuid,
) -> sqlx::Result<Outcome> {
    sqlx::query_as::<_, Outcome>(
        "UPDATE outcomes SET is_resolved = TRUE WHERE id = $1 RETURNING *",
    )
    .bind(outcome_id)
    .fetch_one(exec)
    .await
}
