use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::Transaction;

pub async fn insert_transaction(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
    amount: Decimal,
    kind: &str,
    metadata: Option<serde_json::Value>,
) -> sqlx::Result<Transaction> {
    sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (user_id, amount, kind, metadata)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(kind)
    .bind(metadata)
    .fetch_one(exec)
    .await
}

pub async fn get_transactions_by_user(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
) -> sqlx::Result<Vec<Transaction>> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(exec)
    .await
}
