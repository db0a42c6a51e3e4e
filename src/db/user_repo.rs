use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::User;

pub async fn insert_user(
    exec: impl PgExecutor<'_>,
    username: &str,
    balance: Decimal,
    is_admin: bool,
) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, balance, is_admin)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(username)
    .bind(balance)
    .bind(is_admin)
    .fetch_one(exec)
    .await
}

pub async fn get_user(exec: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// Lock the user row for the remainder of the enclosing transaction.
/// Balance read-modify-write must go through this to serialize with
/// concurrent operations on the same user.
pub async fn get_user_for_update(
    exec: impl PgExecutor<'_>,
    id: Uuid,
) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(exec)
        .await
}

pub async fn adjust_balance(
    exec: impl PgExecutor<'_>,
    id: Uuid,
    delta: Decimal,
) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET balance = balance + $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(delta)
    .fetch_one(exec)
    .await
}
