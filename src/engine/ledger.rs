//! Ledger: the only writer of user balances, and the append-only
//! transaction trail behind every balance change.

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::{transaction_repo, user_repo};
use crate::errors::EngineError;
use crate::models::{Transaction, User};

/// Apply a signed balance delta and record the matching transaction row.
/// Runs inside the caller's transaction. Sufficiency is the caller's
/// responsibility; the balance CHECK constraint is the last line of
/// defense and surfaces as a database error, rolling everything back.
pub async fn apply(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount: Decimal,
    kind: &str,
    metadata: Option<serde_json::Value>,
) -> Result<(User, Transaction), EngineError> {
    let user = user_repo::adjust_balance(&mut *conn, user_id, amount).await?;
    let txn = transaction_repo::insert_transaction(&mut *conn, user_id, amount, kind, metadata)
        .await?;

    tracing::debug!(
        user_id = %user_id,
        amount = %amount,
        kind = kind,
        balance = %user.balance,
        "Ledger entry"
    );

    Ok((user, txn))
}
