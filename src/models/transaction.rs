use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Append-only ledger entry; the audit trail for every balance change.
/// `amount` is signed (credits positive, debits negative). `metadata`
/// carries extras such as realized P&L on sells.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub kind: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
