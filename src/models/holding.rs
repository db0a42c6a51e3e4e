use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for the holdings table: one row per (user, outcome), long
/// shares only. The outcome reference makes the position side explicit;
/// there is no price-proximity heuristic to infer YES/NO.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Holding {
    pub id: Uuid,
    pub user_id: Uuid,
    pub outcome_id: Uuid,
    pub market_id: Uuid,
    pub quantity: Decimal,
    pub avg_price: Decimal,
    pub updated_at: DateTime<Utc>,
}
