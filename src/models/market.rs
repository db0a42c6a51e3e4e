use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for the markets table. `volume` is cumulative traded
/// notional; `resolved_outcome_id` is set exactly once at resolution.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Market {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub end_date: Option<DateTime<Utc>>,
    pub volume: Decimal,
    pub is_resolved: bool,
    pub resolved_outcome_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Database row for the outcomes table. `probability` doubles as the share
/// price and stays within [0.01, 0.99]; probabilities across a market sum
/// to 1.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Outcome {
    pub id: Uuid,
    pub market_id: Uuid,
    pub label: String,
    pub probability: Decimal,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
}
