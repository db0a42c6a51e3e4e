//! Position book: owns holdings (share quantity + cost basis) per
//! (user, outcome). Buys blend into a weighted-average cost; sells reduce
//! pro-rata and realize P&L against the average.

use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::holding_repo;
use crate::errors::EngineError;
use crate::models::Holding;

const QTY_DP: u32 = 4;

fn round_qty(q: Decimal) -> Decimal {
    q.round_dp_with_strategy(QTY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Shares bought for a given notional at a given price. The probability
/// floor keeps prices off zero, but the division is still guarded.
pub fn shares_for_notional(notional: Decimal, price: Decimal) -> Result<Decimal, EngineError> {
    if price <= Decimal::ZERO {
        return Err(EngineError::Validation(format!(
            "cannot price shares at {price}"
        )));
    }
    Ok(round_qty(notional / price))
}

/// Weighted-average cost after adding `bought` shares at `price` to an
/// existing (quantity, avg) position.
pub fn blended_average(
    old_qty: Decimal,
    old_avg: Decimal,
    bought: Decimal,
    price: Decimal,
) -> Decimal {
    let total = old_qty + bought;
    ((old_avg * old_qty + price * bought) / total)
        .round_dp_with_strategy(QTY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Realized P&L when selling `sold` shares at `price` against an `avg`
/// cost basis.
pub fn realized_pnl(sold: Decimal, price: Decimal, avg: Decimal) -> Decimal {
    (sold * (price - avg)).round_dp_with_strategy(QTY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Add shares to a user's holding, creating it on first acquisition.
pub async fn acquire(
    conn: &mut PgConnection,
    user_id: Uuid,
    outcome_id: Uuid,
    market_id: Uuid,
    quantity: Decimal,
    price: Decimal,
) -> Result<Holding, EngineError> {
    let existing = holding_repo::get_holding_for_update(&mut *conn, user_id, outcome_id).await?;

    let holding = match existing {
        Some(h) => {
            let avg = blended_average(h.quantity, h.avg_price, quantity, price);
            holding_repo::update_holding(&mut *conn, h.id, h.quantity + quantity, avg).await?
        }
        None => {
            holding_repo::insert_holding(&mut *conn, user_id, outcome_id, market_id, quantity, price)
                .await?
        }
    };

    Ok(holding)
}

/// Remove shares from a user's holding. A full sell deletes the row. The
/// average price is untouched by partial sells. Returns the realized P&L.
///
/// `reserved` is the share quantity already promised to the user's OPEN
/// SELL orders; it is unavailable for disposal here.
pub async fn dispose(
    conn: &mut PgConnection,
    user_id: Uuid,
    outcome_id: Uuid,
    quantity: Decimal,
    price: Decimal,
    reserved: Decimal,
) -> Result<Decimal, EngineError> {
    let holding = holding_repo::get_holding_for_update(&mut *conn, user_id, outcome_id)
        .await?
        .ok_or(EngineError::InsufficientShares {
            required: quantity,
            available: Decimal::ZERO,
        })?;

    let available = holding.quantity - reserved;
    if available < quantity {
        return Err(EngineError::InsufficientShares {
            required: quantity,
            available,
        });
    }

    let pnl = realized_pnl(quantity, price, holding.avg_price);

    if holding.quantity == quantity {
        holding_repo::delete_holding(&mut *conn, holding.id).await?;
    } else {
        holding_repo::update_holding(
            &mut *conn,
            holding.id,
            holding.quantity - quantity,
            holding.avg_price,
        )
        .await?;
    }

    Ok(pnl)
}
