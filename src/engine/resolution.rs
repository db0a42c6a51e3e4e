//! Resolution engine: the terminal transition of a market. Winners are paid
//! 1.00 per share, every holding is zeroed, every open order is cancelled
//! and BUY reservations refunded, all in one transaction.

use metrics::counter;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{holding_repo, market_repo, order_repo, user_repo};
use crate::errors::EngineError;
use crate::models::{order_status, txn_kind, Market, Side};

use super::ledger;

#[derive(Debug)]
pub struct ResolveMarketResult {
    pub market: Market,
    pub winners_paid: usize,
    pub holdings_settled: usize,
    pub orders_cancelled: usize,
}

pub async fn resolve_market(
    pool: &PgPool,
    admin_id: Uuid,
    market_id: Uuid,
    winning_outcome_id: Uuid,
) -> Result<ResolveMarketResult, EngineError> {
    let mut tx = pool.begin().await?;

    let caller = user_repo::get_user(&mut *tx, admin_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("user {admin_id}")))?;
    if !caller.is_admin {
        return Err(EngineError::Forbidden);
    }

    let market = market_repo::get_market_for_update(&mut *tx, market_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("market {market_id}")))?;
    if market.is_resolved {
        return Err(EngineError::AlreadyResolved);
    }

    let winning = market_repo::get_outcome(&mut *tx, winning_outcome_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("outcome {winning_outcome_id}")))?;
    if winning.market_id != market.id {
        return Err(EngineError::Validation(
            "outcome does not belong to market".into(),
        ));
    }

    let market = market_repo::mark_resolved(&mut *tx, market.id, winning.id).await?;
    market_repo::mark_outcome_resolved(&mut *tx, winning.id).await?;

    // Settle holdings: winners collect quantity * 1.00, losers collect
    // nothing, and no position survives resolution.
    let holdings = holding_repo::get_positive_holdings_for_market(&mut *tx, market.id).await?;
    let mut winners_paid = 0usize;
    for holding in &holdings {
        if holding.outcome_id == winning.id {
            ledger::apply(
                &mut *tx,
                holding.user_id,
                holding.quantity,
                txn_kind::MARKET_RESOLUTION_PAYOUT,
                Some(json!({
                    "market_id": market.id,
                    "outcome_id": winning.id,
                    "shares": holding.quantity,
                })),
            )
            .await?;
            winners_paid += 1;
        }
        holding_repo::zero_quantity(&mut *tx, holding.id).await?;
    }

    // Sweep the book: refund the unfilled part of BUY reservations, cancel
    // everything still open.
    let open_orders = order_repo::get_open_orders_for_market(&mut *tx, market.id).await?;
    for order in &open_orders {
        if order.side == Side::Buy.to_string() {
            let refund = order.amount - order.filled;
            if refund > Decimal::ZERO {
                ledger::apply(
                    &mut *tx,
                    order.user_id,
                    refund,
                    txn_kind::ORDER_REFUND,
                    Some(json!({ "order_id": order.id, "market_id": market.id })),
                )
                .await?;
            }
        }
        order_repo::set_status(&mut *tx, order.id, order_status::CANCELLED).await?;
    }

    tx.commit().await?;

    counter!("markets_resolved_total").increment(1);
    tracing::info!(
        market_id = %market.id,
        winning_outcome_id = %winning.id,
        winners_paid,
        holdings_settled = holdings.len(),
        orders_cancelled = open_orders.len(),
        "Market resolved"
    );

    Ok(ResolveMarketResult {
        market,
        winners_paid,
        holdings_settled: holdings.len(),
        orders_cancelled: open_orders.len(),
    })
}
