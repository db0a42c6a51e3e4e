//! Matching engine: order lifecycle and trade orchestration.
//!
//! LIMIT orders rest on the book (BUY reserves funds at placement, SELL
//! reserves shares implicitly). MARKET orders walk the opposite side of the
//! book best-price-first, FIFO within a price level, filling at the maker's
//! price. The direct-execution path trades against the current probability
//! instead of the book. Every operation is one database transaction.

use metrics::counter;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{market_repo, order_repo, trade_repo, user_repo};
use crate::errors::EngineError;
use crate::models::{order_status, txn_kind, Order, OrderKind, Side, Trade};

use super::{ledger, position, pricing};

const AMOUNT_DP: u32 = 4;

fn round_amount(a: Decimal) -> Decimal {
    a.round_dp_with_strategy(AMOUNT_DP, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub outcome_id: Uuid,
    pub side: Side,
    pub kind: OrderKind,
    /// Notional currency for BUY orders, shares for SELL orders.
    pub amount: Decimal,
    /// Required for LIMIT orders, ignored for MARKET orders.
    pub price: Option<Decimal>,
}

#[derive(Debug)]
pub struct PlaceOrderResult {
    pub order: Order,
    pub matched_order_ids: Vec<Uuid>,
    pub fully_filled: bool,
    pub trades: Vec<Trade>,
}

#[derive(Debug, Clone)]
pub struct ExecuteTradeRequest {
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub outcome_id: Uuid,
    pub amount: Decimal,
    pub side: Side,
    /// When true, `amount` is a share quantity; otherwise notional currency.
    pub shares_mode: bool,
}

#[derive(Debug)]
pub struct ExecuteTradeResult {
    pub trade: Trade,
    pub new_probability: Decimal,
}

/// Notional and share quantity exchanged when an incoming MARKET order
/// meets one resting order at the maker's price. BUY remainders are in
/// notional, SELL remainders in shares; full consumption of the maker uses
/// the maker's exact remainder so fills never overshoot.
pub(crate) fn fill_amounts(
    incoming_side: Side,
    incoming_remaining: Decimal,
    maker_price: Decimal,
    maker_remaining: Decimal,
) -> (Decimal, Decimal) {
    match incoming_side {
        Side::Buy => {
            // maker is a SELL resting in shares
            let capacity_notional = round_amount(maker_remaining * maker_price);
            if incoming_remaining >= capacity_notional {
                (capacity_notional, maker_remaining)
            } else {
                let notional = incoming_remaining;
                (notional, round_amount(notional / maker_price))
            }
        }
        Side::Sell => {
            // maker is a BUY resting in notional
            let capacity_shares = round_amount(maker_remaining / maker_price);
            if incoming_remaining >= capacity_shares {
                (maker_remaining, capacity_shares)
            } else {
                let shares = incoming_remaining;
                (round_amount(shares * maker_price), shares)
            }
        }
    }
}

fn final_status(filled: Decimal, amount: Decimal) -> &'static str {
    if filled >= amount {
        order_status::FILLED
    } else {
        order_status::OPEN
    }
}

/// Place a LIMIT or MARKET order. Validations and every share/balance/
/// probability effect happen inside one transaction; any failure rolls the
/// whole operation back.
pub async fn place_order(
    pool: &PgPool,
    req: PlaceOrderRequest,
) -> Result<PlaceOrderResult, EngineError> {
    if req.amount <= Decimal::ZERO {
        return Err(EngineError::Validation("amount must be positive".into()));
    }
    let amount = round_amount(req.amount);

    let mut tx = pool.begin().await?;

    let market = market_repo::get_market_for_update(&mut *tx, req.market_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("market {}", req.market_id)))?;
    if market.is_resolved {
        return Err(EngineError::MarketResolved);
    }

    let outcome = market_repo::get_outcome(&mut *tx, req.outcome_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("outcome {}", req.outcome_id)))?;
    if outcome.market_id != market.id {
        return Err(EngineError::Validation(
            "outcome does not belong to market".into(),
        ));
    }

    let result = match req.kind {
        OrderKind::Limit => {
            let price = req
                .price
                .ok_or_else(|| EngineError::Validation("limit order requires a price".into()))?;
            if price < pricing::prob_floor() || price > pricing::prob_ceiling() {
                return Err(EngineError::Validation(format!(
                    "price {price} outside [0.01, 0.99]"
                )));
            }
            place_limit(&mut tx, &req, amount, price).await?
        }
        OrderKind::Market => {
            place_market(&mut tx, &req, amount, market.volume, outcome.probability).await?
        }
    };

    tx.commit().await?;

    counter!("orders_placed_total").increment(1);
    tracing::info!(
        order_id = %result.order.id,
        user_id = %req.user_id,
        market_id = %req.market_id,
        side = %req.side,
        kind = %req.kind,
        amount = %amount,
        matched = result.matched_order_ids.len(),
        fully_filled = result.fully_filled,
        "Order placed"
    );

    Ok(result)
}

async fn place_limit(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    req: &PlaceOrderRequest,
    amount: Decimal,
    price: Decimal,
) -> Result<PlaceOrderResult, EngineError> {
    match req.side {
        Side::Buy => {
            let user = user_repo::get_user_for_update(&mut **tx, req.user_id)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("user {}", req.user_id)))?;
            if user.balance < amount {
                return Err(EngineError::InsufficientBalance {
                    required: amount,
                    available: user.balance,
                });
            }

            let order = order_repo::insert_order(
                &mut **tx,
                req.user_id,
                req.market_id,
                req.outcome_id,
                Side::Buy,
                OrderKind::Limit,
                amount,
                price,
            )
            .await?;

            // Funds come out up front; cancellation refunds the unfilled part.
            ledger::apply(
                &mut *tx,
                req.user_id,
                -amount,
                txn_kind::ORDER_RESERVE,
                Some(json!({ "order_id": order.id })),
            )
            .await?;

            Ok(PlaceOrderResult {
                order,
                matched_order_ids: Vec::new(),
                fully_filled: false,
                trades: Vec::new(),
            })
        }
        Side::Sell => {
            let available = available_shares(tx, req.user_id, req.outcome_id).await?;
            if available < amount {
                return Err(EngineError::InsufficientShares {
                    required: amount,
                    available,
                });
            }

            let order = order_repo::insert_order(
                &mut **tx,
                req.user_id,
                req.market_id,
                req.outcome_id,
                Side::Sell,
                OrderKind::Limit,
                amount,
                price,
            )
            .await?;

            Ok(PlaceOrderResult {
                order,
                matched_order_ids: Vec::new(),
                fully_filled: false,
                trades: Vec::new(),
            })
        }
    }
}

/// Holding quantity net of shares already promised to resting SELL limit
/// orders.
async fn available_shares(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    outcome_id: Uuid,
) -> Result<Decimal, EngineError> {
    let held = crate::db::holding_repo::get_holding_for_update(&mut **tx, user_id, outcome_id)
        .await?
        .map(|h| h.quantity)
        .unwrap_or(Decimal::ZERO);
    let reserved = order_repo::reserved_sell_quantity(&mut **tx, user_id, outcome_id).await?;
    Ok(held - reserved)
}

async fn place_market(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    req: &PlaceOrderRequest,
    amount: Decimal,
    volume_at_start: Decimal,
    probability_snapshot: Decimal,
) -> Result<PlaceOrderResult, EngineError> {
    let taker = user_repo::get_user_for_update(&mut **tx, req.user_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("user {}", req.user_id)))?;

    // Upfront sufficiency for the whole requested size. Computed before the
    // taker's own order row exists so reservation sums stay honest.
    let taker_reserved = match req.side {
        Side::Buy => {
            if taker.balance < amount {
                return Err(EngineError::InsufficientBalance {
                    required: amount,
                    available: taker.balance,
                });
            }
            Decimal::ZERO
        }
        Side::Sell => {
            let available = available_shares(tx, req.user_id, req.outcome_id).await?;
            if available < amount {
                return Err(EngineError::InsufficientShares {
                    required: amount,
                    available,
                });
            }
            order_repo::reserved_sell_quantity(&mut **tx, req.user_id, req.outcome_id).await?
        }
    };

    let resting =
        order_repo::get_resting_orders(&mut **tx, req.market_id, req.outcome_id, req.side).await?;

    let incoming = order_repo::insert_order(
        &mut **tx,
        req.user_id,
        req.market_id,
        req.outcome_id,
        req.side,
        OrderKind::Market,
        amount,
        probability_snapshot,
    )
    .await?;

    let mut filled = Decimal::ZERO;
    let mut matched_order_ids = Vec::new();
    let mut trades = Vec::new();
    let mut running_volume = volume_at_start;

    for maker_order in &resting {
        let remaining = amount - filled;
        if remaining <= Decimal::ZERO {
            break;
        }
        // A user's own resting orders are skipped rather than self-matched.
        if maker_order.user_id == req.user_id {
            continue;
        }
        let maker_remaining = maker_order.remaining();
        if maker_remaining <= Decimal::ZERO {
            continue;
        }

        let price = maker_order.price;
        let (notional, shares) = fill_amounts(req.side, remaining, price, maker_remaining);
        if notional <= Decimal::ZERO || shares <= Decimal::ZERO {
            continue;
        }

        settle_fill(
            tx,
            req,
            &incoming,
            maker_order,
            price,
            notional,
            shares,
            taker_reserved,
            &mut trades,
        )
        .await?;

        // Maker bookkeeping in the maker's own denomination.
        let maker_filled = maker_order.filled
            + match req.side {
                Side::Buy => shares,
                Side::Sell => notional,
            };
        order_repo::update_fill(
            &mut **tx,
            maker_order.id,
            maker_filled,
            final_status(maker_filled, maker_order.amount),
        )
        .await?;
        matched_order_ids.push(maker_order.id);

        filled += match req.side {
            Side::Buy => notional,
            Side::Sell => shares,
        };

        // Probability impact per fill, against the volume before the fill.
        pricing::apply_trade_impact(
            &mut *tx,
            req.market_id,
            req.outcome_id,
            notional,
            running_volume,
            req.side,
        )
        .await?;
        market_repo::add_volume(&mut **tx, req.market_id, notional).await?;
        running_volume += notional;
    }

    // A MARKET order never rests: fully matched finalizes as FILLED, any
    // unfilled remainder is abandoned and the order closes CANCELLED.
    let fully_filled = filled >= amount;
    let status = if fully_filled {
        order_status::FILLED
    } else {
        order_status::CANCELLED
    };
    let order = order_repo::update_fill(&mut **tx, incoming.id, filled, status).await?;

    Ok(PlaceOrderResult {
        order,
        matched_order_ids,
        fully_filled,
        trades,
    })
}

/// Ledger + position book effects for both parties of one fill, plus the
/// two trade rows.
#[allow(clippy::too_many_arguments)]
async fn settle_fill(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    req: &PlaceOrderRequest,
    incoming: &Order,
    maker_order: &Order,
    price: Decimal,
    notional: Decimal,
    shares: Decimal,
    taker_reserved: Decimal,
    trades: &mut Vec<Trade>,
) -> Result<(), EngineError> {
    match req.side {
        Side::Buy => {
            // Taker pays notional and takes shares.
            ledger::apply(
                &mut *tx,
                req.user_id,
                -notional,
                txn_kind::TRADE_BUY,
                Some(json!({ "order_id": incoming.id, "price": price })),
            )
            .await?;
            position::acquire(
                &mut *tx,
                req.user_id,
                req.outcome_id,
                req.market_id,
                shares,
                price,
            )
            .await?;

            // Maker delivers shares from its holding; the resting SELL order
            // itself is the reservation, so only the maker's *other* open
            // sells stay off-limits.
            let maker_reserved =
                order_repo::reserved_sell_quantity(&mut **tx, maker_order.user_id, req.outcome_id)
                    .await?
                    - maker_order.remaining();
            let pnl = position::dispose(
                &mut *tx,
                maker_order.user_id,
                req.outcome_id,
                shares,
                price,
                maker_reserved.max(Decimal::ZERO),
            )
            .await?;
            ledger::apply(
                &mut *tx,
                maker_order.user_id,
                notional,
                txn_kind::TRADE_SELL,
                Some(json!({ "order_id": maker_order.id, "realized_pnl": pnl })),
            )
            .await?;
        }
        Side::Sell => {
            // Taker delivers shares and takes the maker's reserved funds.
            let pnl = position::dispose(
                &mut *tx,
                req.user_id,
                req.outcome_id,
                shares,
                price,
                taker_reserved,
            )
            .await?;
            ledger::apply(
                &mut *tx,
                req.user_id,
                notional,
                txn_kind::TRADE_SELL,
                Some(json!({ "order_id": incoming.id, "realized_pnl": pnl })),
            )
            .await?;

            // Maker's funds were debited at placement; it just takes shares.
            position::acquire(
                &mut *tx,
                maker_order.user_id,
                req.outcome_id,
                req.market_id,
                shares,
                price,
            )
            .await?;
        }
    }

    let taker_trade = trade_repo::insert_trade(
        &mut **tx,
        req.user_id,
        Some(maker_order.id),
        req.market_id,
        req.outcome_id,
        req.side,
        shares,
        price,
        notional,
    )
    .await?;
    let maker_trade = trade_repo::insert_trade(
        &mut **tx,
        maker_order.user_id,
        Some(incoming.id),
        req.market_id,
        req.outcome_id,
        req.side.opposite(),
        shares,
        price,
        notional,
    )
    .await?;
    trades.push(taker_trade);
    trades.push(maker_trade);

    Ok(())
}

/// Cancel an OPEN order. Owner or admin only; the unfilled part of a BUY
/// reservation is refunded, SELL cancellation frees the implicit share
/// reservation with no ledger effect.
pub async fn cancel_order(
    pool: &PgPool,
    caller_id: Uuid,
    order_id: Uuid,
) -> Result<Order, EngineError> {
    let mut tx = pool.begin().await?;

    let order = order_repo::get_order_for_update(&mut *tx, order_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;

    let caller = user_repo::get_user(&mut *tx, caller_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("user {caller_id}")))?;
    if order.user_id != caller.id && !caller.is_admin {
        return Err(EngineError::Forbidden);
    }

    let market = market_repo::get_market(&mut *tx, order.market_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("market {}", order.market_id)))?;
    if market.is_resolved {
        return Err(EngineError::MarketResolved);
    }

    if order.status != order_status::OPEN {
        return Err(EngineError::AlreadyClosed);
    }

    let cancelled = order_repo::set_status(&mut *tx, order.id, order_status::CANCELLED).await?;

    if order.side == Side::Buy.to_string() {
        let refund = order.amount - order.filled;
        if refund > Decimal::ZERO {
            ledger::apply(
                &mut *tx,
                order.user_id,
                refund,
                txn_kind::ORDER_CANCEL_REFUND,
                Some(json!({ "order_id": order.id })),
            )
            .await?;
        }
    }

    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        caller_id = %caller_id,
        "Order cancelled"
    );

    Ok(cancelled)
}

/// Direct execution against the current probability (the plain trading UI
/// path): no book, one trade row, immediate position/balance effect.
pub async fn execute_trade(
    pool: &PgPool,
    req: ExecuteTradeRequest,
) -> Result<ExecuteTradeResult, EngineError> {
    if req.amount <= Decimal::ZERO {
        return Err(EngineError::Validation("amount must be positive".into()));
    }

    let mut tx = pool.begin().await?;

    let market = market_repo::get_market_for_update(&mut *tx, req.market_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("market {}", req.market_id)))?;
    if market.is_resolved {
        return Err(EngineError::MarketResolved);
    }

    // Lock the outcome rows up front; the price read here is the price the
    // trade executes at, and the CAS write later keeps it honest.
    let outcomes = market_repo::get_outcomes_for_update(&mut *tx, req.market_id).await?;
    let outcome = outcomes
        .iter()
        .find(|o| o.id == req.outcome_id)
        .ok_or_else(|| EngineError::NotFound(format!("outcome {}", req.outcome_id)))?;

    let price = outcome.probability;
    let (notional, shares) = if req.shares_mode {
        let shares = round_amount(req.amount);
        (round_amount(shares * price), shares)
    } else {
        let notional = round_amount(req.amount);
        (notional, position::shares_for_notional(notional, price)?)
    };
    if notional <= Decimal::ZERO || shares <= Decimal::ZERO {
        return Err(EngineError::Validation("trade size rounds to zero".into()));
    }

    let user = user_repo::get_user_for_update(&mut *tx, req.user_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("user {}", req.user_id)))?;

    match req.side {
        Side::Buy => {
            if user.balance < notional {
                return Err(EngineError::InsufficientBalance {
                    required: notional,
                    available: user.balance,
                });
            }
            ledger::apply(
                &mut *tx,
                req.user_id,
                -notional,
                txn_kind::TRADE_BUY,
                Some(json!({ "market_id": req.market_id, "outcome_id": req.outcome_id })),
            )
            .await?;
            position::acquire(
                &mut *tx,
                req.user_id,
                req.outcome_id,
                req.market_id,
                shares,
                price,
            )
            .await?;
        }
        Side::Sell => {
            let reserved =
                order_repo::reserved_sell_quantity(&mut *tx, req.user_id, req.outcome_id).await?;
            let pnl = position::dispose(
                &mut *tx,
                req.user_id,
                req.outcome_id,
                shares,
                price,
                reserved,
            )
            .await?;
            ledger::apply(
                &mut *tx,
                req.user_id,
                notional,
                txn_kind::TRADE_SELL,
                Some(json!({ "realized_pnl": pnl })),
            )
            .await?;
        }
    }

    let trade = trade_repo::insert_trade(
        &mut *tx,
        req.user_id,
        None,
        req.market_id,
        req.outcome_id,
        req.side,
        shares,
        price,
        notional,
    )
    .await?;

    let new_probability = pricing::apply_trade_impact(
        &mut tx,
        req.market_id,
        req.outcome_id,
        notional,
        market.volume,
        req.side,
    )
    .await?;
    market_repo::add_volume(&mut *tx, req.market_id, notional).await?;

    tx.commit().await?;

    counter!("trades_executed_total").increment(1);
    tracing::info!(
        trade_id = %trade.id,
        user_id = %req.user_id,
        market_id = %req.market_id,
        side = %req.side,
        shares = %shares,
        notional = %notional,
        new_probability = %new_probability,
        "Trade executed"
    );

    Ok(ExecuteTradeResult {
        trade,
        new_probability,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn buy_fill_consumes_maker_exactly_when_larger() {
        // Incoming BUY has 100 notional; maker offers 80 shares at 0.50.
        let (notional, shares) = fill_amounts(Side::Buy, dec!(100), dec!(0.50), dec!(80));
        assert_eq!(notional, dec!(40));
        assert_eq!(shares, dec!(80));
    }

    #[test]
    fn buy_fill_partial_maker_when_smaller() {
        // Incoming BUY has 10 notional left against 100 shares at 0.40.
        let (notional, shares) = fill_amounts(Side::Buy, dec!(10), dec!(0.40), dec!(100));
        assert_eq!(notional, dec!(10));
        assert_eq!(shares, dec!(25));
    }

    #[test]
    fn sell_fill_consumes_maker_notional_exactly() {
        // Incoming SELL has 200 shares; maker bid holds 30 notional at 0.60.
        let (notional, shares) = fill_amounts(Side::Sell, dec!(200), dec!(0.60), dec!(30));
        assert_eq!(notional, dec!(30));
        assert_eq!(shares, dec!(50));
    }

    #[test]
    fn sell_fill_partial_maker_when_smaller() {
        let (notional, shares) = fill_amounts(Side::Sell, dec!(20), dec!(0.60), dec!(30));
        assert_eq!(shares, dec!(20));
        assert_eq!(notional, dec!(12));
    }

    #[test]
    fn awkward_prices_round_without_overshooting_the_maker() {
        // Maker: 33.3333 shares at 0.30 -> capacity 10.0000 notional.
        let (notional, shares) = fill_amounts(Side::Buy, dec!(50), dec!(0.30), dec!(33.3333));
        assert_eq!(notional, dec!(10));
        assert_eq!(shares, dec!(33.3333));

        // Partial take at a repeating-decimal price still rounds to 4 dp.
        let (notional, shares) = fill_amounts(Side::Buy, dec!(10), dec!(0.33), dec!(1000));
        assert_eq!(notional, dec!(10));
        assert_eq!(shares, dec!(30.3030));
    }

    #[test]
    fn final_status_flips_only_on_complete_fill() {
        assert_eq!(final_status(dec!(100), dec!(100)), order_status::FILLED);
        assert_eq!(final_status(dec!(99.9999), dec!(100)), order_status::OPEN);
        assert_eq!(final_status(Decimal::ZERO, dec!(100)), order_status::OPEN);
    }
}
