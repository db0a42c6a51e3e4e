//! Pricing engine: owns outcome probabilities.
//!
//! Every trade moves the traded outcome's probability by a volume-sensitive
//! impact factor and rescales the sibling outcomes so the market still sums
//! to 1. All writes happen inside the caller's transaction with the outcome
//! rows locked.

use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::market_repo;
use crate::errors::EngineError;
use crate::models::{Outcome, Side};

/// Probabilities are kept to 4 decimal places.
pub const PROB_DP: u32 = 4;

pub fn prob_floor() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

pub fn prob_ceiling() -> Decimal {
    Decimal::new(99, 2) // 0.99
}

fn round_prob(p: Decimal) -> Decimal {
    p.round_dp_with_strategy(PROB_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Impact factor: 0.1 probability-points of remaining headroom consumed per
/// 100% of current market volume traded in one trade.
fn impact_factor(trade_notional: Decimal, market_volume: Decimal) -> Decimal {
    let volume_ratio = trade_notional / market_volume.max(Decimal::ONE);
    Decimal::new(1, 1) * volume_ratio
}

/// New probability for the traded outcome. `market_volume` is the volume
/// before this trade is added. The ceiling leaves room for every sibling to
/// sit at the floor, so the market can still sum to 1.
pub fn impacted_probability(
    current: Decimal,
    trade_notional: Decimal,
    market_volume: Decimal,
    side: Side,
    sibling_count: usize,
) -> Decimal {
    let impact = impact_factor(trade_notional, market_volume);
    let raw = match side {
        Side::Buy => current + impact * (Decimal::ONE - current),
        Side::Sell => current - impact * current,
    };
    let ceiling = prob_ceiling()
        .min(Decimal::ONE - prob_floor() * Decimal::from(sibling_count as u64));
    round_prob(raw).clamp(prob_floor(), ceiling)
}

/// Rescale sibling probabilities into the remainder left by the traded
/// outcome, preserving their relative odds. The largest sibling absorbs the
/// rounding drift so the market sums to exactly 1.
pub fn rescale_siblings(siblings: &[Decimal], new_prob: Decimal) -> Vec<Decimal> {
    if siblings.is_empty() {
        return Vec::new();
    }

    let remainder = Decimal::ONE - new_prob;
    let total: Decimal = siblings.iter().copied().sum();

    let mut scaled: Vec<Decimal> = if total > Decimal::ZERO {
        let scale = remainder / total;
        siblings
            .iter()
            .map(|p| round_prob(*p * scale).max(prob_floor()))
            .collect()
    } else {
        let each = round_prob(remainder / Decimal::from(siblings.len() as u64));
        vec![each.max(prob_floor()); siblings.len()]
    };

    let drift = remainder - scaled.iter().copied().sum::<Decimal>();
    if !drift.is_zero() {
        let largest = scaled
            .iter()
            .enumerate()
            .max_by_key(|(_, p)| **p)
            .map(|(i, _)| i)
            .unwrap_or(0);
        scaled[largest] = (scaled[largest] + drift).clamp(prob_floor(), prob_ceiling());
    }

    scaled
}

/// Initial probability split for a freshly created market: 1/N each, with
/// the rounding remainder assigned to the first outcome so the sum is
/// exactly 1.
pub fn equal_split(outcome_count: usize) -> Vec<Decimal> {
    let n = Decimal::from(outcome_count as u64);
    let each = round_prob(Decimal::ONE / n);
    let mut probs = vec![each; outcome_count];
    let drift = Decimal::ONE - each * n;
    probs[0] += drift;
    probs
}

/// Apply one trade's impact to a market's outcomes inside the caller's
/// transaction. `volume_before` is the market volume prior to this trade's
/// notional being added. The traded outcome and its siblings are written
/// back with compare-and-swap guards; a lost race maps to `Conflict`.
pub async fn apply_trade_impact(
    conn: &mut PgConnection,
    market_id: Uuid,
    outcome_id: Uuid,
    trade_notional: Decimal,
    volume_before: Decimal,
    side: Side,
) -> Result<Decimal, EngineError> {
    let outcomes = market_repo::get_outcomes_for_update(&mut *conn, market_id).await?;

    let traded: &Outcome = outcomes
        .iter()
        .find(|o| o.id == outcome_id)
        .ok_or_else(|| EngineError::NotFound(format!("outcome {outcome_id}")))?;
    let siblings: Vec<&Outcome> = outcomes.iter().filter(|o| o.id != outcome_id).collect();

    let new_prob = impacted_probability(
        traded.probability,
        trade_notional,
        volume_before,
        side,
        siblings.len(),
    );

    if !market_repo::update_probability(&mut *conn, traded.id, traded.probability, new_prob)
        .await?
    {
        return Err(EngineError::Conflict);
    }

    let sibling_probs: Vec<Decimal> = siblings.iter().map(|o| o.probability).collect();
    let rescaled = rescale_siblings(&sibling_probs, new_prob);
    for (sibling, updated) in siblings.iter().zip(rescaled) {
        if !market_repo::update_probability(&mut *conn, sibling.id, sibling.probability, updated)
            .await?
        {
            return Err(EngineError::Conflict);
        }
    }

    tracing::debug!(
        market_id = %market_id,
        outcome_id = %outcome_id,
        side = %side,
        notional = %trade_notional,
        new_prob = %new_prob,
        "Applied trade impact"
    );

    Ok(new_prob)
}
