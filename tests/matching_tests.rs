mod common;

use rust_decimal_macros::dec;
use uuid::Uuid;

use predmarket::db::{holding_repo, market_repo, order_repo};
use predmarket::engine::matching::{
    self, ExecuteTradeRequest, PlaceOrderRequest,
};
use predmarket::errors::EngineError;
use predmarket::models::{order_status, OrderKind, Side};

fn limit(user: Uuid, market: Uuid, outcome: Uuid, side: Side, amount: rust_decimal::Decimal, price: rust_decimal::Decimal) -> PlaceOrderRequest {
    PlaceOrderRequest {
        user_id: user,
        market_id: market,
        outcome_id: outcome,
        side,
        kind: OrderKind::Limit,
        amount,
        price: Some(price),
    }
}

fn market_order(user: Uuid, market: Uuid, outcome: Uuid, side: Side, amount: rust_decimal::Decimal) -> PlaceOrderRequest {
    PlaceOrderRequest {
        user_id: user,
        market_id: market,
        outcome_id: outcome,
        side,
        kind: OrderKind::Market,
        amount,
        price: None,
    }
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database"]
async fn limit_buy_reserves_funds_and_cancel_refunds_in_full() {
    let pool = common::setup_test_db().await;
    let alice = common::seed_user(&pool, "alice", dec!(1000), false).await;
    let (market, outcomes) = common::seed_market(&pool, "Will it rain?", &["Yes", "No"]).await;

    let placed = matching::place_order(
        &pool,
        limit(alice.id, market.id, outcomes[0].id, Side::Buy, dec!(100), dec!(0.50)),
    )
    .await
    .expect("placement should succeed");

    assert_eq!(placed.order.status, order_status::OPEN);
    assert!(!placed.fully_filled);
    assert!(placed.matched_order_ids.is_empty());
    assert_eq!(common::balance_of(&pool, alice.id).await, dec!(900));

    let cancelled = matching::cancel_order(&pool, alice.id, placed.order.id)
        .await
        .expect("cancel should succeed");
    assert_eq!(cancelled.status, order_status::CANCELLED);
    assert_eq!(common::balance_of(&pool, alice.id).await, dec!(1000));

    // A second cancel finds the order closed.
    let err = matching::cancel_order(&pool, alice.id, placed.order.id)
        .await
        .expect_err("second cancel must fail");
    assert!(matches!(err, EngineError::AlreadyClosed));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database"]
async fn partial_fill_then_cancel_refunds_the_unfilled_remainder() {
    let pool = common::setup_test_db().await;
    let alice = common::seed_user(&pool, "alice", dec!(1000), false).await;
    let bob = common::seed_user(&pool, "bob", dec!(1000), false).await;
    let (market, outcomes) = common::seed_market(&pool, "Partial fill", &["Yes", "No"]).await;
    let outcome = outcomes[0].id;
    common::seed_holding(&pool, bob.id, outcome, market.id, dec!(100), dec!(0.40)).await;

    // Alice rests a 100-notional bid at 0.50; Bob's market sell of 60
    // shares consumes 30 of it.
    let resting = matching::place_order(
        &pool,
        limit(alice.id, market.id, outcome, Side::Buy, dec!(100), dec!(0.50)),
    )
    .await
    .expect("limit placement");

    let taker = matching::place_order(
        &pool,
        market_order(bob.id, market.id, outcome, Side::Sell, dec!(60)),
    )
    .await
    .expect("market sell");

    assert!(taker.fully_filled);
    assert_eq!(taker.matched_order_ids, vec![resting.order.id]);
    // Seller is paid exactly the notional the buyer committed to the fill.
    assert_eq!(common::balance_of(&pool, bob.id).await, dec!(1030));

    let after_fill = order_repo::get_order(&pool, resting.order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_fill.filled, dec!(30));
    assert_eq!(after_fill.status, order_status::OPEN);

    // Alice ends up with the shares at the maker price.
    let holding = holding_repo::get_holding(&pool, alice.id, outcome)
        .await
        .unwrap()
        .expect("buyer holding");
    assert_eq!(holding.quantity, dec!(60));
    assert_eq!(holding.avg_price, dec!(0.50));

    // Cancelling the partially filled bid refunds amount - filled = 70.
    matching::cancel_order(&pool, alice.id, resting.order.id)
        .await
        .expect("cancel");
    assert_eq!(common::balance_of(&pool, alice.id).await, dec!(970));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database"]
async fn market_buy_walks_the_book_cheapest_first() {
    let pool = common::setup_test_db().await;
    let buyer = common::seed_user(&pool, "buyer", dec!(1000), false).await;
    let s1 = common::seed_user(&pool, "seller1", dec!(1000), false).await;
    let s2 = common::seed_user(&pool, "seller2", dec!(1000), false).await;
    let s3 = common::seed_user(&pool, "seller3", dec!(1000), false).await;
    let (market, outcomes) = common::seed_market(&pool, "Book walk", &["Yes", "No"]).await;
    let outcome = outcomes[0].id;

    for seller in [&s1, &s2, &s3] {
        common::seed_holding(&pool, seller.id, outcome, market.id, dec!(50), dec!(0.30)).await;
    }

    matching::place_order(&pool, limit(s1.id, market.id, outcome, Side::Sell, dec!(50), dec!(0.40)))
        .await
        .expect("s1 ask");
    matching::place_order(&pool, limit(s2.id, market.id, outcome, Side::Sell, dec!(50), dec!(0.60)))
        .await
        .expect("s2 ask");
    let ask3 =
        matching::place_order(&pool, limit(s3.id, market.id, outcome, Side::Sell, dec!(50), dec!(0.40)))
            .await
            .expect("s3 ask");

    // 30 notional: 20 clears seller1's whole ask (50 shares at 0.40), the
    // remaining 10 goes to seller3 (same price, later timestamp) for 25
    // shares. Seller2's 0.60 ask is never touched.
    let result = matching::place_order(
        &pool,
        market_order(buyer.id, market.id, outcome, Side::Buy, dec!(30)),
    )
    .await
    .expect("market buy");

    assert!(result.fully_filled);
    assert_eq!(result.order.status, order_status::FILLED);
    assert_eq!(result.order.filled, dec!(30));
    assert_eq!(result.matched_order_ids.len(), 2);
    assert_eq!(result.matched_order_ids[1], ask3.order.id);

    let buyer_holding = holding_repo::get_holding(&pool, buyer.id, outcome)
        .await
        .unwrap()
        .expect("buyer holding");
    assert_eq!(buyer_holding.quantity, dec!(75));
    assert_eq!(buyer_holding.avg_price, dec!(0.40));
    assert_eq!(common::balance_of(&pool, buyer.id).await, dec!(970));

    // Sellers realized P&L against their 0.30 basis; seller1 paid in full.
    assert_eq!(common::balance_of(&pool, s1.id).await, dec!(1020));
    assert_eq!(common::balance_of(&pool, s3.id).await, dec!(1010));
    assert_eq!(common::balance_of(&pool, s2.id).await, dec!(1000));

    // Total balance across all four parties is conserved.
    let total = common::balance_of(&pool, buyer.id).await
        + common::balance_of(&pool, s1.id).await
        + common::balance_of(&pool, s2.id).await
        + common::balance_of(&pool, s3.id).await;
    assert_eq!(total, dec!(4000));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database"]
async fn unfilled_market_order_remainder_is_not_rested() {
    let pool = common::setup_test_db().await;
    let buyer = common::seed_user(&pool, "buyer", dec!(1000), false).await;
    let seller = common::seed_user(&pool, "seller", dec!(1000), false).await;
    let (market, outcomes) = common::seed_market(&pool, "Thin book", &["Yes", "No"]).await;
    let outcome = outcomes[0].id;
    common::seed_holding(&pool, seller.id, outcome, market.id, dec!(10), dec!(0.50)).await;

    matching::place_order(&pool, limit(seller.id, market.id, outcome, Side::Sell, dec!(10), dec!(0.50)))
        .await
        .expect("ask");

    // 100 notional against 5 notional of liquidity: the order closes with
    // the remainder abandoned instead of resting.
    let result = matching::place_order(
        &pool,
        market_order(buyer.id, market.id, outcome, Side::Buy, dec!(100)),
    )
    .await
    .expect("market buy");

    assert!(!result.fully_filled);
    assert_eq!(result.order.filled, dec!(5));
    assert_eq!(result.order.status, order_status::CANCELLED);
    // Only the filled notional was spent; nothing is held back.
    assert_eq!(common::balance_of(&pool, buyer.id).await, dec!(995));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database"]
async fn preconditions_fail_without_any_state_change() {
    let pool = common::setup_test_db().await;
    let poor = common::seed_user(&pool, "poor", dec!(10), false).await;
    let (market, outcomes) = common::seed_market(&pool, "Preconditions", &["Yes", "No"]).await;
    let outcome = outcomes[0].id;

    let err = matching::place_order(
        &pool,
        limit(poor.id, market.id, outcome, Side::Buy, dec!(100), dec!(0.50)),
    )
    .await
    .expect_err("insufficient balance");
    assert!(matches!(err, EngineError::InsufficientBalance { .. }));
    assert_eq!(common::balance_of(&pool, poor.id).await, dec!(10));
    assert!(order_repo::get_orders_by_user(&pool, poor.id)
        .await
        .unwrap()
        .is_empty());

    let err = matching::place_order(
        &pool,
        limit(poor.id, market.id, outcome, Side::Sell, dec!(5), dec!(0.50)),
    )
    .await
    .expect_err("no shares to sell");
    assert!(matches!(err, EngineError::InsufficientShares { .. }));

    let err = matching::place_order(
        &pool,
        limit(poor.id, market.id, outcome, Side::Buy, dec!(5), dec!(1.50)),
    )
    .await
    .expect_err("price out of range");
    assert!(matches!(err, EngineError::Validation(_)));

    let err = matching::place_order(
        &pool,
        limit(poor.id, market.id, Uuid::new_v4(), Side::Buy, dec!(5), dec!(0.50)),
    )
    .await
    .expect_err("unknown outcome");
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database"]
async fn resting_sells_reserve_shares_against_double_selling() {
    let pool = common::setup_test_db().await;
    let dave = common::seed_user(&pool, "dave", dec!(1000), false).await;
    let (market, outcomes) = common::seed_market(&pool, "Reservation", &["Yes", "No"]).await;
    let outcome = outcomes[0].id;
    common::seed_holding(&pool, dave.id, outcome, market.id, dec!(100), dec!(0.50)).await;

    matching::place_order(&pool, limit(dave.id, market.id, outcome, Side::Sell, dec!(80), dec!(0.60)))
        .await
        .expect("first ask within holding");

    // 80 of the 100 shares are promised; a second ask for 50 must fail.
    let err = matching::place_order(
        &pool,
        limit(dave.id, market.id, outcome, Side::Sell, dec!(50), dec!(0.70)),
    )
    .await
    .expect_err("over-committed");
    match err {
        EngineError::InsufficientShares { required, available } => {
            assert_eq!(required, dec!(50));
            assert_eq!(available, dec!(20));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database"]
async fn direct_trade_round_trip_is_neutral_at_stable_prices() {
    let pool = common::setup_test_db().await;
    let charlie = common::seed_user(&pool, "charlie", dec!(1000), false).await;
    let (market, outcomes) = common::seed_market(&pool, "Round trip", &["Yes", "No"]).await;
    let outcome = outcomes[0].id;
    // Dwarf the trade with existing volume so the impact rounds away.
    common::set_market_volume(&pool, market.id, dec!(1000000)).await;

    let buy = matching::execute_trade(
        &pool,
        ExecuteTradeRequest {
            user_id: charlie.id,
            market_id: market.id,
            outcome_id: outcome,
            amount: dec!(50),
            side: Side::Buy,
            shares_mode: false,
        },
    )
    .await
    .expect("buy");
    assert_eq!(buy.trade.amount, dec!(100)); // 50 / 0.50
    assert_eq!(buy.new_probability, dec!(0.50));
    assert_eq!(common::balance_of(&pool, charlie.id).await, dec!(950));

    let sell = matching::execute_trade(
        &pool,
        ExecuteTradeRequest {
            user_id: charlie.id,
            market_id: market.id,
            outcome_id: outcome,
            amount: dec!(100),
            side: Side::Sell,
            shares_mode: true,
        },
    )
    .await
    .expect("sell");
    assert_eq!(sell.trade.notional, dec!(50));

    // Full sell deletes the holding; the balance is back to flat.
    assert!(holding_repo::get_holding(&pool, charlie.id, outcome)
        .await
        .unwrap()
        .is_none());
    assert_eq!(common::balance_of(&pool, charlie.id).await, dec!(1000));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database"]
async fn first_trade_on_a_fresh_market_saturates_the_probability() {
    let pool = common::setup_test_db().await;
    let buyer = common::seed_user(&pool, "buyer", dec!(1000), false).await;
    let (market, outcomes) = common::seed_market(&pool, "Fresh", &["A", "B"]).await;

    // Volume 0 is treated as 1: a 50-notional buy overwhelms the market and
    // clamps outcome A at the 0.99 ceiling, rescaling B to 0.01.
    let result = matching::execute_trade(
        &pool,
        ExecuteTradeRequest {
            user_id: buyer.id,
            market_id: market.id,
            outcome_id: outcomes[0].id,
            amount: dec!(50),
            side: Side::Buy,
            shares_mode: false,
        },
    )
    .await
    .expect("buy");

    assert_eq!(result.new_probability, dec!(0.99));
    let refreshed = market_repo::get_outcomes(&pool, market.id).await.unwrap();
    assert_eq!(refreshed[0].probability, dec!(0.99));
    assert_eq!(refreshed[1].probability, dec!(0.01));

    let m = market_repo::get_market(&pool, market.id).await.unwrap().unwrap();
    assert_eq!(m.volume, dec!(50));
}
