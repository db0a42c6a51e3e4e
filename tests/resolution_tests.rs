mod common;

use rust_decimal_macros::dec;

use predmarket::db::{holding_repo, market_repo, order_repo, transaction_repo};
use predmarket::engine::matching::{self, ExecuteTradeRequest, PlaceOrderRequest};
use predmarket::engine::resolution;
use predmarket::errors::EngineError;
use predmarket::models::{order_status, txn_kind, OrderKind, Side};

#[tokio::test]
#[ignore = "requires a PostgreSQL test database"]
async fn resolution_pays_winners_zeroes_holdings_and_sweeps_the_book() {
    let pool = common::setup_test_db().await;
    let admin = common::seed_user(&pool, "admin", dec!(1000), true).await;
    let user1 = common::seed_user(&pool, "user1", dec!(1000), false).await;
    let user2 = common::seed_user(&pool, "user2", dec!(1000), false).await;
    let (market, outcomes) = common::seed_market(&pool, "Resolution", &["Yes", "No"]).await;
    let winning = outcomes[0].id;
    let losing = outcomes[1].id;

    common::seed_holding(&pool, user1.id, winning, market.id, dec!(40), dec!(0.60)).await;
    common::seed_holding(&pool, user2.id, losing, market.id, dec!(25), dec!(0.40)).await;

    // user2 also has an open bid that must be refunded at resolution.
    let bid = matching::place_order(
        &pool,
        PlaceOrderRequest {
            user_id: user2.id,
            market_id: market.id,
            outcome_id: losing,
            side: Side::Buy,
            kind: OrderKind::Limit,
            amount: dec!(50),
            price: Some(dec!(0.30)),
        },
    )
    .await
    .expect("bid");
    assert_eq!(common::balance_of(&pool, user2.id).await, dec!(950));

    let result = resolution::resolve_market(&pool, admin.id, market.id, winning)
        .await
        .expect("resolution");
    assert_eq!(result.winners_paid, 1);
    assert_eq!(result.holdings_settled, 2);
    assert_eq!(result.orders_cancelled, 1);

    // Winner collects 1.00 per share; loser collects nothing but gets the
    // bid reservation back.
    assert_eq!(common::balance_of(&pool, user1.id).await, dec!(1040));
    assert_eq!(common::balance_of(&pool, user2.id).await, dec!(1000));

    let h1 = holding_repo::get_holding(&pool, user1.id, winning).await.unwrap().unwrap();
    let h2 = holding_repo::get_holding(&pool, user2.id, losing).await.unwrap().unwrap();
    assert_eq!(h1.quantity, dec!(0));
    assert_eq!(h2.quantity, dec!(0));

    let swept = order_repo::get_order(&pool, bid.order.id).await.unwrap().unwrap();
    assert_eq!(swept.status, order_status::CANCELLED);

    let market = market_repo::get_market(&pool, market.id).await.unwrap().unwrap();
    assert!(market.is_resolved);
    assert_eq!(market.resolved_outcome_id, Some(winning));

    // Payout and refund are both on the audit trail.
    let user2_txns = transaction_repo::get_transactions_by_user(&pool, user2.id)
        .await
        .unwrap();
    assert!(user2_txns.iter().any(|t| t.kind == txn_kind::ORDER_REFUND));
    let user1_txns = transaction_repo::get_transactions_by_user(&pool, user1.id)
        .await
        .unwrap();
    assert!(user1_txns
        .iter()
        .any(|t| t.kind == txn_kind::MARKET_RESOLUTION_PAYOUT && t.amount == dec!(40)));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database"]
async fn resolution_is_terminal_and_blocks_further_trading() {
    let pool = common::setup_test_db().await;
    let admin = common::seed_user(&pool, "admin", dec!(1000), true).await;
    let trader = common::seed_user(&pool, "trader", dec!(1000), false).await;
    let (market, outcomes) = common::seed_market(&pool, "Terminal", &["Yes", "No"]).await;

    resolution::resolve_market(&pool, admin.id, market.id, outcomes[0].id)
        .await
        .expect("first resolution");

    let err = resolution::resolve_market(&pool, admin.id, market.id, outcomes[1].id)
        .await
        .expect_err("second resolution must fail");
    assert!(matches!(err, EngineError::AlreadyResolved));

    // The winner assignment from the first call is untouched.
    let m = market_repo::get_market(&pool, market.id).await.unwrap().unwrap();
    assert_eq!(m.resolved_outcome_id, Some(outcomes[0].id));

    let err = matching::place_order(
        &pool,
        PlaceOrderRequest {
            user_id: trader.id,
            market_id: market.id,
            outcome_id: outcomes[0].id,
            side: Side::Buy,
            kind: OrderKind::Limit,
            amount: dec!(10),
            price: Some(dec!(0.50)),
        },
    )
    .await
    .expect_err("resolved market rejects orders");
    assert!(matches!(err, EngineError::MarketResolved));

    let err = matching::execute_trade(
        &pool,
        ExecuteTradeRequest {
            user_id: trader.id,
            market_id: market.id,
            outcome_id: outcomes[0].id,
            amount: dec!(10),
            side: Side::Buy,
            shares_mode: false,
        },
    )
    .await
    .expect_err("resolved market rejects trades");
    assert!(matches!(err, EngineError::MarketResolved));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database"]
async fn resolution_requires_an_administrator_and_a_matching_outcome() {
    let pool = common::setup_test_db().await;
    let admin = common::seed_user(&pool, "admin", dec!(1000), true).await;
    let civilian = common::seed_user(&pool, "civilian", dec!(1000), false).await;
    let (market, outcomes) = common::seed_market(&pool, "Auth", &["Yes", "No"]).await;
    let (_other_market, other_outcomes) = common::seed_market(&pool, "Other", &["A", "B"]).await;

    let err = resolution::resolve_market(&pool, civilian.id, market.id, outcomes[0].id)
        .await
        .expect_err("non-admin");
    assert!(matches!(err, EngineError::Forbidden));

    let err = resolution::resolve_market(&pool, admin.id, market.id, other_outcomes[0].id)
        .await
        .expect_err("foreign outcome");
    assert!(matches!(err, EngineError::Validation(_)));

    // Neither failure resolved anything.
    let m = market_repo::get_market(&pool, market.id).await.unwrap().unwrap();
    assert!(!m.is_resolved);
}
