use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::db::{holding_repo, order_repo, transaction_repo, user_repo};
use crate::engine::ledger;
use crate::errors::EngineError;
use crate::models::{txn_kind, Holding, Order, Transaction, User};
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// POST /api/users — register an account with the starting balance.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<User>>, EngineError> {
    if req.username.trim().is_empty() {
        return Err(EngineError::Validation("username must not be empty".into()));
    }

    // Accounts start at zero; the ledger credits the bonus so the very
    // first balance change is on the audit trail too.
    let mut tx = state.db.begin().await?;
    let user = user_repo::insert_user(&mut *tx, req.username.trim(), Decimal::ZERO, req.is_admin)
        .await?;
    let (user, _) = ledger::apply(
        &mut *tx,
        user.id,
        state.config.starting_balance,
        txn_kind::REGISTRATION_BONUS,
        Some(json!({ "username": user.username })),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(Json(ApiResponse::ok(user)))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, EngineError> {
    let user = user_repo::get_user(&state.db, id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("user {id}")))?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn transactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, EngineError> {
    let txns = transaction_repo::get_transactions_by_user(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(txns)))
}

pub async fn positions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Holding>>>, EngineError> {
    let holdings = holding_repo::get_holdings_by_user(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(holdings)))
}

pub async fn orders(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Order>>>, EngineError> {
    let orders = order_repo::get_orders_by_user(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(orders)))
}
