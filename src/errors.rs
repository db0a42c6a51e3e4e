use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;

/// Typed failures surfaced by the trading core. Every operation runs in one
/// database transaction, so any of these implies no partial state change.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    #[error("Insufficient shares: required {required}, available {available}")]
    InsufficientShares {
        required: Decimal,
        available: Decimal,
    },

    #[error("Market is resolved")]
    MarketResolved,

    #[error("Market is already resolved")]
    AlreadyResolved,

    #[error("Order is already closed")]
    AlreadyClosed,

    #[error("Concurrent update conflict")]
    Conflict,

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Forbidden => StatusCode::FORBIDDEN,
            EngineError::InsufficientBalance { .. }
            | EngineError::InsufficientShares { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::MarketResolved
            | EngineError::AlreadyResolved
            | EngineError::AlreadyClosed
            | EngineError::Conflict => StatusCode::CONFLICT,
            EngineError::Db(e) => {
                tracing::error!("Database error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            EngineError::Db(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}
