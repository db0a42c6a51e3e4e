use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_auth;
use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes — no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected API routes — require Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Users
        .route("/api/users", post(handlers::users::register))
        .route("/api/users/:id", get(handlers::users::detail))
        .route("/api/users/:id/transactions", get(handlers::users::transactions))
        .route("/api/users/:id/positions", get(handlers::users::positions))
        .route("/api/users/:id/orders", get(handlers::users::orders))
        // Markets
        .route("/api/markets", get(handlers::markets::list).post(handlers::markets::create))
        .route("/api/markets/:id", get(handlers::markets::detail))
        .route("/api/markets/:id/orders", get(handlers::markets::open_orders))
        .route("/api/markets/:id/trades", get(handlers::markets::recent_trades))
        .route("/api/markets/:id/resolve", post(handlers::markets::resolve))
        // Orders
        .route("/api/orders", post(handlers::orders::place))
        .route("/api/orders/:id/cancel", post(handlers::orders::cancel))
        // Direct trades
        .route("/api/trades", post(handlers::trades::execute))
        // WebSocket
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn(require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
