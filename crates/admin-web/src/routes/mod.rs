//! Route handlers for the admin web interface.

pub mod broadcasts;
pub mod dashboard;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // API endpoints
        .route("/api/dashboard", get(dashboard::dashboard_api))
        .route("/api/broadcasts", get(broadcasts::list_api))
        .route("/api/broadcasts/:id", get(broadcasts::detail_api))
        .route("/api/broadcasts/:id/logs", get(broadcasts::logs_api))
}
