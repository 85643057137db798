//! Dashboard statistics endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::Result;
use crate::state::AppState;

/// Dashboard statistics.
#[derive(Clone, Serialize)]
pub struct Stats {
    pub user_count: i64,
    pub reachable_user_count: i64,
    pub order_count: i64,
    pub broadcast_count: i64,
}

/// Get dashboard statistics as JSON.
pub async fn dashboard_api(State(state): State<AppState>) -> Result<Json<Stats>> {
    let pool = state.db.pool();

    let stats = Stats {
        user_count: database::user::count_users(pool).await?,
        reachable_user_count: database::user::count_reachable_users(pool).await?,
        order_count: database::order::count_orders(pool).await?,
        broadcast_count: database::broadcast::count_broadcasts(pool).await?,
    };

    Ok(Json(stats))
}
