//! Order operations.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{Order, OrderStatus};

/// Create an order for a user.
pub async fn create_order(
    pool: &SqlitePool,
    user_id: i64,
    status: OrderStatus,
    total_kopeks: i64,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO orders (user_id, status, total_kopeks)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(status)
    .bind(total_kopeks)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// List a user's orders, newest first.
pub async fn list_orders_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT id, user_id, status, total_kopeks, created_at
        FROM orders
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(orders)
}

/// Count total orders.
pub async fn count_orders(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM orders
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}
