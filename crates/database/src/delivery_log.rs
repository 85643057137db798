//! Delivery log operations.
//!
//! Every terminal transition is guarded by `status = 'pending'`, so a
//! row can leave `pending` exactly once no matter how often a sender
//! run is retried.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::BroadcastLog;

/// List the rows still pending for a broadcast, in creation order.
pub async fn list_pending(pool: &SqlitePool, broadcast_id: i64) -> Result<Vec<BroadcastLog>> {
    let logs = sqlx::query_as::<_, BroadcastLog>(
        r#"
        SELECT id, broadcast_id, user_id, telegram_id, status, error_message,
               sent_at, created_at
        FROM broadcast_logs
        WHERE broadcast_id = ? AND status = 'pending'
        ORDER BY id
        "#,
    )
    .bind(broadcast_id)
    .fetch_all(pool)
    .await?;

    Ok(logs)
}

/// List all rows for a broadcast, in creation order.
pub async fn list_for_broadcast(
    pool: &SqlitePool,
    broadcast_id: i64,
) -> Result<Vec<BroadcastLog>> {
    let logs = sqlx::query_as::<_, BroadcastLog>(
        r#"
        SELECT id, broadcast_id, user_id, telegram_id, status, error_message,
               sent_at, created_at
        FROM broadcast_logs
        WHERE broadcast_id = ?
        ORDER BY id
        "#,
    )
    .bind(broadcast_id)
    .fetch_all(pool)
    .await?;

    Ok(logs)
}

/// Transition a pending row to `sent`.
pub async fn mark_sent(pool: &SqlitePool, log_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE broadcast_logs
        SET status = 'sent', sent_at = datetime('now')
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(log_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Transition a pending row to `failed` with an error detail.
pub async fn mark_failed(pool: &SqlitePool, log_id: i64, error_message: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE broadcast_logs
        SET status = 'failed', error_message = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(error_message)
    .bind(log_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Transition a pending row to `blocked` with the block reason.
pub async fn mark_blocked(pool: &SqlitePool, log_id: i64, error_message: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE broadcast_logs
        SET status = 'blocked', error_message = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(error_message)
    .bind(log_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Count rows still pending for a broadcast.
pub async fn count_pending(pool: &SqlitePool, broadcast_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM broadcast_logs
        WHERE broadcast_id = ? AND status = 'pending'
        "#,
    )
    .bind(broadcast_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
