//! Conversation state store.
//!
//! One row per operator, keyed by Telegram id. The row is created
//! lazily, mutated on every step transition and reset in place on
//! cancel or completion so the unique-key slot survives.

use sqlx::SqlitePool;

use crate::error::Result;

/// Get the current step and draft data for an operator, creating the
/// row with empty values if it does not exist yet.
pub async fn get(pool: &SqlitePool, telegram_id: i64) -> Result<(String, String)> {
    sqlx::query(
        r#"
        INSERT INTO conversation_states (telegram_id)
        VALUES (?)
        ON CONFLICT (telegram_id) DO NOTHING
        "#,
    )
    .bind(telegram_id)
    .execute(pool)
    .await?;

    let row = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT step, data
        FROM conversation_states
        WHERE telegram_id = ?
        "#,
    )
    .bind(telegram_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Upsert the step and draft data for an operator.
pub async fn set(pool: &SqlitePool, telegram_id: i64, step: &str, data: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO conversation_states (telegram_id, step, data, updated_at)
        VALUES (?, ?, ?, datetime('now'))
        ON CONFLICT (telegram_id) DO UPDATE SET
            step = excluded.step,
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(telegram_id)
    .bind(step)
    .bind(data)
    .execute(pool)
    .await?;

    Ok(())
}

/// Reset the step and data in place. The row is kept.
pub async fn clear(pool: &SqlitePool, telegram_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE conversation_states
        SET step = '', data = '{}', updated_at = datetime('now')
        WHERE telegram_id = ?
        "#,
    )
    .bind(telegram_id)
    .execute(pool)
    .await?;

    Ok(())
}
