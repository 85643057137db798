//! User CRUD operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::User;

/// Get a user by internal id.
pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, telegram_id, telegram_username, first_name, is_active,
               created_at, last_seen_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })
}

/// Get a user by Telegram id.
pub async fn get_user_by_telegram_id(pool: &SqlitePool, telegram_id: i64) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, telegram_id, telegram_username, first_name, is_active,
               created_at, last_seen_at
        FROM users
        WHERE telegram_id = ?
        "#,
    )
    .bind(telegram_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: telegram_id.to_string(),
    })
}

/// Register a Telegram user, or refresh an existing record.
///
/// Called on every inbound bot interaction: creates the row on first
/// contact, keeps the stored username current, reactivates the account
/// and touches `last_seen_at`.
pub async fn register_telegram_user(
    pool: &SqlitePool,
    telegram_id: i64,
    username: Option<&str>,
    first_name: Option<&str>,
) -> Result<User> {
    let username = username.map(|u| u.to_lowercase()).unwrap_or_default();
    let first_name = first_name.unwrap_or_default();

    sqlx::query(
        r#"
        INSERT INTO users (telegram_id, telegram_username, first_name,
                           is_active, last_seen_at)
        VALUES (?, ?, ?, 1, datetime('now'))
        ON CONFLICT (telegram_id) DO UPDATE SET
            telegram_username = CASE
                WHEN excluded.telegram_username != ''
                    THEN excluded.telegram_username
                ELSE telegram_username
            END,
            first_name = CASE
                WHEN excluded.first_name != '' THEN excluded.first_name
                ELSE first_name
            END,
            is_active = 1,
            last_seen_at = datetime('now')
        "#,
    )
    .bind(telegram_id)
    .bind(&username)
    .bind(first_name)
    .execute(pool)
    .await?;

    get_user_by_telegram_id(pool, telegram_id).await
}

/// Count total users.
pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM users
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Count users reachable by the bot.
pub async fn count_reachable_users(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM users
        WHERE telegram_id IS NOT NULL AND is_active = 1
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}
