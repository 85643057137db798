//! Bot admin allowlist operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::BotAdmin;

/// Normalize a username to the stored `@`-prefixed form.
fn normalize_username(username: &str) -> String {
    if username.starts_with('@') {
        username.to_string()
    } else {
        format!("@{username}")
    }
}

/// Add an admin by username.
pub async fn create_admin(pool: &SqlitePool, username: &str, note: &str) -> Result<i64> {
    let username = normalize_username(username);

    let result = sqlx::query(
        r#"
        INSERT INTO bot_admins (username, note)
        VALUES (?, ?)
        "#,
    )
    .bind(&username)
    .bind(note)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "BotAdmin",
                    id: username.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    Ok(result.last_insert_rowid())
}

/// Look up an active admin by Telegram id or username, backfilling the
/// stored Telegram id when the record was matched by username alone.
///
/// Returns `None` for unknown or deactivated callers.
pub async fn get_and_update(
    pool: &SqlitePool,
    telegram_id: i64,
    username: Option<&str>,
) -> Result<Option<BotAdmin>> {
    let admin = sqlx::query_as::<_, BotAdmin>(
        r#"
        SELECT id, username, telegram_id, first_name, is_active, note, created_at
        FROM bot_admins
        WHERE telegram_id = ? AND is_active = 1
        "#,
    )
    .bind(telegram_id)
    .fetch_optional(pool)
    .await?;

    if admin.is_some() {
        return Ok(admin);
    }

    let Some(username) = username else {
        return Ok(None);
    };
    let username = normalize_username(username);

    let admin = sqlx::query_as::<_, BotAdmin>(
        r#"
        SELECT id, username, telegram_id, first_name, is_active, note, created_at
        FROM bot_admins
        WHERE username = ? COLLATE NOCASE AND is_active = 1
        "#,
    )
    .bind(&username)
    .fetch_optional(pool)
    .await?;

    let Some(mut admin) = admin else {
        return Ok(None);
    };

    if admin.telegram_id.is_none() {
        sqlx::query(
            r#"
            UPDATE bot_admins
            SET telegram_id = ?
            WHERE id = ?
            "#,
        )
        .bind(telegram_id)
        .bind(admin.id)
        .execute(pool)
        .await?;

        admin.telegram_id = Some(telegram_id);
        tracing::info!(admin = %admin.username, telegram_id, "Backfilled admin Telegram id");
    }

    Ok(Some(admin))
}

/// Check whether a caller is an active admin.
pub async fn is_admin(
    pool: &SqlitePool,
    telegram_id: i64,
    username: Option<&str>,
) -> Result<bool> {
    Ok(get_and_update(pool, telegram_id, username).await?.is_some())
}
