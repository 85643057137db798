//! Audience resolution queries.
//!
//! All categories are restricted to reachable users (a known
//! `telegram_id`); anyone else cannot receive a message. Read-only.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{Audience, Recipient};

const RECIPIENT_COLUMNS: &str =
    "u.id AS user_id, u.telegram_id, u.telegram_username AS username";

/// Resolve the current recipient set for an audience category.
///
/// Returns an empty set when nothing matches. [`Audience::Custom`] is
/// not resolved here; use [`find_by_usernames`] with the operator's
/// explicit list.
pub async fn resolve(pool: &SqlitePool, audience: Audience) -> Result<Vec<Recipient>> {
    let sql = match audience {
        Audience::All => format!(
            r#"
            SELECT {RECIPIENT_COLUMNS}
            FROM users u
            WHERE u.telegram_id IS NOT NULL AND u.is_active = 1
            ORDER BY u.id
            "#
        ),
        Audience::Customers => format!(
            r#"
            SELECT {RECIPIENT_COLUMNS}
            FROM users u
            WHERE u.telegram_id IS NOT NULL AND u.is_active = 1
              AND EXISTS (
                  SELECT 1 FROM orders o
                  WHERE o.user_id = u.id
                    AND o.status IN ('confirmed', 'completed')
              )
            ORDER BY u.id
            "#
        ),
        Audience::Vip => format!(
            r#"
            SELECT {RECIPIENT_COLUMNS}
            FROM users u
            WHERE u.telegram_id IS NOT NULL AND u.is_active = 1
              AND (
                  SELECT COUNT(*) FROM orders o
                  WHERE o.user_id = u.id AND o.status = 'completed'
              ) >= 2
            ORDER BY u.id
            "#
        ),
        Audience::New => format!(
            r#"
            SELECT {RECIPIENT_COLUMNS}
            FROM users u
            WHERE u.telegram_id IS NOT NULL AND u.is_active = 1
              AND u.created_at >= datetime('now', '-7 days')
            ORDER BY u.id
            "#
        ),
        Audience::Inactive => format!(
            r#"
            SELECT {RECIPIENT_COLUMNS}
            FROM users u
            WHERE u.telegram_id IS NOT NULL AND u.is_active = 1
              AND u.last_seen_at IS NOT NULL
              AND u.last_seen_at <= datetime('now', '-30 days')
            ORDER BY u.id
            "#
        ),
        Audience::Custom => return Ok(Vec::new()),
    };

    let recipients = sqlx::query_as::<_, Recipient>(&sql).fetch_all(pool).await?;

    tracing::debug!(?audience, count = recipients.len(), "Audience resolved");

    Ok(recipients)
}

/// Look up reachable users by username, case-insensitively.
///
/// Usernames are given without the leading `@`. Returns the found
/// recipients in input order plus the usernames with no reachable
/// match.
pub async fn find_by_usernames(
    pool: &SqlitePool,
    usernames: &[String],
) -> Result<(Vec<Recipient>, Vec<String>)> {
    let mut found = Vec::new();
    let mut not_found = Vec::new();

    for username in usernames {
        let recipient = sqlx::query_as::<_, Recipient>(&format!(
            r#"
            SELECT {RECIPIENT_COLUMNS}
            FROM users u
            WHERE u.telegram_username = ? COLLATE NOCASE
              AND u.telegram_id IS NOT NULL
            "#
        ))
        .bind(username)
        .fetch_optional(pool)
        .await?;

        match recipient {
            Some(recipient) => found.push(recipient),
            None => not_found.push(username.clone()),
        }
    }

    Ok((found, not_found))
}
