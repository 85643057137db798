//! Broadcast record operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Audience, Broadcast, ContentType, Recipient};

/// Parameters for launching a broadcast.
#[derive(Debug, Clone)]
pub struct NewBroadcast {
    /// Audience category the recipients were resolved from.
    pub audience: Audience,
    /// Launch-time recipient snapshot.
    pub recipients: Vec<Recipient>,
    /// Content kind.
    pub content_type: ContentType,
    /// Message text or media caption.
    pub text: String,
    /// Telegram file_id for media content.
    pub file_id: String,
    /// Operator who launched the broadcast.
    pub created_by_telegram_id: i64,
}

/// Create a broadcast in `pending` status together with one `pending`
/// delivery-log row per recipient, in a single transaction.
///
/// `total_recipients` is fixed here from the snapshot size and never
/// recomputed.
pub async fn create_with_logs(pool: &SqlitePool, new: &NewBroadcast) -> Result<i64> {
    let snapshot = serde_json::to_string(&new.recipients)?;
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO broadcasts (audience, recipients, content_type, text,
                                file_id, status, created_by_telegram_id,
                                total_recipients)
        VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(new.audience)
    .bind(&snapshot)
    .bind(new.content_type)
    .bind(&new.text)
    .bind(&new.file_id)
    .bind(new.created_by_telegram_id)
    .bind(new.recipients.len() as i64)
    .execute(&mut *tx)
    .await?;

    let broadcast_id = result.last_insert_rowid();

    for recipient in &new.recipients {
        sqlx::query(
            r#"
            INSERT INTO broadcast_logs (broadcast_id, user_id, telegram_id)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(broadcast_id)
        .bind(recipient.user_id)
        .bind(recipient.telegram_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        broadcast_id,
        recipients = new.recipients.len(),
        audience = ?new.audience,
        "Broadcast created"
    );

    Ok(broadcast_id)
}

/// Get a broadcast by id.
pub async fn get_broadcast(pool: &SqlitePool, id: i64) -> Result<Broadcast> {
    sqlx::query_as::<_, Broadcast>(
        r#"
        SELECT id, audience, recipients, content_type, text, file_id, status,
               created_by_telegram_id, total_recipients, sent_count,
               failed_count, created_at, started_at, completed_at
        FROM broadcasts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Broadcast",
        id: id.to_string(),
    })
}

/// List all broadcasts, newest first.
pub async fn list_broadcasts(pool: &SqlitePool) -> Result<Vec<Broadcast>> {
    let broadcasts = sqlx::query_as::<_, Broadcast>(
        r#"
        SELECT id, audience, recipients, content_type, text, file_id, status,
               created_by_telegram_id, total_recipients, sent_count,
               failed_count, created_at, started_at, completed_at
        FROM broadcasts
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(broadcasts)
}

/// Count total broadcasts.
pub async fn count_broadcasts(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM broadcasts
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Transition a broadcast into `sending`, recording the start time on
/// the first run only (a resumed run keeps the original timestamp).
pub async fn mark_sending(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE broadcasts
        SET status = 'sending',
            started_at = COALESCE(started_at, datetime('now'))
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Finalize a broadcast as `completed`.
pub async fn mark_completed(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE broadcasts
        SET status = 'completed', completed_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a broadcast as `failed` after the job runner gave up on it.
pub async fn mark_failed(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE broadcasts
        SET status = 'failed'
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Increment the sent counter by one.
pub async fn increment_sent(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE broadcasts
        SET sent_count = sent_count + 1
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Increment the failed counter by one (blocked counts as failed in
/// the aggregate).
pub async fn increment_failed(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE broadcasts
        SET failed_count = failed_count + 1
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}
