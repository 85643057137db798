//! Rate-limited, resumable delivery engine.
//!
//! `send_broadcast` walks the pending delivery-log rows for one
//! broadcast and dispatches content to each recipient sequentially.
//! Rows already in a terminal state are skipped, so re-invoking after
//! a crash resumes where the previous run stopped without
//! double-counting.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::time::Duration;

use database::{broadcast, delivery_log, BroadcastStatus};

use crate::content::BroadcastContent;
use crate::error::Result;

/// Outcome of one delivery attempt to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Delivered.
    Sent,
    /// The recipient blocked the bot or the chat is gone. Terminal.
    Blocked(String),
    /// The API asked to back off for this many seconds.
    RateLimited(u64),
    /// Any other delivery error (timeout, bad payload). Terminal for
    /// this run.
    Failed(String),
}

/// Delivers one piece of content to one recipient.
///
/// Implemented over the Bot API in production and by recording fakes
/// in tests.
#[async_trait]
pub trait ContentSender: Send + Sync {
    async fn send(&self, telegram_id: i64, content: &BroadcastContent) -> SendOutcome;
}

/// Throughput and retry knobs for a sender run.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Rows processed between throttle pauses.
    pub batch_size: usize,
    /// Pause inserted after each batch.
    pub batch_delay: Duration,
    /// How many rate-limit backoffs to absorb for a single recipient
    /// before giving up on that row.
    pub max_rate_limit_retries: u32,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            batch_delay: Duration::from_secs(1),
            max_rate_limit_retries: 5,
        }
    }
}

/// Counters from one sender run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendStats {
    pub sent: u64,
    pub failed: u64,
    pub blocked: u64,
}

/// Process every pending delivery-log row of a broadcast.
///
/// Idempotent and resumable. A cancelled broadcast is left untouched.
pub async fn send_broadcast(
    pool: &SqlitePool,
    sender: &dyn ContentSender,
    config: &SenderConfig,
    broadcast_id: i64,
) -> Result<SendStats> {
    let record = broadcast::get_broadcast(pool, broadcast_id).await?;
    if record.status == BroadcastStatus::Cancelled {
        tracing::info!(broadcast_id, "Skipping cancelled broadcast");
        return Ok(SendStats::default());
    }

    let pending = delivery_log::list_pending(pool, broadcast_id).await?;
    if pending.is_empty() {
        // Nothing left to do, possibly a resumed run that had already
        // finished every row.
        broadcast::mark_completed(pool, broadcast_id).await?;
        return Ok(SendStats::default());
    }

    broadcast::mark_sending(pool, broadcast_id).await?;
    tracing::info!(
        broadcast_id,
        pending = pending.len(),
        "Starting broadcast delivery"
    );

    let content = BroadcastContent::from_broadcast(&record);
    let mut stats = SendStats::default();
    let mut processed = 0usize;

    for row in pending {
        let outcome = dispatch_with_backoff(sender, config, row.telegram_id, &content).await;

        match outcome {
            SendOutcome::Sent => {
                delivery_log::mark_sent(pool, row.id).await?;
                broadcast::increment_sent(pool, broadcast_id).await?;
                stats.sent += 1;
            }
            SendOutcome::Blocked(reason) => {
                tracing::debug!(telegram_id = row.telegram_id, %reason, "Recipient blocked");
                delivery_log::mark_blocked(pool, row.id, &reason).await?;
                broadcast::increment_failed(pool, broadcast_id).await?;
                stats.blocked += 1;
            }
            // dispatch_with_backoff converts exhausted rate limits to
            // Failed, so a stray RateLimited is treated the same way.
            SendOutcome::Failed(error) => {
                tracing::warn!(telegram_id = row.telegram_id, %error, "Delivery failed");
                delivery_log::mark_failed(pool, row.id, &error).await?;
                broadcast::increment_failed(pool, broadcast_id).await?;
                stats.failed += 1;
            }
            SendOutcome::RateLimited(secs) => {
                let error = format!("rate limited, retry after {secs}s");
                delivery_log::mark_failed(pool, row.id, &error).await?;
                broadcast::increment_failed(pool, broadcast_id).await?;
                stats.failed += 1;
            }
        }

        processed += 1;
        if processed % config.batch_size == 0 {
            tokio::time::sleep(config.batch_delay).await;
        }
    }

    broadcast::mark_completed(pool, broadcast_id).await?;
    tracing::info!(
        broadcast_id,
        sent = stats.sent,
        failed = stats.failed,
        blocked = stats.blocked,
        "Broadcast delivery complete"
    );

    Ok(stats)
}

/// Dispatch to one recipient, absorbing rate-limit backoffs.
///
/// Retries the same recipient after sleeping the server-specified
/// duration, up to the configured bound, then converts the rate limit
/// into a terminal failure.
async fn dispatch_with_backoff(
    sender: &dyn ContentSender,
    config: &SenderConfig,
    telegram_id: i64,
    content: &BroadcastContent,
) -> SendOutcome {
    let mut attempts = 0;
    loop {
        match sender.send(telegram_id, content).await {
            SendOutcome::RateLimited(secs) => {
                attempts += 1;
                if attempts > config.max_rate_limit_retries {
                    return SendOutcome::Failed(format!(
                        "rate limited after {attempts} attempts"
                    ));
                }
                tracing::debug!(telegram_id, secs, attempts, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_secs(secs)).await;
            }
            outcome => return outcome,
        }
    }
}
