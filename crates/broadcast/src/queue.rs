//! Background job queue for broadcast delivery.
//!
//! One worker task drains a channel of broadcast ids and runs the
//! sender for each. A dedup set guarantees at most one active run per
//! broadcast id, which the resumable sender design requires.

use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use database::broadcast;

use crate::sender::{send_broadcast, ContentSender, SenderConfig};

/// Retry policy for a delivery job that errors out.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Total attempts per job before it is marked failed.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(60),
        }
    }
}

/// Handle for enqueueing broadcast delivery jobs.
#[derive(Clone)]
pub struct BroadcastQueue {
    tx: mpsc::UnboundedSender<i64>,
    active: Arc<Mutex<HashSet<i64>>>,
}

impl BroadcastQueue {
    /// Spawn the worker task and return the enqueue handle.
    pub fn spawn(
        pool: SqlitePool,
        sender: Arc<dyn ContentSender>,
        sender_config: SenderConfig,
        queue_config: QueueConfig,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<i64>();
        let active: Arc<Mutex<HashSet<i64>>> = Arc::new(Mutex::new(HashSet::new()));

        let worker_active = active.clone();
        tokio::spawn(async move {
            while let Some(broadcast_id) = rx.recv().await {
                run_job(&pool, sender.as_ref(), &sender_config, &queue_config, broadcast_id)
                    .await;
                worker_active.lock().unwrap().remove(&broadcast_id);
            }
        });

        Self { tx, active }
    }

    /// Queue a broadcast for delivery.
    ///
    /// Returns false if the broadcast is already queued or running.
    pub fn enqueue(&self, broadcast_id: i64) -> bool {
        if !self.active.lock().unwrap().insert(broadcast_id) {
            tracing::warn!(broadcast_id, "Broadcast already queued, ignoring");
            return false;
        }
        if self.tx.send(broadcast_id).is_err() {
            self.active.lock().unwrap().remove(&broadcast_id);
            tracing::error!(broadcast_id, "Broadcast worker is gone");
            return false;
        }
        true
    }
}

/// Run the sender with the bounded job-level retry.
async fn run_job(
    pool: &SqlitePool,
    sender: &dyn ContentSender,
    sender_config: &SenderConfig,
    queue_config: &QueueConfig,
    broadcast_id: i64,
) {
    for attempt in 1..=queue_config.max_attempts {
        match send_broadcast(pool, sender, sender_config, broadcast_id).await {
            Ok(_) => return,
            Err(error) => {
                tracing::error!(
                    broadcast_id,
                    attempt,
                    %error,
                    "Broadcast delivery attempt failed"
                );
                if attempt < queue_config.max_attempts {
                    tokio::time::sleep(queue_config.retry_delay).await;
                }
            }
        }
    }

    // Every attempt errored. The pending rows survive, so a manual
    // re-run can still finish the broadcast.
    if let Err(error) = broadcast::mark_failed(pool, broadcast_id).await {
        tracing::error!(broadcast_id, %error, "Failed to mark broadcast as failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::BroadcastContent;
    use crate::sender::SendOutcome;
    use async_trait::async_trait;
    use database::broadcast::NewBroadcast;
    use database::{user, Audience, BroadcastStatus, ContentType, Database, Recipient};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSender {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ContentSender for CountingSender {
        async fn send(&self, _telegram_id: i64, _content: &BroadcastContent) -> SendOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            SendOutcome::Sent
        }
    }

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    async fn seed_broadcast(db: &Database) -> i64 {
        let user = user::register_telegram_user(db.pool(), 1, Some("a"), None)
            .await
            .unwrap();
        broadcast::create_with_logs(
            db.pool(),
            &NewBroadcast {
                audience: Audience::All,
                recipients: vec![Recipient {
                    user_id: user.id,
                    telegram_id: 1,
                    username: "a".into(),
                }],
                content_type: ContentType::Text,
                text: "hi".into(),
                file_id: String::new(),
                created_by_telegram_id: 999,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_dedupes_active_jobs() {
        let db = test_db().await;
        let id = seed_broadcast(&db).await;
        let sender = Arc::new(CountingSender {
            calls: AtomicU32::new(0),
        });

        let queue = BroadcastQueue::spawn(
            db.pool().clone(),
            sender.clone(),
            SenderConfig::default(),
            QueueConfig::default(),
        );

        assert!(queue.enqueue(id));
        // A second enqueue while the first is still queued is refused.
        assert!(!queue.enqueue(id));

        // Wait for the worker to finish the job.
        for _ in 0..100 {
            let record = broadcast::get_broadcast(db.pool(), id).await.unwrap();
            if record.status == BroadcastStatus::Completed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let record = broadcast::get_broadcast(db.pool(), id).await.unwrap();
        assert_eq!(record.status, BroadcastStatus::Completed);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 1);

        // Once finished the id can be queued again; the sender finds
        // no pending rows and the run is a no-op.
        assert!(queue.enqueue(id));
    }

    #[tokio::test]
    async fn test_job_errors_mark_broadcast_failed() {
        let db = test_db().await;
        let id = seed_broadcast(&db).await;
        let sender = Arc::new(CountingSender {
            calls: AtomicU32::new(0),
        });

        // Break the broadcast record so the sender errors on load.
        sqlx::query("DELETE FROM broadcast_logs WHERE broadcast_id = ?")
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("DELETE FROM broadcasts WHERE id = ?")
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();

        let queue_config = QueueConfig {
            max_attempts: 2,
            retry_delay: Duration::from_millis(1),
        };
        let queue = BroadcastQueue::spawn(
            db.pool().clone(),
            sender.clone(),
            SenderConfig::default(),
            queue_config,
        );

        assert!(queue.enqueue(id));
        tokio::time::sleep(Duration::from_millis(200)).await;

        // The job retried and gave up without dispatching anything.
        assert_eq!(sender.calls.load(Ordering::SeqCst), 0);
        assert!(!queue.active.lock().unwrap().contains(&id));
    }
}
