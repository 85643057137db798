//! SQLite persistence layer for the Bloom shop bot.
//!
//! This crate provides async database operations for users, orders,
//! the admin allowlist, conversation state and broadcast records using
//! SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:bloom.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Register a user seen by the bot
//!     let user =
//!         database::user::register_telegram_user(db.pool(), 42, Some("alice"), Some("Alice"))
//!             .await?;
//!     println!("registered user #{}", user.id);
//!
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod audience;
pub mod broadcast;
pub mod conversation;
pub mod delivery_log;
pub mod error;
pub mod models;
pub mod order;
pub mod user;

pub use error::{DatabaseError, Result};
pub use models::{
    Audience, BotAdmin, Broadcast, BroadcastLog, BroadcastStatus, ContentType, LogStatus,
    Order, OrderStatus, Recipient, User,
};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

pub use sqlx::SqlitePool;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    ///
    /// Tests use `sqlite::memory:` with a pool size of 1 so every query
    /// sees the same in-memory database.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!("Connected to database: {} (pool size: {})", url, pool_size);

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::NewBroadcast;

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    async fn seed_user(db: &Database, telegram_id: i64, username: &str) -> User {
        user::register_telegram_user(db.pool(), telegram_id, Some(username), Some("Test"))
            .await
            .unwrap()
    }

    fn snapshot(users: &[&User]) -> Vec<Recipient> {
        users
            .iter()
            .map(|u| Recipient {
                user_id: u.id,
                telegram_id: u.telegram_id.unwrap(),
                username: u.telegram_username.clone(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_register_creates_then_refreshes() {
        let db = test_db().await;

        let user = seed_user(&db, 100, "Alice").await;
        assert_eq!(user.telegram_username, "alice");
        assert!(user.last_seen_at.is_some());

        // Re-registering keeps the row and refreshes the username.
        let again = user::register_telegram_user(db.pool(), 100, Some("alice_new"), None)
            .await
            .unwrap();
        assert_eq!(again.id, user.id);
        assert_eq!(again.telegram_username, "alice_new");
        assert_eq!(user::count_users(db.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_conversation_state_round_trip() {
        let db = test_db().await;

        // Lazy creation defaults to empty.
        let (step, data) = conversation::get(db.pool(), 7).await.unwrap();
        assert_eq!(step, "");
        assert_eq!(data, "{}");

        conversation::set(db.pool(), 7, "broadcast_confirm", r#"{"x":1}"#)
            .await
            .unwrap();
        let (step, data) = conversation::get(db.pool(), 7).await.unwrap();
        assert_eq!(step, "broadcast_confirm");
        assert_eq!(data, r#"{"x":1}"#);

        // Clear resets in place.
        conversation::clear(db.pool(), 7).await.unwrap();
        let (step, data) = conversation::get(db.pool(), 7).await.unwrap();
        assert_eq!(step, "");
        assert_eq!(data, "{}");
    }

    #[tokio::test]
    async fn test_admin_gate_and_backfill() {
        let db = test_db().await;

        admin::create_admin(db.pool(), "boss", "owner").await.unwrap();

        // Unknown caller is rejected.
        assert!(!admin::is_admin(db.pool(), 1, Some("nobody")).await.unwrap());

        // Username match backfills the Telegram id.
        let found = admin::get_and_update(db.pool(), 555, Some("Boss"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.telegram_id, Some(555));

        // Subsequent calls match by id alone.
        assert!(admin::is_admin(db.pool(), 555, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_broadcast_launch_creates_pending_logs() {
        let db = test_db().await;
        let a = seed_user(&db, 1, "a").await;
        let b = seed_user(&db, 2, "b").await;
        let c = seed_user(&db, 3, "c").await;

        let id = broadcast::create_with_logs(
            db.pool(),
            &NewBroadcast {
                audience: Audience::All,
                recipients: snapshot(&[&a, &b, &c]),
                content_type: ContentType::Text,
                text: "hello".into(),
                file_id: String::new(),
                created_by_telegram_id: 999,
            },
        )
        .await
        .unwrap();

        let bc = broadcast::get_broadcast(db.pool(), id).await.unwrap();
        assert_eq!(bc.status, BroadcastStatus::Pending);
        assert_eq!(bc.total_recipients, 3);
        assert_eq!(bc.recipient_list().unwrap().len(), 3);

        let logs = delivery_log::list_for_broadcast(db.pool(), id).await.unwrap();
        assert_eq!(logs.len(), 3);
        assert!(logs.iter().all(|l| l.status == LogStatus::Pending));
    }

    #[tokio::test]
    async fn test_log_rows_transition_exactly_once() {
        let db = test_db().await;
        let a = seed_user(&db, 1, "a").await;

        let id = broadcast::create_with_logs(
            db.pool(),
            &NewBroadcast {
                audience: Audience::Custom,
                recipients: snapshot(&[&a]),
                content_type: ContentType::Text,
                text: "hi".into(),
                file_id: String::new(),
                created_by_telegram_id: 999,
            },
        )
        .await
        .unwrap();

        let logs = delivery_log::list_pending(db.pool(), id).await.unwrap();
        delivery_log::mark_sent(db.pool(), logs[0].id).await.unwrap();

        // A second transition attempt is a no-op.
        delivery_log::mark_failed(db.pool(), logs[0].id, "late error")
            .await
            .unwrap();
        let logs = delivery_log::list_for_broadcast(db.pool(), id).await.unwrap();
        assert_eq!(logs[0].status, LogStatus::Sent);
        assert_eq!(logs[0].error_message, "");
        assert_eq!(delivery_log::count_pending(db.pool(), id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_audience_excludes_unreachable_users() {
        let db = test_db().await;
        seed_user(&db, 1, "reachable").await;
        // A storefront-only user without a Telegram id.
        sqlx::query("INSERT INTO users (telegram_username) VALUES ('webonly')")
            .execute(db.pool())
            .await
            .unwrap();

        let recipients = audience::resolve(db.pool(), Audience::All).await.unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].username, "reachable");
    }

    #[tokio::test]
    async fn test_audience_customers_and_vip() {
        let db = test_db().await;
        let once = seed_user(&db, 1, "once").await;
        let twice = seed_user(&db, 2, "twice").await;
        let window = seed_user(&db, 3, "window").await;
        seed_user(&db, 4, "never").await;

        order::create_order(db.pool(), once.id, OrderStatus::Confirmed, 1000)
            .await
            .unwrap();
        order::create_order(db.pool(), twice.id, OrderStatus::Completed, 2000)
            .await
            .unwrap();
        order::create_order(db.pool(), twice.id, OrderStatus::Completed, 3000)
            .await
            .unwrap();
        // Cancelled orders do not make a customer.
        order::create_order(db.pool(), window.id, OrderStatus::Cancelled, 500)
            .await
            .unwrap();

        let customers = audience::resolve(db.pool(), Audience::Customers)
            .await
            .unwrap();
        let names: Vec<_> = customers.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["once", "twice"]);

        let vip = audience::resolve(db.pool(), Audience::Vip).await.unwrap();
        assert_eq!(vip.len(), 1);
        assert_eq!(vip[0].username, "twice");
    }

    #[tokio::test]
    async fn test_audience_new_and_inactive_windows() {
        let db = test_db().await;
        let fresh = seed_user(&db, 1, "fresh").await;
        let old = seed_user(&db, 2, "old").await;

        // Age the second user past both windows.
        sqlx::query(
            "UPDATE users SET created_at = datetime('now', '-60 days'),
             last_seen_at = datetime('now', '-45 days') WHERE id = ?",
        )
        .bind(old.id)
        .execute(db.pool())
        .await
        .unwrap();

        let new = audience::resolve(db.pool(), Audience::New).await.unwrap();
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].user_id, fresh.id);

        let inactive = audience::resolve(db.pool(), Audience::Inactive)
            .await
            .unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].user_id, old.id);
    }

    #[tokio::test]
    async fn test_find_by_usernames_partitions() {
        let db = test_db().await;
        seed_user(&db, 1, "alice").await;

        let (found, not_found) =
            audience::find_by_usernames(db.pool(), &["Alice".to_string(), "bob".to_string()])
                .await
                .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "alice");
        assert_eq!(not_found, vec!["bob".to_string()]);
    }
}
