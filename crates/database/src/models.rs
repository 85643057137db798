//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A shop user, identified internally by row id.
///
/// A user is "reachable" once `telegram_id` is known, i.e. they have
/// opened the bot at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Internal id.
    pub id: i64,
    /// Telegram id, if the user has opened the bot.
    pub telegram_id: Option<i64>,
    /// Telegram username without the leading `@`, lowercased.
    pub telegram_username: String,
    /// Display name.
    pub first_name: String,
    /// Whether the account is active.
    pub is_active: bool,
    /// Registration timestamp.
    pub created_at: String,
    /// Last bot interaction timestamp.
    pub last_seen_at: Option<String>,
}

/// Order lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Confirmed,
    Completed,
    Cancelled,
}

/// An order, reduced to what audience resolution needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Order {
    /// Internal id.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Order total in kopeks.
    pub total_kopeks: i64,
    /// Creation timestamp.
    pub created_at: String,
}

/// A broadcast operator.
///
/// Added by username; `telegram_id` is backfilled the first time the
/// admin uses a gated command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BotAdmin {
    /// Internal id.
    pub id: i64,
    /// Username with the leading `@`.
    pub username: String,
    /// Telegram id, once known.
    pub telegram_id: Option<i64>,
    /// Display name.
    pub first_name: String,
    /// Whether admin commands are allowed.
    pub is_active: bool,
    /// Free-form operator note.
    pub note: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Audience categories for a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Audience {
    /// Every reachable user.
    All,
    /// Reachable users with at least one confirmed or completed order.
    Customers,
    /// Reachable users with two or more completed orders.
    Vip,
    /// Reachable users registered within the last 7 days.
    New,
    /// Reachable users not seen for more than 30 days.
    Inactive,
    /// Explicit username list supplied by the operator.
    Custom,
}

/// Broadcast content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Photo,
    Video,
    Document,
    Voice,
}

/// Broadcast lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BroadcastStatus {
    Draft,
    Pending,
    Sending,
    Completed,
    Cancelled,
    Failed,
}

/// One resolved recipient, captured in the launch-time snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Recipient {
    /// Internal user id.
    pub user_id: i64,
    /// Telegram id used for delivery.
    pub telegram_id: i64,
    /// Username without `@`, for display.
    pub username: String,
}

/// A launched mass-send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Broadcast {
    /// Internal id.
    pub id: i64,
    /// Audience category tag.
    pub audience: Audience,
    /// JSON snapshot of [`Recipient`]s, fixed at launch time.
    pub recipients: String,
    /// Content kind.
    pub content_type: ContentType,
    /// Message text, or caption for media.
    pub text: String,
    /// Telegram file_id for media content.
    pub file_id: String,
    /// Lifecycle status.
    pub status: BroadcastStatus,
    /// Telegram id of the operator who launched it.
    pub created_by_telegram_id: Option<i64>,
    /// Snapshot size, fixed once sending begins.
    pub total_recipients: i64,
    /// Successful deliveries so far.
    pub sent_count: i64,
    /// Failed plus blocked deliveries so far.
    pub failed_count: i64,
    /// Creation timestamp.
    pub created_at: String,
    /// First sending attempt timestamp.
    pub started_at: Option<String>,
    /// Completion timestamp.
    pub completed_at: Option<String>,
}

impl Broadcast {
    /// Parse the recipient snapshot column.
    pub fn recipient_list(&self) -> Result<Vec<Recipient>, serde_json::Error> {
        serde_json::from_str(&self.recipients)
    }

    /// Delivery success rate in percent.
    pub fn success_rate(&self) -> f64 {
        if self.total_recipients == 0 {
            return 0.0;
        }
        (self.sent_count as f64 / self.total_recipients as f64) * 100.0
    }
}

/// Per-recipient delivery states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LogStatus {
    Pending,
    Sent,
    Failed,
    Blocked,
}

/// One tracked delivery attempt to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BroadcastLog {
    /// Internal id.
    pub id: i64,
    /// Owning broadcast.
    pub broadcast_id: i64,
    /// Internal user reference.
    pub user_id: i64,
    /// Telegram id used for delivery.
    pub telegram_id: i64,
    /// Delivery status; transitions exactly once out of `pending`.
    pub status: LogStatus,
    /// Error detail for failed or blocked rows.
    pub error_message: String,
    /// Delivery timestamp for sent rows.
    pub sent_at: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}
