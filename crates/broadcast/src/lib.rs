//! Mass-messaging subsystem: composition flow, delivery engine and
//! background job queue.
//!
//! The [`engine::Engine`] drives an operator through audience
//! selection, content capture and confirmation, persisting progress in
//! the conversation state table. Confirmation creates a broadcast
//! record with one pending delivery-log row per recipient and hands
//! the id to the [`queue::BroadcastQueue`], whose worker runs
//! [`sender::send_broadcast`] under the Bot API rate ceiling. The
//! sender only ever touches rows still pending, so a crashed or
//! interrupted run is finished by simply running it again.

pub mod content;
pub mod engine;
pub mod error;
pub mod queue;
pub mod sender;

pub use content::BroadcastContent;
pub use engine::{Engine, Inbound, Keyboard, Outcome, Reply};
pub use error::{BroadcastError, Result};
pub use queue::{BroadcastQueue, QueueConfig};
pub use sender::{send_broadcast, ContentSender, SendOutcome, SendStats, SenderConfig};
