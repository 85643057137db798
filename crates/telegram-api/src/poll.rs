//! Long-poll loop over `getUpdates`.

use crate::client::BotClient;
use crate::error::ApiError;
use crate::types::Update;
use std::collections::VecDeque;

/// Default server-side hold time for long polls, in seconds.
const POLL_TIMEOUT_SECS: u64 = 25;

/// Pulls updates one at a time, tracking the confirmed offset.
///
/// Each `getUpdates` call acknowledges everything before `offset`, so
/// an update is only re-delivered if the process dies before the next
/// poll.
pub struct UpdatePoller {
    client: BotClient,
    offset: i64,
    buffered: VecDeque<Update>,
}

impl UpdatePoller {
    /// Create a poller starting from the oldest unconfirmed update.
    pub fn new(client: BotClient) -> Self {
        Self {
            client,
            offset: 0,
            buffered: VecDeque::new(),
        }
    }

    /// Wait for and return the next update.
    ///
    /// Blocks through empty long-poll rounds until an update arrives.
    pub async fn next_update(&mut self) -> Result<Update, ApiError> {
        loop {
            if let Some(update) = self.buffered.pop_front() {
                return Ok(update);
            }

            let updates = self.client.get_updates(self.offset, POLL_TIMEOUT_SECS).await?;
            if !updates.is_empty() {
                tracing::debug!("Received {} update(s)", updates.len());
            }
            for update in updates {
                self.offset = self.offset.max(update.update_id + 1);
                self.buffered.push_back(update);
            }
        }
    }
}
