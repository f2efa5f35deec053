/// Per-user live feed of brick changes
///
/// Every mutation of a user's bricks or profile is published here so open
/// clients can update without polling. Each user gets their own broadcast
/// channel, created on first subscribe and removed when the last
/// [`Subscription`] is dropped.
///
/// Delivery is best effort. A subscriber that falls more than
/// [`CHANNEL_CAPACITY`] events behind skips the missed events and carries on
/// from the newest one.
///
/// # Example
///
/// ```
/// use buildnotburn_shared::feed::{BrickChange, BrickFeed};
/// use uuid::Uuid;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let feed = BrickFeed::new();
/// let user_id = Uuid::new_v4();
///
/// let mut subscription = feed.subscribe(user_id);
/// feed.publish(user_id, BrickChange::ProfileUpdated);
///
/// assert_eq!(subscription.recv().await, Some(BrickChange::ProfileUpdated));
///
/// drop(subscription);
/// assert_eq!(feed.subscriber_count(user_id), 0);
/// # }
/// ```

use crate::models::brick::Brick;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events buffered per user before slow subscribers start skipping
pub const CHANNEL_CAPACITY: usize = 64;

/// A change to one user's bricks or profile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BrickChange {
    Added { brick: Brick },
    Completed { brick: Brick },
    Burned { brick: Brick },
    Reordered { order: Vec<Uuid> },
    NotesUpdated { brick: Brick },

    /// Plan, audit or bonus changed; clients should refetch `/v1/me`
    ProfileUpdated,
}

impl BrickChange {
    /// Short name used as the SSE event type
    pub fn kind(&self) -> &'static str {
        match self {
            BrickChange::Added { .. } => "added",
            BrickChange::Completed { .. } => "completed",
            BrickChange::Burned { .. } => "burned",
            BrickChange::Reordered { .. } => "reordered",
            BrickChange::NotesUpdated { .. } => "notes_updated",
            BrickChange::ProfileUpdated => "profile_updated",
        }
    }
}

type Channels = Arc<Mutex<HashMap<Uuid, broadcast::Sender<BrickChange>>>>;

/// Publish/subscribe hub keyed by user
#[derive(Debug, Clone, Default)]
pub struct BrickFeed {
    channels: Channels,
}

impl BrickFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(channels: &Channels) -> MutexGuard<'_, HashMap<Uuid, broadcast::Sender<BrickChange>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts listening to `user_id`'s changes
    pub fn subscribe(&self, user_id: Uuid) -> Subscription {
        let mut channels = Self::lock(&self.channels);
        let sender = channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);

        tracing::debug!(user_id = %user_id, subscribers = sender.receiver_count() + 1, "Feed subscribe");

        Subscription {
            user_id,
            receiver: sender.subscribe(),
            channels: Arc::clone(&self.channels),
        }
    }

    /// Sends a change to every current subscriber of `user_id`
    ///
    /// Returns how many subscribers received it; 0 when nobody listens.
    pub fn publish(&self, user_id: Uuid, change: BrickChange) -> usize {
        let channels = Self::lock(&self.channels);
        match channels.get(&user_id) {
            Some(sender) => sender.send(change).unwrap_or(0),
            None => 0,
        }
    }

    /// Live subscriptions for `user_id`
    pub fn subscriber_count(&self, user_id: Uuid) -> usize {
        Self::lock(&self.channels)
            .get(&user_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

/// Handle for one listener; dropping it unsubscribes
#[derive(Debug)]
pub struct Subscription {
    user_id: Uuid,
    receiver: broadcast::Receiver<BrickChange>,
    channels: Channels,
}

impl Subscription {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Waits for the next change
    ///
    /// Returns `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<BrickChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %self.user_id, skipped, "Feed subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut channels = BrickFeed::lock(&self.channels);

        // Our receiver is still counted until this drop finishes.
        let idle = channels
            .get(&self.user_id)
            .map(|sender| sender.receiver_count() <= 1)
            .unwrap_or(false);

        if idle {
            channels.remove(&self.user_id);
            tracing::debug!(user_id = %self.user_id, "Feed channel closed");
        }
    }
}
