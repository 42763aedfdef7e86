use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use super::types::ChangeNotification;

/// In-process change feed backed by `tokio::broadcast`.
/// Postgres notifications reach it through [`super::listener::PgChangeListener`].
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: Arc<broadcast::Sender<ChangeNotification>>,
}

impl ChangeFeed {
    /// Create a new feed with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish a change to all current subscribers. Returns how many
    /// subscriptions it was queued for.
    pub fn publish(&self, change: ChangeNotification) -> usize {
        match self.sender.send(change) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(change)) => {
                tracing::trace!(kind = change.kind(), "change published with no subscribers");
                0
            }
        }
    }

    /// Open a subscription scoped to one match.
    pub fn subscribe(&self, match_id: impl Into<String>) -> Subscription {
        Subscription {
            match_id: match_id.into(),
            receiver: Some(self.sender.subscribe()),
        }
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// What a subscription yields.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Change(ChangeNotification),
    /// The subscriber fell behind and this many notifications were lost.
    Lagged(u64),
}

/// Receiving end of a [`ChangeFeed`] for one match.
#[derive(Debug)]
pub struct Subscription {
    match_id: String,
    receiver: Option<broadcast::Receiver<ChangeNotification>>,
}

impl Subscription {
    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn is_open(&self) -> bool {
        self.receiver.is_some()
    }

    /// Wait for the next change of this match. Changes that name another
    /// match are skipped; deletes that name no match are passed through.
    /// Returns `None` once the subscription or the feed is closed.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(change) => {
                    if change.match_id().is_some_and(|id| id != self.match_id) {
                        continue;
                    }
                    return Some(FeedEvent::Change(change));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(match_id = %self.match_id, skipped, "change feed subscriber lagged");
                    return Some(FeedEvent::Lagged(skipped));
                }
                Err(RecvError::Closed) => {
                    tracing::info!(match_id = %self.match_id, "change feed closed");
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Stop receiving. Safe to call more than once.
    pub fn close(&mut self) {
        if self.receiver.take().is_some() {
            tracing::debug!(match_id = %self.match_id, "change feed subscription closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, EventType, MatchEvent};
    use serde_json::Map;

    fn insert(id: &str, match_id: &str) -> ChangeNotification {
        ChangeNotification::Insert(MatchEvent {
            id: id.to_string(),
            match_id: match_id.to_string(),
            event_type: EventType::Shot,
            timestamp: 1.0,
            team: None,
            player_id: None,
            coordinates: Coordinates::default(),
            created_by: "tracker".to_string(),
            created_at: None,
            event_data: Map::new(),
        })
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let feed = ChangeFeed::new(16);
        let mut sub = feed.subscribe("m1");

        assert_eq!(feed.publish(insert("e1", "m1")), 1);

        let event = sub.next().await.unwrap();
        assert_eq!(event, FeedEvent::Change(insert("e1", "m1")));
    }

    #[tokio::test]
    async fn subscription_skips_other_matches() {
        let feed = ChangeFeed::new(16);
        let mut sub = feed.subscribe("m1");

        feed.publish(insert("x", "m2"));
        feed.publish(ChangeNotification::delete("gone"));
        feed.publish(insert("e1", "m1"));

        assert_eq!(
            sub.next().await,
            Some(FeedEvent::Change(ChangeNotification::delete("gone")))
        );
        assert_eq!(sub.next().await, Some(FeedEvent::Change(insert("e1", "m1"))));
    }

    #[tokio::test]
    async fn multiple_subscribers() {
        let feed = ChangeFeed::new(16);
        let mut sub1 = feed.subscribe("m1");
        let mut sub2 = feed.subscribe("m1");

        assert_eq!(feed.subscriber_count(), 2);

        feed.publish(insert("e1", "m1"));

        assert!(matches!(sub1.next().await, Some(FeedEvent::Change(_))));
        assert!(matches!(sub2.next().await, Some(FeedEvent::Change(_))));
    }

    #[tokio::test]
    async fn lag_is_reported() {
        let feed = ChangeFeed::new(2);
        let mut sub = feed.subscribe("m1");

        for i in 0..5 {
            feed.publish(insert(&format!("e{i}"), "m1"));
        }

        assert_eq!(sub.next().await, Some(FeedEvent::Lagged(3)));
        assert_eq!(sub.next().await, Some(FeedEvent::Change(insert("e3", "m1"))));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let feed = ChangeFeed::new(16);
        let mut sub = feed.subscribe("m1");

        sub.close();
        sub.close();
        assert!(!sub.is_open());
        assert_eq!(feed.subscriber_count(), 0);

        feed.publish(insert("e1", "m1"));
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn dropping_the_feed_ends_the_subscription() {
        let feed = ChangeFeed::new(16);
        let mut sub = feed.subscribe("m1");
        drop(feed);

        assert_eq!(sub.next().await, None);
        assert!(!sub.is_open());
    }
}
