//! Broadcast of reservation changes to live subscribers.
//!
//! Events only say that something changed; subscribers are expected to
//! re-read occupancy. A lagging receiver loses events, which is harmless
//! because the next read is authoritative anyway.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::TableId;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ReservationChanged {
    pub table_id: TableId,
    pub user_id: Uuid,
    pub kind: ChangeKind,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ReservationChanged>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: ReservationChanged) {
        // No subscribers is the normal idle state.
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::trace!(receivers = delivered, "Published reservation change");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReservationChanged> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: ChangeKind) -> ReservationChanged {
        ReservationChanged {
            table_id: TableId::new(1).unwrap(),
            user_id: Uuid::new_v4(),
            kind,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let feed = ChangeFeed::default();
        let mut rx = feed.subscribe();

        feed.publish(event(ChangeKind::Created));
        feed.publish(event(ChangeKind::Cancelled));

        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Created);
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Cancelled);
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let feed = ChangeFeed::new(4);
        assert_eq!(feed.subscriber_count(), 0);
        feed.publish(event(ChangeKind::Created));
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(event(ChangeKind::Cancelled)).unwrap();
        assert_eq!(json["kind"], "cancelled");
        assert_eq!(json["table_id"], 1);
    }
}
