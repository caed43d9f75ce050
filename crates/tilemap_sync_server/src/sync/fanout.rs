//! Best-effort push of committed batches to live subscribers.
//!
//! One broadcast channel per room with at least one subscriber. Delivery is
//! at-most-once: a subscriber that falls more than `capacity` batches behind
//! loses the oldest ones and has to reconcile through catch-up.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tilemap_core::Delta;
use tokio::sync::broadcast;
use tracing::debug;

use crate::room::RoomId;

/// A batch as pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommittedBatch {
    pub deltas: Vec<Delta>,
    /// Score the batch was logged under; usable as a catch-up cursor.
    pub cursor: i64,
}

/// Per-room broadcast channels.
pub struct FanOut {
    channels: DashMap<RoomId, broadcast::Sender<Arc<CommittedBatch>>>,
    capacity: usize,
}

impl FanOut {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to batches committed in `room` from now on.
    pub fn subscribe(&self, room: &RoomId) -> broadcast::Receiver<Arc<CommittedBatch>> {
        self.channels
            .entry(room.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish a batch; returns how many subscribers it was queued for.
    ///
    /// A room whose subscribers have all gone away has its channel dropped.
    pub fn publish(&self, room: &RoomId, batch: CommittedBatch) -> usize {
        let Some(sender) = self.channels.get(room).map(|entry| entry.value().clone()) else {
            return 0;
        };

        match sender.send(Arc::new(batch)) {
            Ok(receivers) => receivers,
            Err(_) => {
                self.channels
                    .remove_if(room, |_, sender| sender.receiver_count() == 0);
                debug!("Dropped fan-out channel for room {} (no subscribers)", room);
                0
            }
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self, room: &RoomId) -> usize {
        self.channels
            .get(room)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub fn active_rooms(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str) -> RoomId {
        RoomId::parse(id).unwrap()
    }

    fn batch(cursor: i64) -> CommittedBatch {
        CommittedBatch {
            deltas: vec![Delta::add(0, 0, "grass")],
            cursor,
        }
    }

    #[tokio::test]
    async fn subscribers_receive_batches_for_their_room_only() {
        let fanout = FanOut::new(8);
        let mut a = fanout.subscribe(&room("a"));
        let mut b = fanout.subscribe(&room("b"));

        assert_eq!(fanout.publish(&room("a"), batch(1)), 1);

        assert_eq!(*a.recv().await.unwrap(), batch(1));
        assert!(matches!(
            b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let fanout = FanOut::new(8);
        assert_eq!(fanout.publish(&room("a"), batch(1)), 0);
        assert_eq!(fanout.active_rooms(), 0);
    }

    #[test]
    fn channel_is_dropped_once_subscribers_leave() {
        let fanout = FanOut::new(8);
        let rx = fanout.subscribe(&room("a"));
        assert_eq!(fanout.subscriber_count(&room("a")), 1);
        drop(rx);

        assert_eq!(fanout.publish(&room("a"), batch(1)), 0);
        assert_eq!(fanout.active_rooms(), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking() {
        let fanout = FanOut::new(2);
        let mut rx = fanout.subscribe(&room("a"));
        for cursor in 1..=4 {
            fanout.publish(&room("a"), batch(cursor));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(rx.recv().await.unwrap().cursor, 3);
        assert_eq!(rx.recv().await.unwrap().cursor, 4);
    }
}
