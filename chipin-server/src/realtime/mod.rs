use actix_web::web::Bytes;
use chipin_common::request_io::{OutputContribution, OutputEventStats, OutputExpense};
use futures::Stream;
use serde::Serialize;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// A ledger change pushed to clients watching an event. Serialized as
/// `{"type": "...", "payload": {...}}`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum LedgerUpdate {
    ContributionSubmitted {
        contribution: OutputContribution,
        stats: OutputEventStats,
    },
    ContributionUpdated {
        contribution: OutputContribution,
        stats: OutputEventStats,
    },
    ExpenseAdded {
        expense: OutputExpense,
        stats: OutputEventStats,
    },
    ExpenseUpdated {
        expense: OutputExpense,
        stats: OutputEventStats,
    },
    ExpenseDeleted {
        expense_id: Uuid,
        stats: OutputEventStats,
    },
}

type SubscriberMap = HashMap<Uuid, HashMap<Uuid, UnboundedSender<String>>>;

/// Fan-out registry of live subscribers, keyed by event ID. Delivery is
/// best-effort; a slow or disconnected subscriber never fails the operation
/// that triggered the broadcast.
#[derive(Clone, Default)]
pub struct EventBroadcaster {
    subscribers: Arc<Mutex<SubscriberMap>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event_id: Uuid) -> Subscription {
        let subscriber_id = Uuid::now_v7();
        let (sender, receiver) = mpsc::unbounded_channel();

        self.subscribers
            .lock()
            .expect("Subscriber map mutex was poisoned")
            .entry(event_id)
            .or_default()
            .insert(subscriber_id, sender);

        Subscription {
            event_id,
            subscriber_id,
            receiver,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    pub fn broadcast(&self, event_id: Uuid, update: &LedgerUpdate) {
        let message = match serde_json::to_string(update) {
            Ok(m) => m,
            Err(e) => {
                log::error!("Failed to serialize ledger update: {e}");
                return;
            }
        };

        // Snapshot the senders so the lock isn't held while sending
        let targets: Vec<(Uuid, UnboundedSender<String>)> = {
            let subscribers = self
                .subscribers
                .lock()
                .expect("Subscriber map mutex was poisoned");

            match subscribers.get(&event_id) {
                Some(event_subscribers) => event_subscribers
                    .iter()
                    .map(|(id, sender)| (*id, sender.clone()))
                    .collect(),
                None => return,
            }
        };

        let mut disconnected = Vec::new();

        for (subscriber_id, sender) in targets {
            if sender.send(message.clone()).is_err() {
                disconnected.push(subscriber_id);
            }
        }

        if !disconnected.is_empty() {
            let mut subscribers = self
                .subscribers
                .lock()
                .expect("Subscriber map mutex was poisoned");

            if let Some(event_subscribers) = subscribers.get_mut(&event_id) {
                for subscriber_id in disconnected {
                    event_subscribers.remove(&subscriber_id);
                }

                if event_subscribers.is_empty() {
                    subscribers.remove(&event_id);
                }
            }
        }
    }

    pub fn subscriber_count(&self, event_id: Uuid) -> usize {
        self.subscribers
            .lock()
            .expect("Subscriber map mutex was poisoned")
            .get(&event_id)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

/// A live feed for a single event. Unregisters itself from the broadcaster
/// when dropped (e.g. when the client disconnects and the response stream is
/// torn down).
pub struct Subscription {
    event_id: Uuid,
    subscriber_id: Uuid,
    receiver: UnboundedReceiver<String>,
    subscribers: Arc<Mutex<SubscriberMap>>,
}

impl Subscription {
    pub async fn next_message(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

impl Stream for Subscription {
    type Item = Result<Bytes, actix_web::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(message)) => {
                Poll::Ready(Some(Ok(Bytes::from(format!("data: {}\n\n", message)))))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subscribers = self
            .subscribers
            .lock()
            .expect("Subscriber map mutex was poisoned");

        if let Some(event_subscribers) = subscribers.get_mut(&self.event_id) {
            event_subscribers.remove(&self.subscriber_id);

            if event_subscribers.is_empty() {
                subscribers.remove(&self.event_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chipin_common::stats::EventStats;

    use super::*;

    fn stats_update(event_id: Uuid) -> LedgerUpdate {
        LedgerUpdate::ExpenseDeleted {
            expense_id: Uuid::now_v7(),
            stats: OutputEventStats::new(
                event_id,
                EventStats {
                    total_collected_cents: 600,
                    total_expenses_cents: 200,
                    contributors_count: 2,
                    pending_requests: 1,
                    remaining_funds_cents: 400,
                },
            ),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_event_subscribers() {
        let broadcaster = EventBroadcaster::new();

        let event_a = Uuid::now_v7();
        let event_b = Uuid::now_v7();

        let mut sub1 = broadcaster.subscribe(event_a);
        let mut sub2 = broadcaster.subscribe(event_a);
        let mut other = broadcaster.subscribe(event_b);

        broadcaster.broadcast(event_a, &stats_update(event_a));

        let msg1 = sub1.next_message().await.unwrap();
        let msg2 = sub2.next_message().await.unwrap();

        assert_eq!(msg1, msg2);
        assert!(msg1.contains("expense_deleted"));

        // The other event's subscriber must not have received anything
        assert!(other.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_unregistered() {
        let broadcaster = EventBroadcaster::new();
        let event_id = Uuid::now_v7();

        let sub1 = broadcaster.subscribe(event_id);
        let sub2 = broadcaster.subscribe(event_id);

        assert_eq!(broadcaster.subscriber_count(event_id), 2);

        drop(sub1);
        assert_eq!(broadcaster.subscriber_count(event_id), 1);

        drop(sub2);
        assert_eq!(broadcaster.subscriber_count(event_id), 0);
    }

    #[tokio::test]
    async fn test_broadcast_prunes_closed_channels() {
        let broadcaster = EventBroadcaster::new();
        let event_id = Uuid::now_v7();

        let mut sub = broadcaster.subscribe(event_id);
        sub.receiver.close();

        assert_eq!(broadcaster.subscriber_count(event_id), 1);

        broadcaster.broadcast(event_id, &stats_update(event_id));

        assert_eq!(broadcaster.subscriber_count(event_id), 0);
    }

    #[tokio::test]
    async fn test_broadcast_to_event_with_no_subscribers_is_a_noop() {
        let broadcaster = EventBroadcaster::new();
        let event_id = Uuid::now_v7();

        broadcaster.broadcast(event_id, &stats_update(event_id));

        assert_eq!(broadcaster.subscriber_count(event_id), 0);
    }

    #[actix_web::test]
    async fn test_subscription_stream_frames_messages_for_sse() {
        use futures::StreamExt;

        let broadcaster = EventBroadcaster::new();
        let event_id = Uuid::now_v7();

        let mut sub = broadcaster.subscribe(event_id);
        broadcaster.broadcast(event_id, &stats_update(event_id));

        let frame = sub.next().await.unwrap().unwrap();
        let frame = String::from_utf8(frame.to_vec()).unwrap();

        assert!(frame.starts_with("data: "));
        assert!(frame.ends_with("\n\n"));
    }
}
