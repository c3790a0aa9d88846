//! In-process publish/subscribe for live attendance updates.
//!
//! A single-process, best-effort fan-out: every streaming client owns a
//! bounded queue, and publishing pushes a copy of the event into each
//! live queue under one lock. There is no persistence, no replay, and no
//! delivery guarantee; a subscriber that cannot keep up loses events
//! rather than stalling the publisher. Ordering is insertion order per
//! subscriber only.

use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Events a subscriber may fit in its queue before new ones are dropped.
const SUBSCRIBER_QUEUE_DEPTH: usize = 64;

/// The event kinds fanned out to streaming clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ClassCreated,
    ClassMemberAdded,
    AttendanceMarked,
}

impl EventKind {
    /// Wire name used as the SSE event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ClassCreated => "class_created",
            EventKind::ClassMemberAdded => "class_member_added",
            EventKind::AttendanceMarked => "attendance_marked",
        }
    }
}

/// One published event: a kind plus its JSON payload.
#[derive(Debug, Clone, Serialize)]
pub struct BrokerEvent {
    pub kind: EventKind,
    pub payload: serde_json::Value,
}

struct Subscriber {
    id: Uuid,
    tx: mpsc::Sender<BrokerEvent>,
}

/// Clonable handle to the broker; all clones share one subscriber list.
#[derive(Clone)]
pub struct EventBroker {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl Default for EventBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroker {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a new streaming client. The subscription unregisters
    /// itself when dropped.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let id = Uuid::new_v4();

        self.subscribers.lock().push(Subscriber { id, tx });
        log::debug!("event subscriber {} registered", id);

        Subscription {
            id,
            rx,
            broker: self.clone(),
        }
    }

    /// Publish an event to every live subscriber.
    ///
    /// The payload is serialized once and cloned per queue. Subscribers
    /// whose receiver is gone are pruned; subscribers whose queue is
    /// full miss this event. Returns the number of queues reached.
    pub fn publish(&self, kind: EventKind, payload: &impl Serialize) -> usize {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(err) => {
                log::error!("failed to serialize {} event: {}", kind.as_str(), err);
                return 0;
            }
        };

        let event = BrokerEvent { kind, payload };
        let mut delivered = 0;

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|subscriber| match subscriber.tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                log::debug!(
                    "subscriber {} lagging, dropped {} event",
                    subscriber.id,
                    kind.as_str()
                );
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });

        delivered
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn unsubscribe(&self, id: Uuid) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.id != id);
        log::debug!("event subscriber {} unregistered", id);
    }
}

/// A registered subscriber's receiving end.
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<BrokerEvent>,
    broker: EventBroker,
}

impl Subscription {
    /// Wait for the next event. `None` once the broker side is gone.
    pub async fn recv(&mut self) -> Option<BrokerEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broker.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fans_out_to_all_subscribers() {
        let broker = EventBroker::new();
        let mut first = broker.subscribe();
        let mut second = broker.subscribe();

        let delivered = broker.publish(EventKind::ClassCreated, &json!({"id": 1}));
        assert_eq!(delivered, 2);

        let event = first.recv().await.expect("first subscriber event");
        assert_eq!(event.kind, EventKind::ClassCreated);
        assert_eq!(event.payload["id"], 1);

        let event = second.recv().await.expect("second subscriber event");
        assert_eq!(event.kind, EventKind::ClassCreated);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let broker = EventBroker::new();
        assert_eq!(broker.publish(EventKind::AttendanceMarked, &json!({})), 0);
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_unregistered() {
        let broker = EventBroker::new();
        let first = broker.subscribe();
        let second = broker.subscribe();
        assert_eq!(broker.subscriber_count(), 2);

        drop(first);
        assert_eq!(broker.subscriber_count(), 1);

        drop(second);
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn slow_subscribers_lose_events_instead_of_blocking() {
        let broker = EventBroker::new();
        let mut subscription = broker.subscribe();

        for i in 0..(SUBSCRIBER_QUEUE_DEPTH + 10) {
            broker.publish(EventKind::AttendanceMarked, &json!({ "seq": i }));
        }

        // The queue held the first SUBSCRIBER_QUEUE_DEPTH events; the
        // overflow was dropped but the subscriber stays registered.
        assert_eq!(broker.subscriber_count(), 1);

        let first = subscription.recv().await.expect("queued event");
        assert_eq!(first.payload["seq"], 0);
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let broker = EventBroker::new();
        let mut subscription = broker.subscribe();

        broker.publish(EventKind::ClassCreated, &json!({"seq": 0}));
        broker.publish(EventKind::ClassMemberAdded, &json!({"seq": 1}));
        broker.publish(EventKind::AttendanceMarked, &json!({"seq": 2}));

        for (i, expected) in [
            EventKind::ClassCreated,
            EventKind::ClassMemberAdded,
            EventKind::AttendanceMarked,
        ]
        .iter()
        .enumerate()
        {
            let event = subscription.recv().await.expect("ordered event");
            assert_eq!(event.kind, *expected);
            assert_eq!(event.payload["seq"], i);
        }
    }
}
