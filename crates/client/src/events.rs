//! Application event bus.
//!
//! The bus is constructed once by the application root and shared by
//! reference (`Arc<EventBus>`). Subscriber IDs come from a counter owned
//! by the bus instance, so two buses never interfere.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use fileshelf_protocol::EventName;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Arbitrary key/value payload carried by an event.
pub type EventPayload = serde_json::Map<String, serde_json::Value>;

/// Callback invoked for every published event.
pub type Subscriber = Arc<dyn Fn(&EventPayload) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Publish/subscribe hub for client notifications.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<EventName, BTreeMap<SubscriberId, Subscriber>>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `event` and returns its ID.
    pub fn subscribe<F>(&self, event: EventName, callback: F) -> SubscriberId
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut map = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        map.entry(event).or_default().insert(id, Arc::new(callback));
        id
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, event: EventName, id: SubscriberId) -> bool {
        let mut map = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        map.get_mut(&event)
            .map(|subs| subs.remove(&id).is_some())
            .unwrap_or(false)
    }

    /// Delivers `payload` to every current subscriber of `event`.
    ///
    /// Subscribers run in subscription order on the caller's task. The
    /// subscriber list is snapshotted first, so a callback may subscribe
    /// or unsubscribe without deadlocking. Returns the number notified.
    pub fn publish(&self, event: EventName, payload: &EventPayload) -> usize {
        let snapshot: Vec<Subscriber> = {
            let map = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            match map.get(&event) {
                Some(subs) => subs.values().cloned().collect(),
                None => return 0,
            }
        };

        trace!(%event, subscribers = snapshot.len(), "publishing event");
        for subscriber in &snapshot {
            subscriber(payload);
        }
        snapshot.len()
    }

    /// Number of subscribers currently registered for `event`.
    pub fn subscriber_count(&self, event: EventName) -> usize {
        let map = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
        map.get(&event).map_or(0, BTreeMap::len)
    }
}

/// Payload of an [`EventName::UploadProgress`] event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub file_name: String,
    pub upload_percentage: f64,
}

impl ProgressEvent {
    /// Converts the event into a bus payload.
    pub fn to_payload(&self) -> EventPayload {
        let mut payload = EventPayload::new();
        payload.insert("fileName".into(), self.file_name.clone().into());
        payload.insert("uploadPercentage".into(), self.upload_percentage.into());
        payload
    }

    /// Reads a progress event back from a bus payload.
    pub fn from_payload(payload: &EventPayload) -> Option<Self> {
        serde_json::from_value(serde_json::Value::Object(payload.clone())).ok()
    }
}
