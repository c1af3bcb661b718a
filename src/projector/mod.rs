//! The projector: ordered dispatch of inserted records to subscribed handlers.
//!
//! Maintains one FIFO queue per stream id, created lazily on the first record for that
//! stream and torn down once drained (see [`queue`]). Handlers for the same stream never
//! run concurrently; handlers across different streams may.

mod queue;

use std::collections::{hash_map, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::trace;

use crate::error::DynError;
use crate::event::EventRecord;
use queue::StreamQueue;

/// Status of a record at the moment it reaches the projector; distinct from
/// [`crate::event::EventStatus`], which is the facade's point-in-time existence check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStatus {
    /// The record has been observed before (e.g. via replay).
    pub hydrated: bool,
    /// The record is older than another record of the same `(stream, type)`.
    pub outdated: bool,
}

/// A `continuous`/`all` mode subscriber: tolerant of replay (`continuous`) or of
/// replay-and-reordering (`all`).
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn handle(&self, record: &EventRecord) -> Result<(), DynError>;

    /// `None` matches every event type.
    fn event_types(&self) -> Option<Vec<String>> {
        None
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A `once` mode subscriber: fires only for genuinely new, in-order records. Intended for
/// side effects that must not replay (sending email, placing an external order).
#[async_trait]
pub trait OnceSubscriber: Send + Sync {
    async fn handle(&self, record: &EventRecord) -> Result<Value, DynError>;

    fn event_types(&self) -> Option<Vec<String>> {
        None
    }

    async fn on_success(&self, _data: Value, _record: &EventRecord) {}

    async fn on_error(&self, _error: DynError, _record: &EventRecord) {}

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A batch subscriber, receiving the full slice of records tagged with its registration key.
#[async_trait]
pub trait BatchSubscriber: Send + Sync {
    async fn handle(&self, records: &[EventRecord]) -> Result<(), DynError>;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

fn matches_type(event_types: &Option<Vec<String>>, record: &EventRecord) -> bool {
    event_types
        .as_ref()
        .map(|types| types.iter().any(|t| t == &record.event_type))
        .unwrap_or(true)
}

#[derive(Default)]
pub(crate) struct Subscriptions {
    once: Vec<Arc<dyn OnceSubscriber>>,
    continuous: Vec<Arc<dyn Subscriber>>,
    all: Vec<Arc<dyn Subscriber>>,
    batch: HashMap<String, Vec<Arc<dyn BatchSubscriber>>>,
}

/// The dispatch layer. Cheaply [`Clone`] — internally `Arc`-backed, matching the
/// provider/store types.
#[derive(Clone)]
pub struct Projector {
    subscriptions: Arc<RwLock<Subscriptions>>,
    queues: Arc<Mutex<HashMap<String, StreamQueue>>>,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new()
    }
}

impl Projector {
    pub fn new() -> Self {
        Self {
            subscriptions: Arc::new(RwLock::new(Subscriptions::default())),
            queues: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn subscribe_once(&self, subscriber: Arc<dyn OnceSubscriber>) {
        self.subscriptions.write().await.once.push(subscriber);
    }

    pub async fn subscribe_continuous(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscriptions.write().await.continuous.push(subscriber);
    }

    pub async fn subscribe_all(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscriptions.write().await.all.push(subscriber);
    }

    pub async fn subscribe_batch(&self, key: impl Into<String>, subscriber: Arc<dyn BatchSubscriber>) {
        self.subscriptions.write().await.batch.entry(key.into()).or_default().push(subscriber);
    }

    /// Number of streams currently holding a live dispatch queue. Exposed for tests that
    /// assert drained queues are actually removed, not just emptied.
    #[cfg(test)]
    pub(crate) async fn live_queue_count(&self) -> usize {
        self.queues.lock().await.len()
    }

    /// Enqueues `record` onto its stream's FIFO queue. The returned future resolves once
    /// every matching `continuous`/`all` handler for this record has completed; `once`
    /// handler errors are routed to that subscription's `on_error` effect instead and
    /// never appear here.
    pub async fn push(&self, record: EventRecord, status: DeliveryStatus) -> Result<(), Vec<DynError>> {
        let stream = record.stream.clone();
        let subscriptions = self.subscriptions.clone();
        let receiver = {
            let mut queues = self.queues.lock().await;
            let queue = match queues.entry(stream.clone()) {
                hash_map::Entry::Occupied(entry) => entry.into_mut(),
                hash_map::Entry::Vacant(entry) => {
                    trace!(stream = %stream, "projector queue created");
                    entry.insert(StreamQueue::new())
                }
            };
            queue.enqueue(record, status, subscriptions, self.queues.clone(), stream.clone())
        };
        receiver.await.unwrap_or_else(|_| Ok(()))
    }

    /// Delivers the full slice of `records` to every batch subscriber registered under `key`.
    pub async fn push_many(&self, key: &str, records: &[EventRecord]) -> Result<(), Vec<DynError>> {
        let subscribers = {
            let subscriptions = self.subscriptions.read().await;
            subscriptions.batch.get(key).cloned().unwrap_or_default()
        };

        let mut errors = Vec::new();
        for subscriber in subscribers {
            if let Err(error) = subscriber.handle(records).await {
                errors.push(error);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

type HandlerPartition = (Vec<Arc<dyn OnceSubscriber>>, Vec<Arc<dyn Subscriber>>, Vec<Arc<dyn Subscriber>>);

pub(crate) fn partition_handlers(subscriptions: &Subscriptions, record: &EventRecord, status: DeliveryStatus) -> HandlerPartition {
    let once = if !status.hydrated && !status.outdated {
        subscriptions
            .once
            .iter()
            .filter(|s| matches_type(&s.event_types(), record))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    let continuous = if !status.outdated {
        subscriptions
            .continuous
            .iter()
            .filter(|s| matches_type(&s.event_types(), record))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    let all = subscriptions
        .all
        .iter()
        .filter(|s| matches_type(&s.event_types(), record))
        .cloned()
        .collect();

    (once, continuous, all)
}
