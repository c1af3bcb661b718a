//! Aggregates: a mutable root that accumulates pending events before a single atomic commit.

use crate::event::{EventRecord, PartialEvent};
use crate::reducer::Reducer;

/// A deterministic, I/O-free event applier. `with` is the only method required; `NAME`
/// namespaces the aggregate's reducer/snapshot identity.
pub trait Aggregate: Default + Clone + Send + Sync + serde::Serialize + serde::de::DeserializeOwned + 'static {
    const NAME: &'static str;

    /// Applies `record` to `self`. Must be a pure function of `(self, record)`.
    fn with(&mut self, record: &EventRecord);
}

/// Builds the [`Reducer`] that replays an [`Aggregate`]'s own `with` method over a stream.
pub fn reducer_for<A: Aggregate>() -> Reducer<A> {
    Reducer::new(A::default, |mut state, record| {
        state.with(record);
        state
    })
}

/// Holds a stream's derived state plus a buffer of events not yet persisted.
///
/// Mutating methods (`push`) update `state` and append to the pending buffer in the same
/// call, so `state()` always reflects every event pushed so far, committed or not.
pub struct AggregateRoot<A> {
    stream: String,
    state: A,
    pending: Vec<EventRecord>,
}

impl<A: Aggregate> AggregateRoot<A> {
    /// A fresh root with no history: `state` is `A::default()`, `pending` is empty.
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            state: A::default(),
            pending: Vec::new(),
        }
    }

    /// Rehydrates a root from an existing state (e.g. the result of
    /// [`crate::store::EventStore::reduce`]), with an empty pending buffer.
    pub fn with_state(stream: impl Into<String>, state: A) -> Self {
        Self {
            stream: stream.into(),
            state,
            pending: Vec::new(),
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn state(&self) -> &A {
        &self.state
    }

    /// Stamps `partial` onto this aggregate's stream, applies it to `state` immediately,
    /// and appends it to the pending buffer. Returns the stamped record.
    pub fn push(&mut self, partial: PartialEvent) -> &EventRecord {
        let record = EventRecord::from_partial(partial.with_stream(self.stream.clone()));
        self.state.with(&record);
        self.pending.push(record);
        self.pending.last().expect("just pushed")
    }

    /// The events pushed since the last [`AggregateRoot::flush`], in push order.
    pub fn to_pending(&self) -> &[EventRecord] {
        &self.pending
    }

    /// Clears the pending buffer. Called by [`crate::store::EventStore::push_aggregate`]
    /// (and its `_many` counterpart) after a successful commit.
    pub fn flush(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
    struct Counter {
        count: i64,
    }

    impl Aggregate for Counter {
        const NAME: &'static str = "counter";

        fn with(&mut self, record: &EventRecord) {
            if record.event_type == "incremented" {
                self.count += 1;
            }
        }
    }

    #[test]
    fn push_updates_state_and_buffers_pending() {
        let mut root = AggregateRoot::<Counter>::new("c1");
        root.push(PartialEvent::new("incremented"));
        root.push(PartialEvent::new("incremented"));

        assert_eq!(root.state(), &Counter { count: 2 });
        assert_eq!(root.to_pending().len(), 2);
        assert!(root.to_pending().iter().all(|r| r.stream == "c1"));
    }

    #[test]
    fn flush_clears_pending_without_touching_state() {
        let mut root = AggregateRoot::<Counter>::new("c1");
        root.push(PartialEvent::new("incremented"));
        root.flush();

        assert!(root.to_pending().is_empty());
        assert_eq!(root.state(), &Counter { count: 1 });
    }

    #[test]
    fn with_state_rehydrates_without_pending_history() {
        let root = AggregateRoot::with_state("c1", Counter { count: 5 });
        assert_eq!(root.state().count, 5);
        assert!(root.to_pending().is_empty());
    }
}
