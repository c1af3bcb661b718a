//! Deterministic left-fold over ordered events, with optional snapshot acceleration.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::event::EventRecord;

/// Whether [`crate::store::EventStore::reduce`] persists a snapshot after folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotMode {
    /// Never write a snapshot; the caller calls `create_snapshot` explicitly.
    #[default]
    Manual,
    /// Write a snapshot after every `reduce` that folded at least one event. Chatty —
    /// prefer `Manual` unless the read path is also the natural place to keep the
    /// snapshot warm.
    Auto,
}

type FoldFn<S> = Box<dyn Fn(S, &EventRecord) -> S + Send + Sync>;
type InitialFn<S> = Box<dyn Fn() -> S + Send + Sync>;

/// The pair `(from, reduce)`: `from` rehydrates a snapshot's opaque state, `reduce` folds
/// events (optionally on top of a rehydrated state) into the reducer's typed state `S`.
pub struct Reducer<S> {
    initial: InitialFn<S>,
    fold: FoldFn<S>,
}

impl<S> Reducer<S>
where
    S: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Builds a reducer from a fold function and an initial-state factory.
    pub fn new(initial: impl Fn() -> S + Send + Sync + 'static, fold: impl Fn(S, &EventRecord) -> S + Send + Sync + 'static) -> Self {
        Self {
            initial: Box::new(initial),
            fold: Box::new(fold),
        }
    }

    /// Rehydrates `S` from a snapshot's opaque state blob.
    pub fn from(&self, snapshot_state: &Value) -> Result<S, serde_json::Error> {
        serde_json::from_value(snapshot_state.clone())
    }

    /// Folds `events` in order, starting from `snapshot_state` (rehydrated via
    /// [`Reducer::from`]) when given, or from the reducer's initial state otherwise.
    pub fn reduce(&self, events: &[EventRecord], snapshot_state: Option<&Value>) -> Result<S, serde_json::Error> {
        let seed = match snapshot_state {
            Some(state) => self.from(state)?,
            None => (self.initial)(),
        };
        Ok(events.iter().fold(seed, |state, event| (self.fold)(state, event)))
    }
}
