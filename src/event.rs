//! The persistent unit: an immutable, append-only event record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{id, timestamp};

/// A persisted, immutable fact.
///
/// `created` is assigned once at construction and never modified. `recorded` equals
/// `created` for locally-originated records, and is rewritten to local time when a
/// record is hydrated from an external source (see [`EventRecord::hydrate`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub stream: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub meta: Value,
    pub created: String,
    pub recorded: String,
}

/// The caller-supplied shape handed to [`crate::store::EventStore::make_event`]. Any field
/// left `None` is filled in deterministically.
#[derive(Debug, Clone, Default)]
pub struct PartialEvent {
    pub id: Option<String>,
    pub stream: Option<String>,
    pub event_type: String,
    pub data: Option<Value>,
    pub meta: Option<Value>,
}

impl PartialEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            ..Default::default()
        }
    }

    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = Some(stream.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl EventRecord {
    /// Stamps a brand-new record from a [`PartialEvent`]: id, stream (generated if absent),
    /// `created == recorded == now()`, empty data/meta if omitted. Pure — no I/O.
    pub fn from_partial(partial: PartialEvent) -> Self {
        let now = timestamp::now();

        Self {
            id: partial.id.unwrap_or_else(id::generate),
            stream: partial.stream.unwrap_or_else(id::generate),
            event_type: partial.event_type,
            data: partial.data.unwrap_or(Value::Null),
            meta: partial.meta.unwrap_or(Value::Null),
            created: now.clone(),
            recorded: now,
        }
    }

    /// Marks this record as imported from an external source: `recorded` is rewritten to
    /// local time while `created` is preserved, so `recorded >= created` holds.
    pub fn hydrate(mut self) -> Self {
        self.recorded = timestamp::now();
        self
    }

    /// True when this record was hydrated (its `recorded` cursor differs from `created`).
    pub fn is_hydrated(&self) -> bool {
        self.recorded != self.created
    }
}

/// Result of [`crate::store::EventStore::get_event_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventStatus {
    /// A record with this id is present in the store.
    pub exists: bool,
    /// Another record exists with the same `(stream, type)` and a strictly greater `created`.
    pub outdated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_partial_fills_defaults() {
        let record = EventRecord::from_partial(PartialEvent::new("user:created"));
        assert!(!record.id.is_empty());
        assert!(!record.stream.is_empty());
        assert_eq!(record.data, Value::Null);
        assert_eq!(record.meta, Value::Null);
        assert_eq!(record.created, record.recorded);
        assert!(!record.is_hydrated());
    }

    #[test]
    fn hydrate_preserves_created_and_advances_recorded() {
        let record = EventRecord::from_partial(PartialEvent::new("user:created"));
        let created = record.created.clone();
        let hydrated = record.hydrate();
        assert_eq!(hydrated.created, created);
        assert!(hydrated.recorded >= hydrated.created);
        assert!(hydrated.is_hydrated());
    }
}
