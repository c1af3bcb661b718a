//! Pluggable storage contracts: events, relations, snapshots.
//!
//! Two concrete implementations ship with the crate: [`memory`], a dependency-free
//! backend used for tests and demos, and [`postgres`] (behind the `postgres` feature),
//! the relational-database backend described in spec §4.2–§4.4.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;
use crate::event::EventRecord;

/// Default contiguous batch size for transactional batch inserts/removals.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Read direction for ordered event queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Options accepted by every read operation on the events provider.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Restrict results to these event types; `None` means every type.
    pub types: Option<Vec<String>>,
    /// Exclusive lower bound on `created`, compared lexicographically.
    pub cursor: Option<String>,
    pub direction: Direction,
    pub limit: Option<usize>,
}

impl ReadOptions {
    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = Some(types);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn matches(&self, record: &EventRecord) -> bool {
        let type_ok = self
            .types
            .as_ref()
            .map(|types| types.iter().any(|t| t == &record.event_type))
            .unwrap_or(true);
        let cursor_ok = self.cursor.as_ref().map(|c| &record.created > c).unwrap_or(true);
        type_ok && cursor_ok
    }
}

/// Persists and queries append-only event records.
#[async_trait]
pub trait EventsProvider: Send + Sync {
    /// Inserts one record. Fails on primary-key (id) collision.
    async fn insert(&self, record: EventRecord) -> Result<(), ProviderError>;

    /// Inserts every record inside a single transaction; all-or-nothing.
    async fn insert_many(&self, records: Vec<EventRecord>) -> Result<(), ProviderError>;

    /// All events, type-filtered and cursor-bounded, ordered by `created`.
    async fn get(&self, options: &ReadOptions) -> Result<Vec<EventRecord>, ProviderError>;

    /// Same as [`EventsProvider::get`], restricted to one stream.
    async fn get_by_stream(&self, stream: &str, options: &ReadOptions) -> Result<Vec<EventRecord>, ProviderError>;

    /// Same as [`EventsProvider::get`], restricted to a set of streams.
    async fn get_by_streams(&self, streams: &[String], options: &ReadOptions) -> Result<Vec<EventRecord>, ProviderError>;

    /// Zero or one record, by id.
    async fn get_by_id(&self, id: &str) -> Result<Option<EventRecord>, ProviderError>;

    /// True iff another record with the same `(stream, type)` and a strictly greater
    /// `created` exists.
    async fn check_outdated(&self, record: &EventRecord) -> Result<bool, ProviderError>;
}

/// A single insert/remove instruction for [`RelationsProvider::apply`].
#[derive(Debug, Clone)]
pub struct RelationOp {
    pub key: String,
    pub stream: String,
    pub kind: RelationOpKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationOpKind {
    Insert,
    Remove,
}

impl RelationOp {
    pub fn insert(key: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            stream: stream.into(),
            kind: RelationOpKind::Insert,
        }
    }

    pub fn remove(key: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            stream: stream.into(),
            kind: RelationOpKind::Remove,
        }
    }
}

/// Maintains the many-to-many mapping from relational key to stream id.
#[async_trait]
pub trait RelationsProvider: Send + Sync {
    /// Partitions `ops` into inserts and removes and runs both batches concurrently.
    async fn apply(&self, ops: Vec<RelationOp>) -> Result<(), ProviderError>;

    async fn insert(&self, key: &str, stream: &str) -> Result<(), ProviderError>;

    async fn remove(&self, key: &str, stream: &str) -> Result<(), ProviderError>;

    /// Transactional batched insert; duplicate `(key, stream)` pairs are silently skipped.
    async fn insert_many(&self, pairs: Vec<(String, String)>) -> Result<(), ProviderError>;

    /// Transactional batched removal.
    async fn remove_many(&self, pairs: Vec<(String, String)>) -> Result<(), ProviderError>;

    /// Distinct stream ids registered under `key`.
    async fn get_by_key(&self, key: &str) -> Result<Vec<String>, ProviderError>;

    /// Distinct stream ids registered under any of `keys`.
    async fn get_by_keys(&self, keys: &[String]) -> Result<Vec<String>, ProviderError>;

    async fn remove_by_keys(&self, keys: &[String]) -> Result<(), ProviderError>;

    async fn remove_by_streams(&self, streams: &[String]) -> Result<(), ProviderError>;
}

/// A persisted `(name, stream, cursor, state)` row.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub name: String,
    pub stream: String,
    pub cursor: String,
    pub state: Value,
}

/// Persists and fetches the most recent state+cursor per `(reducer-name, stream)`.
#[async_trait]
pub trait SnapshotsProvider: Send + Sync {
    /// Append-only insert.
    async fn insert(&self, name: &str, stream: &str, cursor: &str, state: Value) -> Result<(), ProviderError>;

    /// Zero or one row; when multiple exist, the most recently inserted wins.
    async fn get_by_stream(&self, name: &str, stream: &str) -> Result<Option<Snapshot>, ProviderError>;

    /// Deletes every row for the pair.
    async fn remove(&self, name: &str, stream: &str) -> Result<(), ProviderError>;
}
