//! Dependency-free in-memory implementation of the three storage contracts.
//!
//! Used for tests and for demonstrating the facade without a database; not a
//! replacement for [`super::postgres`] in production.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Direction, EventsProvider, ReadOptions, RelationOp, RelationOpKind, RelationsProvider, Snapshot, SnapshotsProvider};
use crate::error::ProviderError;
use crate::event::EventRecord;

/// In-memory [`EventsProvider`], ordered by insertion (which, by construction, is
/// `created` order for locally-originated records).
#[derive(Clone, Default)]
pub struct MemoryEventsProvider {
    records: Arc<RwLock<Vec<EventRecord>>>,
}

impl MemoryEventsProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ordered(mut records: Vec<EventRecord>, options: &ReadOptions) -> Vec<EventRecord> {
    records.sort_by(|a, b| a.created.cmp(&b.created));
    if options.direction == Direction::Descending {
        records.reverse();
    }
    if let Some(limit) = options.limit {
        records.truncate(limit);
    }
    records
}

#[async_trait]
impl EventsProvider for MemoryEventsProvider {
    async fn insert(&self, record: EventRecord) -> Result<(), ProviderError> {
        debug!(id = %record.id, stream = %record.stream, "memory events: insert");
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(ProviderError::Custom(format!("duplicate event id `{}`", record.id)));
        }
        records.push(record);
        Ok(())
    }

    async fn insert_many(&self, new_records: Vec<EventRecord>) -> Result<(), ProviderError> {
        debug!(count = new_records.len(), "memory events: insert_many");
        let mut records = self.records.write().await;
        let mut seen: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        for record in &new_records {
            if seen.contains(record.id.as_str()) {
                return Err(ProviderError::Custom(format!("duplicate event id `{}`", record.id)));
            }
            seen.insert(record.id.as_str());
        }
        records.extend(new_records);
        Ok(())
    }

    async fn get(&self, options: &ReadOptions) -> Result<Vec<EventRecord>, ProviderError> {
        debug!("memory events: get");
        let records = self.records.read().await;
        Ok(ordered(records.iter().filter(|r| options.matches(r)).cloned().collect(), options))
    }

    async fn get_by_stream(&self, stream: &str, options: &ReadOptions) -> Result<Vec<EventRecord>, ProviderError> {
        debug!(stream, "memory events: get_by_stream");
        let records = self.records.read().await;
        Ok(ordered(
            records
                .iter()
                .filter(|r| r.stream == stream && options.matches(r))
                .cloned()
                .collect(),
            options,
        ))
    }

    async fn get_by_streams(&self, streams: &[String], options: &ReadOptions) -> Result<Vec<EventRecord>, ProviderError> {
        debug!(streams = ?streams, "memory events: get_by_streams");
        let records = self.records.read().await;
        Ok(ordered(
            records
                .iter()
                .filter(|r| streams.iter().any(|s| s == &r.stream) && options.matches(r))
                .cloned()
                .collect(),
            options,
        ))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<EventRecord>, ProviderError> {
        debug!(id, "memory events: get_by_id");
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn check_outdated(&self, record: &EventRecord) -> Result<bool, ProviderError> {
        debug!(id = %record.id, stream = %record.stream, "memory events: check_outdated");
        let records = self.records.read().await;
        Ok(records
            .iter()
            .any(|r| r.stream == record.stream && r.event_type == record.event_type && r.created > record.created))
    }
}

/// In-memory [`RelationsProvider`].
#[derive(Clone, Default)]
pub struct MemoryRelationsProvider {
    pairs: Arc<RwLock<Vec<(String, String)>>>,
}

impl MemoryRelationsProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RelationsProvider for MemoryRelationsProvider {
    async fn apply(&self, ops: Vec<RelationOp>) -> Result<(), ProviderError> {
        debug!(count = ops.len(), "memory relations: apply");
        let (inserts, removes): (Vec<_>, Vec<_>) = ops.into_iter().partition(|op| op.kind == RelationOpKind::Insert);
        let inserts = inserts.into_iter().map(|op| (op.key, op.stream)).collect();
        let removes = removes.into_iter().map(|op| (op.key, op.stream)).collect();
        let (a, b) = tokio::join!(self.insert_many(inserts), self.remove_many(removes));
        a?;
        b?;
        Ok(())
    }

    async fn insert(&self, key: &str, stream: &str) -> Result<(), ProviderError> {
        debug!(key, stream, "memory relations: insert");
        self.insert_many(vec![(key.to_string(), stream.to_string())]).await
    }

    async fn remove(&self, key: &str, stream: &str) -> Result<(), ProviderError> {
        debug!(key, stream, "memory relations: remove");
        self.remove_many(vec![(key.to_string(), stream.to_string())]).await
    }

    async fn insert_many(&self, new_pairs: Vec<(String, String)>) -> Result<(), ProviderError> {
        let mut pairs = self.pairs.write().await;
        for pair in new_pairs {
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
        Ok(())
    }

    async fn remove_many(&self, removed: Vec<(String, String)>) -> Result<(), ProviderError> {
        let mut pairs = self.pairs.write().await;
        pairs.retain(|pair| !removed.contains(pair));
        Ok(())
    }

    async fn get_by_key(&self, key: &str) -> Result<Vec<String>, ProviderError> {
        debug!(key, "memory relations: get_by_key");
        let pairs = self.pairs.read().await;
        let mut streams: Vec<String> = pairs.iter().filter(|(k, _)| k == key).map(|(_, s)| s.clone()).collect();
        streams.dedup();
        Ok(streams)
    }

    async fn get_by_keys(&self, keys: &[String]) -> Result<Vec<String>, ProviderError> {
        debug!(keys = ?keys, "memory relations: get_by_keys");
        let pairs = self.pairs.read().await;
        let mut streams: Vec<String> = Vec::new();
        for (k, s) in pairs.iter() {
            if keys.iter().any(|key| key == k) && !streams.contains(s) {
                streams.push(s.clone());
            }
        }
        Ok(streams)
    }

    async fn remove_by_keys(&self, keys: &[String]) -> Result<(), ProviderError> {
        let mut pairs = self.pairs.write().await;
        pairs.retain(|(k, _)| !keys.iter().any(|key| key == k));
        Ok(())
    }

    async fn remove_by_streams(&self, streams: &[String]) -> Result<(), ProviderError> {
        let mut pairs = self.pairs.write().await;
        pairs.retain(|(_, s)| !streams.iter().any(|stream| stream == s));
        Ok(())
    }
}

/// In-memory [`SnapshotsProvider`].
#[derive(Clone, Default)]
pub struct MemorySnapshotsProvider {
    rows: Arc<RwLock<Vec<Snapshot>>>,
}

impl MemorySnapshotsProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotsProvider for MemorySnapshotsProvider {
    async fn insert(&self, name: &str, stream: &str, cursor: &str, state: Value) -> Result<(), ProviderError> {
        debug!(name, stream, cursor, "memory snapshots: insert");
        self.rows.write().await.push(Snapshot {
            name: name.to_string(),
            stream: stream.to_string(),
            cursor: cursor.to_string(),
            state,
        });
        Ok(())
    }

    async fn get_by_stream(&self, name: &str, stream: &str) -> Result<Option<Snapshot>, ProviderError> {
        debug!(name, stream, "memory snapshots: get_by_stream");
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|row| row.name == name && row.stream == stream)
            .max_by(|a, b| a.cursor.cmp(&b.cursor))
            .cloned())
    }

    async fn remove(&self, name: &str, stream: &str) -> Result<(), ProviderError> {
        debug!(name, stream, "memory snapshots: remove");
        self.rows.write().await.retain(|row| !(row.name == name && row.stream == stream));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PartialEvent;

    fn event(stream: &str, event_type: &str) -> EventRecord {
        EventRecord::from_partial(PartialEvent::new(event_type).with_stream(stream))
    }

    #[tokio::test]
    async fn insert_many_is_all_or_nothing() {
        let provider = MemoryEventsProvider::new();
        let a = event("s1", "t");
        let dup = a.clone();
        let err = provider.insert_many(vec![a, dup]).await.unwrap_err();
        assert!(matches!(err, ProviderError::Custom(_)));
        assert!(provider.get(&ReadOptions::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn check_outdated_is_strict() {
        let provider = MemoryEventsProvider::new();
        let first = event("s1", "t");
        let mut second = event("s1", "t");
        second.created = format!("{}9", first.created);
        provider.insert(first.clone()).await.unwrap();
        provider.insert(second).await.unwrap();
        assert!(provider.check_outdated(&first).await.unwrap());
    }

    #[tokio::test]
    async fn relations_fan_in_distinct_streams() {
        let provider = MemoryRelationsProvider::new();
        provider
            .apply(vec![
                RelationOp::insert("user:a:posts", "p1"),
                RelationOp::insert("user:a:posts", "p2"),
                RelationOp::insert("user:a:posts", "p1"),
            ])
            .await
            .unwrap();
        let mut streams = provider.get_by_keys(&["user:a:posts".to_string()]).await.unwrap();
        streams.sort();
        assert_eq!(streams, vec!["p1".to_string(), "p2".to_string()]);
    }

    #[tokio::test]
    async fn snapshots_reader_picks_latest() {
        let provider = MemorySnapshotsProvider::new();
        provider.insert("user", "u1", "1", Value::Null).await.unwrap();
        provider.insert("user", "u1", "2", Value::Null).await.unwrap();
        let snapshot = provider.get_by_stream("user", "u1").await.unwrap().unwrap();
        assert_eq!(snapshot.cursor, "2");
    }
}
