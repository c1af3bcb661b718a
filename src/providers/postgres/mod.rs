//! Relational storage providers backed by Postgres.
//!
//! Tables are namespaced by a caller-chosen prefix so multiple stores can share a schema
//! without colliding: `{namespace}_events`, `{namespace}_relations`, `{namespace}_snapshots`.

mod events;
mod relations;
mod schema;
mod snapshots;

use sqlx::{Pool, Postgres};

pub use events::PgEventsProvider;
pub use relations::PgRelationsProvider;
pub use snapshots::PgSnapshotsProvider;

/// The three Postgres-backed providers for one schema namespace.
pub struct PgProviders {
    pub events: PgEventsProvider,
    pub relations: PgRelationsProvider,
    pub snapshots: PgSnapshotsProvider,
}

impl PgProviders {
    /// Creates `namespace`'s tables and indexes if they don't exist, then returns its
    /// three providers. Call once per store per startup.
    pub async fn connect(pool: Pool<Postgres>, namespace: &str) -> Result<Self, sqlx::Error> {
        schema::run(&pool, namespace).await?;
        Ok(Self {
            events: PgEventsProvider::new(pool.clone(), namespace),
            relations: PgRelationsProvider::new(pool.clone(), namespace),
            snapshots: PgSnapshotsProvider::new(pool, namespace),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PartialEvent;
    use crate::providers::{EventsProvider, ReadOptions, RelationsProvider, SnapshotsProvider};

    #[sqlx::test]
    async fn setup_creates_tables(pool: Pool<Postgres>) {
        let providers = PgProviders::connect(pool.clone(), "setup_test").await.unwrap();
        let record = crate::event::EventRecord::from_partial(PartialEvent::new("t").with_stream("s1"));
        providers.events.insert(record.clone()).await.unwrap();
        let fetched = providers.events.get_by_id(&record.id).await.unwrap();
        assert_eq!(fetched.unwrap().id, record.id);
    }

    #[sqlx::test]
    async fn insert_many_is_transactional(pool: Pool<Postgres>) {
        let providers = PgProviders::connect(pool, "batch_test").await.unwrap();
        let a = crate::event::EventRecord::from_partial(PartialEvent::new("t").with_stream("s1"));
        let dup = a.clone();
        let err = providers.events.insert_many(vec![a, dup]).await.unwrap_err();
        assert!(matches!(err, crate::error::ProviderError::Sql(_)));
        assert!(providers.events.get(&ReadOptions::default()).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn relations_resolve_distinct_streams(pool: Pool<Postgres>) {
        let providers = PgProviders::connect(pool, "relations_test").await.unwrap();
        providers.relations.insert("user:a:posts", "p1").await.unwrap();
        providers.relations.insert("user:a:posts", "p2").await.unwrap();
        let mut streams = providers.relations.get_by_key("user:a:posts").await.unwrap();
        streams.sort();
        assert_eq!(streams, vec!["p1".to_string(), "p2".to_string()]);
    }

    #[sqlx::test]
    async fn snapshots_pick_latest_cursor(pool: Pool<Postgres>) {
        let providers = PgProviders::connect(pool, "snapshots_test").await.unwrap();
        providers.snapshots.insert("counter", "s1", "1", serde_json::json!({"count": 1})).await.unwrap();
        providers.snapshots.insert("counter", "s1", "2", serde_json::json!({"count": 2})).await.unwrap();
        let snapshot = providers.snapshots.get_by_stream("counter", "s1").await.unwrap().unwrap();
        assert_eq!(snapshot.cursor, "2");
    }

    /// Regression test: `get_by_stream`'s predicate consumes `$1` before `select_clause`
    /// appends its own cursor/type placeholders — they must not also be numbered `$1`.
    #[sqlx::test]
    async fn get_by_stream_combines_cursor_and_type_filters(pool: Pool<Postgres>) {
        let providers = PgProviders::connect(pool, "cursor_and_types_test").await.unwrap();
        let first = crate::event::EventRecord::from_partial(PartialEvent::new("a").with_stream("s1"));
        providers.events.insert(first.clone()).await.unwrap();
        let second = crate::event::EventRecord::from_partial(PartialEvent::new("b").with_stream("s1"));
        providers.events.insert(second.clone()).await.unwrap();
        let third = crate::event::EventRecord::from_partial(PartialEvent::new("a").with_stream("s1"));
        providers.events.insert(third.clone()).await.unwrap();

        let options = ReadOptions::default().with_cursor(first.created.clone()).with_types(vec!["a".to_string()]);
        let events = providers.events.get_by_stream("s1", &options).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, third.id);

        let streams_options = ReadOptions::default().with_cursor(first.created.clone()).with_types(vec!["a".to_string()]);
        let events = providers
            .events
            .get_by_streams(&["s1".to_string()], &streams_options)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, third.id);
    }
}
