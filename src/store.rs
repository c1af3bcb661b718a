//! The Event Store facade: the orchestration seam tying validators, storage providers
//! and hooks together.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::aggregate::{Aggregate, AggregateRoot};
use crate::error::{ProviderError, StoreError};
use crate::event::{EventRecord, EventStatus, PartialEvent};
use crate::projector::{DeliveryStatus, Projector};
use crate::providers::{EventsProvider, ReadOptions, RelationsProvider, Snapshot, SnapshotsProvider};
use crate::reducer::{Reducer, SnapshotMode};
use crate::validator::ValidatorRegistry;

/// Either a stream id or a relational key. Opaque to the snapshots provider — the same
/// `(name, target)` row space is shared by both kinds of fold target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOrRelation {
    Stream(String),
    Relation(String),
}

impl StreamOrRelation {
    pub fn stream(id: impl Into<String>) -> Self {
        Self::Stream(id.into())
    }

    pub fn relation(key: impl Into<String>) -> Self {
        Self::Relation(key.into())
    }

    fn as_str(&self) -> &str {
        match self {
            Self::Stream(s) | Self::Relation(s) => s,
        }
    }
}

/// Per-insert options threaded through to the post-insert hook.
#[derive(Debug, Clone)]
pub struct InsertSettings {
    /// Set to `false` to skip the post-insert hook for this call.
    pub emit: bool,
    /// Opaque, caller-chosen label forwarded to batch subscriptions.
    pub batch: Option<String>,
}

impl Default for InsertSettings {
    fn default() -> Self {
        Self { emit: true, batch: None }
    }
}

impl InsertSettings {
    pub fn without_emit(mut self) -> Self {
        self.emit = false;
        self
    }

    pub fn with_batch(mut self, batch: impl Into<String>) -> Self {
        self.batch = Some(batch.into());
        self
    }
}

/// A `(name, stream-or-relation, type-filter, snapshot-mode)` tuple identifying a fold.
#[derive(Debug, Clone)]
pub struct ReduceQuery {
    pub name: String,
    pub target: StreamOrRelation,
    pub types: Option<Vec<String>>,
    pub mode: SnapshotMode,
}

impl ReduceQuery {
    pub fn new(name: impl Into<String>, target: StreamOrRelation) -> Self {
        Self {
            name: name.into(),
            target,
            types: None,
            mode: SnapshotMode::Manual,
        }
    }

    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = Some(types);
        self
    }

    pub fn with_mode(mut self, mode: SnapshotMode) -> Self {
        self.mode = mode;
        self
    }
}

/// The post-insert extension point. `on_events_inserted` is the seam projection dispatch
/// hooks into; a failure there is recovered locally (never surfaced to the caller of
/// `push_event`) and routed through `on_error`.
#[async_trait]
pub trait Hooks: Send + Sync {
    async fn on_events_inserted(&self, records: &[EventRecord], statuses: &[DeliveryStatus], settings: &InsertSettings);

    async fn on_error(&self, error: crate::error::DynError) {
        tracing::warn!(error = %error, "event store hook failed");
    }
}

/// The default hook: forwards every inserted record to a [`Projector`], and additionally
/// to its batch subscriptions when `settings.batch` names a key.
pub struct ProjectorHooks {
    projector: Projector,
}

impl ProjectorHooks {
    pub fn new(projector: Projector) -> Self {
        Self { projector }
    }
}

#[async_trait]
impl Hooks for ProjectorHooks {
    async fn on_events_inserted(&self, records: &[EventRecord], statuses: &[DeliveryStatus], settings: &InsertSettings) {
        for (record, status) in records.iter().zip(statuses.iter()) {
            if let Err(errors) = self.projector.push(record.clone(), *status).await {
                for error in errors {
                    self.on_error(error).await;
                }
            }
        }

        if let Some(batch_key) = &settings.batch {
            if let Err(errors) = self.projector.push_many(batch_key, records).await {
                for error in errors {
                    self.on_error(error).await;
                }
            }
        }
    }
}

struct Inner<Ev, Rel, Snap> {
    events: Ev,
    relations: Rel,
    snapshots: Snap,
    validators: ValidatorRegistry,
    hooks: Option<Arc<dyn Hooks>>,
}

/// Ties storage providers, the validator registry and hooks together. Cheaply [`Clone`].
pub struct EventStore<Ev, Rel, Snap> {
    inner: Arc<Inner<Ev, Rel, Snap>>,
}

impl<Ev, Rel, Snap> Clone for EventStore<Ev, Rel, Snap> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

/// Builds an [`EventStore`] from its three providers, a validator registry, and optional hooks.
pub struct EventStoreBuilder<Ev, Rel, Snap> {
    events: Ev,
    relations: Rel,
    snapshots: Snap,
    validators: ValidatorRegistry,
    hooks: Option<Arc<dyn Hooks>>,
}

impl<Ev, Rel, Snap> EventStoreBuilder<Ev, Rel, Snap>
where
    Ev: EventsProvider,
    Rel: RelationsProvider,
    Snap: SnapshotsProvider,
{
    pub fn new(events: Ev, relations: Rel, snapshots: Snap) -> Self {
        Self {
            events,
            relations,
            snapshots,
            validators: ValidatorRegistry::new(),
            hooks: None,
        }
    }

    pub fn with_validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = validators;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Convenience over [`EventStoreBuilder::with_hooks`]: wraps `projector` in the
    /// default [`ProjectorHooks`] forwarding hook.
    pub fn with_projector(self, projector: Projector) -> Self {
        self.with_hooks(Arc::new(ProjectorHooks::new(projector)))
    }

    pub fn build(self) -> EventStore<Ev, Rel, Snap> {
        EventStore {
            inner: Arc::new(Inner {
                events: self.events,
                relations: self.relations,
                snapshots: self.snapshots,
                validators: self.validators,
                hooks: self.hooks,
            }),
        }
    }
}

impl<Ev, Rel, Snap> EventStore<Ev, Rel, Snap>
where
    Ev: EventsProvider,
    Rel: RelationsProvider,
    Snap: SnapshotsProvider,
{
    /// `t` is a member of the registered event-type set.
    pub fn has_event_type(&self, event_type: &str) -> bool {
        self.inner.validators.has_event_type(event_type)
    }

    /// Stamps a brand-new record. Pure — no I/O, no side effects.
    pub fn make_event(&self, partial: PartialEvent) -> EventRecord {
        EventRecord::from_partial(partial)
    }

    pub async fn add_event(&self, partial: PartialEvent, settings: InsertSettings) -> Result<EventRecord, StoreError> {
        self.push_event(self.make_event(partial), settings).await
    }

    pub async fn add_many_events(&self, partials: Vec<PartialEvent>, settings: InsertSettings) -> Result<Vec<EventRecord>, StoreError> {
        let records = partials.into_iter().map(|partial| self.make_event(partial)).collect();
        self.push_many_events(records, settings).await
    }

    /// Validates type registration, validates `data`+`meta` schemas, inserts via the
    /// provider, then runs the post-insert hook.
    pub async fn push_event(&self, record: EventRecord, settings: InsertSettings) -> Result<EventRecord, StoreError> {
        self.validate_record(&record)?;

        self.inner
            .events
            .insert(record.clone())
            .await
            .map_err(StoreError::InsertionFailure)?;

        tracing::info!(id = %record.id, stream = %record.stream, event_type = %record.event_type, "event pushed");

        if settings.emit {
            self.emit(std::slice::from_ref(&record), &settings).await;
        }

        Ok(record)
    }

    /// Validates every record first; only then hands the whole slice to the provider's
    /// transactional batch insert. The post-insert hook observes the full slice once, in order.
    pub async fn push_many_events(&self, records: Vec<EventRecord>, settings: InsertSettings) -> Result<Vec<EventRecord>, StoreError> {
        for record in &records {
            self.validate_record(record)?;
        }

        self.inner
            .events
            .insert_many(records.clone())
            .await
            .map_err(StoreError::InsertionFailure)?;

        tracing::info!(count = records.len(), "event batch pushed");

        if settings.emit {
            self.emit(&records, &settings).await;
        }

        Ok(records)
    }

    /// Drains `aggregate`'s pending buffer, pushes it, then flushes the aggregate on success.
    pub async fn push_aggregate<A>(&self, aggregate: &mut AggregateRoot<A>, settings: InsertSettings) -> Result<Vec<EventRecord>, StoreError>
    where
        A: Aggregate,
    {
        let pending = aggregate.to_pending().to_vec();
        let inserted = self.push_many_events(pending, settings).await?;
        aggregate.flush();
        Ok(inserted)
    }

    /// Gathers pending events from every aggregate, in list order, and inserts them in one
    /// transaction — the atomic multi-aggregate commit primitive.
    pub async fn push_many_aggregates<A>(&self, aggregates: &mut [AggregateRoot<A>], settings: InsertSettings) -> Result<Vec<EventRecord>, StoreError>
    where
        A: Aggregate,
    {
        let mut pending = Vec::new();
        for aggregate in aggregates.iter() {
            pending.extend(aggregate.to_pending().iter().cloned());
        }

        let inserted = self.push_many_events(pending, settings).await?;

        for aggregate in aggregates.iter_mut() {
            aggregate.flush();
        }

        Ok(inserted)
    }

    /// `exists` is a lookup by id; `outdated` compares against other records of the same
    /// `(stream, type)`.
    pub async fn get_event_status(&self, record: &EventRecord) -> Result<EventStatus, StoreError> {
        let exists = self
            .inner
            .events
            .get_by_id(&record.id)
            .await
            .map_err(StoreError::ProviderFailure)?
            .is_some();
        let outdated = self.inner.events.check_outdated(record).await.map_err(StoreError::ProviderFailure)?;
        Ok(EventStatus { exists, outdated })
    }

    pub async fn get_events(&self, options: &ReadOptions) -> Result<Vec<EventRecord>, StoreError> {
        self.inner.events.get(options).await.map_err(StoreError::ProviderFailure)
    }

    pub async fn get_events_by_streams(&self, streams: &[String], options: &ReadOptions) -> Result<Vec<EventRecord>, StoreError> {
        self.inner
            .events
            .get_by_streams(streams, options)
            .await
            .map_err(StoreError::ProviderFailure)
    }

    /// Resolves `keys` to stream ids first; returns empty when none resolve.
    pub async fn get_events_by_relations(&self, keys: &[String], options: &ReadOptions) -> Result<Vec<EventRecord>, StoreError> {
        let streams = self.inner.relations.get_by_keys(keys).await.map_err(StoreError::ProviderFailure)?;
        if streams.is_empty() {
            return Ok(Vec::new());
        }
        self.inner
            .events
            .get_by_streams(&streams, options)
            .await
            .map_err(StoreError::ProviderFailure)
    }

    /// Re-delivers a stream's history through the hook with `hydrated = true`, leaving
    /// `created` untouched and advancing `recorded`.
    pub async fn replay_stream(&self, stream: &str) -> Result<(), StoreError> {
        let records = self
            .inner
            .events
            .get_by_stream(stream, &ReadOptions::default())
            .await
            .map_err(StoreError::ProviderFailure)?;
        let hydrated: Vec<EventRecord> = records.into_iter().map(EventRecord::hydrate).collect();
        self.emit(&hydrated, &InsertSettings::default()).await;
        Ok(())
    }

    /// Builds a reducer from a fold function and an initial-state factory.
    pub fn make_reducer<S>(
        &self,
        initial: impl Fn() -> S + Send + Sync + 'static,
        fold: impl Fn(S, &EventRecord) -> S + Send + Sync + 'static,
    ) -> Reducer<S>
    where
        S: Serialize + DeserializeOwned + Clone + Send + Sync,
    {
        Reducer::new(initial, fold)
    }

    /// See [`crate::store::EventStore::reduce`] for the 5-step algorithm.
    pub async fn reduce<S>(&self, query: &ReduceQuery, reducer: &Reducer<S>, pending: &[EventRecord]) -> Result<Option<S>, StoreError>
    where
        S: Serialize + DeserializeOwned + Clone + Send + Sync,
    {
        let snapshot = self
            .inner
            .snapshots
            .get_by_stream(&query.name, query.target.as_str())
            .await
            .map_err(StoreError::ProviderFailure)?;

        let mut options = ReadOptions::default();
        if let Some(types) = &query.types {
            options = options.with_types(types.clone());
        }
        if let Some(snapshot) = &snapshot {
            options = options.with_cursor(snapshot.cursor.clone());
        }

        let events = self.fetch_target_events(&query.target, &options).await?;

        if events.is_empty() && pending.is_empty() {
            return match &snapshot {
                Some(snapshot) => Ok(Some(reducer.from(&snapshot.state).map_err(json_error)?)),
                None => Ok(None),
            };
        }

        let mut combined = events;
        combined.extend_from_slice(pending);

        let state = reducer
            .reduce(&combined, snapshot.as_ref().map(|s| &s.state))
            .map_err(json_error)?;

        if query.mode == SnapshotMode::Auto {
            if let Some(last) = combined.last() {
                self.persist_snapshot(&query.name, &query.target, &last.created, &state).await?;
            }
        }

        Ok(Some(state))
    }

    /// Explicit snapshot creation; a no-op on an empty event set.
    pub async fn create_snapshot<S>(&self, query: &ReduceQuery, reducer: &Reducer<S>) -> Result<Option<S>, StoreError>
    where
        S: Serialize + DeserializeOwned + Clone + Send + Sync,
    {
        let mut options = ReadOptions::default();
        if let Some(types) = &query.types {
            options = options.with_types(types.clone());
        }

        let events = self.fetch_target_events(&query.target, &options).await?;
        if events.is_empty() {
            return Ok(None);
        }

        let state = reducer.reduce(&events, None).map_err(json_error)?;
        let cursor = events.last().expect("checked non-empty above").created.clone();
        self.persist_snapshot(&query.name, &query.target, &cursor, &state).await?;

        Ok(Some(state))
    }

    pub async fn get_snapshot(&self, name: &str, target: &StreamOrRelation) -> Result<Option<Snapshot>, StoreError> {
        self.inner
            .snapshots
            .get_by_stream(name, target.as_str())
            .await
            .map_err(StoreError::ProviderFailure)
    }

    pub async fn delete_snapshot(&self, name: &str, target: &StreamOrRelation) -> Result<(), StoreError> {
        self.inner.snapshots.remove(name, target.as_str()).await.map_err(StoreError::ProviderFailure)
    }

    fn validate_record(&self, record: &EventRecord) -> Result<(), StoreError> {
        if !self.inner.validators.has_event_type(&record.event_type) {
            return Err(StoreError::UnknownEventType(record.event_type.clone()));
        }
        self.inner
            .validators
            .validate(&record.event_type, &record.data, &record.meta)
            .map_err(StoreError::ValidationFailure)
    }

    async fn emit(&self, records: &[EventRecord], settings: &InsertSettings) {
        let Some(hooks) = &self.inner.hooks else {
            return;
        };

        let mut statuses = Vec::with_capacity(records.len());
        for record in records {
            let outdated = self.inner.events.check_outdated(record).await.unwrap_or(false);
            statuses.push(DeliveryStatus { hydrated: record.is_hydrated(), outdated });
        }

        hooks.on_events_inserted(records, &statuses, settings).await;
    }

    async fn fetch_target_events(&self, target: &StreamOrRelation, options: &ReadOptions) -> Result<Vec<EventRecord>, StoreError> {
        match target {
            StreamOrRelation::Stream(id) => self.inner.events.get_by_stream(id, options).await.map_err(StoreError::ProviderFailure),
            StreamOrRelation::Relation(key) => {
                let streams = self
                    .inner
                    .relations
                    .get_by_keys(std::slice::from_ref(key))
                    .await
                    .map_err(StoreError::ProviderFailure)?;
                if streams.is_empty() {
                    return Ok(Vec::new());
                }
                self.inner
                    .events
                    .get_by_streams(&streams, options)
                    .await
                    .map_err(StoreError::ProviderFailure)
            }
        }
    }

    async fn persist_snapshot<S>(&self, name: &str, target: &StreamOrRelation, cursor: &str, state: &S) -> Result<(), StoreError>
    where
        S: Serialize,
    {
        let state = serde_json::to_value(state).map_err(json_error)?;
        self.inner
            .snapshots
            .insert(name, target.as_str(), cursor, state)
            .await
            .map_err(StoreError::ProviderFailure)
    }
}

fn json_error(error: serde_json::Error) -> StoreError {
    StoreError::ProviderFailure(ProviderError::Json(error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory::{MemoryEventsProvider, MemoryRelationsProvider, MemorySnapshotsProvider};
    use crate::providers::RelationOp;
    use serde::Deserialize;
    use serde_json::{json, Value};

    type TestStore = EventStore<MemoryEventsProvider, MemoryRelationsProvider, MemorySnapshotsProvider>;

    fn store() -> TestStore {
        let mut validators = ValidatorRegistry::new();
        validators.register_type("user:created");
        validators.register_type("user:name_changed");
        validators.register_type("user:email_changed");
        validators.register_type("post:created");
        validators.register_type("post:removed");
        validators
            .register_data_schema(
                "user:created",
                &json!({"type": "object", "required": ["name", "email"]}),
            )
            .unwrap();

        EventStoreBuilder::new(MemoryEventsProvider::new(), MemoryRelationsProvider::new(), MemorySnapshotsProvider::new())
            .with_validators(validators)
            .build()
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
    struct UserState {
        name: Value,
        email: Value,
    }

    fn user_reducer() -> Reducer<UserState> {
        Reducer::new(UserState::default, |mut state, record| {
            match record.event_type.as_str() {
                "user:created" => {
                    state.name = record.data["name"].clone();
                    state.email = record.data["email"].clone();
                }
                "user:name_changed" => state.name = record.data["name"].clone(),
                "user:email_changed" => state.email = record.data["email"].clone(),
                _ => {}
            }
            state
        })
    }

    #[tokio::test]
    async fn scenario_append_and_read() {
        let store = store();
        store
            .add_event(
                PartialEvent::new("user:created")
                    .with_stream("u1")
                    .with_data(json!({"name": {"given": "Jane", "family": "Doe"}, "email": "jane@x"})),
                InsertSettings::default(),
            )
            .await
            .unwrap();

        let events = store.get_events_by_streams(&["u1".to_string()], &ReadOptions::default()).await.unwrap();
        assert_eq!(events.len(), 1);

        let state = store
            .reduce(&ReduceQuery::new("user", StreamOrRelation::stream("u1")), &user_reducer(), &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.email, json!("jane@x"));
        assert_eq!(state.name, json!({"given": "Jane", "family": "Doe"}));
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
    struct UserAggregate {
        name: Value,
        email: Value,
    }

    impl Aggregate for UserAggregate {
        const NAME: &'static str = "user";

        fn with(&mut self, record: &EventRecord) {
            match record.event_type.as_str() {
                "user:created" => {
                    self.name = record.data["name"].clone();
                    self.email = record.data["email"].clone();
                }
                "user:name_changed" => self.name = record.data["name"].clone(),
                "user:email_changed" => self.email = record.data["email"].clone(),
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn scenario_mutate_via_aggregate() {
        let store = store();
        let mut aggregate = AggregateRoot::<UserAggregate>::new("u1");
        aggregate.push(
            PartialEvent::new("user:created").with_data(json!({"name": {"given": "Jane"}, "email": "jane@x"})),
        );
        aggregate.push(PartialEvent::new("user:name_changed").with_data(json!({"name": {"given": "John"}})));
        aggregate.push(PartialEvent::new("user:email_changed").with_data(json!({"email": "john@x"})));

        store.push_aggregate(&mut aggregate, InsertSettings::default()).await.unwrap();

        let events = store.get_events_by_streams(&["u1".to_string()], &ReadOptions::default()).await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(aggregate.state().email, json!("john@x"));
    }

    #[tokio::test]
    async fn scenario_batch_rollback_on_validation_failure() {
        let store = store();
        let records = vec![
            EventRecord::from_partial(
                PartialEvent::new("user:created")
                    .with_stream("u3")
                    .with_data(json!({"name": "a", "email": "a@x"})),
            ),
            EventRecord::from_partial(
                PartialEvent::new("user:created")
                    .with_stream("u3")
                    .with_data(json!({"name": "b"})), // missing required `email`
            ),
            EventRecord::from_partial(
                PartialEvent::new("user:created")
                    .with_stream("u3")
                    .with_data(json!({"name": "c", "email": "c@x"})),
            ),
        ];

        let err = store.push_many_events(records, InsertSettings::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::ValidationFailure(_)));

        let events = store.get_events_by_streams(&["u3".to_string()], &ReadOptions::default()).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn scenario_snapshot_skip() {
        let store = store();
        let reducer = user_reducer();
        let query = ReduceQuery::new("user", StreamOrRelation::stream("u2"));

        store
            .add_event(
                PartialEvent::new("user:created").with_stream("u2").with_data(json!({"name": "a", "email": "a@x"})),
                InsertSettings::default(),
            )
            .await
            .unwrap();
        store
            .add_event(
                PartialEvent::new("user:name_changed").with_stream("u2").with_data(json!({"name": "b"})),
                InsertSettings::default(),
            )
            .await
            .unwrap();

        store.create_snapshot(&query, &reducer).await.unwrap().unwrap();
        let snapshot = store.get_snapshot("user", &StreamOrRelation::stream("u2")).await.unwrap().unwrap();

        store
            .add_event(
                PartialEvent::new("user:email_changed").with_stream("u2").with_data(json!({"email": "c@x"})),
                InsertSettings::default(),
            )
            .await
            .unwrap();

        let remaining = store
            .get_events_by_streams(&["u2".to_string()], &ReadOptions::default().with_cursor(snapshot.cursor.clone()))
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);

        let from_snapshot = store.reduce(&query, &reducer, &[]).await.unwrap().unwrap();
        let from_scratch = reducer
            .reduce(
                &store.get_events_by_streams(&["u2".to_string()], &ReadOptions::default()).await.unwrap(),
                None,
            )
            .unwrap();
        assert_eq!(from_snapshot, from_scratch);
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
    struct PostsState {
        count: i64,
    }

    #[tokio::test]
    async fn scenario_relation_fan_in() {
        let events = MemoryEventsProvider::new();
        let relations = MemoryRelationsProvider::new();
        let snapshots = MemorySnapshotsProvider::new();

        let mut validators = ValidatorRegistry::new();
        validators.register_type("post:created");
        validators.register_type("post:removed");

        let store = EventStoreBuilder::new(events, relations.clone(), snapshots)
            .with_validators(validators)
            .build();

        let p1 = store
            .add_event(PartialEvent::new("post:created").with_stream("p1"), InsertSettings::default())
            .await
            .unwrap();
        let p2 = store
            .add_event(PartialEvent::new("post:created").with_stream("p2"), InsertSettings::default())
            .await
            .unwrap();
        store
            .add_event(PartialEvent::new("post:created").with_stream("p1"), InsertSettings::default())
            .await
            .unwrap();
        store
            .add_event(PartialEvent::new("post:removed").with_stream("p2"), InsertSettings::default())
            .await
            .unwrap();

        relations
            .apply(vec![
                RelationOp::insert("user:a:posts", p1.stream.clone()),
                RelationOp::insert("user:a:posts", p2.stream.clone()),
            ])
            .await
            .unwrap();

        let mut streams = relations.get_by_key("user:a:posts").await.unwrap();
        streams.sort();
        assert_eq!(streams, vec!["p1".to_string(), "p2".to_string()]);

        let posts_reducer: Reducer<PostsState> = Reducer::new(PostsState::default, |mut state, record| {
            match record.event_type.as_str() {
                "post:created" => state.count += 1,
                "post:removed" => state.count -= 1,
                _ => {}
            }
            state
        });

        let state = store
            .reduce(
                &ReduceQuery::new("posts", StreamOrRelation::relation("user:a:posts".to_string())),
                &posts_reducer,
                &[],
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.count, 2);
    }
}
