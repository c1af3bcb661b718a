//! An event-sourced storage engine: append-only events, relational many-to-many
//! relations, snapshot-accelerated reducers and aggregates, and an ordered projector.
//!
//! [`store::EventStore`] is the facade most callers reach for first. It is generic over
//! the three storage contracts in [`providers`] — implement them yourselves, or use the
//! dependency-free [`providers::memory`] backend or the [`providers::postgres`] backend
//! (behind the `postgres` feature, enabled by default).

pub mod aggregate;
pub mod error;
pub mod event;
pub mod id;
pub mod projector;
pub mod providers;
pub mod reducer;
pub mod store;
pub mod timestamp;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{DynError, ProviderError, StoreError, ValidationError};
pub use event::{EventRecord, EventStatus, PartialEvent};
pub use projector::{DeliveryStatus, Projector};
pub use reducer::{Reducer, SnapshotMode};
pub use store::{EventStore, EventStoreBuilder, InsertSettings, ReduceQuery, StreamOrRelation};
pub use validator::ValidatorRegistry;

mod validator;
