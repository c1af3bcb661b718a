//! Error taxonomy for the event store facade and its providers.
//!
//! `UnknownEventType` and `ValidationFailure` are surfaced before any I/O has happened.
//! `InsertionFailure` wraps the provider's own error with the original cause chained.
//! Hook and handler failures never appear here — they are recovered locally and routed
//! to a caller-supplied error effect (see [`crate::store::Hooks::on_error`] and
//! [`crate::projector::OnError`]).

use std::fmt;

/// A type-erased error passed to hook/handler error effects, which by design never
/// propagate back through the facade's own `Result`.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Errors the facade can return from `push_event`/`push_many_events`/`reduce` and friends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record's `type` is not in the registered event-type set. Raised before any I/O.
    #[error("unknown event type `{0}`")]
    UnknownEventType(String),

    /// The record's `data` or `meta` did not match its registered schema.
    #[error(transparent)]
    ValidationFailure(#[from] ValidationError),

    /// The storage provider rejected the insert.
    #[error("insertion failed: {0}")]
    InsertionFailure(#[from] ProviderError),

    /// A storage provider failed on a read, reduce or snapshot operation.
    #[error("provider failed: {0}")]
    ProviderFailure(ProviderError),
}

/// Per-field validation failures, collected across both `data` and `meta` before rejecting.
#[derive(Debug, Default)]
pub struct ValidationError {
    pub data_errors: Vec<String>,
    pub meta_errors: Vec<String>,
}

impl ValidationError {
    pub fn is_empty(&self) -> bool {
        self.data_errors.is_empty() && self.meta_errors.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} data error(s), {} meta error(s)",
            self.data_errors.len(),
            self.meta_errors.len()
        )?;
        for e in &self.data_errors {
            write!(f, "\n  data: {e}")?;
        }
        for e in &self.meta_errors {
            write!(f, "\n  meta: {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised by a storage provider (events, relations or snapshots).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Sql(#[from] sqlx::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}
