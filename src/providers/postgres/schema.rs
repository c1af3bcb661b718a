//! Table and index creation for a given schema namespace.

use sqlx::postgres::PgQueryResult;
use sqlx::{Pool, Postgres};

/// Creates the namespace's three tables and their indexes if they don't already exist.
/// Idempotent; safe to call on every store startup.
pub async fn run(pool: &Pool<Postgres>, namespace: &str) -> Result<(), sqlx::Error> {
    let _: PgQueryResult = sqlx::query(&create_events_table(namespace)).execute(pool).await?;
    let _: PgQueryResult = sqlx::query(&create_events_stream_index(namespace)).execute(pool).await?;
    let _: PgQueryResult = sqlx::query(&create_events_outdated_index(namespace)).execute(pool).await?;

    let _: PgQueryResult = sqlx::query(&create_relations_table(namespace)).execute(pool).await?;
    let _: PgQueryResult = sqlx::query(&create_relations_stream_index(namespace)).execute(pool).await?;

    let _: PgQueryResult = sqlx::query(&create_snapshots_table(namespace)).execute(pool).await?;
    let _: PgQueryResult = sqlx::query(&create_snapshots_lookup_index(namespace)).execute(pool).await?;

    Ok(())
}

pub(super) fn events_table(namespace: &str) -> String {
    format!("{namespace}_events")
}

pub(super) fn relations_table(namespace: &str) -> String {
    format!("{namespace}_relations")
}

pub(super) fn snapshots_table(namespace: &str) -> String {
    format!("{namespace}_snapshots")
}

fn create_events_table(namespace: &str) -> String {
    let table = events_table(namespace);
    format!(
        "CREATE TABLE IF NOT EXISTS {table}
        (
          id TEXT NOT NULL,
          stream TEXT NOT NULL,
          event_type TEXT NOT NULL,
          data JSONB NOT NULL,
          meta JSONB NOT NULL,
          created TEXT NOT NULL,
          recorded TEXT NOT NULL,
          CONSTRAINT {table}_pkey PRIMARY KEY (id)
        )"
    )
}

fn create_events_stream_index(namespace: &str) -> String {
    let table = events_table(namespace);
    format!("CREATE INDEX IF NOT EXISTS {table}_stream ON {table} USING btree (stream, created)")
}

fn create_events_outdated_index(namespace: &str) -> String {
    let table = events_table(namespace);
    format!("CREATE INDEX IF NOT EXISTS {table}_outdated ON {table} USING btree (stream, event_type, created)")
}

fn create_relations_table(namespace: &str) -> String {
    let table = relations_table(namespace);
    format!(
        "CREATE TABLE IF NOT EXISTS {table}
        (
          id TEXT NOT NULL,
          key TEXT NOT NULL,
          stream TEXT NOT NULL,
          CONSTRAINT {table}_pkey PRIMARY KEY (id),
          CONSTRAINT {table}_key_stream_key UNIQUE (key, stream)
        )"
    )
}

fn create_relations_stream_index(namespace: &str) -> String {
    let table = relations_table(namespace);
    format!("CREATE INDEX IF NOT EXISTS {table}_stream ON {table} USING btree (stream)")
}

fn create_snapshots_table(namespace: &str) -> String {
    let table = snapshots_table(namespace);
    format!(
        "CREATE TABLE IF NOT EXISTS {table}
        (
          id TEXT NOT NULL,
          name TEXT NOT NULL,
          stream TEXT NOT NULL,
          cursor TEXT NOT NULL,
          state JSONB NOT NULL,
          CONSTRAINT {table}_pkey PRIMARY KEY (id)
        )"
    )
}

fn create_snapshots_lookup_index(namespace: &str) -> String {
    let table = snapshots_table(namespace);
    format!("CREATE INDEX IF NOT EXISTS {table}_lookup ON {table} USING btree (name, stream, cursor DESC)")
}
