use sqlx::{Pool, Postgres};
use tracing::debug;

use super::schema::snapshots_table;
use crate::error::ProviderError;
use crate::providers::{Snapshot, SnapshotsProvider};

#[derive(sqlx::FromRow)]
struct Row {
    name: String,
    stream: String,
    cursor: String,
    state: serde_json::Value,
}

impl From<Row> for Snapshot {
    fn from(row: Row) -> Self {
        Snapshot {
            name: row.name,
            stream: row.stream,
            cursor: row.cursor,
            state: row.state,
        }
    }
}

/// Postgres-backed [`SnapshotsProvider`], scoped to one schema namespace's snapshots table.
#[derive(Clone)]
pub struct PgSnapshotsProvider {
    pool: Pool<Postgres>,
    table: String,
}

impl PgSnapshotsProvider {
    pub(crate) fn new(pool: Pool<Postgres>, namespace: &str) -> Self {
        Self {
            pool,
            table: snapshots_table(namespace),
        }
    }
}

#[async_trait::async_trait]
impl SnapshotsProvider for PgSnapshotsProvider {
    async fn insert(&self, name: &str, stream: &str, cursor: &str, state: serde_json::Value) -> Result<(), ProviderError> {
        debug!(name, stream, cursor, table = %self.table, "postgres snapshots: insert");
        sqlx::query(&format!(
            "INSERT INTO {} (id, name, stream, cursor, state) VALUES ($1, $2, $3, $4, $5)",
            self.table
        ))
        .bind(crate::id::generate())
        .bind(name)
        .bind(stream)
        .bind(cursor)
        .bind(state)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_stream(&self, name: &str, stream: &str) -> Result<Option<Snapshot>, ProviderError> {
        debug!(name, stream, table = %self.table, "postgres snapshots: get_by_stream");
        let row: Option<Row> = sqlx::query_as(&format!(
            "SELECT * FROM {} WHERE name = $1 AND stream = $2 ORDER BY cursor DESC LIMIT 1",
            self.table
        ))
        .bind(name)
        .bind(stream)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Snapshot::from))
    }

    async fn remove(&self, name: &str, stream: &str) -> Result<(), ProviderError> {
        debug!(name, stream, table = %self.table, "postgres snapshots: remove");
        sqlx::query(&format!("DELETE FROM {} WHERE name = $1 AND stream = $2", self.table))
            .bind(name)
            .bind(stream)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
