use sqlx::{Pool, Postgres};
use tracing::debug;

use super::schema::relations_table;
use crate::error::ProviderError;
use crate::providers::{RelationOp, RelationOpKind, RelationsProvider};

/// Postgres-backed [`RelationsProvider`], scoped to one schema namespace's relations table.
#[derive(Clone)]
pub struct PgRelationsProvider {
    pool: Pool<Postgres>,
    table: String,
}

impl PgRelationsProvider {
    pub(crate) fn new(pool: Pool<Postgres>, namespace: &str) -> Self {
        Self {
            pool,
            table: relations_table(namespace),
        }
    }
}

#[async_trait::async_trait]
impl RelationsProvider for PgRelationsProvider {
    async fn apply(&self, ops: Vec<RelationOp>) -> Result<(), ProviderError> {
        debug!(count = ops.len(), table = %self.table, "postgres relations: apply");
        let (inserts, removes): (Vec<_>, Vec<_>) = ops.into_iter().partition(|op| op.kind == RelationOpKind::Insert);
        let inserts: Vec<(String, String)> = inserts.into_iter().map(|op| (op.key, op.stream)).collect();
        let removes: Vec<(String, String)> = removes.into_iter().map(|op| (op.key, op.stream)).collect();
        let mut transaction = self.pool.begin().await?;
        for (key, stream) in inserts {
            sqlx::query(&format!(
                "INSERT INTO {} (id, key, stream) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
                self.table
            ))
            .bind(crate::id::generate())
            .bind(key)
            .bind(stream)
            .execute(&mut *transaction)
            .await?;
        }
        for (key, stream) in removes {
            sqlx::query(&format!("DELETE FROM {} WHERE key = $1 AND stream = $2", self.table))
                .bind(key)
                .bind(stream)
                .execute(&mut *transaction)
                .await?;
        }
        transaction.commit().await?;
        Ok(())
    }

    async fn insert(&self, key: &str, stream: &str) -> Result<(), ProviderError> {
        debug!(key, stream, table = %self.table, "postgres relations: insert");
        sqlx::query(&format!(
            "INSERT INTO {} (id, key, stream) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            self.table
        ))
        .bind(crate::id::generate())
        .bind(key)
        .bind(stream)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str, stream: &str) -> Result<(), ProviderError> {
        debug!(key, stream, table = %self.table, "postgres relations: remove");
        sqlx::query(&format!("DELETE FROM {} WHERE key = $1 AND stream = $2", self.table))
            .bind(key)
            .bind(stream)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_many(&self, pairs: Vec<(String, String)>) -> Result<(), ProviderError> {
        debug!(count = pairs.len(), table = %self.table, "postgres relations: insert_many");
        let mut transaction = self.pool.begin().await?;
        for (key, stream) in pairs {
            sqlx::query(&format!(
                "INSERT INTO {} (id, key, stream) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
                self.table
            ))
            .bind(crate::id::generate())
            .bind(key)
            .bind(stream)
            .execute(&mut *transaction)
            .await?;
        }
        transaction.commit().await?;
        Ok(())
    }

    async fn remove_many(&self, pairs: Vec<(String, String)>) -> Result<(), ProviderError> {
        debug!(count = pairs.len(), table = %self.table, "postgres relations: remove_many");
        let mut transaction = self.pool.begin().await?;
        for (key, stream) in pairs {
            sqlx::query(&format!("DELETE FROM {} WHERE key = $1 AND stream = $2", self.table))
                .bind(key)
                .bind(stream)
                .execute(&mut *transaction)
                .await?;
        }
        transaction.commit().await?;
        Ok(())
    }

    async fn get_by_key(&self, key: &str) -> Result<Vec<String>, ProviderError> {
        debug!(key, table = %self.table, "postgres relations: get_by_key");
        self.get_by_keys(std::slice::from_ref(&key.to_string())).await
    }

    async fn get_by_keys(&self, keys: &[String]) -> Result<Vec<String>, ProviderError> {
        debug!(keys = ?keys, table = %self.table, "postgres relations: get_by_keys");
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<(String,)> = sqlx::query_as(&format!(
            "SELECT DISTINCT stream FROM {} WHERE key = ANY($1)",
            self.table
        ))
        .bind(keys)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(stream,)| stream).collect())
    }

    async fn remove_by_keys(&self, keys: &[String]) -> Result<(), ProviderError> {
        debug!(keys = ?keys, table = %self.table, "postgres relations: remove_by_keys");
        sqlx::query(&format!("DELETE FROM {} WHERE key = ANY($1)", self.table))
            .bind(keys)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_by_streams(&self, streams: &[String]) -> Result<(), ProviderError> {
        debug!(streams = ?streams, table = %self.table, "postgres relations: remove_by_streams");
        sqlx::query(&format!("DELETE FROM {} WHERE stream = ANY($1)", self.table))
            .bind(streams)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
