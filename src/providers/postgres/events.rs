use sqlx::{Pool, Postgres, Transaction};
use tracing::debug;

use super::schema::events_table;
use crate::error::ProviderError;
use crate::event::EventRecord;
use crate::providers::{Direction, EventsProvider, ReadOptions};

#[derive(sqlx::FromRow)]
struct Row {
    id: String,
    stream: String,
    event_type: String,
    data: serde_json::Value,
    meta: serde_json::Value,
    created: String,
    recorded: String,
}

impl From<Row> for EventRecord {
    fn from(row: Row) -> Self {
        EventRecord {
            id: row.id,
            stream: row.stream,
            event_type: row.event_type,
            data: row.data,
            meta: row.meta,
            created: row.created,
            recorded: row.recorded,
        }
    }
}

/// Postgres-backed [`EventsProvider`], scoped to one schema namespace's events table.
#[derive(Clone)]
pub struct PgEventsProvider {
    pool: Pool<Postgres>,
    table: String,
}

impl PgEventsProvider {
    pub(crate) fn new(pool: Pool<Postgres>, namespace: &str) -> Self {
        Self {
            pool,
            table: events_table(namespace),
        }
    }

    async fn insert_within(&self, record: &EventRecord, executor: &mut Transaction<'_, Postgres>) -> Result<(), ProviderError> {
        sqlx::query(&format!(
            "INSERT INTO {} (id, stream, event_type, data, meta, created, recorded) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            self.table
        ))
        .bind(&record.id)
        .bind(&record.stream)
        .bind(&record.event_type)
        .bind(&record.data)
        .bind(&record.meta)
        .bind(&record.created)
        .bind(&record.recorded)
        .execute(&mut **executor)
        .await?;
        Ok(())
    }

    /// Builds a `SELECT * FROM {table} WHERE {predicate} AND ...` statement for `options`'
    /// cursor/type/direction/limit filters. `predicate` may itself reference placeholders
    /// (`$1`, `$2`, ...); `starting_at` is the next free placeholder number so this method's
    /// own binds never collide with the predicate's.
    fn select_clause(&self, predicate: &str, starting_at: usize, options: &ReadOptions) -> (String, Vec<String>) {
        let mut clauses = vec![predicate.to_string()];
        let mut binds = Vec::new();
        let mut placeholder = starting_at;

        if let Some(cursor) = &options.cursor {
            clauses.push(format!("created > ${placeholder}"));
            binds.push(cursor.clone());
            placeholder += 1;
        }

        if let Some(types) = &options.types {
            let list = (0..types.len())
                .map(|i| format!("${}", placeholder + i))
                .collect::<Vec<_>>()
                .join(", ");
            clauses.push(format!("event_type IN ({list})"));
            binds.extend(types.iter().cloned());
        }

        let direction = match options.direction {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        };

        let mut query = format!("SELECT * FROM {} WHERE {} ORDER BY created {direction}", self.table, clauses.join(" AND "));
        if let Some(limit) = options.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        (query, binds)
    }
}

#[async_trait::async_trait]
impl EventsProvider for PgEventsProvider {
    async fn insert(&self, record: EventRecord) -> Result<(), ProviderError> {
        debug!(id = %record.id, stream = %record.stream, table = %self.table, "postgres events: insert");
        let mut transaction = self.pool.begin().await?;
        self.insert_within(&record, &mut transaction).await?;
        transaction.commit().await?;
        Ok(())
    }

    async fn insert_many(&self, records: Vec<EventRecord>) -> Result<(), ProviderError> {
        debug!(count = records.len(), table = %self.table, "postgres events: insert_many");
        let mut transaction = self.pool.begin().await?;
        for record in &records {
            self.insert_within(record, &mut transaction).await?;
        }
        transaction.commit().await?;
        Ok(())
    }

    async fn get(&self, options: &ReadOptions) -> Result<Vec<EventRecord>, ProviderError> {
        debug!(table = %self.table, "postgres events: get");
        let (sql, binds) = self.select_clause("1 = 1", 1, options);
        let mut query = sqlx::query_as::<_, Row>(&sql);
        for bind in binds {
            query = query.bind(bind);
        }
        Ok(query.fetch_all(&self.pool).await?.into_iter().map(EventRecord::from).collect())
    }

    async fn get_by_stream(&self, stream: &str, options: &ReadOptions) -> Result<Vec<EventRecord>, ProviderError> {
        debug!(stream, table = %self.table, "postgres events: get_by_stream");
        let (sql, binds) = self.select_clause("stream = $1", 2, options);
        let mut query = sqlx::query_as::<_, Row>(&sql).bind(stream);
        for bind in binds {
            query = query.bind(bind);
        }
        Ok(query.fetch_all(&self.pool).await?.into_iter().map(EventRecord::from).collect())
    }

    async fn get_by_streams(&self, streams: &[String], options: &ReadOptions) -> Result<Vec<EventRecord>, ProviderError> {
        debug!(streams = ?streams, table = %self.table, "postgres events: get_by_streams");
        if streams.is_empty() {
            return Ok(Vec::new());
        }
        let (sql, binds) = self.select_clause("stream = ANY($1)", 2, options);
        let mut query = sqlx::query_as::<_, Row>(&sql).bind(streams);
        for bind in binds {
            query = query.bind(bind);
        }
        Ok(query.fetch_all(&self.pool).await?.into_iter().map(EventRecord::from).collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<EventRecord>, ProviderError> {
        debug!(id, table = %self.table, "postgres events: get_by_id");
        let row: Option<Row> = sqlx::query_as(&format!("SELECT * FROM {} WHERE id = $1", self.table))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(EventRecord::from))
    }

    async fn check_outdated(&self, record: &EventRecord) -> Result<bool, ProviderError> {
        debug!(id = %record.id, stream = %record.stream, table = %self.table, "postgres events: check_outdated");
        let row = sqlx::query(&format!(
            "SELECT 1 FROM {} WHERE stream = $1 AND event_type = $2 AND created > $3 LIMIT 1",
            self.table
        ))
        .bind(&record.stream)
        .bind(&record.event_type)
        .bind(&record.created)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}
