use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventEnvelope, EventId, EventStoreError, Notification, Position,
    ProjectionRecord, Result, Sequence, Version, WriteMode,
    store::{Commit, EventStore, StreamAppend, validate_commit},
};

const EVENT_COLUMNS: &str = "position, id, event_type, aggregate_id, aggregate_type, sequence_number, timestamp, payload, metadata";

/// Advisory lock key held by every transaction that appends to the log.
///
/// Positions are allocated on insert but only become visible on commit, so
/// appends are serialized to keep visibility in position order.
pub const EVENT_LOG_LOCK: i64 = 0x626f_785f_6c6f_67;

/// PostgreSQL-backed event store implementation.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `url` and returns a store over a fresh pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_notification(row: PgRow) -> Result<Notification> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        let event = EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            sequence: Sequence::new(row.try_get("sequence_number")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
            metadata,
        };

        Ok(Notification {
            position: Position::new(row.try_get("position")?),
            event,
        })
    }

    fn row_to_record(row: PgRow) -> Result<ProjectionRecord> {
        Ok(ProjectionRecord {
            table: row.try_get("table_name")?,
            key: row.try_get("record_key")?,
            value: row.try_get("value")?,
        })
    }

    async fn append_stream(
        tx: &mut Transaction<'_, Postgres>,
        append: &StreamAppend,
    ) -> Result<Version> {
        let aggregate_id = append.aggregate_id;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE aggregate_id = $1")
            .bind(aggregate_id.as_uuid())
            .fetch_one(&mut **tx)
            .await?;
        let actual = Version::new(count);

        if actual != append.expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: append.expected_version,
                actual,
            });
        }

        for event in &append.events {
            let metadata_json = serde_json::to_value(&event.metadata)?;

            sqlx::query(
                r#"
                INSERT INTO events (id, event_type, aggregate_id, aggregate_type, sequence_number, timestamp, payload, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(&event.event_type)
            .bind(event.aggregate_id.as_uuid())
            .bind(&event.aggregate_type)
            .bind(event.sequence.as_i64())
            .bind(event.timestamp)
            .bind(&event.payload)
            .bind(metadata_json)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                // A racing writer got the same sequence number first
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_aggregate_sequence")
                {
                    return EventStoreError::ConcurrencyConflict {
                        aggregate_id,
                        expected: append.expected_version,
                        actual: event.sequence.version_after(),
                    };
                }
                EventStoreError::Database(e)
            })?;
        }

        Ok(append.resulting_version())
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, commit), fields(appends = commit.appends.len(), records = commit.records.len()))]
    async fn commit(&self, commit: Commit) -> Result<Vec<Version>> {
        validate_commit(&commit)?;

        let mut tx = self.pool.begin().await?;

        if commit.event_count() > 0 {
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(EVENT_LOG_LOCK)
                .execute(&mut *tx)
                .await?;
        }

        let mut versions = Vec::with_capacity(commit.appends.len());
        for append in &commit.appends {
            versions.push(Self::append_stream(&mut tx, append).await?);
        }

        for write in &commit.records {
            let record = &write.record;
            let sql = match write.mode {
                WriteMode::Insert => {
                    "INSERT INTO projection_records (table_name, record_key, value) VALUES ($1, $2, $3)"
                }
                WriteMode::Upsert => {
                    r#"
                    INSERT INTO projection_records (table_name, record_key, value) VALUES ($1, $2, $3)
                    ON CONFLICT (table_name, record_key) DO UPDATE SET value = EXCLUDED.value
                    "#
                }
            };

            sqlx::query(sql)
                .bind(&record.table)
                .bind(&record.key)
                .bind(&record.value)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if let sqlx::Error::Database(ref db_err) = e
                        && db_err.constraint() == Some("projection_records_pkey")
                    {
                        return EventStoreError::RecordConflict {
                            table: record.table.clone(),
                            key: record.key.clone(),
                        };
                    }
                    EventStoreError::Database(e)
                })?;
        }

        if let Some(tracking) = &commit.tracking {
            sqlx::query(
                r#"
                INSERT INTO tracking (process_name, position) VALUES ($1, $2)
                ON CONFLICT (process_name) DO UPDATE SET position = GREATEST(tracking.position, EXCLUDED.position)
                "#,
            )
            .bind(&tracking.process)
            .bind(tracking.position.as_i64())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        metrics::counter!("events_appended_total").increment(commit.event_count() as u64);
        Ok(versions)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE aggregate_id = $1 ORDER BY sequence_number ASC"
        ))
        .bind(aggregate_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Self::row_to_notification(row).map(|n| n.event))
            .collect()
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE aggregate_id = $1")
            .bind(aggregate_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        Ok((count > 0).then(|| Version::new(count)))
    }

    async fn read_notifications(
        &self,
        after: Position,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE position > $1 ORDER BY position ASC LIMIT $2"
        ))
        .bind(after.as_i64())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn get_notification(&self, position: Position) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE position = $1"
        ))
        .bind(position.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_notification).transpose()
    }

    async fn get_record(&self, table: &str, key: &str) -> Result<Option<ProjectionRecord>> {
        let row = sqlx::query(
            "SELECT table_name, record_key, value FROM projection_records WHERE table_name = $1 AND record_key = $2",
        )
        .bind(table)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn find_records(
        &self,
        table: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<Vec<ProjectionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT table_name, record_key, value FROM projection_records
            WHERE table_name = $1 AND value -> $2 = $3
            ORDER BY record_key ASC
            "#,
        )
        .bind(table)
        .bind(field)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn get_tracking(&self, process: &str) -> Result<Position> {
        let position: Option<i64> =
            sqlx::query_scalar("SELECT position FROM tracking WHERE process_name = $1")
                .bind(process)
                .fetch_optional(&self.pool)
                .await?;

        Ok(position.map(Position::new).unwrap_or(Position::start()))
    }
}
