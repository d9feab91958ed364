use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Notification, Position, ProjectionRecord, Result,
    Version, WriteMode,
    store::{Commit, EventStore, validate_commit},
};

#[derive(Default)]
struct Inner {
    /// The notification log; an event's position is its index + 1.
    log: Vec<EventEnvelope>,
    /// Log indices of each aggregate's events, in sequence order.
    streams: HashMap<AggregateId, Vec<usize>>,
    /// Projection tables, keyed by `(table, key)`.
    records: BTreeMap<(String, String), serde_json::Value>,
    tracking: HashMap<String, Position>,
}

impl Inner {
    fn version_of(&self, aggregate_id: &AggregateId) -> Version {
        Version::new(self.streams.get(aggregate_id).map_or(0, |s| s.len() as i64))
    }

    fn notification_at(&self, index: usize) -> Option<Notification> {
        self.log.get(index).map(|event| Notification {
            position: Position::new(index as i64 + 1),
            event: event.clone(),
        })
    }
}

/// In-memory event store implementation.
///
/// Holds the log, projection tables and tracking positions behind a single
/// lock, so a commit is applied all at once or not at all. Cloning the store
/// yields another handle onto the same data.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.log.len()
    }

    /// Returns the total number of projection records stored.
    pub async fn record_count(&self) -> usize {
        self.inner.read().await.records.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn commit(&self, commit: Commit) -> Result<Vec<Version>> {
        validate_commit(&commit)?;
        let event_count = commit.event_count();

        let mut inner = self.inner.write().await;

        // Check every precondition before touching anything
        for append in &commit.appends {
            let actual = inner.version_of(&append.aggregate_id);
            if actual != append.expected_version {
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id: append.aggregate_id,
                    expected: append.expected_version,
                    actual,
                });
            }
        }

        let mut inserted = HashSet::new();
        for write in commit.records.iter().filter(|w| w.mode == WriteMode::Insert) {
            let key = (write.record.table.clone(), write.record.key.clone());
            if inner.records.contains_key(&key) || !inserted.insert(key) {
                return Err(EventStoreError::RecordConflict {
                    table: write.record.table.clone(),
                    key: write.record.key.clone(),
                });
            }
        }

        let mut versions = Vec::with_capacity(commit.appends.len());
        for append in commit.appends {
            let new_version = append.resulting_version();
            for event in append.events {
                let index = inner.log.len();
                inner.log.push(event);
                inner
                    .streams
                    .entry(append.aggregate_id)
                    .or_default()
                    .push(index);
            }
            versions.push(new_version);
        }

        for write in commit.records {
            let ProjectionRecord { table, key, value } = write.record;
            inner.records.insert((table, key), value);
        }

        if let Some(tracking) = commit.tracking {
            let entry = inner
                .tracking
                .entry(tracking.process)
                .or_insert(Position::start());
            *entry = (*entry).max(tracking.position);
        }

        metrics::counter!("events_appended_total").increment(event_count as u64);
        Ok(versions)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        let events = inner
            .streams
            .get(&aggregate_id)
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&i| inner.log.get(i).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let inner = self.inner.read().await;
        Ok(inner
            .streams
            .get(&aggregate_id)
            .map(|s| Version::new(s.len() as i64)))
    }

    async fn read_notifications(
        &self,
        after: Position,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let inner = self.inner.read().await;
        let start = after.as_i64().max(0) as usize;
        Ok((start..inner.log.len())
            .take(limit)
            .filter_map(|i| inner.notification_at(i))
            .collect())
    }

    async fn get_notification(&self, position: Position) -> Result<Option<Notification>> {
        if position.as_i64() < 1 {
            return Ok(None);
        }
        let inner = self.inner.read().await;
        Ok(inner.notification_at(position.as_i64() as usize - 1))
    }

    async fn get_record(&self, table: &str, key: &str) -> Result<Option<ProjectionRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .get(&(table.to_string(), key.to_string()))
            .map(|value| ProjectionRecord::new(table, key, value.clone())))
    }

    async fn find_records(
        &self,
        table: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<Vec<ProjectionRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .iter()
            .filter(|((t, _), _)| t == table)
            .map(|((t, k), v)| ProjectionRecord::new(t.clone(), k.clone(), v.clone()))
            .filter(|record| record.matches(field, value))
            .collect())
    }

    async fn get_tracking(&self, process: &str) -> Result<Position> {
        let inner = self.inner.read().await;
        Ok(inner
            .tracking
            .get(process)
            .copied()
            .unwrap_or(Position::start()))
    }
}
