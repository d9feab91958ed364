use std::collections::{HashSet, VecDeque};
use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Notification, Position, ProjectionRecord,
    RecordWrite, Result, Tracking, Version,
};

/// Events to append to a single aggregate stream.
#[derive(Debug, Clone)]
pub struct StreamAppend {
    pub aggregate_id: AggregateId,

    /// Version the stream must be at for the append to succeed.
    pub expected_version: Version,

    /// New events, whose sequences start at `expected_version`.
    pub events: Vec<EventEnvelope>,
}

impl StreamAppend {
    pub fn new(aggregate_id: AggregateId, expected_version: Version) -> Self {
        Self {
            aggregate_id,
            expected_version,
            events: Vec::new(),
        }
    }

    /// Version of the stream once this append has landed.
    pub fn resulting_version(&self) -> Version {
        self.events
            .last()
            .map(|e| e.sequence.version_after())
            .unwrap_or(self.expected_version)
    }
}

/// Everything one command or one policy step persists, written atomically.
#[derive(Debug, Clone, Default)]
pub struct Commit {
    pub appends: Vec<StreamAppend>,
    pub records: Vec<RecordWrite>,
    pub tracking: Option<Tracking>,
}

impl Commit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the commit would write nothing at all.
    pub fn is_empty(&self) -> bool {
        self.appends.is_empty() && self.records.is_empty() && self.tracking.is_none()
    }

    /// Number of events across all appends.
    pub fn event_count(&self) -> usize {
        self.appends.iter().map(|a| a.events.len()).sum()
    }
}

/// A page-by-page stream of notifications.
pub type NotificationStream<'a> = Pin<Box<dyn Stream<Item = Result<Notification>> + Send + 'a>>;

/// Core trait for event store implementations.
///
/// An event store owns the authoritative event log, the projection record
/// tables derived from it, and the tracking positions of the processes that
/// consume the log. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persists a commit atomically.
    ///
    /// Each append fails the whole commit with `ConcurrencyConflict` if its
    /// stream is not at `expected_version`; each `Insert` record write fails
    /// it with `RecordConflict` if the key exists. Returns the new version of
    /// every appended stream, in append order.
    async fn commit(&self, commit: Commit) -> Result<Vec<Version>>;

    /// Retrieves all events for a specific aggregate in sequence order.
    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>>;

    /// Gets the current version of an aggregate.
    ///
    /// Returns None if the aggregate doesn't exist.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;

    /// Reads up to `limit` notifications with a position greater than `after`.
    async fn read_notifications(&self, after: Position, limit: usize)
    -> Result<Vec<Notification>>;

    /// Reads the notification at exactly `position`.
    async fn get_notification(&self, position: Position) -> Result<Option<Notification>>;

    /// Fetches a single projection record.
    async fn get_record(&self, table: &str, key: &str) -> Result<Option<ProjectionRecord>>;

    /// Fetches every record in `table` whose JSON value has `field == value`,
    /// ordered by key.
    async fn find_records(
        &self,
        table: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<Vec<ProjectionRecord>>;

    /// Returns the last position `process` has recorded, or `Position::start()`.
    async fn get_tracking(&self, process: &str) -> Result<Position>;
}

// Lets callers pick a backend at runtime behind `Arc<dyn EventStore>`
#[async_trait]
impl<T: EventStore + ?Sized> EventStore for std::sync::Arc<T> {
    async fn commit(&self, commit: Commit) -> Result<Vec<Version>> {
        (**self).commit(commit).await
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        (**self).get_events_for_aggregate(aggregate_id).await
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        (**self).get_aggregate_version(aggregate_id).await
    }

    async fn read_notifications(
        &self,
        after: Position,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        (**self).read_notifications(after, limit).await
    }

    async fn get_notification(&self, position: Position) -> Result<Option<Notification>> {
        (**self).get_notification(position).await
    }

    async fn get_record(&self, table: &str, key: &str) -> Result<Option<ProjectionRecord>> {
        (**self).get_record(table, key).await
    }

    async fn find_records(
        &self,
        table: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<Vec<ProjectionRecord>> {
        (**self).find_records(table, field, value).await
    }

    async fn get_tracking(&self, process: &str) -> Result<Position> {
        (**self).get_tracking(process).await
    }
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends events to one stream with no projection writes.
    async fn append(&self, events: Vec<EventEnvelope>, expected_version: Version) -> Result<Version> {
        let aggregate_id = events
            .first()
            .map(|e| e.aggregate_id)
            .ok_or_else(|| EventStoreError::InvalidAppend("Cannot append empty event list".into()))?;

        let commit = Commit {
            appends: vec![StreamAppend {
                aggregate_id,
                expected_version,
                events,
            }],
            ..Commit::default()
        };

        let versions = self.commit(commit).await?;
        Ok(versions.first().copied().unwrap_or(expected_version))
    }

    /// Checks if an aggregate exists (has any events).
    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.get_aggregate_version(aggregate_id).await?.is_some())
    }

    /// Loads an aggregate's full history, failing if the stream is empty.
    async fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        let events = self.get_events_for_aggregate(aggregate_id).await?;
        if events.is_empty() {
            return Err(EventStoreError::AggregateNotFound(aggregate_id));
        }
        Ok(events)
    }

    /// Streams every notification after `after`, fetching `page_size` at a time.
    ///
    /// Pages are read lazily, so events appended while the stream is being
    /// consumed are picked up by later pages.
    fn notifications(&self, after: Position, page_size: usize) -> NotificationStream<'_> {
        use futures_util::stream;

        let page_size = page_size.max(1);
        let state = (after, VecDeque::new(), false);

        Box::pin(stream::unfold(
            state,
            move |(after, mut buffer, mut exhausted): (Position, VecDeque<Notification>, bool)| async move {
                if buffer.is_empty() && !exhausted {
                    match self.read_notifications(after, page_size).await {
                        Ok(page) => {
                            exhausted = page.len() < page_size;
                            buffer.extend(page);
                        }
                        Err(e) => return Some((Err(e), (after, buffer, true))),
                    }
                }

                let next = buffer.pop_front()?;
                let position = next.position;
                Some((Ok(next), (position, buffer, exhausted)))
            },
        ))
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Validates a commit before anything is written.
pub fn validate_commit(commit: &Commit) -> Result<()> {
    let mut seen = HashSet::new();

    for append in &commit.appends {
        if !seen.insert(append.aggregate_id) {
            return Err(EventStoreError::InvalidAppend(format!(
                "Aggregate {} appears more than once in one commit",
                append.aggregate_id
            )));
        }
        validate_events_for_append(append)?;
    }

    Ok(())
}

/// Validates the events of one stream append.
pub fn validate_events_for_append(append: &StreamAppend) -> Result<()> {
    let Some(first) = append.events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "Cannot append empty event list".to_string(),
        ));
    };

    // All events must be for the same aggregate
    for event in &append.events {
        if event.aggregate_id != append.aggregate_id {
            return Err(EventStoreError::InvalidAppend(
                "All events must be for the same aggregate".to_string(),
            ));
        }
        if event.aggregate_type != first.aggregate_type {
            return Err(EventStoreError::InvalidAppend(
                "All events must have the same aggregate type".to_string(),
            ));
        }
    }

    // Sequences must continue the stream without gaps
    let mut expected = append.expected_version.next_sequence();
    for event in &append.events {
        if event.sequence != expected {
            return Err(EventStoreError::InvalidAppend(format!(
                "Event sequences must be contiguous. Expected {}, got {}",
                expected, event.sequence
            )));
        }
        expected = expected.next();
    }

    Ok(())
}
