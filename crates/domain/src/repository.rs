//! Loading aggregates from their streams and persisting new events.

use common::AggregateId;
use event_store::{
    Commit, EventEnvelope, EventStore, EventStoreError, EventStoreExt, RecordWrite, StreamAppend,
    Tracking, Version,
};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Everything one command or one policy step will persist.
///
/// Events are applied to the in-memory aggregate as they are recorded, so the
/// caller keeps working with up-to-date state. Nothing reaches the store
/// until the unit is committed, and then it lands atomically or not at all.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    appends: Vec<StreamAppend>,
    records: Vec<RecordWrite>,
    tracking: Option<Tracking>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `events` to `aggregate` and stages them for its stream.
    ///
    /// On error neither the aggregate nor the unit is changed.
    pub fn record<A: Aggregate>(
        &mut self,
        aggregate: &mut A,
        events: Vec<A::Event>,
    ) -> Result<(), DomainError> {
        let mut next = aggregate.clone();
        let mut staged = Vec::with_capacity(events.len());

        for event in events {
            let expected = next.version();
            let sequence = expected.next_sequence();
            let event_type = event.event_type();
            let payload = serde_json::to_value(&event)?;

            next.apply(event);
            next.set_version(sequence.version_after());

            let aggregate_id = next
                .id()
                .ok_or(DomainError::MissingIdentity(A::aggregate_type()))?;

            let envelope = EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event_type)
                .sequence(sequence)
                .payload_raw(payload)
                .build();

            staged.push((expected, envelope));
        }

        for (expected, envelope) in staged {
            self.stream(envelope.aggregate_id, expected)
                .events
                .push(envelope);
        }
        *aggregate = next;
        Ok(())
    }

    /// Stages a projection write for the same commit.
    pub fn write(&mut self, record: RecordWrite) {
        self.records.push(record);
    }

    pub fn track(&mut self, tracking: Tracking) {
        self.tracking = Some(tracking);
    }

    /// Events staged so far, in the order they were recorded per stream.
    pub fn events(&self) -> impl Iterator<Item = &EventEnvelope> {
        self.appends.iter().flat_map(|a| a.events.iter())
    }

    pub fn event_count(&self) -> usize {
        self.appends.iter().map(|a| a.events.len()).sum()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Returns true when there are no events and no record writes.
    ///
    /// A unit that only moves a tracking position still counts as empty.
    pub fn has_no_changes(&self) -> bool {
        self.appends.is_empty() && self.records.is_empty()
    }

    pub fn into_commit(self) -> Commit {
        Commit {
            appends: self.appends,
            records: self.records,
            tracking: self.tracking,
        }
    }

    fn stream(&mut self, aggregate_id: AggregateId, expected: Version) -> &mut StreamAppend {
        let index = match self
            .appends
            .iter()
            .position(|a| a.aggregate_id == aggregate_id)
        {
            Some(index) => index,
            None => {
                self.appends.push(StreamAppend::new(aggregate_id, expected));
                self.appends.len() - 1
            }
        };
        &mut self.appends[index]
    }
}

/// Reconstructs aggregates from the event store and persists their changes.
///
/// Any aggregate type can be loaded through the same repository, so a policy
/// running for one process can read the state of another's aggregates.
#[derive(Debug, Clone)]
pub struct Repository<S> {
    store: S,
}

impl<S: EventStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate by folding its full history.
    ///
    /// Fails with `NotFound` if no stream of type `A` exists for the id.
    pub async fn load<A: Aggregate>(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let not_found = || DomainError::NotFound {
            aggregate_type: A::aggregate_type(),
            aggregate_id,
        };

        let envelopes = match self.store.load_stream(aggregate_id).await {
            Ok(envelopes) => envelopes,
            Err(EventStoreError::AggregateNotFound(_)) => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };
        fold(envelopes)?.ok_or_else(not_found)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn find<A: Aggregate>(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Option<A>, DomainError> {
        let envelopes = self.store.get_events_for_aggregate(aggregate_id).await?;
        fold(envelopes)
    }

    /// Applies `events` to `aggregate` and persists them in their own commit.
    ///
    /// Fails with `VersionConflict` if the stream has moved past the version
    /// the aggregate was loaded at. Returns the new version.
    pub async fn save<A: Aggregate>(
        &self,
        aggregate: &mut A,
        events: Vec<A::Event>,
    ) -> Result<Version, DomainError> {
        let mut unit = UnitOfWork::new();
        unit.record(aggregate, events)?;
        if unit.has_no_changes() {
            return Ok(aggregate.version());
        }

        self.commit(unit).await?;
        Ok(aggregate.version())
    }

    /// Persists a unit of work atomically.
    #[tracing::instrument(skip_all, fields(events = unit.event_count(), records = unit.record_count()))]
    pub async fn commit(&self, unit: UnitOfWork) -> Result<Vec<Version>, DomainError> {
        Ok(self.store.commit(unit.into_commit()).await?)
    }
}

/// Folds a stream into an `A`, or None if the stream is empty or belongs to
/// another aggregate type.
#[tracing::instrument(skip(envelopes), fields(aggregate_type = A::aggregate_type(), events = envelopes.len()))]
fn fold<A: Aggregate>(envelopes: Vec<EventEnvelope>) -> Result<Option<A>, DomainError> {
    let Some(first) = envelopes.first() else {
        return Ok(None);
    };
    if first.aggregate_type != A::aggregate_type() {
        tracing::debug!(found = %first.aggregate_type, "stream belongs to another aggregate type");
        return Ok(None);
    }

    let mut aggregate = A::default();
    for envelope in envelopes {
        let event: A::Event = serde_json::from_value(envelope.payload)?;
        aggregate.apply(event);
        aggregate.set_version(envelope.sequence.version_after());
    }

    Ok(Some(aggregate))
}
