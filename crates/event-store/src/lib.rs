//! Storage contract for the box system.
//!
//! - [`EventStore`] persists atomic [`Commit`]s: events for one or more
//!   aggregate streams, the projection records derived from them, and the
//!   tracking position of the process that produced them
//! - Every event gets a per-stream [`Sequence`] and a global [`Position`]
//!   in the notification log that processes consume
//! - [`InMemoryEventStore`] and [`PostgresEventStore`] implement the contract

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Notification, Position, Sequence, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use record::{ProjectionRecord, RecordWrite, Tracking, WriteMode};
pub use store::{Commit, EventStore, EventStoreExt, NotificationStream, StreamAppend};
