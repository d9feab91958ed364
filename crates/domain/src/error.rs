//! Domain error types.

use common::AggregateId;
use event_store::{EventStoreError, Version};
use thiserror::Error;

use crate::negotiation::NegotiationError;
use crate::shipping::ShippingError;
use crate::user::UserError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(EventStoreError),

    #[error("User error: {0}")]
    User(#[from] UserError),

    #[error("Shipping error: {0}")]
    Shipping(#[from] ShippingError),

    #[error("Negotiation error: {0}")]
    Negotiation(#[from] NegotiationError),

    /// No stream of the requested type exists for the id.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    NotFound {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
    },

    /// The stream moved on since the aggregate was loaded.
    #[error("Version conflict on {aggregate_id}: expected {expected}, found {actual}")]
    VersionConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// Events were recorded on an aggregate that has no identity yet.
    #[error("Cannot record events on an uncreated {0}")]
    MissingIdentity(&'static str),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<EventStoreError> for DomainError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            } => DomainError::VersionConflict {
                aggregate_id,
                expected,
                actual,
            },
            other => DomainError::EventStore(other),
        }
    }
}

impl DomainError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, DomainError::VersionConflict { .. })
    }

    /// Returns the `(table, key)` of a failed insert-only projection write.
    pub fn record_conflict(&self) -> Option<(&str, &str)> {
        match self {
            DomainError::EventStore(EventStoreError::RecordConflict { table, key }) => {
                Some((table.as_str(), key.as_str()))
            }
            _ => None,
        }
    }
}
