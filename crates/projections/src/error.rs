//! Projection error types.

use thiserror::Error;

/// Errors that can occur while projecting events or querying read models.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// A staged event could not be decoded.
    #[error("Domain error: {0}")]
    Domain(#[from] domain::DomainError),

    /// Failed to deserialize a record value.
    #[error("Record deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A stored record does not have the shape its table promises.
    #[error("Malformed record {key} in {table}: {reason}")]
    MalformedRecord {
        table: &'static str,
        key: String,
        reason: String,
    },
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
