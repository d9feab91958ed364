//! System error types.

use common::AggregateId;
use domain::{DomainError, NegotiationError, NegotiationStatus, ShippingError, UserError};
use event_store::{EventStoreError, Position, Version};
use projections::{ProjectionError, USER_INDEX};
use thiserror::Error;

use crate::graph::ProcessName;

/// Errors returned by the box system's commands, queries and runner.
#[derive(Debug, Error)]
pub enum SystemError {
    /// A user with this name is already registered.
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    /// A user with this email is already registered.
    #[error("Email already registered: {0}")]
    EmailAlreadyExists(String),

    #[error("{aggregate_type} not found: {aggregate_id}")]
    NotFound {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
    },

    /// The aggregate changed between load and save.
    #[error("Version conflict on {aggregate_id}: expected {expected}, found {actual}")]
    VersionConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The command is not valid in the negotiation's current status.
    #[error("Cannot {action} while negotiation is '{current}'")]
    InvalidTransition {
        current: NegotiationStatus,
        action: &'static str,
    },

    /// The command's arguments were rejected before anything was recorded.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// No notification exists at this position.
    #[error("No notification at position {0}")]
    UnknownPosition(Position),

    /// A policy failed; nothing from that notification was persisted.
    #[error("Process '{process}' failed at position {position}: {source}")]
    PolicyFailed {
        process: ProcessName,
        position: Position,
        #[source]
        source: Box<SystemError>,
    },

    #[error("Projection error: {0}")]
    Projection(ProjectionError),

    #[error("Domain error: {0}")]
    Domain(DomainError),
}

impl SystemError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, SystemError::VersionConflict { .. })
    }

    /// Strips `PolicyFailed` wrappers.
    pub fn root(&self) -> &SystemError {
        match self {
            SystemError::PolicyFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<DomainError> for SystemError {
    fn from(err: DomainError) -> Self {
        if let Some((table, key)) = err.record_conflict() {
            if table == USER_INDEX {
                return SystemError::UserAlreadyExists(key.to_string());
            }
        }

        match err {
            DomainError::NotFound {
                aggregate_type,
                aggregate_id,
            } => SystemError::NotFound {
                aggregate_type,
                aggregate_id,
            },
            DomainError::VersionConflict {
                aggregate_id,
                expected,
                actual,
            } => SystemError::VersionConflict {
                aggregate_id,
                expected,
                actual,
            },
            DomainError::Negotiation(NegotiationError::InvalidTransition { current, action }) => {
                SystemError::InvalidTransition { current, action }
            }
            DomainError::User(e @ (UserError::NameRequired | UserError::EmailRequired)) => {
                SystemError::InvalidCommand(e.to_string())
            }
            other => SystemError::Domain(other),
        }
    }
}

impl From<ProjectionError> for SystemError {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::Domain(e) => e.into(),
            ProjectionError::EventStore(e) => DomainError::from(e).into(),
            other => SystemError::Projection(other),
        }
    }
}

impl From<EventStoreError> for SystemError {
    fn from(err: EventStoreError) -> Self {
        DomainError::from(err).into()
    }
}

impl From<UserError> for SystemError {
    fn from(err: UserError) -> Self {
        DomainError::from(err).into()
    }
}

impl From<ShippingError> for SystemError {
    fn from(err: ShippingError) -> Self {
        DomainError::from(err).into()
    }
}

impl From<NegotiationError> for SystemError {
    fn from(err: NegotiationError) -> Self {
        DomainError::from(err).into()
    }
}

/// Convenience type alias for system results.
pub type Result<T> = std::result::Result<T, SystemError>;
