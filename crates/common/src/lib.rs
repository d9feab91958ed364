//! Shared identifier types for the box system.

mod types;

pub use types::{AggregateId, NegotiationId, ShipmentId, UserId};
