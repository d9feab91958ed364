//! Domain layer for the box system.
//!
//! This crate provides:
//! - `Aggregate` and `DomainEvent` traits for event-sourced entities
//! - The User, Shipping and Negotiation aggregates with their closed event sets
//! - `SystemEvent`, the union consumed by the process pipeline
//! - `Repository` and `UnitOfWork` for loading and persisting aggregates

pub mod aggregate;
pub mod error;
pub mod event;
pub mod negotiation;
pub mod repository;
pub mod shipping;
pub mod user;

pub use aggregate::{Aggregate, DomainEvent};
pub use error::DomainError;
pub use event::SystemEvent;
pub use negotiation::{
    Negotiation, NegotiationCreatedData, NegotiationError, NegotiationEvent, NegotiationStatus,
};
pub use repository::{Repository, UnitOfWork};
pub use shipping::{Shipping, ShippingCreatedData, ShippingError, ShippingEvent};
pub use user::{ShipmentPartiesData, User, UserCreatedData, UserError, UserEvent};
