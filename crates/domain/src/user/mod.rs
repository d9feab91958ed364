//! User aggregate and related types.

mod aggregate;
mod events;

pub use aggregate::User;
pub use events::{ShipmentPartiesData, UserCreatedData, UserEvent};

use common::ShipmentId;
use thiserror::Error;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User already created")]
    AlreadyCreated,

    #[error("User has not been created")]
    NotCreated,

    #[error("User name is required")]
    NameRequired,

    #[error("User email is required")]
    EmailRequired,

    /// The user is already party to this shipment.
    #[error("Shipment already started: {0}")]
    DuplicateShipment(ShipmentId),
}
