//! Negotiation aggregate and related types.

mod aggregate;
mod events;
mod status;

pub use aggregate::Negotiation;
pub use events::{NegotiationCreatedData, NegotiationEvent};
pub use status::NegotiationStatus;

use thiserror::Error;

/// Errors that can occur during negotiation operations.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("Negotiation already created")]
    AlreadyCreated,

    #[error("Negotiation has not been created")]
    NotCreated,

    /// The command is not valid in the current status.
    #[error("Invalid transition: cannot {action} from {current} status")]
    InvalidTransition {
        current: NegotiationStatus,
        action: &'static str,
    },
}
