//! The closed set of events flowing through the notification log.

use event_store::EventEnvelope;

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;
use crate::negotiation::{Negotiation, NegotiationEvent};
use crate::shipping::{Shipping, ShippingEvent};
use crate::user::{User, UserEvent};

/// Every event any aggregate in the system can emit.
///
/// Consumers match on this exhaustively, so adding an event kind without
/// deciding how each consumer handles it is a compile error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEvent {
    User(UserEvent),
    Shipping(ShippingEvent),
    Negotiation(NegotiationEvent),
}

impl SystemEvent {
    /// Decodes a stored envelope, routing on its aggregate type.
    ///
    /// Returns `Ok(None)` for aggregate types this system does not know.
    pub fn from_envelope(envelope: &EventEnvelope) -> Result<Option<Self>, DomainError> {
        let payload = envelope.payload.clone();
        let event = match envelope.aggregate_type.as_str() {
            t if t == User::aggregate_type() => SystemEvent::User(serde_json::from_value(payload)?),
            t if t == Shipping::aggregate_type() => {
                SystemEvent::Shipping(serde_json::from_value(payload)?)
            }
            t if t == Negotiation::aggregate_type() => {
                SystemEvent::Negotiation(serde_json::from_value(payload)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            SystemEvent::User(e) => e.event_type(),
            SystemEvent::Shipping(e) => e.event_type(),
            SystemEvent::Negotiation(e) => e.event_type(),
        }
    }

    pub fn aggregate_type(&self) -> &'static str {
        match self {
            SystemEvent::User(_) => User::aggregate_type(),
            SystemEvent::Shipping(_) => Shipping::aggregate_type(),
            SystemEvent::Negotiation(_) => Negotiation::aggregate_type(),
        }
    }
}

impl From<UserEvent> for SystemEvent {
    fn from(event: UserEvent) -> Self {
        SystemEvent::User(event)
    }
}

impl From<ShippingEvent> for SystemEvent {
    fn from(event: ShippingEvent) -> Self {
        SystemEvent::Shipping(event)
    }
}

impl From<NegotiationEvent> for SystemEvent {
    fn from(event: NegotiationEvent) -> Self {
        SystemEvent::Negotiation(event)
    }
}
