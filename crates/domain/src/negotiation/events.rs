//! Negotiation domain events.

use common::NegotiationId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a negotiation aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NegotiationEvent {
    Created(NegotiationCreatedData),
    OfferCreated,
    OfferAccepted,
    OfferRejected,
}

impl DomainEvent for NegotiationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            NegotiationEvent::Created(_) => "Created",
            NegotiationEvent::OfferCreated => "OfferCreated",
            NegotiationEvent::OfferAccepted => "OfferAccepted",
            NegotiationEvent::OfferRejected => "OfferRejected",
        }
    }
}

/// Data for the negotiation Created event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationCreatedData {
    pub negotiation_id: NegotiationId,
    pub author: String,

    /// Reference to the box being negotiated over.
    pub box_ref: String,

    pub date: String,
}

impl NegotiationEvent {
    pub fn created(
        negotiation_id: NegotiationId,
        author: impl Into<String>,
        box_ref: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        NegotiationEvent::Created(NegotiationCreatedData {
            negotiation_id,
            author: author.into(),
            box_ref: box_ref.into(),
            date: date.into(),
        })
    }
}
