//! Negotiation aggregate implementation.

use common::NegotiationId;
use event_store::Version;

use crate::aggregate::Aggregate;

use super::{NegotiationError, NegotiationEvent, NegotiationStatus};

/// Offer/accept/reject tracking for a shipment proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Negotiation {
    id: Option<NegotiationId>,
    version: Version,
    author: String,
    box_ref: String,
    date: String,
    status: NegotiationStatus,
}

impl Aggregate for Negotiation {
    type Event = NegotiationEvent;
    type Error = NegotiationError;

    fn aggregate_type() -> &'static str {
        "Negotiation"
    }

    fn id(&self) -> Option<NegotiationId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            NegotiationEvent::Created(data) => {
                self.id = Some(data.negotiation_id);
                self.author = data.author;
                self.box_ref = data.box_ref;
                self.date = data.date;
            }
            NegotiationEvent::OfferCreated => self.status = NegotiationStatus::Created,
            NegotiationEvent::OfferAccepted => self.status = NegotiationStatus::Accepted,
            NegotiationEvent::OfferRejected => self.status = NegotiationStatus::Rejected,
        }
    }
}

// Query methods
impl Negotiation {
    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn box_ref(&self) -> &str {
        &self.box_ref
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn status(&self) -> NegotiationStatus {
        self.status
    }
}

// Command methods (return events)
impl Negotiation {
    pub fn create(
        &self,
        negotiation_id: NegotiationId,
        author: &str,
        box_ref: &str,
        date: &str,
    ) -> Result<Vec<NegotiationEvent>, NegotiationError> {
        if self.id.is_some() {
            return Err(NegotiationError::AlreadyCreated);
        }

        Ok(vec![NegotiationEvent::created(
            negotiation_id,
            author,
            box_ref,
            date,
        )])
    }

    pub fn create_offer(&self) -> Result<Vec<NegotiationEvent>, NegotiationError> {
        self.ensure_created()?;
        if !self.status.can_create_offer() {
            return Err(self.invalid_transition("create offer"));
        }

        Ok(vec![NegotiationEvent::OfferCreated])
    }

    pub fn accept_offer(&self) -> Result<Vec<NegotiationEvent>, NegotiationError> {
        self.ensure_created()?;
        if !self.status.can_decide() {
            return Err(self.invalid_transition("accept offer"));
        }

        Ok(vec![NegotiationEvent::OfferAccepted])
    }

    pub fn reject_offer(&self) -> Result<Vec<NegotiationEvent>, NegotiationError> {
        self.ensure_created()?;
        if !self.status.can_decide() {
            return Err(self.invalid_transition("reject offer"));
        }

        Ok(vec![NegotiationEvent::OfferRejected])
    }

    fn ensure_created(&self) -> Result<(), NegotiationError> {
        match self.id {
            Some(_) => Ok(()),
            None => Err(NegotiationError::NotCreated),
        }
    }

    fn invalid_transition(&self, action: &'static str) -> NegotiationError {
        NegotiationError::InvalidTransition {
            current: self.status,
            action,
        }
    }
}
