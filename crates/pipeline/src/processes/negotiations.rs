use async_trait::async_trait;
use domain::{NegotiationEvent, Repository, ShippingEvent, SystemEvent, UnitOfWork, UserEvent};
use event_store::EventStore;
use projections::Projection;

use crate::error::Result;
use crate::graph::ProcessName;
use crate::process::Process;

/// Owns Negotiation aggregates. Driven by commands only.
#[derive(Debug, Default)]
pub struct NegotiationsProcess;

impl NegotiationsProcess {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<S: EventStore> Process<S> for NegotiationsProcess {
    fn name(&self) -> ProcessName {
        ProcessName::Negotiations
    }

    fn projections(&self) -> Vec<&dyn Projection> {
        vec![]
    }

    async fn policy(
        &self,
        _repo: &Repository<S>,
        event: &SystemEvent,
        _unit: &mut UnitOfWork,
    ) -> Result<()> {
        match event {
            SystemEvent::User(
                UserEvent::Created(_) | UserEvent::ShippingStarted(_) | UserEvent::ShippingOffered(_),
            )
            | SystemEvent::Shipping(ShippingEvent::Created(_))
            | SystemEvent::Negotiation(
                NegotiationEvent::Created(_)
                | NegotiationEvent::OfferCreated
                | NegotiationEvent::OfferAccepted
                | NegotiationEvent::OfferRejected,
            ) => Ok(()),
        }
    }
}
