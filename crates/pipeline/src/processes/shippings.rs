use async_trait::async_trait;
use domain::{Repository, Shipping, SystemEvent, UnitOfWork, UserEvent};
use event_store::{EventStore, EventStoreExt};
use projections::{Projection, ShipmentLedger};

use crate::error::Result;
use crate::graph::ProcessName;
use crate::process::Process;

/// Owns Shipping aggregates and the per-user sendings and receivings tables.
///
/// Creates one Shipping per `ShippingStarted`, reusing the shipment id the
/// sender chose.
pub struct ShippingsProcess<S> {
    ledger: ShipmentLedger<S>,
}

impl<S: EventStore> ShippingsProcess<S> {
    pub fn new(store: S) -> Self {
        Self {
            ledger: ShipmentLedger::new(store),
        }
    }

    pub fn ledger(&self) -> &ShipmentLedger<S> {
        &self.ledger
    }
}

#[async_trait]
impl<S: EventStore> Process<S> for ShippingsProcess<S> {
    fn name(&self) -> ProcessName {
        ProcessName::Shippings
    }

    fn projections(&self) -> Vec<&dyn Projection> {
        vec![&self.ledger]
    }

    #[tracing::instrument(skip_all, fields(process = "shippings", event_type = event.event_type()))]
    async fn policy(
        &self,
        repo: &Repository<S>,
        event: &SystemEvent,
        unit: &mut UnitOfWork,
    ) -> Result<()> {
        match event {
            SystemEvent::User(UserEvent::ShippingStarted(data)) => {
                if repo.store().aggregate_exists(data.shipment_id).await? {
                    tracing::warn!(
                        shipment_id = %data.shipment_id,
                        "shipping already exists, ignoring redelivered event"
                    );
                    return Ok(());
                }

                let mut shipping = Shipping::default();
                let events = shipping.create(data.shipment_id, data.sender, data.receiver)?;
                unit.record(&mut shipping, events)?;
                Ok(())
            }
            SystemEvent::User(UserEvent::Created(_) | UserEvent::ShippingOffered(_))
            | SystemEvent::Shipping(_)
            | SystemEvent::Negotiation(_) => Ok(()),
        }
    }
}
