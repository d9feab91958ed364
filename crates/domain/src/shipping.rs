//! Shipping aggregate.
//!
//! A shipping is created once, by the shippings process, under the shipment
//! id the sender generated. It has no further transitions.

use common::{AggregateId, ShipmentId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{Aggregate, DomainEvent};

/// Events that can occur on a shipping aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ShippingEvent {
    Created(ShippingCreatedData),
}

impl DomainEvent for ShippingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShippingEvent::Created(_) => "Created",
        }
    }
}

/// Data for the shipping Created event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingCreatedData {
    pub shipment_id: ShipmentId,
    pub sender: UserId,
    pub receiver: UserId,
}

impl ShippingEvent {
    pub fn created(shipment_id: ShipmentId, sender: UserId, receiver: UserId) -> Self {
        ShippingEvent::Created(ShippingCreatedData {
            shipment_id,
            sender,
            receiver,
        })
    }
}

/// Errors that can occur during shipping operations.
#[derive(Debug, Error)]
pub enum ShippingError {
    #[error("Shipping already created")]
    AlreadyCreated,
}

/// A shipment between two users; immutable once created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shipping {
    id: Option<ShipmentId>,
    version: Version,
    sender: Option<UserId>,
    receiver: Option<UserId>,
}

impl Aggregate for Shipping {
    type Event = ShippingEvent;
    type Error = ShippingError;

    fn aggregate_type() -> &'static str {
        "Shipping"
    }

    fn id(&self) -> Option<AggregateId> {
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
            ShippingEvent::Created(data) => {
                self.id = Some(data.shipment_id);
                self.sender = Some(data.sender);
                self.receiver = Some(data.receiver);
            }
        }
    }
}

impl Shipping {
    pub fn sender(&self) -> Option<UserId> {
        self.sender
    }

    pub fn receiver(&self) -> Option<UserId> {
        self.receiver
    }

    /// Creates the shipping under an externally supplied id.
    pub fn create(
        &self,
        shipment_id: ShipmentId,
        sender: UserId,
        receiver: UserId,
    ) -> Result<Vec<ShippingEvent>, ShippingError> {
        if self.id.is_some() {
            return Err(ShippingError::AlreadyCreated);
        }

        Ok(vec![ShippingEvent::created(shipment_id, sender, receiver)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_uses_supplied_id() {
        let (shipment_id, sender, receiver) = (ShipmentId::new(), UserId::new(), UserId::new());
        let mut shipping = Shipping::default();

        let events = shipping.create(shipment_id, sender, receiver).unwrap();
        shipping.apply_events(events);

        assert_eq!(shipping.id(), Some(shipment_id));
        assert_eq!(shipping.sender(), Some(sender));
        assert_eq!(shipping.receiver(), Some(receiver));
    }

    #[test]
    fn create_twice_fails() {
        let mut shipping = Shipping::default();
        let events = shipping
            .create(ShipmentId::new(), UserId::new(), UserId::new())
            .unwrap();
        shipping.apply_events(events);

        assert!(matches!(
            shipping.create(ShipmentId::new(), UserId::new(), UserId::new()),
            Err(ShippingError::AlreadyCreated)
        ));
    }
}
