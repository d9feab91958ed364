//! User domain events.

use common::{ShipmentId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a user aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UserEvent {
    /// User was registered.
    Created(UserCreatedData),

    /// User started sending a shipment to another user.
    ShippingStarted(ShipmentPartiesData),

    /// User was made party to a shipment started elsewhere.
    ShippingOffered(ShipmentPartiesData),
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Created(_) => "Created",
            UserEvent::ShippingStarted(_) => "ShippingStarted",
            UserEvent::ShippingOffered(_) => "ShippingOffered",
        }
    }
}

/// Data for the user Created event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreatedData {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

/// A shipment and the two users it connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentPartiesData {
    pub shipment_id: ShipmentId,
    pub sender: UserId,
    pub receiver: UserId,
}

// Convenience constructors for events
impl UserEvent {
    pub fn created(user_id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        UserEvent::Created(UserCreatedData {
            user_id,
            name: name.into(),
            email: email.into(),
        })
    }

    pub fn shipping_started(shipment_id: ShipmentId, sender: UserId, receiver: UserId) -> Self {
        UserEvent::ShippingStarted(ShipmentPartiesData {
            shipment_id,
            sender,
            receiver,
        })
    }

    pub fn shipping_offered(shipment_id: ShipmentId, sender: UserId, receiver: UserId) -> Self {
        UserEvent::ShippingOffered(ShipmentPartiesData {
            shipment_id,
            sender,
            receiver,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_tagged_by_type() {
        let user_id = UserId::new();
        let event = UserEvent::created(user_id, "Julian", "a@b.c");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Created");
        assert_eq!(json["data"]["name"], "Julian");
        assert_eq!(json["data"]["user_id"], user_id.to_string());

        let decoded: UserEvent = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn shipping_events_have_distinct_types() {
        let (s, a, b) = (ShipmentId::new(), UserId::new(), UserId::new());
        assert_eq!(
            UserEvent::shipping_started(s, a, b).event_type(),
            "ShippingStarted"
        );
        assert_eq!(
            UserEvent::shipping_offered(s, a, b).event_type(),
            "ShippingOffered"
        );
    }
}
