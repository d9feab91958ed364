//! User aggregate implementation.

use common::{ShipmentId, UserId};
use event_store::Version;

use crate::aggregate::Aggregate;

use super::{UserError, UserEvent};

/// A party that sends and receives shipments.
///
/// The user keeps every shipment it is party to, as sender or receiver, in
/// the order it learned about them and without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    id: Option<UserId>,
    version: Version,
    name: String,
    email: String,
    shipments: Vec<ShipmentId>,
}

impl Aggregate for User {
    type Event = UserEvent;
    type Error = UserError;

    fn aggregate_type() -> &'static str {
        "User"
    }

    fn id(&self) -> Option<UserId> {
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
            UserEvent::Created(data) => {
                self.id = Some(data.user_id);
                self.name = data.name;
                self.email = data.email;
            }
            UserEvent::ShippingStarted(data) | UserEvent::ShippingOffered(data) => {
                if !self.shipments.contains(&data.shipment_id) {
                    self.shipments.push(data.shipment_id);
                }
            }
        }
    }
}

// Query methods
impl User {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Shipment ids this user is party to, oldest first.
    pub fn shipments(&self) -> &[ShipmentId] {
        &self.shipments
    }

    pub fn is_party_to(&self, shipment_id: ShipmentId) -> bool {
        self.shipments.contains(&shipment_id)
    }
}

// Command methods (return events)
impl User {
    /// Registers a new user.
    ///
    /// Name and email uniqueness is checked against the user index before
    /// this is called; the aggregate only guards against double creation.
    pub fn create(
        &self,
        user_id: UserId,
        name: &str,
        email: &str,
    ) -> Result<Vec<UserEvent>, UserError> {
        if self.id.is_some() {
            return Err(UserError::AlreadyCreated);
        }
        if name.trim().is_empty() {
            return Err(UserError::NameRequired);
        }
        if email.trim().is_empty() {
            return Err(UserError::EmailRequired);
        }

        Ok(vec![UserEvent::created(user_id, name, email)])
    }

    /// Starts a shipment from this user to `receiver` under `shipment_id`.
    pub fn start_shipping(
        &self,
        shipment_id: ShipmentId,
        receiver: UserId,
    ) -> Result<Vec<UserEvent>, UserError> {
        let sender = self.id.ok_or(UserError::NotCreated)?;

        if self.is_party_to(shipment_id) {
            return Err(UserError::DuplicateShipment(shipment_id));
        }

        Ok(vec![UserEvent::shipping_started(
            shipment_id,
            sender,
            receiver,
        )])
    }

    /// Records that this user is party to a shipment.
    ///
    /// Returns no events if the shipment is already known, so repeated
    /// delivery of the triggering event is harmless.
    pub fn track_shipping(
        &self,
        shipment_id: ShipmentId,
        sender: UserId,
        receiver: UserId,
    ) -> Result<Vec<UserEvent>, UserError> {
        if self.id.is_none() {
            return Err(UserError::NotCreated);
        }
        if self.is_party_to(shipment_id) {
            return Ok(vec![]);
        }

        Ok(vec![UserEvent::shipping_offered(
            shipment_id,
            sender,
            receiver,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_user(name: &str) -> User {
        let mut user = User::default();
        let events = user.create(UserId::new(), name, "a@b.c").unwrap();
        user.apply_events(events);
        user
    }

    #[test]
    fn create_sets_identity_and_contact() {
        let user_id = UserId::new();
        let mut user = User::default();
        let events = user.create(user_id, "Julian", "a@b.c").unwrap();
        assert_eq!(events.len(), 1);

        user.apply_events(events);
        assert_eq!(user.id(), Some(user_id));
        assert_eq!(user.name(), "Julian");
        assert_eq!(user.email(), "a@b.c");
        assert!(user.shipments().is_empty());
    }

    #[test]
    fn create_twice_fails() {
        let user = create_user("Julian");
        assert!(matches!(
            user.create(UserId::new(), "Julian", "a@b.c"),
            Err(UserError::AlreadyCreated)
        ));
    }

    #[test]
    fn create_requires_name_and_email() {
        let user = User::default();
        assert!(matches!(
            user.create(UserId::new(), "  ", "a@b.c"),
            Err(UserError::NameRequired)
        ));
        assert!(matches!(
            user.create(UserId::new(), "Bob", ""),
            Err(UserError::EmailRequired)
        ));
    }

    #[test]
    fn start_shipping_records_shipment_as_sender() {
        let mut user = create_user("Julian");
        let receiver = UserId::new();
        let shipment_id = ShipmentId::new();

        let events = user.start_shipping(shipment_id, receiver).unwrap();
        assert_eq!(
            events,
            vec![UserEvent::shipping_started(
                shipment_id,
                user.id().unwrap(),
                receiver
            )]
        );

        user.apply_events(events);
        assert_eq!(user.shipments(), &[shipment_id]);
    }

    #[test]
    fn start_shipping_requires_created_user() {
        let user = User::default();
        assert!(matches!(
            user.start_shipping(ShipmentId::new(), UserId::new()),
            Err(UserError::NotCreated)
        ));
    }

    #[test]
    fn track_shipping_is_idempotent() {
        let mut user = create_user("Niklas");
        let (shipment_id, sender) = (ShipmentId::new(), UserId::new());
        let receiver = user.id().unwrap();

        let events = user.track_shipping(shipment_id, sender, receiver).unwrap();
        assert_eq!(events.len(), 1);
        user.apply_events(events);

        let again = user.track_shipping(shipment_id, sender, receiver).unwrap();
        assert!(again.is_empty());
        assert_eq!(user.shipments(), &[shipment_id]);
    }

    #[test]
    fn shipments_keep_insertion_order() {
        let mut user = create_user("Julian");
        let ids: Vec<_> = (0..3).map(|_| ShipmentId::new()).collect();

        for id in &ids {
            let events = user.start_shipping(*id, UserId::new()).unwrap();
            user.apply_events(events);
        }

        assert_eq!(user.shipments(), ids.as_slice());
    }
}
