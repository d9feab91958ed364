use async_trait::async_trait;
use common::{ShipmentId, UserId};
use domain::{Repository, ShippingEvent, SystemEvent, UnitOfWork, User, UserEvent};
use event_store::EventStore;
use projections::{Projection, UserIndex};

use crate::error::Result;
use crate::graph::ProcessName;
use crate::process::Process;

/// Owns User aggregates and the name index.
///
/// Adds each shipment to the shipment list of every user party to it. Both
/// the sender's `ShippingStarted` and the resulting `Shipping` creation lead
/// here, so a party is usually tracked on the first and skipped on the second.
pub struct UsersProcess<S> {
    index: UserIndex<S>,
}

impl<S: EventStore> UsersProcess<S> {
    pub fn new(store: S) -> Self {
        Self {
            index: UserIndex::new(store),
        }
    }

    pub fn index(&self) -> &UserIndex<S> {
        &self.index
    }
}

#[async_trait]
impl<S: EventStore> Process<S> for UsersProcess<S> {
    fn name(&self) -> ProcessName {
        ProcessName::Users
    }

    fn projections(&self) -> Vec<&dyn Projection> {
        vec![&self.index]
    }

    #[tracing::instrument(skip_all, fields(process = "users", event_type = event.event_type()))]
    async fn policy(
        &self,
        repo: &Repository<S>,
        event: &SystemEvent,
        unit: &mut UnitOfWork,
    ) -> Result<()> {
        match event {
            SystemEvent::User(UserEvent::ShippingStarted(data)) => {
                track(repo, unit, data.receiver, data.shipment_id, data.sender, data.receiver).await
            }
            SystemEvent::Shipping(ShippingEvent::Created(data)) => {
                track(repo, unit, data.receiver, data.shipment_id, data.sender, data.receiver)
                    .await?;
                if data.sender != data.receiver {
                    track(repo, unit, data.sender, data.shipment_id, data.sender, data.receiver)
                        .await?;
                }
                Ok(())
            }
            SystemEvent::User(UserEvent::Created(_) | UserEvent::ShippingOffered(_))
            | SystemEvent::Negotiation(_) => Ok(()),
        }
    }
}

async fn track<S: EventStore>(
    repo: &Repository<S>,
    unit: &mut UnitOfWork,
    user_id: UserId,
    shipment_id: ShipmentId,
    sender: UserId,
    receiver: UserId,
) -> Result<()> {
    let mut user: User = repo.load(user_id).await?;
    let events = user.track_shipping(shipment_id, sender, receiver)?;

    if events.is_empty() {
        tracing::debug!(%user_id, %shipment_id, "shipment already tracked");
        return Ok(());
    }

    unit.record(&mut user, events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Aggregate;
    use event_store::InMemoryEventStore;

    struct Fixture {
        repo: Repository<InMemoryEventStore>,
        process: UsersProcess<InMemoryEventStore>,
    }

    fn fixture() -> Fixture {
        let store = InMemoryEventStore::new();
        Fixture {
            repo: Repository::new(store.clone()),
            process: UsersProcess::new(store),
        }
    }

    async fn user(repo: &Repository<InMemoryEventStore>, name: &str) -> User {
        let mut user = User::default();
        let events = user.create(UserId::new(), name, "x@y.z").unwrap();
        repo.save(&mut user, events).await.unwrap();
        user
    }

    #[tokio::test]
    async fn shipping_started_tracks_receiver() {
        let f = fixture();
        let julian = user(&f.repo, "Julian").await;
        let niklas = user(&f.repo, "Niklas").await;
        let shipment_id = ShipmentId::new();

        let event = SystemEvent::User(UserEvent::shipping_started(
            shipment_id,
            julian.id().unwrap(),
            niklas.id().unwrap(),
        ));
        let mut unit = UnitOfWork::new();
        f.process.policy(&f.repo, &event, &mut unit).await.unwrap();

        let staged: Vec<_> = unit.events().collect();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].aggregate_id, niklas.id().unwrap());
        assert_eq!(staged[0].event_type, "ShippingOffered");
    }

    #[tokio::test]
    async fn shipping_created_skips_parties_already_tracking_it() {
        let f = fixture();
        let mut julian = user(&f.repo, "Julian").await;
        let niklas = user(&f.repo, "Niklas").await;
        let shipment_id = ShipmentId::new();

        let events = julian
            .start_shipping(shipment_id, niklas.id().unwrap())
            .unwrap();
        f.repo.save(&mut julian, events).await.unwrap();

        let event = SystemEvent::Shipping(ShippingEvent::created(
            shipment_id,
            julian.id().unwrap(),
            niklas.id().unwrap(),
        ));
        let mut unit = UnitOfWork::new();
        f.process.policy(&f.repo, &event, &mut unit).await.unwrap();

        // Only the receiver is new to the shipment.
        let staged: Vec<_> = unit.events().collect();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].aggregate_id, niklas.id().unwrap());
    }

    #[tokio::test]
    async fn shipping_to_self_is_tracked_once() {
        let f = fixture();
        let julian = user(&f.repo, "Julian").await;
        let id = julian.id().unwrap();

        let event = SystemEvent::Shipping(ShippingEvent::created(ShipmentId::new(), id, id));
        let mut unit = UnitOfWork::new();
        f.process.policy(&f.repo, &event, &mut unit).await.unwrap();

        assert_eq!(unit.event_count(), 1);
    }

    #[tokio::test]
    async fn unknown_receiver_fails() {
        let f = fixture();
        let julian = user(&f.repo, "Julian").await;

        let event = SystemEvent::User(UserEvent::shipping_started(
            ShipmentId::new(),
            julian.id().unwrap(),
            UserId::new(),
        ));
        let mut unit = UnitOfWork::new();
        let err = f.process.policy(&f.repo, &event, &mut unit).await.unwrap_err();

        assert!(matches!(
            err,
            crate::SystemError::NotFound {
                aggregate_type: "User",
                ..
            }
        ));
        assert!(unit.has_no_changes());
    }

    #[tokio::test]
    async fn other_events_are_ignored() {
        let f = fixture();
        let event = SystemEvent::User(UserEvent::created(UserId::new(), "Bob", "b@b"));
        let mut unit = UnitOfWork::new();
        f.process.policy(&f.repo, &event, &mut unit).await.unwrap();
        assert!(unit.has_no_changes());
    }
}
