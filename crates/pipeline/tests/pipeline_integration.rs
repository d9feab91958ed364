//! End-to-end tests for the box system: commands, the policy cascade and
//! the read models it maintains.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use common::{ShipmentId, UserId};
use domain::{Aggregate, NegotiationStatus, Repository, SystemEvent, UnitOfWork, User, UserEvent};
use event_store::{EventStore, InMemoryEventStore, Position};
use pipeline::{
    BoxSystem, Process, ProcessName, Runner, RunnerConfig, SubscriptionGraph, SystemError,
};
use projections::Projection;

fn create_system() -> (BoxSystem<InMemoryEventStore>, InMemoryEventStore) {
    let store = InMemoryEventStore::new();
    (BoxSystem::new(store.clone()), store)
}

async fn julian_and_niklas(system: &BoxSystem<InMemoryEventStore>) -> (UserId, UserId) {
    let julian = system.create_user("Julian", "a@b.c").await.unwrap();
    let niklas = system.create_user("Niklas", "b@c.d").await.unwrap();
    (julian, niklas)
}

async fn position_of(store: &InMemoryEventStore, aggregate_type: &str, event_type: &str) -> Position {
    store
        .read_notifications(Position::start(), 1000)
        .await
        .unwrap()
        .into_iter()
        .find(|n| n.event.aggregate_type == aggregate_type && n.event.event_type == event_type)
        .map(|n| n.position)
        .unwrap()
}

mod properties {
    use super::*;

    #[tokio::test]
    async fn p1_second_user_with_same_name_fails_for_any_email() {
        let (system, _) = create_system();
        system.create_user("Julian", "a@b.c").await.unwrap();

        for email in ["a@b.c", "other@b.c"] {
            let err = system.create_user("Julian", email).await.unwrap_err();
            assert!(matches!(err, SystemError::UserAlreadyExists(name) if name == "Julian"));
        }
    }

    #[tokio::test]
    async fn p3_shipment_listed_once_per_party_despite_redelivery() {
        let (system, store) = create_system();
        let (julian, niklas) = julian_and_niklas(&system).await;
        let shipment = system.start_shipping(julian, niklas).await.unwrap();
        let events_before = store.event_count().await;

        let started = position_of(&store, "User", "ShippingStarted").await;
        let delivered = system.runner().redeliver(started).await.unwrap();
        assert_eq!(delivered, 2);

        let created = position_of(&store, "Shipping", "Created").await;
        assert_eq!(system.runner().redeliver(created).await.unwrap(), 1);

        assert_eq!(system.get_user(julian).await.unwrap().shipments(), &[shipment]);
        assert_eq!(system.get_user(niklas).await.unwrap().shipments(), &[shipment]);
        assert_eq!(store.event_count().await, events_before);
    }

    #[tokio::test]
    async fn p4_index_points_at_new_user_immediately() {
        let (system, _) = create_system();
        let id = system.create_user("Julian", "a@b.c").await.unwrap();

        assert_eq!(system.get_user_id_by_name("Julian").await.unwrap(), Some(id));
        assert_eq!(system.get_user_id_by_email("a@b.c").await.unwrap(), Some(id));
    }

    #[tokio::test]
    async fn p5_per_user_tables_hold_only_the_new_shipment() {
        let (system, _) = create_system();
        let (julian, niklas) = julian_and_niklas(&system).await;

        let shipment = system.start_shipping(julian, niklas).await.unwrap();

        assert_eq!(system.get_sent_by(julian).await.unwrap(), vec![shipment]);
        assert_eq!(system.get_received_by(niklas).await.unwrap(), vec![shipment]);
        assert!(system.get_sent_by(niklas).await.unwrap().is_empty());
        assert!(system.get_received_by(julian).await.unwrap().is_empty());
    }
}

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn e2e_1_julian_ships_to_niklas() {
        let (system, _) = create_system();
        let (julian, niklas) = julian_and_niklas(&system).await;

        let shipment = system.start_shipping(julian, niklas).await.unwrap();

        let shipping = system.get_shipment(shipment).await.unwrap();
        assert_eq!(shipping.sender(), Some(julian));
        assert_eq!(shipping.receiver(), Some(niklas));
        assert_eq!(system.get_user(julian).await.unwrap().shipments(), &[shipment]);
        assert_eq!(system.get_user(niklas).await.unwrap().shipments(), &[shipment]);
    }

    #[tokio::test]
    async fn e2e_2_offer_on_new_negotiation() {
        let (system, _) = create_system();
        let id = system.create_negotiation("a", "b", "c").await.unwrap();

        let status = system.create_offer(id).await.unwrap();
        assert_eq!(status, NegotiationStatus::Created);

        let negotiation = system.get_negotiation(id).await.unwrap();
        assert_eq!(negotiation.status().as_str(), "created");
        assert_eq!(
            (negotiation.author(), negotiation.box_ref(), negotiation.date()),
            ("a", "b", "c")
        );
    }

    #[tokio::test]
    async fn e2e_3_bob_twice_with_different_emails() {
        let (system, store) = create_system();
        let bob = system.create_user("Bob", "bob@one").await.unwrap();

        let err = system.create_user("Bob", "bob@two").await.unwrap_err();

        assert!(matches!(err, SystemError::UserAlreadyExists(name) if name == "Bob"));
        assert_eq!(system.get_user_id_by_name("Bob").await.unwrap(), Some(bob));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn several_shipments_keep_insertion_order() {
        let (system, _) = create_system();
        let (julian, niklas) = julian_and_niklas(&system).await;

        let first = system.start_shipping(julian, niklas).await.unwrap();
        let second = system.start_shipping(niklas, julian).await.unwrap();

        assert_eq!(
            system.get_user(julian).await.unwrap().shipments(),
            &[first, second]
        );
        assert_eq!(
            system.get_user(niklas).await.unwrap().shipments(),
            &[first, second]
        );
        assert_eq!(system.get_sent_by(niklas).await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn ledger_queries_list_shipments_oldest_first() {
        let (system, _) = create_system();
        let (julian, niklas) = julian_and_niklas(&system).await;

        let mut started = Vec::new();
        for _ in 0..6 {
            started.push(system.start_shipping(julian, niklas).await.unwrap());
        }

        assert_eq!(system.get_sent_by(julian).await.unwrap(), started);
        assert_eq!(system.get_received_by(niklas).await.unwrap(), started);
    }

    #[tokio::test]
    async fn shipping_to_oneself_lists_it_once() {
        let (system, _) = create_system();
        let julian = system.create_user("Julian", "a@b.c").await.unwrap();

        let shipment = system.start_shipping(julian, julian).await.unwrap();

        assert_eq!(system.get_user(julian).await.unwrap().shipments(), &[shipment]);
        assert_eq!(system.get_sent_by(julian).await.unwrap(), vec![shipment]);
        assert_eq!(system.get_received_by(julian).await.unwrap(), vec![shipment]);
    }
}

mod command_errors {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (system, _) = create_system();
        system.create_user("Julian", "a@b.c").await.unwrap();

        let err = system.create_user("Jules", "a@b.c").await.unwrap_err();
        assert!(matches!(err, SystemError::EmailAlreadyExists(email) if email == "a@b.c"));
    }

    #[tokio::test]
    async fn name_is_checked_before_email() {
        let (system, _) = create_system();
        system.create_user("Julian", "a@b.c").await.unwrap();

        let err = system.create_user("Julian", "a@b.c").await.unwrap_err();
        assert!(matches!(err, SystemError::UserAlreadyExists(_)));
    }

    #[tokio::test]
    async fn blank_name_is_an_invalid_command() {
        let (system, store) = create_system();

        let err = system.create_user("  ", "a@b.c").await.unwrap_err();
        assert!(matches!(err, SystemError::InvalidCommand(_)));
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_parties_persist_nothing() {
        let (system, store) = create_system();
        let julian = system.create_user("Julian", "a@b.c").await.unwrap();
        let ghost = UserId::new();

        let err = system.start_shipping(julian, ghost).await.unwrap_err();
        assert!(matches!(
            err,
            SystemError::NotFound { aggregate_type: "User", aggregate_id } if aggregate_id == ghost
        ));

        let err = system.start_shipping(ghost, julian).await.unwrap_err();
        assert!(matches!(err, SystemError::NotFound { .. }));

        assert_eq!(store.event_count().await, 1);
        assert!(system.get_user(julian).await.unwrap().shipments().is_empty());
    }

    #[tokio::test]
    async fn unknown_negotiation_is_not_found() {
        let (system, _) = create_system();
        let id = common::NegotiationId::new();

        for result in [
            system.create_offer(id).await,
            system.accept_offer(id).await,
            system.reject_offer(id).await,
        ] {
            assert!(matches!(
                result,
                Err(SystemError::NotFound {
                    aggregate_type: "Negotiation",
                    ..
                })
            ));
        }
    }

    #[tokio::test]
    async fn ids_of_other_aggregate_types_are_not_found() {
        let (system, _) = create_system();
        let negotiation = system.create_negotiation("a", "b", "c").await.unwrap();

        let err = system.get_user(negotiation).await.unwrap_err();
        assert!(matches!(err, SystemError::NotFound { aggregate_type: "User", .. }));
    }
}

mod negotiation_lifecycle {
    use super::*;

    // Accepting and rejecting move the status on. Earlier versions of this
    // system left it at "created" after either decision.
    #[tokio::test]
    async fn decisions_update_the_status() {
        let (system, _) = create_system();

        let accepted = system.create_negotiation("a", "b", "c").await.unwrap();
        system.create_offer(accepted).await.unwrap();
        assert_eq!(
            system.accept_offer(accepted).await.unwrap(),
            NegotiationStatus::Accepted
        );

        let rejected = system.create_negotiation("a", "b", "c").await.unwrap();
        system.create_offer(rejected).await.unwrap();
        system.reject_offer(rejected).await.unwrap();
        assert_eq!(
            system.get_negotiation(rejected).await.unwrap().status().as_str(),
            "rejected"
        );
    }

    #[tokio::test]
    async fn deciding_without_an_open_offer_is_invalid() {
        let (system, store) = create_system();
        let id = system.create_negotiation("a", "b", "c").await.unwrap();

        let err = system.accept_offer(id).await.unwrap_err();
        assert!(matches!(
            err,
            SystemError::InvalidTransition {
                current: NegotiationStatus::Initial,
                ..
            }
        ));

        system.create_offer(id).await.unwrap();
        system.reject_offer(id).await.unwrap();

        let err = system.accept_offer(id).await.unwrap_err();
        assert!(matches!(
            err,
            SystemError::InvalidTransition {
                current: NegotiationStatus::Rejected,
                ..
            }
        ));
        assert_eq!(store.event_count().await, 3);
    }
}

mod user_index {
    use super::*;

    // A second Created for an existing name that skips the pre-check still
    // fails at the index instead of repointing it.
    #[tokio::test]
    async fn index_rejects_duplicate_name_at_commit() {
        let (system, store) = create_system();
        let bob = system.create_user("Bob", "bob@one").await.unwrap();

        let mut duplicate = User::default();
        let events = duplicate.create(UserId::new(), "Bob", "bob@two").unwrap();
        let mut unit = UnitOfWork::new();
        unit.record(&mut duplicate, events).unwrap();

        let err = system
            .runner()
            .commit_for(ProcessName::Users, unit)
            .await
            .unwrap_err();

        assert!(matches!(err, SystemError::UserAlreadyExists(name) if name == "Bob"));
        assert_eq!(system.get_user_id_by_name("Bob").await.unwrap(), Some(bob));
        assert_eq!(store.event_count().await, 1);
    }
}

mod runner {
    use super::*;

    #[tokio::test]
    async fn restarted_system_resumes_from_tracking() {
        let store = InMemoryEventStore::new();
        let first = BoxSystem::new(store.clone());
        let (julian, niklas) = julian_and_niklas(&first).await;
        first.start_shipping(julian, niklas).await.unwrap();

        let second = BoxSystem::new(store.clone());
        assert_eq!(second.runner().run_until_idle().await.unwrap(), 0);

        // An event written behind the runner's back is picked up on the next run.
        let repo = second.repository();
        let mut user: User = repo.load(julian).await.unwrap();
        let shipment = ShipmentId::new();
        let events = user.start_shipping(shipment, niklas).unwrap();
        repo.save(&mut user, events).await.unwrap();

        assert_eq!(second.runner().run_until_idle().await.unwrap(), 3);
        assert!(
            second
                .get_user(niklas)
                .await
                .unwrap()
                .is_party_to(shipment)
        );
        assert_eq!(second.get_shipment(shipment).await.unwrap().sender(), Some(julian));
    }

    #[tokio::test]
    async fn every_process_tracks_the_head_of_the_log_when_idle() {
        let (system, store) = create_system();
        let (julian, niklas) = julian_and_niklas(&system).await;
        system.start_shipping(julian, niklas).await.unwrap();

        let head = Position::new(store.event_count().await as i64);
        for name in ProcessName::ALL {
            assert_eq!(system.runner().position_of(name).await.unwrap(), head);
        }
    }

    /// Writes to the receiver between the policy's load and its commit, the
    /// way a concurrent command would.
    struct Interfering {
        attempts: AtomicU32,
        interfere_times: u32,
    }

    impl Interfering {
        fn new(interfere_times: u32) -> Self {
            Self {
                attempts: AtomicU32::new(0),
                interfere_times,
            }
        }
    }

    #[async_trait]
    impl Process<InMemoryEventStore> for Interfering {
        fn name(&self) -> ProcessName {
            ProcessName::Users
        }

        fn projections(&self) -> Vec<&dyn Projection> {
            vec![]
        }

        async fn policy(
            &self,
            repo: &Repository<InMemoryEventStore>,
            event: &SystemEvent,
            unit: &mut UnitOfWork,
        ) -> pipeline::Result<()> {
            let SystemEvent::User(UserEvent::ShippingStarted(data)) = event else {
                return Ok(());
            };
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);

            let mut receiver: User = repo.load(data.receiver).await?;
            if attempt < self.interfere_times {
                let mut other = receiver.clone();
                let events = other.track_shipping(ShipmentId::new(), data.sender, data.receiver)?;
                repo.save(&mut other, events).await?;
            }

            let events = receiver.track_shipping(data.shipment_id, data.sender, data.receiver)?;
            unit.record(&mut receiver, events)?;
            Ok(())
        }
    }

    async fn shipping_started(
        store: &InMemoryEventStore,
    ) -> (Repository<InMemoryEventStore>, UserId, ShipmentId) {
        let repo = Repository::new(store.clone());
        let mut sender = User::default();
        let events = sender.create(UserId::new(), "Julian", "a@b.c").unwrap();
        repo.save(&mut sender, events).await.unwrap();
        let mut receiver = User::default();
        let events = receiver.create(UserId::new(), "Niklas", "b@c.d").unwrap();
        repo.save(&mut receiver, events).await.unwrap();

        let shipment = ShipmentId::new();
        let events = sender
            .start_shipping(shipment, receiver.id().unwrap())
            .unwrap();
        repo.save(&mut sender, events).await.unwrap();

        (repo, receiver.id().unwrap(), shipment)
    }

    fn runner_with(
        store: &InMemoryEventStore,
        process: Interfering,
        max_policy_retries: u32,
    ) -> Runner<InMemoryEventStore> {
        Runner::new(
            Repository::new(store.clone()),
            vec![Box::new(process)],
            SubscriptionGraph::new().subscribe(
                ProcessName::Users,
                ProcessName::Users,
                "ShippingStarted",
            ),
            RunnerConfig {
                max_policy_retries,
                ..RunnerConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn version_conflict_in_policy_is_retried_against_fresh_state() {
        let store = InMemoryEventStore::new();
        let (repo, receiver, shipment) = shipping_started(&store).await;
        let runner = runner_with(&store, Interfering::new(1), 3);

        assert_eq!(runner.run_until_idle().await.unwrap(), 1);

        let receiver: User = repo.load(receiver).await.unwrap();
        assert_eq!(receiver.shipments().len(), 2);
        assert!(receiver.is_party_to(shipment));
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let store = InMemoryEventStore::new();
        shipping_started(&store).await;
        let runner = runner_with(&store, Interfering::new(u32::MAX), 1);

        let err = runner.run_until_idle().await.unwrap_err();

        assert!(matches!(
            err,
            SystemError::PolicyFailed {
                process: ProcessName::Users,
                ..
            }
        ));
        assert!(err.root().is_version_conflict());
        assert_eq!(
            runner.position_of(ProcessName::Users).await.unwrap(),
            Position::start()
        );
    }
}
