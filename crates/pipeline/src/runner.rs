//! Single-threaded, in-order runner driving the processes over the log.

use futures_util::StreamExt;

use domain::{Repository, SystemEvent, UnitOfWork};
use event_store::{EventStore, EventStoreExt, Notification, Position, Tracking, Version};
use projections::stage_projections;

use crate::error::{Result, SystemError};
use crate::graph::{ProcessName, SubscriptionGraph};
use crate::process::Process;

/// Runner tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// How many times a policy is reloaded and retried after a version conflict.
    pub max_policy_retries: u32,

    /// Notifications fetched per read.
    pub page_size: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_policy_retries: 3,
            page_size: 256,
        }
    }
}

/// Feeds the notification log to the processes along the subscription graph.
///
/// Each process consumes the log from its own tracking position, one
/// notification at a time. The policy's output, the projection writes over
/// it and the new tracking position are committed together, so a restarted
/// runner resumes exactly where each process left off.
pub struct Runner<S> {
    repo: Repository<S>,
    processes: Vec<Box<dyn Process<S>>>,
    graph: SubscriptionGraph,
    config: RunnerConfig,
    sweep: tokio::sync::Mutex<()>,
}

impl<S: EventStore> Runner<S> {
    pub fn new(
        repo: Repository<S>,
        processes: Vec<Box<dyn Process<S>>>,
        graph: SubscriptionGraph,
        config: RunnerConfig,
    ) -> Self {
        Self {
            repo,
            processes,
            graph,
            config,
            sweep: tokio::sync::Mutex::new(()),
        }
    }

    pub fn graph(&self) -> &SubscriptionGraph {
        &self.graph
    }

    pub fn config(&self) -> RunnerConfig {
        self.config
    }

    /// Current tracking position of a process.
    pub async fn position_of(&self, name: ProcessName) -> Result<Position> {
        Ok(self.repo.store().get_tracking(name.as_str()).await?)
    }

    /// Sweeps the processes in order until none has anything left to consume.
    ///
    /// Returns the number of notifications handed to a policy.
    #[tracing::instrument(skip(self))]
    pub async fn run_until_idle(&self) -> Result<usize> {
        let _guard = self.sweep.lock().await;
        let start = std::time::Instant::now();

        let result = self.sweep_until_idle().await;

        metrics::histogram!("pipeline_sweep_seconds").record(start.elapsed().as_secs_f64());
        result
    }

    /// Hands an already-recorded notification to its subscribers again.
    ///
    /// Tracking positions never move backwards, so this only exercises the
    /// policies' tolerance of duplicate delivery.
    #[tracing::instrument(skip(self))]
    pub async fn redeliver(&self, position: Position) -> Result<usize> {
        let _guard = self.sweep.lock().await;

        let notification = self
            .repo
            .store()
            .get_notification(position)
            .await?
            .ok_or(SystemError::UnknownPosition(position))?;

        let mut delivered = 0;
        for process in &self.processes {
            if let Some(event) = self.routed_event(process.name(), &notification)? {
                self.handle(process.as_ref(), &event, position).await?;
                delivered += 1;
            }
        }

        self.sweep_until_idle().await?;
        Ok(delivered)
    }

    /// Commits a command's unit of work on behalf of `name`, with that
    /// process's projections staged into it.
    pub async fn commit_for(&self, name: ProcessName, mut unit: UnitOfWork) -> Result<Vec<Version>> {
        if let Some(process) = self.processes.iter().find(|p| p.name() == name) {
            stage_projections(&process.projections(), &mut unit)?;
        }
        Ok(self.repo.commit(unit).await?)
    }

    async fn sweep_until_idle(&self) -> Result<usize> {
        let mut delivered = 0;
        loop {
            let mut consumed = 0;
            for process in &self.processes {
                let (seen, handled) = self.drain(process.as_ref()).await?;
                consumed += seen;
                delivered += handled;
            }
            if consumed == 0 {
                return Ok(delivered);
            }
        }
    }

    /// Consumes every pending notification for one process.
    ///
    /// Returns `(consumed, handed to the policy)`.
    async fn drain(&self, process: &dyn Process<S>) -> Result<(usize, usize)> {
        let name = process.name();
        let store = self.repo.store();
        let after = store.get_tracking(name.as_str()).await?;

        let mut notifications = store.notifications(after, self.config.page_size);
        let mut skipped_to: Option<Position> = None;
        let (mut consumed, mut handled) = (0, 0);

        while let Some(notification) = notifications.next().await {
            let notification = notification?;
            consumed += 1;

            match self.routed_event(name, &notification)? {
                Some(event) => {
                    self.handle(process, &event, notification.position).await?;
                    handled += 1;
                    skipped_to = None;
                }
                None => skipped_to = Some(notification.position),
            }
        }

        if let Some(position) = skipped_to {
            let mut unit = UnitOfWork::new();
            unit.track(Tracking::new(name.as_str(), position));
            self.repo.commit(unit).await?;
        }

        if consumed > 0 {
            tracing::debug!(process = %name, consumed, handled, "drained notifications");
        }
        Ok((consumed, handled))
    }

    /// Decodes the notification if the graph routes it to `name`.
    fn routed_event(
        &self,
        name: ProcessName,
        notification: &Notification,
    ) -> Result<Option<SystemEvent>> {
        let envelope = &notification.event;
        let Some(upstream) = ProcessName::owning(&envelope.aggregate_type) else {
            return Ok(None);
        };
        if !self
            .graph
            .is_subscribed(name, upstream, &envelope.event_type)
        {
            return Ok(None);
        }
        Ok(SystemEvent::from_envelope(envelope)?)
    }

    async fn handle(
        &self,
        process: &dyn Process<S>,
        event: &SystemEvent,
        position: Position,
    ) -> Result<()> {
        let name = process.name();
        let mut retries = 0;

        loop {
            match self.attempt(process, event, position).await {
                Ok(()) => {
                    metrics::counter!(
                        "policy_notifications_processed_total",
                        "process" => name.as_str()
                    )
                    .increment(1);
                    return Ok(());
                }
                Err(e) if e.is_version_conflict() && retries < self.config.max_policy_retries => {
                    retries += 1;
                    metrics::counter!("policy_retries_total", "process" => name.as_str())
                        .increment(1);
                    tracing::warn!(process = %name, %position, retries, error = %e, "retrying policy");
                }
                Err(e) => {
                    tracing::error!(process = %name, %position, error = %e, "policy failed");
                    return Err(SystemError::PolicyFailed {
                        process: name,
                        position,
                        source: Box::new(e),
                    });
                }
            }
        }
    }

    async fn attempt(
        &self,
        process: &dyn Process<S>,
        event: &SystemEvent,
        position: Position,
    ) -> Result<()> {
        let mut unit = UnitOfWork::new();
        process.policy(&self.repo, event, &mut unit).await?;

        stage_projections(&process.projections(), &mut unit)?;
        unit.track(Tracking::new(process.name().as_str(), position));

        self.repo.commit(unit).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processes::{NegotiationsProcess, ShippingsProcess, UsersProcess};
    use common::{ShipmentId, UserId};
    use domain::{Aggregate, User};
    use event_store::InMemoryEventStore;

    fn runner(store: &InMemoryEventStore) -> Runner<InMemoryEventStore> {
        Runner::new(
            Repository::new(store.clone()),
            vec![
                Box::new(UsersProcess::new(store.clone())),
                Box::new(ShippingsProcess::new(store.clone())),
                Box::new(NegotiationsProcess::new()),
            ],
            SubscriptionGraph::box_system(),
            RunnerConfig::default(),
        )
    }

    async fn user(repo: &Repository<InMemoryEventStore>, name: &str) -> User {
        let mut user = User::default();
        let events = user.create(UserId::new(), name, "x@y.z").unwrap();
        repo.save(&mut user, events).await.unwrap();
        user
    }

    #[tokio::test]
    async fn unsubscribed_events_only_advance_tracking() {
        let store = InMemoryEventStore::new();
        let runner = runner(&store);
        user(&Repository::new(store.clone()), "Julian").await;

        let handled = runner.run_until_idle().await.unwrap();

        assert_eq!(handled, 0);
        for name in ProcessName::ALL {
            assert_eq!(runner.position_of(name).await.unwrap(), Position::new(1));
        }
    }

    #[tokio::test]
    async fn shipping_started_cascades_through_both_processes() {
        let store = InMemoryEventStore::new();
        let repo = Repository::new(store.clone());
        let runner = runner(&store);
        let mut julian = user(&repo, "Julian").await;
        let niklas = user(&repo, "Niklas").await;
        let shipment_id = ShipmentId::new();

        let events = julian
            .start_shipping(shipment_id, niklas.id().unwrap())
            .unwrap();
        repo.save(&mut julian, events).await.unwrap();

        // users ← ShippingStarted, shippings ← ShippingStarted, users ← Created
        let handled = runner.run_until_idle().await.unwrap();
        assert_eq!(handled, 3);

        let niklas: User = repo.load(niklas.id().unwrap()).await.unwrap();
        assert_eq!(niklas.shipments(), &[shipment_id]);
        assert!(
            repo.find::<domain::Shipping>(shipment_id)
                .await
                .unwrap()
                .is_some()
        );

        // Idle now.
        assert_eq!(runner.run_until_idle().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn redeliver_unknown_position_fails() {
        let store = InMemoryEventStore::new();
        let runner = runner(&store);

        let err = runner.redeliver(Position::new(42)).await.unwrap_err();
        assert!(matches!(err, SystemError::UnknownPosition(p) if p == Position::new(42)));
    }

    #[tokio::test]
    async fn failing_policy_persists_nothing_for_the_notification() {
        let store = InMemoryEventStore::new();
        let repo = Repository::new(store.clone());
        let runner = runner(&store);
        let mut julian = user(&repo, "Julian").await;

        // Receiver was never created, so the users policy cannot load it.
        let events = julian
            .start_shipping(ShipmentId::new(), UserId::new())
            .unwrap();
        repo.save(&mut julian, events).await.unwrap();

        let err = runner.run_until_idle().await.unwrap_err();
        assert!(matches!(
            err,
            SystemError::PolicyFailed {
                process: ProcessName::Users,
                ..
            }
        ));
        assert!(matches!(err.root(), SystemError::NotFound { .. }));
        assert_eq!(
            runner.position_of(ProcessName::Users).await.unwrap(),
            Position::start()
        );
        assert_eq!(store.event_count().await, 2);
    }
}
