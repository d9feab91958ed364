//! The box system facade: commands and queries over the pipeline.

use std::collections::HashMap;

use common::{NegotiationId, ShipmentId, UserId};
use domain::{
    Negotiation, NegotiationError, NegotiationEvent, NegotiationStatus, Repository, Shipping,
    UnitOfWork, User,
};
use event_store::EventStore;
use projections::{ShipmentLedger, UserIndex};

use crate::error::{Result, SystemError};
use crate::graph::{ProcessName, SubscriptionGraph};
use crate::process::Process;
use crate::processes::{NegotiationsProcess, ShippingsProcess, UsersProcess};
use crate::runner::{Runner, RunnerConfig};

/// Entry point for the request layer.
///
/// Every command loads what it needs, records its events through the
/// process that owns the aggregate and then runs the pipeline until idle, so
/// all downstream effects are visible when the command returns. If a
/// downstream policy fails, the command's own events stay persisted and the
/// error is returned; the failed notification is retried on the next run.
pub struct BoxSystem<S> {
    repo: Repository<S>,
    runner: Runner<S>,
    index: UserIndex<S>,
    ledger: ShipmentLedger<S>,
}

impl<S: EventStore + Clone + 'static> BoxSystem<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, RunnerConfig::default())
    }

    pub fn with_config(store: S, config: RunnerConfig) -> Self {
        let repo = Repository::new(store.clone());
        let processes: Vec<Box<dyn Process<S>>> = vec![
            Box::new(UsersProcess::new(store.clone())),
            Box::new(ShippingsProcess::new(store.clone())),
            Box::new(NegotiationsProcess::new()),
        ];
        let runner = Runner::new(
            repo.clone(),
            processes,
            SubscriptionGraph::box_system(),
            config,
        );

        Self {
            repo,
            runner,
            index: UserIndex::new(store.clone()),
            ledger: ShipmentLedger::new(store),
        }
    }

    pub fn runner(&self) -> &Runner<S> {
        &self.runner
    }

    pub fn repository(&self) -> &Repository<S> {
        &self.repo
    }

    pub fn store(&self) -> &S {
        self.repo.store()
    }

    // Commands

    /// Registers a user; names and emails are unique, checked name first.
    #[tracing::instrument(skip(self))]
    pub async fn create_user(&self, name: &str, email: &str) -> Result<UserId> {
        metrics::counter!("commands_total", "command" => "create_user").increment(1);

        if self.index.user_id_by_name(name).await?.is_some() {
            return Err(SystemError::UserAlreadyExists(name.to_string()));
        }
        if self.index.user_id_by_email(email).await?.is_some() {
            return Err(SystemError::EmailAlreadyExists(email.to_string()));
        }

        let user_id = UserId::new();
        let mut user = User::default();
        let events = user.create(user_id, name, email)?;

        self.persist(ProcessName::Users, &mut user, events).await?;
        tracing::info!(%user_id, "user created");
        Ok(user_id)
    }

    /// Starts a shipment from `sender` to `receiver` and returns its id.
    #[tracing::instrument(skip(self))]
    pub async fn start_shipping(&self, sender: UserId, receiver: UserId) -> Result<ShipmentId> {
        metrics::counter!("commands_total", "command" => "start_shipping").increment(1);

        let mut user: User = self.repo.load(sender).await?;
        if receiver != sender {
            self.repo.load::<User>(receiver).await?;
        }

        let shipment_id = ShipmentId::new();
        let events = user.start_shipping(shipment_id, receiver)?;

        self.persist(ProcessName::Users, &mut user, events).await?;
        tracing::info!(%shipment_id, "shipping started");
        Ok(shipment_id)
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_negotiation(
        &self,
        author: &str,
        box_ref: &str,
        date: &str,
    ) -> Result<NegotiationId> {
        metrics::counter!("commands_total", "command" => "create_negotiation").increment(1);

        let negotiation_id = NegotiationId::new();
        let mut negotiation = Negotiation::default();
        let events = negotiation.create(negotiation_id, author, box_ref, date)?;

        self.persist(ProcessName::Negotiations, &mut negotiation, events)
            .await?;
        Ok(negotiation_id)
    }

    /// Opens an offer. Returns the new status.
    pub async fn create_offer(&self, id: NegotiationId) -> Result<NegotiationStatus> {
        self.negotiate(id, "create_offer", Negotiation::create_offer)
            .await
    }

    pub async fn accept_offer(&self, id: NegotiationId) -> Result<NegotiationStatus> {
        self.negotiate(id, "accept_offer", Negotiation::accept_offer)
            .await
    }

    pub async fn reject_offer(&self, id: NegotiationId) -> Result<NegotiationStatus> {
        self.negotiate(id, "reject_offer", Negotiation::reject_offer)
            .await
    }

    #[tracing::instrument(skip(self, decide))]
    async fn negotiate(
        &self,
        id: NegotiationId,
        command: &'static str,
        decide: fn(&Negotiation) -> std::result::Result<Vec<NegotiationEvent>, NegotiationError>,
    ) -> Result<NegotiationStatus> {
        metrics::counter!("commands_total", "command" => command).increment(1);

        let mut negotiation: Negotiation = self.repo.load(id).await?;
        let events = decide(&negotiation)?;

        self.persist(ProcessName::Negotiations, &mut negotiation, events)
            .await?;
        Ok(negotiation.status())
    }

    async fn persist<A: domain::Aggregate>(
        &self,
        owner: ProcessName,
        aggregate: &mut A,
        events: Vec<A::Event>,
    ) -> Result<()> {
        let mut unit = UnitOfWork::new();
        unit.record(aggregate, events)?;
        self.runner.commit_for(owner, unit).await?;
        self.runner.run_until_idle().await?;
        Ok(())
    }

    // Queries

    pub async fn get_user(&self, id: UserId) -> Result<User> {
        Ok(self.repo.load(id).await?)
    }

    pub async fn get_shipment(&self, id: ShipmentId) -> Result<Shipping> {
        Ok(self.repo.load(id).await?)
    }

    pub async fn get_negotiation(&self, id: NegotiationId) -> Result<Negotiation> {
        Ok(self.repo.load(id).await?)
    }

    pub async fn get_user_id_by_name(&self, name: &str) -> Result<Option<UserId>> {
        Ok(self.index.user_id_by_name(name).await?)
    }

    pub async fn get_user_id_by_email(&self, email: &str) -> Result<Option<UserId>> {
        Ok(self.index.user_id_by_email(email).await?)
    }

    /// Shipments sent by the user, oldest first; empty for unknown users.
    pub async fn get_sent_by(&self, user_id: UserId) -> Result<Vec<ShipmentId>> {
        let shipments = self.ledger.sent_by(user_id).await?;
        self.in_user_order(user_id, shipments).await
    }

    /// Shipments received by the user, oldest first; empty for unknown users.
    pub async fn get_received_by(&self, user_id: UserId) -> Result<Vec<ShipmentId>> {
        let shipments = self.ledger.received_by(user_id).await?;
        self.in_user_order(user_id, shipments).await
    }

    /// Sorts ledger rows by the order the user's stream recorded them.
    async fn in_user_order(
        &self,
        user_id: UserId,
        mut shipments: Vec<ShipmentId>,
    ) -> Result<Vec<ShipmentId>> {
        if let Some(user) = self.repo.find::<User>(user_id).await? {
            let rank: HashMap<_, _> = user
                .shipments()
                .iter()
                .enumerate()
                .map(|(i, id)| (*id, i))
                .collect();
            shipments.sort_by_key(|id| rank.get(id).copied().unwrap_or(usize::MAX));
        }
        Ok(shipments)
    }
}
