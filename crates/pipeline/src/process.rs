//! The process application trait.

use async_trait::async_trait;
use domain::{Repository, SystemEvent, UnitOfWork};
use event_store::EventStore;
use projections::Projection;

use crate::error::Result;
use crate::graph::ProcessName;

/// A process application: a policy reacting to upstream events plus the
/// projections maintained over the events it persists.
///
/// The runner only calls `policy` for events the subscription graph routes
/// to this process. Whatever the policy records in `unit` is committed
/// together with the projection writes and the process's new tracking
/// position, so a notification is either fully handled or not at all.
#[async_trait]
pub trait Process<S: EventStore>: Send + Sync {
    fn name(&self) -> ProcessName;

    /// Projections applied to every event this process persists.
    fn projections(&self) -> Vec<&dyn Projection>;

    /// Reacts to one upstream event by recording new events into `unit`.
    ///
    /// Must tolerate the same event being delivered more than once.
    async fn policy(
        &self,
        repo: &Repository<S>,
        event: &SystemEvent,
        unit: &mut UnitOfWork,
    ) -> Result<()>;
}
