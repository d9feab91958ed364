//! Core projection trait.

use domain::{SystemEvent, UnitOfWork};
use event_store::RecordWrite;

use crate::Result;

/// A projection that derives record writes from events.
///
/// Writes are staged into the unit of work that persists the event, so a
/// projection is never ahead of or behind the log it derives from.
pub trait Projection: Send + Sync {
    /// Returns the name of this projection.
    fn name(&self) -> &'static str;

    /// Returns the record writes `event` causes; empty if it is not relevant.
    fn project(&self, event: &SystemEvent) -> Vec<RecordWrite>;
}

/// Runs every projection over the events staged in `unit` and stages the
/// resulting writes into the same unit. Returns the number of writes added.
pub fn stage_projections(projections: &[&dyn Projection], unit: &mut UnitOfWork) -> Result<usize> {
    let mut events = Vec::with_capacity(unit.event_count());
    for envelope in unit.events() {
        if let Some(event) = SystemEvent::from_envelope(envelope)? {
            events.push(event);
        }
    }

    let mut staged = 0;
    for projection in projections {
        for event in &events {
            for write in projection.project(event) {
                tracing::trace!(
                    projection = projection.name(),
                    table = %write.record.table,
                    key = %write.record.key,
                    "staging record write"
                );
                unit.write(write);
                staged += 1;
            }
        }
    }

    Ok(staged)
}
