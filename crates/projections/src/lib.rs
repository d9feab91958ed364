//! Read models derived from the event log.
//!
//! Projections here never rebuild from scratch. Each one turns an event into
//! record writes that are committed in the same unit of work as the event:
//! - [`Projection`] trait mapping a [`domain::SystemEvent`] to record writes
//! - [`UserIndex`]: name and email to user id
//! - [`ShipmentLedger`]: shipments sent and received per user

pub mod error;
pub mod projection;
pub mod views;

pub use error::{ProjectionError, Result};
pub use projection::{Projection, stage_projections};
pub use views::{
    RECEIVINGS_PER_USER, SENDINGS_PER_USER, ShipmentLedger, ShipmentParty, USER_INDEX, UserIndex,
    UserIndexEntry,
};
