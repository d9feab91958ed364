//! Read model views.

mod shipment_ledger;
mod user_index;

pub use shipment_ledger::{RECEIVINGS_PER_USER, SENDINGS_PER_USER, ShipmentLedger, ShipmentParty};
pub use user_index::{USER_INDEX, UserIndex, UserIndexEntry};
