//! Shipment ledger: which shipments each user sent and received.

use std::str::FromStr;

use common::{ShipmentId, UserId};
use domain::{ShippingEvent, SystemEvent};
use event_store::{EventStore, ProjectionRecord, RecordWrite};
use serde::{Deserialize, Serialize};

use crate::projection::Projection;
use crate::{ProjectionError, Result};

/// Table mapping shipment id to its sender.
pub const SENDINGS_PER_USER: &str = "sendings_per_user";

/// Table mapping shipment id to its receiver.
pub const RECEIVINGS_PER_USER: &str = "receivings_per_user";

/// Value stored in both ledger tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentParty {
    pub user_id: UserId,
}

/// Read model view over the per-user sendings and receivings tables.
///
/// One row per shipment is written to each table when the shipping is
/// created. Rows are write-once.
#[derive(Debug, Clone)]
pub struct ShipmentLedger<S> {
    store: S,
}

impl<S: EventStore> ShipmentLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Shipments sent by `user_id`, ordered by shipment id.
    pub async fn sent_by(&self, user_id: UserId) -> Result<Vec<ShipmentId>> {
        self.shipments_for(SENDINGS_PER_USER, user_id).await
    }

    /// Shipments received by `user_id`, ordered by shipment id.
    pub async fn received_by(&self, user_id: UserId) -> Result<Vec<ShipmentId>> {
        self.shipments_for(RECEIVINGS_PER_USER, user_id).await
    }

    async fn shipments_for(&self, table: &'static str, user_id: UserId) -> Result<Vec<ShipmentId>> {
        let records = self
            .store
            .find_records(table, "user_id", &serde_json::json!(user_id))
            .await?;

        records
            .into_iter()
            .map(|record| parse_shipment_id(table, record))
            .collect()
    }
}

fn parse_shipment_id(table: &'static str, record: ProjectionRecord) -> Result<ShipmentId> {
    ShipmentId::from_str(&record.key).map_err(|e| ProjectionError::MalformedRecord {
        table,
        key: record.key.clone(),
        reason: e.to_string(),
    })
}

impl<S: EventStore> Projection for ShipmentLedger<S> {
    fn name(&self) -> &'static str {
        "ShipmentLedger"
    }

    fn project(&self, event: &SystemEvent) -> Vec<RecordWrite> {
        match event {
            SystemEvent::Shipping(ShippingEvent::Created(data)) => {
                let key = data.shipment_id.to_string();
                vec![
                    RecordWrite::insert(
                        SENDINGS_PER_USER,
                        key.clone(),
                        serde_json::json!(ShipmentParty {
                            user_id: data.sender
                        }),
                    ),
                    RecordWrite::insert(
                        RECEIVINGS_PER_USER,
                        key,
                        serde_json::json!(ShipmentParty {
                            user_id: data.receiver
                        }),
                    ),
                ]
            }
            SystemEvent::User(_) | SystemEvent::Negotiation(_) => vec![],
        }
    }
}
