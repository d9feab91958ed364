//! Shipment lookup.

use axum::Json;
use axum::extract::{Path, State};
use event_store::EventStore;
use serde::Serialize;

use super::{AppState, parse_aggregate_id};
use crate::error::ApiError;

#[derive(Serialize)]
pub struct ShipmentResponse {
    pub id: String,
    pub sender: String,
    pub receiver: String,
}

/// GET /shipments/{id}
#[tracing::instrument(skip(system))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<ShipmentResponse>, ApiError> {
    let shipment_id = parse_aggregate_id(&id)?;
    let shipping = system.get_shipment(shipment_id).await?;

    Ok(Json(ShipmentResponse {
        id: shipment_id.to_string(),
        sender: shipping.sender().map(|s| s.to_string()).unwrap_or_default(),
        receiver: shipping.receiver().map(|r| r.to_string()).unwrap_or_default(),
    }))
}
