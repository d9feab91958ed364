//! Shipping requests between users.
//!
//! Package size and drop-off date are not part of a request.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::{AppState, parse_aggregate_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct NewRequest {
    pub sender: String,
    pub receiver: String,
}

#[derive(Serialize)]
pub struct RequestCreatedResponse {
    pub id: String,
}

/// POST /requests/new: start shipping from `sender` to `receiver`.
#[tracing::instrument(skip(system, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Json(req): Json<NewRequest>,
) -> Result<(StatusCode, Json<RequestCreatedResponse>), ApiError> {
    let sender = parse_aggregate_id(&req.sender)?;
    let receiver = parse_aggregate_id(&req.receiver)?;

    let shipment_id = system.start_shipping(sender, receiver).await?;

    Ok((
        StatusCode::CREATED,
        Json(RequestCreatedResponse {
            id: shipment_id.to_string(),
        }),
    ))
}

/// GET /requests/{user_id}: every shipment the user is party to.
#[tracing::instrument(skip(system))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let user = system.get_user(parse_aggregate_id(&user_id)?).await?;
    Ok(Json(user.shipments().iter().map(|s| s.to_string()).collect()))
}
