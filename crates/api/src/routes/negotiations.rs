//! Negotiation endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::NegotiationStatus;
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::{AppState, parse_aggregate_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateNegotiationRequest {
    pub author: String,
    #[serde(rename = "box")]
    pub box_ref: String,
    pub date: String,
}

#[derive(Serialize)]
pub struct NegotiationCreatedResponse {
    pub id: String,
}

#[derive(Serialize)]
pub struct NegotiationResponse {
    pub id: String,
    pub author: String,
    #[serde(rename = "box")]
    pub box_ref: String,
    pub date: String,
    pub status: NegotiationStatus,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub id: String,
    pub status: NegotiationStatus,
}

/// POST /negotiations
#[tracing::instrument(skip(system, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Json(req): Json<CreateNegotiationRequest>,
) -> Result<(StatusCode, Json<NegotiationCreatedResponse>), ApiError> {
    let id = system
        .create_negotiation(&req.author, &req.box_ref, &req.date)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(NegotiationCreatedResponse { id: id.to_string() }),
    ))
}

/// GET /negotiations/{id}
#[tracing::instrument(skip(system))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<NegotiationResponse>, ApiError> {
    let negotiation_id = parse_aggregate_id(&id)?;
    let negotiation = system.get_negotiation(negotiation_id).await?;

    Ok(Json(NegotiationResponse {
        id: negotiation_id.to_string(),
        author: negotiation.author().to_string(),
        box_ref: negotiation.box_ref().to_string(),
        date: negotiation.date().to_string(),
        status: negotiation.status(),
    }))
}

/// POST /negotiations/{id}/offer
pub async fn offer<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let negotiation_id = parse_aggregate_id(&id)?;
    let status = system.create_offer(negotiation_id).await?;
    Ok(Json(StatusResponse { id, status }))
}

/// POST /negotiations/{id}/accept
pub async fn accept<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let negotiation_id = parse_aggregate_id(&id)?;
    let status = system.accept_offer(negotiation_id).await?;
    Ok(Json(StatusResponse { id, status }))
}

/// POST /negotiations/{id}/reject
pub async fn reject<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let negotiation_id = parse_aggregate_id(&id)?;
    let status = system.reject_offer(negotiation_id).await?;
    Ok(Json(StatusResponse { id, status }))
}
