//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod negotiations;
pub mod requests;
pub mod shipments;
pub mod users;

use std::sync::Arc;

use common::AggregateId;
use pipeline::BoxSystem;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub type AppState<S> = Arc<BoxSystem<S>>;

fn parse_aggregate_id(id: &str) -> Result<AggregateId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(AggregateId::from(uuid))
}
