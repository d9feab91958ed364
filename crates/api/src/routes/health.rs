//! Health check endpoint.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use event_store::EventStore;
use pipeline::ProcessName;
use serde::Serialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Last log position each process has consumed.
    pub processes: BTreeMap<&'static str, i64>,
}

/// GET /health: storage reachability and pipeline progress.
pub async fn check<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let mut processes = BTreeMap::new();
    for name in ProcessName::ALL {
        let position = system.runner().position_of(name).await?;
        processes.insert(name.as_str(), position.as_i64());
    }

    Ok(Json(HealthResponse {
        status: "ok",
        processes,
    }))
}
