//! User registration and lookup endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Aggregate, User};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::{AppState, parse_aggregate_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct UserCreatedResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub shipments: Vec<String>,
}

impl UserResponse {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id().map(|id| id.to_string()).unwrap_or_default(),
            name: user.name().to_string(),
            email: user.email().to_string(),
            shipments: user.shipments().iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct UserIdResponse {
    pub id: String,
}

/// POST /users: register a user.
#[tracing::instrument(skip(system, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserCreatedResponse>), ApiError> {
    let user_id = system.create_user(&req.name, &req.email).await?;

    let response = UserCreatedResponse {
        id: user_id.to_string(),
        name: req.name,
        email: req.email,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /debug/user: register a throwaway user with a generated name and email.
#[tracing::instrument(skip(system))]
pub async fn debug_user<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
) -> Result<Json<UserCreatedResponse>, ApiError> {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];
    let name = format!("User{suffix}");
    let email = format!("{suffix}@b.c");

    let user_id = system.create_user(&name, &email).await?;
    Ok(Json(UserCreatedResponse {
        id: user_id.to_string(),
        name,
        email,
    }))
}

/// GET /users/{id}
#[tracing::instrument(skip(system))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = system.get_user(parse_aggregate_id(&id)?).await?;
    Ok(Json(UserResponse::from_user(&user)))
}

/// GET /users/by-name/{name}
#[tracing::instrument(skip(system))]
pub async fn by_name<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Path(name): Path<String>,
) -> Result<Json<UserIdResponse>, ApiError> {
    let id = system
        .get_user_id_by_name(&name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No user named {name}")))?;
    Ok(Json(UserIdResponse { id: id.to_string() }))
}

/// GET /users/by-email/{email}
#[tracing::instrument(skip(system))]
pub async fn by_email<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Path(email): Path<String>,
) -> Result<Json<UserIdResponse>, ApiError> {
    let id = system
        .get_user_id_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No user with email {email}")))?;
    Ok(Json(UserIdResponse { id: id.to_string() }))
}

/// GET /users/{id}/sent: shipments the user sent.
pub async fn sent<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let shipments = system.get_sent_by(parse_aggregate_id(&id)?).await?;
    Ok(Json(shipments.iter().map(|s| s.to_string()).collect()))
}

/// GET /users/{id}/received: shipments addressed to the user.
pub async fn received<S: EventStore + Clone + 'static>(
    State(system): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let shipments = system.get_received_by(parse_aggregate_id(&id)?).await?;
    Ok(Json(shipments.iter().map(|s| s.to_string()).collect()))
}
