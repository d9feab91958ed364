//! HTTP request layer for the box system.
//!
//! Translates JSON requests into [`BoxSystem`] commands and queries and maps
//! each error kind to its own response. Structured logging comes from
//! tracing, metrics are exported for Prometheus.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use pipeline::BoxSystem;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    system: AppState<S>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/users", post(routes::users::create::<S>))
        .route("/users/{id}", get(routes::users::get::<S>))
        .route("/users/{id}/sent", get(routes::users::sent::<S>))
        .route("/users/{id}/received", get(routes::users::received::<S>))
        .route("/users/by-name/{name}", get(routes::users::by_name::<S>))
        .route("/users/by-email/{email}", get(routes::users::by_email::<S>))
        .route("/debug/user", get(routes::users::debug_user::<S>))
        .route("/requests/new", post(routes::requests::create::<S>))
        .route("/requests/{user_id}", get(routes::requests::list::<S>))
        .route("/shipments/{id}", get(routes::shipments::get::<S>))
        .route("/negotiations", post(routes::negotiations::create::<S>))
        .route("/negotiations/{id}", get(routes::negotiations::get::<S>))
        .route(
            "/negotiations/{id}/offer",
            post(routes::negotiations::offer::<S>),
        )
        .route(
            "/negotiations/{id}/accept",
            post(routes::negotiations::accept::<S>),
        )
        .route(
            "/negotiations/{id}/reject",
            post(routes::negotiations::reject::<S>),
        )
        .with_state(system)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the box system over `event_store`, tuned by `config`.
pub fn create_system<S: EventStore + Clone + 'static>(
    event_store: S,
    config: &Config,
) -> AppState<S> {
    Arc::new(BoxSystem::with_config(event_store, config.runner()))
}
