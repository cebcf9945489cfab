//! Route assembly for the observer API.
//!
//! All routes are registered as `GET` only, and a method-guard layer
//! rejects anything that is not `GET`, `HEAD` or `OPTIONS` with 405 --
//! the surface cannot mutate even if a write route were added by
//! mistake.

use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ObserverError;
use crate::handlers;
use crate::state::ObserverState;

/// Build the complete observer router under `/api/observer`.
///
/// Routes:
/// - `GET /api/observer/world/state`
/// - `GET /api/observer/world/regions`
/// - `GET /api/observer/agents` and `/agents/{agent_id}`
/// - `GET /api/observer/ledger/events`
/// - `GET /api/observer/analytics/summary`
/// - `GET /api/observer/replay/{tick}`
/// - `GET /api/observer/timeline` and `/timeline/{agent_id}`
///
/// CORS allows any origin so dashboards can consume the API directly.
pub fn build_router(state: Arc<ObserverState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/observer/world/state", get(handlers::world_state))
        .route("/api/observer/world/regions", get(handlers::world_regions))
        .route("/api/observer/agents", get(handlers::all_agents))
        .route("/api/observer/agents/{agent_id}", get(handlers::agent_detail))
        .route("/api/observer/ledger/events", get(handlers::ledger_events))
        .route(
            "/api/observer/analytics/summary",
            get(handlers::analytics_summary),
        )
        .route("/api/observer/replay/{tick}", get(handlers::replay_at_tick))
        .route("/api/observer/timeline", get(handlers::world_timeline))
        .route(
            "/api/observer/timeline/{agent_id}",
            get(handlers::agent_timeline),
        )
        .layer(middleware::from_fn(enforce_read_only))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Reject any non-read method before it can reach a handler.
async fn enforce_read_only(request: Request, next: Next) -> Response {
    match *request.method() {
        Method::GET | Method::HEAD | Method::OPTIONS => next.run(request).await,
        _ => ObserverError::ReadOnly.into_response(),
    }
}
