//! Route assembly for the write gateway.
//!
//! The registration endpoints run their own verification (PoW plus a
//! signed nonce) and the claim endpoints are gated by token possession;
//! everything else sits behind the signed-request middleware.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::GatewayState;
use crate::{auth, claim, routes};

/// Build the complete gateway router.
///
/// Routes:
/// - `POST /agent/register/challenge` -- PoW challenge (open)
/// - `POST /agent/register` -- registration (self-verifying)
/// - `POST /agent/observe` -- immediate observation (signed)
/// - `POST /agent/action` -- action submission (signed)
/// - `POST /agent/message` -- message submission (signed)
/// - `GET /claim/{claim_token}` -- verification page data (token-gated)
/// - `POST /claim/{claim_token}/verify` -- the atomic claim (token-gated)
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let signed = Router::new()
        .route("/agent/observe", post(routes::agent_observe))
        .route("/agent/action", post(routes::agent_action))
        .route("/agent/message", post(routes::agent_message))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_agent_auth,
        ));

    Router::new()
        .route("/agent/register/challenge", post(routes::register_challenge))
        .route("/agent/register", post(routes::register_agent))
        .route("/claim/{claim_token}", get(claim::claim_page))
        .route("/claim/{claim_token}/verify", post(claim::claim_verify))
        .merge(signed)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
