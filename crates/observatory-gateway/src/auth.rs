//! Signed-request authentication middleware.
//!
//! Every write-side call (except registration) carries three headers:
//! `X-Agent-ID`, `X-Timestamp`, and `X-Signature`. The canonical signed
//! message is `METHOD:PATH:BODY:TIMESTAMP`. Missing headers are 401; any
//! verification failure (stale timestamp, unknown or dead agent, bad
//! signature) is 403.
//!
//! The middleware buffers the request body to verify the signature, then
//! reassembles the request and stores the authenticated agent id as an
//! extension for the handler.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use observatory_agents::{is_timestamp_valid, verify_request};

use crate::error::GatewayError;
use crate::state::GatewayState;

/// Maximum accepted request body size, in bytes.
const BODY_LIMIT: usize = 1024 * 1024;

/// The authenticated agent id, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthedAgent(pub String);

/// Axum middleware enforcing the signed-request policy.
pub async fn require_agent_auth(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let (mut parts, body) = request.into_parts();

    let agent_id = header_string(&parts.headers, "x-agent-id");
    let timestamp = header_string(&parts.headers, "x-timestamp");
    let signature = header_string(&parts.headers, "x-signature");
    let (Some(agent_id), Some(timestamp), Some(signature)) = (agent_id, timestamp, signature)
    else {
        return Err(GatewayError::AuthMissing);
    };

    let bytes = axum::body::to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|_| GatewayError::Validation(String::from("Unreadable request body")))?;
    let body_text = String::from_utf8_lossy(&bytes).into_owned();

    if !is_timestamp_valid(&timestamp) {
        return Err(GatewayError::AuthInvalid(String::from(
            "Request timestamp expired or invalid",
        )));
    }

    let Some(agent) = state.world.get_agent(&agent_id) else {
        return Err(GatewayError::AuthInvalid(String::from("Agent not found")));
    };
    if !agent.is_alive() {
        return Err(GatewayError::AuthInvalid(String::from("Agent is dead")));
    }

    if !verify_request(
        &agent.public_key,
        parts.method.as_str(),
        parts.uri.path(),
        &body_text,
        &timestamp,
        &signature,
    ) {
        debug!(agent_id = %agent_id, path = %parts.uri.path(), "Signature verification failed");
        return Err(GatewayError::AuthInvalid(String::from("Invalid signature")));
    }

    parts.extensions.insert(AuthedAgent(agent_id));
    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}
