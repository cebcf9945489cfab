//! The claim flow: the only human-reachable mutation path.
//!
//! Possession of a single-use claim token gates everything. The kernel
//! records what the out-of-band verifier asserts (an identity string and
//! a method name); it does not authenticate the channel itself.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};

use observatory_types::EventDraft;

use crate::error::GatewayError;
use crate::state::GatewayState;

/// GET `/claim/{claim_token}` -- the verification page data.
pub async fn claim_page(
    State(state): State<Arc<GatewayState>>,
    Path(claim_token): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    let info = state.lifecycle.verification_phrase(&claim_token)?;
    Ok(Json(json!({
        "claim_token": claim_token,
        "agent_id": info.agent_id,
        "display_name": info.display_name,
        "verification_phrase": info.verification_phrase,
        "short_code": info.short_code,
        "instructions": info.instructions,
    })))
}

/// Ownership proof submission.
#[derive(Debug, Deserialize)]
pub struct ClaimVerifyRequest {
    /// The verified operator identity (e.g. a social handle).
    #[serde(default)]
    pub owner_identity: String,
    /// How ownership was verified; recorded verbatim.
    #[serde(default = "default_verification_method")]
    pub verification_method: String,
}

fn default_verification_method() -> String {
    String::from("x_post")
}

/// POST `/claim/{claim_token}/verify` -- consume the token atomically.
pub async fn claim_verify(
    State(state): State<Arc<GatewayState>>,
    Path(claim_token): Path<String>,
    Json(request): Json<ClaimVerifyRequest>,
) -> Result<Json<Value>, GatewayError> {
    let owner_identity = request.owner_identity.trim();
    if owner_identity.is_empty() {
        return Err(GatewayError::Validation(String::from(
            "Missing owner identity",
        )));
    }

    let receipt = state.lifecycle.claim_agent(
        &claim_token,
        owner_identity,
        &request.verification_method,
    )?;

    state.ledger.append(EventDraft {
        tick: state.world.current_tick(),
        action_type: String::from("claim"),
        agent_id: receipt.agent_id.clone(),
        success: true,
        details: json!({
            "owner_identity": receipt.owner_identity,
            "verification_method": receipt.verification_method,
        }),
        error: None,
    });

    Ok(Json(json!({
        "success": true,
        "agent_id": receipt.agent_id,
        "display_name": receipt.display_name,
        "owner_identity": receipt.owner_identity,
        "verification_method": receipt.verification_method,
        "status": receipt.status,
    })))
}
