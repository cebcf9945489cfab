//! Registration, observe, action, and message handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use observatory_agents::{
    CLAIM_TOKEN_TTL_SECONDS, derive_agent_id, generate_challenge, generate_claim_token,
    messaging::Delivery, verify_pow, verify_signed_nonce,
};
use observatory_economy::NewOffer;
use observatory_types::{
    ActionType, AgentStatus, EventDraft, QueuedAction, ResourceKind, unix_now,
};
use observatory_world::{Agent, ResourcePool, SPAWN_REGION_ID, communication_noise_factor};

use crate::auth::AuthedAgent;
use crate::error::GatewayError;
use crate::state::GatewayState;

// ---------------------------------------------------------------------------
// POST /agent/register/challenge
// ---------------------------------------------------------------------------

/// Step 1 of registration: issue a proof-of-work challenge.
pub async fn register_challenge() -> Json<Value> {
    Json(json!({"challenge": generate_challenge()}))
}

// ---------------------------------------------------------------------------
// POST /agent/register
// ---------------------------------------------------------------------------

/// Registration submission.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// The public key the agent will sign requests with.
    #[serde(default)]
    pub agent_public_key: String,
    /// Optional display name (defaults to the derived agent id).
    #[serde(default)]
    pub agent_display_name: String,
    /// Client-chosen nonce, signed to prove key possession.
    #[serde(default)]
    pub nonce: String,
    /// Signature over `nonce` with the key's private counterpart.
    #[serde(default)]
    pub signed_nonce: String,
    /// The challenge from step 1.
    #[serde(default)]
    pub pow_challenge: String,
    /// A nonce solving the challenge.
    #[serde(default)]
    pub pow_nonce: String,
}

/// Step 2 of registration: verify PoW and the signed nonce, then create
/// the agent in the unclaimed state.
pub async fn register_agent(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Value>, GatewayError> {
    if request.agent_public_key.is_empty() {
        return Err(GatewayError::Validation(String::from(
            "Missing agent_public_key",
        )));
    }
    if !verify_pow(&request.pow_challenge, &request.pow_nonce) {
        return Err(GatewayError::Validation(String::from(
            "Invalid proof-of-work",
        )));
    }
    if !verify_signed_nonce(
        &request.agent_public_key,
        &request.nonce,
        &request.signed_nonce,
    ) {
        return Err(GatewayError::Validation(String::from("Invalid signature")));
    }

    let agent_id = derive_agent_id(&request.agent_public_key);
    if state.world.get_agent(&agent_id).is_some() {
        return Err(GatewayError::Validation(String::from(
            "Agent already registered",
        )));
    }

    let claim_token = generate_claim_token();
    let tick = state.world.current_tick();
    let resources = ResourcePool::create_default();
    let initial_resources =
        serde_json::to_value(resources.as_map()).unwrap_or_else(|_| json!({}));

    let display_name = if request.agent_display_name.is_empty() {
        agent_id.clone()
    } else {
        request.agent_display_name.clone()
    };

    state.world.insert_agent(Agent {
        agent_id: agent_id.clone(),
        display_name,
        public_key: request.agent_public_key,
        region: String::from(SPAWN_REGION_ID),
        resources,
        status: AgentStatus::Unclaimed,
        owner_identity: None,
        claim_token: Some(claim_token.clone()),
        claim_token_expires: Some(unix_now() + CLAIM_TOKEN_TTL_SECONDS),
        alliances: Vec::new(),
        created_at_tick: tick,
        died_at_tick: None,
        parent_agent: None,
    });
    if let Err(err) = state.world.save() {
        tracing::warn!(%err, "World snapshot save failed after registration");
    }

    state.ledger.append(EventDraft {
        tick,
        action_type: String::from("register"),
        agent_id: agent_id.clone(),
        success: true,
        details: json!({
            "spawn_region": SPAWN_REGION_ID,
            "initial_resources": initial_resources,
        }),
        error: None,
    });

    info!(agent_id = %agent_id, "Agent registered (unclaimed)");

    Ok(Json(json!({
        "success": true,
        "agent_id": agent_id,
        "claim_token": claim_token,
        "claim_url": state.claim_url(&claim_token),
        "initial_spawn_region": SPAWN_REGION_ID,
        "initial_resources": initial_resources,
        "auth_method": "signed_requests",
        "instructions": "Return the claim_url to your human operator for ownership verification.",
    })))
}

// ---------------------------------------------------------------------------
// POST /agent/observe
// ---------------------------------------------------------------------------

/// Immediate observation: surroundings, own resources, inbox tail, and
/// pending trades. Not queued and free of charge; the queued `observe`
/// action is the paid variant.
pub async fn agent_observe(
    State(state): State<Arc<GatewayState>>,
    Extension(AuthedAgent(agent_id)): Extension<AuthedAgent>,
) -> Result<Json<Value>, GatewayError> {
    let (tick, region, visible_agents, resources, status) = {
        let world = state.world.lock();
        let Some(agent) = world.agents.get(&agent_id) else {
            return Err(GatewayError::Validation(String::from("Agent not found")));
        };
        let region = world.regions.get(&agent.region);
        let visible: Vec<Value> = region.map_or_else(Vec::new, |r| {
            r.occupants
                .iter()
                .filter_map(|id| world.agents.get(id))
                .filter(|a| a.is_alive())
                .map(|a| {
                    json!({
                        "agent_id": a.agent_id,
                        "display_name": a.display_name,
                        "status": a.status,
                    })
                })
                .collect()
        });
        (
            world.tick,
            region.map(observatory_world::Region::view),
            visible,
            agent.resources.as_map(),
            agent.status,
        )
    };

    let inbox: Vec<Value> = state
        .messages
        .get_inbox(&agent_id, 0)
        .iter()
        .rev()
        .take(20)
        .rev()
        .map(|m| serde_json::to_value(m).unwrap_or_default())
        .collect();
    let pending_trades: Vec<Value> = state
        .trades
        .offers_for_agent(&agent_id)
        .iter()
        .map(|o| serde_json::to_value(o).unwrap_or_default())
        .collect();

    Ok(Json(json!({
        "success": true,
        "tick": tick,
        "region": region,
        "visible_agents": visible_agents,
        "your_resources": resources,
        "your_status": status,
        "inbox": inbox,
        "pending_trades": pending_trades,
    })))
}

// ---------------------------------------------------------------------------
// POST /agent/action
// ---------------------------------------------------------------------------

/// An action submission.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    /// Wire name of the action.
    #[serde(default)]
    pub action_type: String,
    /// Action-specific parameters.
    #[serde(default)]
    pub params: Value,
}

/// Submit an action to the world.
///
/// Queueable actions return `{queued_at_tick}` immediately and resolve at
/// the next tick. `accept_trade` is the exception: it settles against the
/// trade book right away.
pub async fn agent_action(
    State(state): State<Arc<GatewayState>>,
    Extension(AuthedAgent(agent_id)): Extension<AuthedAgent>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<Value>, GatewayError> {
    if request.action_type == "accept_trade" {
        return accept_trade(&state, &agent_id, &request.params);
    }

    let Some(action_type) = ActionType::parse(&request.action_type) else {
        return Err(GatewayError::Validation(format!(
            "Invalid action type: {}",
            request.action_type
        )));
    };

    let Some(agent) = state.world.get_agent(&agent_id) else {
        return Err(GatewayError::Validation(String::from("Agent not found")));
    };
    if !agent.is_alive() {
        return Err(GatewayError::Validation(String::from("Agent is dead")));
    }
    if agent.status == AgentStatus::Unclaimed && action_type != ActionType::Observe {
        return Err(GatewayError::Validation(String::from(
            "Agent is unclaimed. Only observe actions allowed until claimed.",
        )));
    }

    let tick = state.world.current_tick();

    // Trade submissions validate their parameters up front and record the
    // pending offer; the action cost is debited at resolution.
    if action_type == ActionType::Trade {
        let offer = parse_trade_params(&request.params)?;
        state.trades.create_offer(NewOffer {
            tick,
            from_agent: agent_id.clone(),
            to_agent: offer.target_agent,
            offer_resource: offer.offer_resource,
            offer_amount: offer.offer_amount,
            request_resource: offer.request_resource,
            request_amount: offer.request_amount,
        });
    }

    state.engine.enqueue_action(QueuedAction::new(
        agent_id,
        action_type,
        request.params,
        tick,
    ));

    Ok(Json(json!({
        "success": true,
        "action_type": action_type,
        "details": {"queued_at_tick": tick},
    })))
}

/// Immediate trade acceptance against the trade book.
fn accept_trade(
    state: &GatewayState,
    agent_id: &str,
    params: &Value,
) -> Result<Json<Value>, GatewayError> {
    let Some(offer_id) = params.get("offer_id").and_then(Value::as_str) else {
        return Err(GatewayError::Validation(String::from("Missing offer_id")));
    };
    let tick = state.world.current_tick();
    let receipt = state
        .trades
        .accept_offer(&state.world, offer_id, agent_id, tick)?;
    Ok(Json(json!({
        "success": true,
        "offer_id": receipt.offer_id,
        "executed_at_tick": receipt.executed_at_tick,
    })))
}

struct TradeParams {
    target_agent: String,
    offer_resource: ResourceKind,
    offer_amount: f64,
    request_resource: ResourceKind,
    request_amount: f64,
}

fn parse_trade_params(params: &Value) -> Result<TradeParams, GatewayError> {
    let target = params.get("target_agent").and_then(Value::as_str);
    let offer_resource = params.get("offer_resource").and_then(Value::as_str);
    let request_resource = params.get("request_resource").and_then(Value::as_str);
    let (Some(target), Some(offer_resource), Some(request_resource)) =
        (target, offer_resource, request_resource)
    else {
        return Err(GatewayError::Validation(String::from(
            "Missing trade parameters",
        )));
    };

    let (Some(offer_kind), Some(request_kind)) = (
        ResourceKind::parse(offer_resource),
        ResourceKind::parse(request_resource),
    ) else {
        return Err(GatewayError::Validation(String::from(
            "Invalid resource kind",
        )));
    };

    let offer_amount = params
        .get("offer_amount")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let request_amount = params
        .get("request_amount")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    if offer_amount < 0.0 || request_amount < 0.0 {
        return Err(GatewayError::Validation(String::from(
            "Negative trade amount",
        )));
    }

    Ok(TradeParams {
        target_agent: target.to_owned(),
        offer_resource: offer_kind,
        offer_amount,
        request_resource: request_kind,
        request_amount,
    })
}

// ---------------------------------------------------------------------------
// POST /agent/message
// ---------------------------------------------------------------------------

/// A direct message submission.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    /// Recipient agent id.
    #[serde(default)]
    pub target_agent: String,
    /// Message content.
    #[serde(default)]
    pub content: String,
}

/// Queue a `send_message` action (costs debit at the next tick) and
/// perform an immediate noisy delivery into the target's inbox.
pub async fn agent_message(
    State(state): State<Arc<GatewayState>>,
    Extension(AuthedAgent(agent_id)): Extension<AuthedAgent>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<Value>, GatewayError> {
    if request.target_agent.is_empty() || request.content.is_empty() {
        return Err(GatewayError::Validation(String::from(
            "Missing target_agent or content",
        )));
    }

    let Some(agent) = state.world.get_agent(&agent_id) else {
        return Err(GatewayError::Validation(String::from("Agent not found")));
    };
    if !agent.is_alive() {
        return Err(GatewayError::Validation(String::from("Agent is dead")));
    }
    if agent.status == AgentStatus::Unclaimed {
        return Err(GatewayError::Validation(String::from(
            "Agent is unclaimed. Only observe actions allowed until claimed.",
        )));
    }

    let tick = state.world.current_tick();
    state.engine.enqueue_action(QueuedAction::new(
        agent_id.clone(),
        ActionType::SendMessage,
        json!({
            "target_agent": request.target_agent,
            "content": request.content,
        }),
        tick,
    ));

    // Immediate delivery alongside the queued (and billed) action.
    let delivery = {
        let world = state.world.lock();
        world.agents.get(&request.target_agent).map(|target| {
            let noise = match (
                world.regions.get(&agent.region),
                world.regions.get(&target.region),
            ) {
                (Some(source), Some(dest)) => communication_noise_factor(source, dest),
                _ => 0.0,
            };
            Delivery {
                tick,
                from_agent: agent_id.clone(),
                to_agent: request.target_agent.clone(),
                content: request.content.clone(),
                noise_factor: noise,
                sender_region: agent.region.clone(),
                receiver_region: target.region.clone(),
            }
        })
    };
    if let Some(delivery) = delivery {
        state.messages.send_message(delivery);
    }

    Ok(Json(json!({"success": true, "queued": true})))
}
