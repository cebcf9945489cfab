//! Deterministic, server-authoritative action resolution.
//!
//! Each action type resolves through a dedicated handler over the locked
//! world and the pre-tick agent view. Handlers validate first and debit
//! last: a failed pre-condition returns a failure result with no partial
//! debit. Successful results carry the exact details the tick engine
//! needs to apply side effects.
//!
//! Liveness and location checks run against the snapshot view captured at
//! the start of the tick, so all actions in one tick resolve against the
//! same picture of the world; resource mutation happens on live state in
//! FIFO order.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use observatory_types::{ActionResult, ActionType, AgentSummary, QueuedAction};
use observatory_world::{
    Costs, World, base_costs, communication_noise_factor, movement_cost_multiplier,
};

/// Fraction of attacker strength applied as energy damage.
pub const ATTACK_DAMAGE_FACTOR: f64 = 0.3;

/// Energy drained per tick per unit of region danger.
pub const DANGER_ENERGY_DRAIN: f64 = 5.0;

/// The pre-tick `{agent_id -> {region, status}}` view.
pub type AgentView = BTreeMap<String, AgentSummary>;

/// Resolve one queued action against the world.
///
/// This is the single entry point of the rules engine: a total function
/// over the action enum. The returned result is recorded in the ledger
/// whether or not it succeeded.
pub fn resolve_action(
    world: &mut World,
    view: &AgentView,
    action: &QueuedAction,
    tick: u64,
) -> ActionResult {
    let agent_id = action.agent_id.as_str();
    let params = &action.params;
    match action.action_type {
        ActionType::Move => resolve_move(world, agent_id, params, tick),
        ActionType::Trade => resolve_trade(world, view, agent_id, params, tick),
        ActionType::SendMessage => resolve_send_message(world, view, agent_id, params, tick),
        ActionType::Observe => resolve_observe(world, agent_id, tick),
        ActionType::Fork => resolve_fork(world, agent_id, params, tick),
        ActionType::Merge => resolve_merge(world, view, agent_id, params, tick),
        ActionType::Attack => resolve_attack(world, view, agent_id, params, tick),
        ActionType::Ally => resolve_ally(world, view, agent_id, params, tick),
    }
}

/// The rejection returned when an unclaimed agent attempts anything but
/// `observe`.
pub fn unclaimed_rejection(action: &QueuedAction, tick: u64) -> ActionResult {
    ActionResult::fail(
        action.action_type,
        &action.agent_id,
        tick,
        "Agent is unclaimed. Only observe actions are allowed until claimed.",
    )
}

// ---------------------------------------------------------------------------
// Per-action handlers
// ---------------------------------------------------------------------------

fn resolve_move(world: &mut World, agent_id: &str, params: &Value, tick: u64) -> ActionResult {
    let Some(target_region_id) = params.get("target_region").and_then(Value::as_str) else {
        return ActionResult::fail(ActionType::Move, agent_id, tick, "Missing target_region");
    };

    let Some(current_region_id) = world.agents.get(agent_id).map(|a| a.region.clone()) else {
        return ActionResult::fail(ActionType::Move, agent_id, tick, "Agent not found");
    };

    let costs = {
        let (Some(source), Some(target)) = (
            world.regions.get(&current_region_id),
            world.regions.get(target_region_id),
        ) else {
            return ActionResult::fail(ActionType::Move, agent_id, tick, "Invalid region");
        };
        if target.is_full() {
            return ActionResult::fail(ActionType::Move, agent_id, tick, "Target region full");
        }
        let multiplier = movement_cost_multiplier(source, target);
        scale_costs(&base_costs(ActionType::Move), multiplier)
    };

    let Some(agent) = world.agents.get_mut(agent_id) else {
        return ActionResult::fail(ActionType::Move, agent_id, tick, "Agent not found");
    };
    if !agent.resources.deduct(&costs) {
        return ActionResult::fail(
            ActionType::Move,
            agent_id,
            tick,
            "Insufficient resources for move",
        );
    }
    agent.region = target_region_id.to_owned();

    if let Some(source) = world.regions.get_mut(&current_region_id) {
        source.remove_occupant(agent_id);
    }
    if let Some(target) = world.regions.get_mut(target_region_id) {
        target.add_occupant(agent_id);
    }

    ActionResult::ok(
        ActionType::Move,
        agent_id,
        json!({
            "from_region": current_region_id,
            "to_region": target_region_id,
            "cost": costs_json(&costs),
        }),
        tick,
    )
}

fn resolve_trade(
    world: &mut World,
    view: &AgentView,
    agent_id: &str,
    params: &Value,
    tick: u64,
) -> ActionResult {
    let target = params.get("target_agent").and_then(Value::as_str);
    let offer_resource = params.get("offer_resource").and_then(Value::as_str);
    let request_resource = params.get("request_resource").and_then(Value::as_str);
    let (Some(target), Some(offer_resource), Some(request_resource)) =
        (target, offer_resource, request_resource)
    else {
        return ActionResult::fail(ActionType::Trade, agent_id, tick, "Missing trade parameters");
    };

    let Some(summary) = view.get(target) else {
        return ActionResult::fail(ActionType::Trade, agent_id, tick, "Target agent not found");
    };
    if !summary.status.is_alive() {
        return ActionResult::fail(ActionType::Trade, agent_id, tick, "Target agent is not alive");
    }

    let kinds = (
        observatory_types::ResourceKind::parse(offer_resource),
        observatory_types::ResourceKind::parse(request_resource),
    );
    let (Some(_), Some(_)) = kinds else {
        return ActionResult::fail(ActionType::Trade, agent_id, tick, "Invalid resource kind");
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
        return ActionResult::fail(ActionType::Trade, agent_id, tick, "Negative trade amount");
    }

    let Some(agent) = world.agents.get_mut(agent_id) else {
        return ActionResult::fail(ActionType::Trade, agent_id, tick, "Agent not found");
    };
    if !agent.resources.deduct(&base_costs(ActionType::Trade)) {
        return ActionResult::fail(
            ActionType::Trade,
            agent_id,
            tick,
            "Insufficient resources for trade action",
        );
    }

    ActionResult::ok(
        ActionType::Trade,
        agent_id,
        json!({
            "target_agent": target,
            "offer_resource": offer_resource,
            "offer_amount": offer_amount,
            "request_resource": request_resource,
            "request_amount": request_amount,
            "status": "pending",
        }),
        tick,
    )
}

fn resolve_send_message(
    world: &mut World,
    view: &AgentView,
    agent_id: &str,
    params: &Value,
    tick: u64,
) -> ActionResult {
    let Some(target) = params.get("target_agent").and_then(Value::as_str) else {
        return ActionResult::fail(ActionType::SendMessage, agent_id, tick, "Missing target_agent");
    };
    let content = params
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let Some(summary) = view.get(target) else {
        return ActionResult::fail(
            ActionType::SendMessage,
            agent_id,
            tick,
            "Target agent not found",
        );
    };
    if !summary.status.is_alive() {
        return ActionResult::fail(
            ActionType::SendMessage,
            agent_id,
            tick,
            "Target agent is not alive",
        );
    }
    let receiver_region = summary.region.clone();

    let Some(sender_region) = world.agents.get(agent_id).map(|a| a.region.clone()) else {
        return ActionResult::fail(ActionType::SendMessage, agent_id, tick, "Agent not found");
    };

    let Some(agent) = world.agents.get_mut(agent_id) else {
        return ActionResult::fail(ActionType::SendMessage, agent_id, tick, "Agent not found");
    };
    if !agent.resources.deduct(&base_costs(ActionType::SendMessage)) {
        return ActionResult::fail(
            ActionType::SendMessage,
            agent_id,
            tick,
            "Insufficient resources",
        );
    }

    let noise = match (
        world.regions.get(&sender_region),
        world.regions.get(&receiver_region),
    ) {
        (Some(source), Some(target_region)) => communication_noise_factor(source, target_region),
        _ => 0.0,
    };

    ActionResult::ok(
        ActionType::SendMessage,
        agent_id,
        json!({
            "target_agent": target,
            "content": content,
            "noise_factor": noise,
            "sender_region": sender_region,
            "receiver_region": receiver_region,
        }),
        tick,
    )
}

fn resolve_observe(world: &mut World, agent_id: &str, tick: u64) -> ActionResult {
    let Some(agent) = world.agents.get_mut(agent_id) else {
        return ActionResult::fail(ActionType::Observe, agent_id, tick, "Agent not found");
    };
    if !agent.resources.deduct(&base_costs(ActionType::Observe)) {
        return ActionResult::fail(ActionType::Observe, agent_id, tick, "Insufficient resources");
    }
    let region_id = agent.region.clone();

    let (region_info, visible_agents) = world.regions.get(&region_id).map_or_else(
        || (json!({}), Vec::new()),
        |region| {
            (
                serde_json::to_value(region.view()).unwrap_or_default(),
                region.occupants.iter().cloned().collect(),
            )
        },
    );

    ActionResult::ok(
        ActionType::Observe,
        agent_id,
        json!({
            "region": region_info,
            "visible_agents": visible_agents,
            "tick": tick,
        }),
        tick,
    )
}

fn resolve_fork(world: &mut World, agent_id: &str, params: &Value, tick: u64) -> ActionResult {
    let Some(region_id) = world.agents.get(agent_id).map(|a| a.region.clone()) else {
        return ActionResult::fail(ActionType::Fork, agent_id, tick, "Agent not found");
    };

    // The child takes an occupancy slot in the parent's region; a full
    // region rejects the fork before any debit.
    if world.regions.get(&region_id).is_none_or(observatory_world::Region::is_full) {
        return ActionResult::fail(ActionType::Fork, agent_id, tick, "Spawn region full");
    }

    let Some(agent) = world.agents.get_mut(agent_id) else {
        return ActionResult::fail(ActionType::Fork, agent_id, tick, "Agent not found");
    };
    if !agent.resources.deduct(&base_costs(ActionType::Fork)) {
        return ActionResult::fail(
            ActionType::Fork,
            agent_id,
            tick,
            "Insufficient resources for fork",
        );
    }

    let child_name = params
        .get("child_name")
        .and_then(Value::as_str)
        .map_or_else(|| format!("{agent_id}_fork_{tick}"), str::to_owned);

    ActionResult::ok(
        ActionType::Fork,
        agent_id,
        json!({
            "child_name": child_name,
            "parent_agent": agent_id,
            "spawn_region": region_id,
        }),
        tick,
    )
}

fn resolve_merge(
    world: &mut World,
    view: &AgentView,
    agent_id: &str,
    params: &Value,
    tick: u64,
) -> ActionResult {
    let Some(target) = params.get("target_agent").and_then(Value::as_str) else {
        return ActionResult::fail(ActionType::Merge, agent_id, tick, "Invalid merge target");
    };
    if !view.contains_key(target) {
        return ActionResult::fail(ActionType::Merge, agent_id, tick, "Invalid merge target");
    }
    if target == agent_id {
        return ActionResult::fail(ActionType::Merge, agent_id, tick, "Cannot merge with self");
    }

    let Some(agent) = world.agents.get_mut(agent_id) else {
        return ActionResult::fail(ActionType::Merge, agent_id, tick, "Agent not found");
    };
    if !agent.resources.deduct(&base_costs(ActionType::Merge)) {
        return ActionResult::fail(
            ActionType::Merge,
            agent_id,
            tick,
            "Insufficient resources for merge",
        );
    }

    ActionResult::ok(
        ActionType::Merge,
        agent_id,
        json!({
            "absorbed_agent": target,
            "surviving_agent": agent_id,
        }),
        tick,
    )
}

fn resolve_attack(
    world: &mut World,
    view: &AgentView,
    agent_id: &str,
    params: &Value,
    tick: u64,
) -> ActionResult {
    let Some(target) = params.get("target_agent").and_then(Value::as_str) else {
        return ActionResult::fail(ActionType::Attack, agent_id, tick, "Invalid attack target");
    };
    let Some(target_summary) = view.get(target) else {
        return ActionResult::fail(ActionType::Attack, agent_id, tick, "Invalid attack target");
    };
    if !target_summary.status.is_alive() {
        return ActionResult::fail(ActionType::Attack, agent_id, tick, "Target agent is not alive");
    }

    let Some(current_region) = world.agents.get(agent_id).map(|a| a.region.clone()) else {
        return ActionResult::fail(ActionType::Attack, agent_id, tick, "Agent not found");
    };
    if target_summary.region != current_region {
        return ActionResult::fail(ActionType::Attack, agent_id, tick, "Target not in same region");
    }

    let Some(agent) = world.agents.get_mut(agent_id) else {
        return ActionResult::fail(ActionType::Attack, agent_id, tick, "Agent not found");
    };
    let costs = base_costs(ActionType::Attack);
    if !agent.resources.can_afford(&costs) {
        return ActionResult::fail(
            ActionType::Attack,
            agent_id,
            tick,
            "Insufficient resources for attack",
        );
    }

    // Strength is sampled at the moment of resolution, before the cost
    // debit. Defender compute is deliberately ignored.
    let attacker_strength = agent.resources.amount(observatory_types::ResourceKind::Compute)
        + agent.resources.amount(observatory_types::ResourceKind::Energy);
    agent.resources.deduct(&costs);

    let danger = world
        .regions
        .get(&current_region)
        .map_or(0.0, |r| r.danger_level);

    ActionResult::ok(
        ActionType::Attack,
        agent_id,
        json!({
            "target_agent": target,
            "attacker_strength": attacker_strength,
            "region_danger": danger,
        }),
        tick,
    )
}

fn resolve_ally(
    world: &mut World,
    view: &AgentView,
    agent_id: &str,
    params: &Value,
    tick: u64,
) -> ActionResult {
    let Some(target) = params.get("target_agent").and_then(Value::as_str) else {
        return ActionResult::fail(ActionType::Ally, agent_id, tick, "Invalid ally target");
    };
    if !view.contains_key(target) {
        return ActionResult::fail(ActionType::Ally, agent_id, tick, "Invalid ally target");
    }

    let Some(agent) = world.agents.get_mut(agent_id) else {
        return ActionResult::fail(ActionType::Ally, agent_id, tick, "Agent not found");
    };
    if !agent.resources.deduct(&base_costs(ActionType::Ally)) {
        return ActionResult::fail(ActionType::Ally, agent_id, tick, "Insufficient resources");
    }

    ActionResult::ok(
        ActionType::Ally,
        agent_id,
        json!({
            "target_agent": target,
            "status": "proposed",
        }),
        tick,
    )
}

// ---------------------------------------------------------------------------
// Danger
// ---------------------------------------------------------------------------

/// Apply region danger to one agent: energy drops by
/// `danger_level * 5`, floored at zero. Returns a `death` result when
/// energy hits the floor; the caller performs the kill.
pub fn apply_danger(world: &mut World, agent_id: &str, tick: u64) -> Option<ActionResult> {
    let region_id = world.agents.get(agent_id).map(|a| a.region.clone())?;
    let (danger, region_id) = {
        let region = world.regions.get(&region_id)?;
        if region.danger_level <= 0.0 {
            return None;
        }
        (region.danger_level, region.region_id.clone())
    };

    let agent = world.agents.get_mut(agent_id)?;
    let drained = (agent.resources.amount(observatory_types::ResourceKind::Energy)
        - danger * DANGER_ENERGY_DRAIN)
        .max(0.0);
    agent
        .resources
        .holdings
        .insert(observatory_types::ResourceKind::Energy, drained);

    if drained <= 0.0 {
        return Some(ActionResult {
            success: true,
            action_type: String::from("death"),
            agent_id: agent_id.to_owned(),
            details: json!({
                "cause": "energy_depletion",
                "region": region_id,
                "danger_level": danger,
            }),
            tick,
            error: None,
        });
    }
    None
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn scale_costs(costs: &Costs, multiplier: f64) -> Costs {
    costs
        .iter()
        .map(|(kind, amount)| (*kind, amount * multiplier))
        .collect()
}

fn costs_json(costs: &Costs) -> Value {
    serde_json::to_value(costs).unwrap_or_default()
}
