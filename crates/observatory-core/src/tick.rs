//! The tick engine: queue, loop, and side-effect application.
//!
//! A single dedicated tick task performs all world mutation. HTTP
//! handlers only enqueue [`QueuedAction`]s; effects become visible at the
//! next tick boundary. Each tick:
//!
//! 1. Atomically advances the tick counter.
//! 2. Drains the queue, discarding stale intents.
//! 3. Snapshots the minimal `{agent_id -> {region, status}}` view.
//! 4. Resolves actions in FIFO order (skipping missing/dead agents,
//!    rejecting non-observe actions from unclaimed agents).
//! 5. Applies side effects of successful resolutions.
//! 6. Regenerates resources and applies region danger to every alive
//!    agent.
//! 7. Persists the world snapshot.
//! 8. Appends one ledger event per result plus a synthetic `tick`
//!    heartbeat.
//!
//! Errors inside a tick are logged and swallowed: the loop continues and
//! the offending tick still persists and emits its heartbeat.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use observatory_agents::messaging::{Delivery, MessageBus};
use observatory_economy::TradeBook;
use observatory_ledger::EventLedger;
use observatory_types::{
    ActionResult, ActionType, AgentStatus, EventDraft, QueuedAction, ResourceKind,
};
use observatory_world::{Agent, ResourcePool, World, WorldState};

use crate::rules;

/// The tick engine. One instance per world.
pub struct TickEngine {
    world: Arc<WorldState>,
    ledger: Arc<EventLedger>,
    trades: Arc<TradeBook>,
    messages: Arc<MessageBus>,
    queue: Mutex<VecDeque<QueuedAction>>,
    tick_duration: Duration,
    shutdown: watch::Sender<bool>,
}

impl TickEngine {
    /// Wire up a tick engine over the shared kernel singletons.
    pub fn new(
        world: Arc<WorldState>,
        ledger: Arc<EventLedger>,
        trades: Arc<TradeBook>,
        messages: Arc<MessageBus>,
        tick_duration: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            world,
            ledger,
            trades,
            messages,
            queue: Mutex::new(VecDeque::new()),
            tick_duration,
            shutdown,
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<QueuedAction>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue an action for resolution at the next tick.
    pub fn enqueue_action(&self, action: QueuedAction) {
        debug!(agent_id = %action.agent_id, action = %action.action_type, "Action queued");
        self.queue().push_back(action);
    }

    /// Number of actions currently waiting.
    pub fn queued_len(&self) -> usize {
        self.queue().len()
    }

    /// Spawn the tick loop. The loop checks the stop signal at the sleep
    /// boundary and exits deterministically within one tick duration.
    pub fn start(self: Arc<Self>) {
        let engine = self;
        let mut shutdown = engine.shutdown.subscribe();
        tokio::spawn(async move {
            info!(tick_duration = ?engine.tick_duration, "World engine started");
            let mut interval = tokio::time::interval(engine.tick_duration);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        engine.run_single_tick();
                    }
                    _ = shutdown.changed() => {
                        break;
                    }
                }
            }
            info!("World engine stopped");
        });
    }

    /// Signal the tick loop to stop.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Execute one tick synchronously. Returns the tick number that ran.
    ///
    /// This is the loop body; it is public so tests and deterministic
    /// replays can drive the engine without the timer.
    pub fn run_single_tick(&self) -> u64 {
        let tick = {
            let mut world = self.world.lock();
            world.tick = world.tick.saturating_add(1);
            world.tick
        };
        debug!(tick, "Processing tick");

        // Drain the queue and discard stale intents.
        let drained: Vec<QueuedAction> = self.queue().drain(..).collect();
        let valid: Vec<QueuedAction> = drained
            .into_iter()
            .filter(|a| tick.saturating_sub(a.submitted_at_tick) <= a.valid_for_ticks)
            .collect();
        let actions_processed = valid.len();

        // Sweep stale trade offers (trade book lock only; always taken
        // before the world lock).
        self.trades.expire_old_offers(tick);

        let mut results: Vec<ActionResult> = Vec::new();
        let (total_agents, alive_agents) = {
            let mut world = self.world.lock();
            let view = world.agent_summaries();

            for action in &valid {
                let Some(agent) = world.agents.get(&action.agent_id) else {
                    continue;
                };
                if !agent.is_alive() {
                    continue;
                }
                if agent.status == AgentStatus::Unclaimed
                    && action.action_type != ActionType::Observe
                {
                    results.push(rules::unclaimed_rejection(action, tick));
                    continue;
                }

                let result = rules::resolve_action(&mut world, &view, action, tick);
                if result.success {
                    let follow_up = apply_side_effects(&mut world, &self.messages, &result);
                    results.push(result);
                    if let Some(death) = follow_up {
                        results.push(death);
                    }
                } else {
                    debug!(
                        tick,
                        agent_id = %action.agent_id,
                        action = %action.action_type,
                        error = result.error.as_deref().unwrap_or(""),
                        "Action rejected"
                    );
                    results.push(result);
                }
            }

            // Per-agent tick effects: regeneration, then danger.
            let agent_ids: Vec<String> = world.agents.keys().cloned().collect();
            for agent_id in agent_ids {
                let alive = world.agents.get(&agent_id).is_some_and(Agent::is_alive);
                if !alive {
                    continue;
                }
                let multiplier = world
                    .agents
                    .get(&agent_id)
                    .and_then(|a| world.regions.get(&a.region))
                    .map_or(1.0, |r| r.resource_multiplier);
                if let Some(agent) = world.agents.get_mut(&agent_id) {
                    agent.resources.regenerate(multiplier);
                }
                if let Some(death) = rules::apply_danger(&mut world, &agent_id, tick) {
                    world.kill_agent(&agent_id, tick);
                    info!(tick, agent_id = %agent_id, "Agent died of energy depletion");
                    results.push(death);
                }
            }

            (world.agents.len(), world.alive_count())
        };

        // Mirror open offers into the document, then persist.
        {
            let pending = self.trades.pending_offers();
            let mut world = self.world.lock();
            world.pending_trades = pending;
        }
        if let Err(err) = self.world.save() {
            error!(tick, %err, "World snapshot save failed; continuing");
        }

        // Emit one event per result plus the heartbeat.
        for result in &results {
            self.ledger.append(EventDraft {
                tick: result.tick,
                action_type: result.action_type.clone(),
                agent_id: result.agent_id.clone(),
                success: result.success,
                details: result.details.clone(),
                error: result.error.clone(),
            });
        }
        self.ledger.append(EventDraft::heartbeat(
            tick,
            json!({
                "actions_processed": actions_processed,
                "results": results.len(),
                "total_agents": total_agents,
                "alive_agents": alive_agents,
            }),
        ));

        info!(
            tick,
            actions_processed,
            results = results.len(),
            alive_agents,
            "Tick complete"
        );
        tick
    }
}

// ---------------------------------------------------------------------------
// Side effects
// ---------------------------------------------------------------------------

/// Apply the world mutations implied by a successful resolution.
///
/// Move relocation already happened during resolution; this covers
/// message delivery, fork spawning, merge absorption, attack damage and
/// alliance recording. Returns a follow-up `death` result when an attack
/// is lethal.
fn apply_side_effects(
    world: &mut World,
    messages: &MessageBus,
    result: &ActionResult,
) -> Option<ActionResult> {
    match result.action_type.as_str() {
        "send_message" => {
            deliver_message(messages, result);
            None
        }
        "fork" => {
            spawn_fork_child(world, result);
            None
        }
        "merge" => {
            absorb_merge_target(world, result);
            None
        }
        "attack" => apply_attack_damage(world, result),
        "ally" => {
            record_alliance(world, result);
            None
        }
        _ => None,
    }
}

fn deliver_message(messages: &MessageBus, result: &ActionResult) {
    let details = &result.details;
    let Some(target) = details.get("target_agent").and_then(serde_json::Value::as_str) else {
        return;
    };
    messages.send_message(Delivery {
        tick: result.tick,
        from_agent: result.agent_id.clone(),
        to_agent: target.to_owned(),
        content: details
            .get("content")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        noise_factor: details
            .get("noise_factor")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.0),
        sender_region: details
            .get("sender_region")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        receiver_region: details
            .get("receiver_region")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_owned(),
    });
}

/// Create the fork child: same key, status and owner as the parent, half
/// of each of the parent's remaining holdings (the parent keeps the other
/// half), default caps, spawned in the parent's region.
fn spawn_fork_child(world: &mut World, result: &ActionResult) {
    let details = &result.details;
    let Some(child_name) = details.get("child_name").and_then(serde_json::Value::as_str) else {
        return;
    };
    let parent_id = result.agent_id.as_str();

    let Some(parent) = world.agents.get_mut(parent_id) else {
        return;
    };

    let mut child_pool = ResourcePool::create_default();
    let kinds: Vec<ResourceKind> = parent.resources.holdings.keys().copied().collect();
    for kind in kinds {
        let half = parent.resources.amount(kind) / 2.0;
        parent.resources.holdings.insert(kind, half);
        child_pool.holdings.insert(kind, half);
    }

    let child = Agent {
        agent_id: child_name.to_owned(),
        display_name: child_name.to_owned(),
        public_key: parent.public_key.clone(),
        region: parent.region.clone(),
        resources: child_pool,
        status: parent.status,
        owner_identity: parent.owner_identity.clone(),
        claim_token: None,
        claim_token_expires: None,
        alliances: Vec::new(),
        created_at_tick: result.tick,
        died_at_tick: None,
        parent_agent: Some(parent_id.to_owned()),
    };
    world.insert_agent(child);
    info!(parent = parent_id, child = child_name, tick = result.tick, "Agent forked");
}

/// Transfer every holding from the absorbed agent to the initiator
/// (clamped at caps), then mark the absorbed agent dead.
fn absorb_merge_target(world: &mut World, result: &ActionResult) {
    let Some(absorbed_id) = result
        .details
        .get("absorbed_agent")
        .and_then(serde_json::Value::as_str)
    else {
        return;
    };

    let Some(absorbed_holdings) = world
        .agents
        .get(absorbed_id)
        .map(|a| a.resources.holdings.clone())
    else {
        return;
    };

    if let Some(survivor) = world.agents.get_mut(&result.agent_id) {
        for (kind, amount) in absorbed_holdings {
            survivor.resources.credit(kind, amount);
        }
    }

    world.kill_agent(absorbed_id, result.tick);
    info!(
        absorbed = absorbed_id,
        survivor = %result.agent_id,
        tick = result.tick,
        "Agent absorbed by merge"
    );
}

/// Apply attack damage to the target's energy. Damage accumulates on
/// live state, so simultaneous attackers stack within a tick; a target
/// at zero energy dies immediately and a `death` result is returned.
fn apply_attack_damage(world: &mut World, result: &ActionResult) -> Option<ActionResult> {
    let details = &result.details;
    let target_id = details
        .get("target_agent")
        .and_then(serde_json::Value::as_str)?;
    let strength = details
        .get("attacker_strength")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0);
    let damage = strength * rules::ATTACK_DAMAGE_FACTOR;

    let target = world.agents.get_mut(target_id)?;
    if !target.is_alive() {
        return None;
    }
    let remaining = (target.resources.amount(ResourceKind::Energy) - damage).max(0.0);
    target
        .resources
        .holdings
        .insert(ResourceKind::Energy, remaining);
    let region = target.region.clone();

    if remaining <= 0.0 {
        world.kill_agent(target_id, result.tick);
        warn!(target = target_id, attacker = %result.agent_id, tick = result.tick, "Agent killed by attack");
        return Some(ActionResult {
            success: true,
            action_type: String::from("death"),
            agent_id: target_id.to_owned(),
            details: json!({
                "cause": "attack",
                "attacker": result.agent_id,
                "region": region,
            }),
            tick: result.tick,
            error: None,
        });
    }
    None
}

/// Record a unilateral alliance: idempotent on the initiator's list, and
/// always appended to the proposal log.
fn record_alliance(world: &mut World, result: &ActionResult) {
    let Some(target) = result
        .details
        .get("target_agent")
        .and_then(serde_json::Value::as_str)
    else {
        return;
    };

    if let Some(agent) = world.agents.get_mut(&result.agent_id) {
        if !agent.alliances.iter().any(|a| a == target) {
            agent.alliances.push(target.to_owned());
        }
    }
    world
        .alliance_proposals
        .push(observatory_types::AllianceProposal {
            from: result.agent_id.clone(),
            to: target.to_owned(),
            tick: result.tick,
        });
}
