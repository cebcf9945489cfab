//! Historical reconstruction by replaying the event ledger.
//!
//! Folds all events with `tick <= target` through a deterministic reducer
//! to rebuild identity, status, location and alliance topology at that
//! tick. Resources are not reconstructed: the ledger carries only the
//! initial allotment from registration (extending events with resulting
//! resource vectors is the documented path if exact rewind is ever
//! needed).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use observatory_types::{AgentStatus, Event};
use observatory_world::{RegionManager, RegionView, SPAWN_REGION_ID};

use crate::events::{EventFilter, EventLedger};

/// Query limit used when folding a full history.
const REPLAY_EVENT_LIMIT: usize = 1_000_000;

/// Query limit for per-agent timelines.
const TIMELINE_EVENT_LIMIT: usize = 10_000;

/// An agent as reconstructed from ledger events alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayAgent {
    /// The agent id.
    pub agent_id: String,
    /// Status as of the target tick.
    pub status: AgentStatus,
    /// Region as of the target tick.
    pub region: String,
    /// Initial resources recorded at registration (not live values).
    pub resources: serde_json::Value,
    /// Alliance declarations made up to the target tick.
    pub alliances: Vec<String>,
    /// Tick the agent was created.
    pub created_at_tick: u64,
    /// Tick of death, if the agent died by the target tick.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub died_at_tick: Option<u64>,
    /// Owner identity, once claimed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_identity: Option<String>,
    /// Fork parent, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_agent: Option<String>,
}

/// The world as reconstructed at a historical tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySnapshot {
    /// The target tick of the reconstruction.
    pub tick: u64,
    /// Reconstructed agents keyed by id.
    pub agents: BTreeMap<String, ReplayAgent>,
    /// The region definitions (regions are never destroyed).
    pub regions: BTreeMap<String, RegionView>,
    /// Number of events folded.
    pub total_events: usize,
}

/// Replays ledger events to reconstruct world state at any point in time.
pub struct ReplayEngine {
    ledger: Arc<EventLedger>,
}

impl ReplayEngine {
    /// Create a replay engine over the given ledger.
    pub const fn new(ledger: Arc<EventLedger>) -> Self {
        Self { ledger }
    }

    /// Reconstruct a snapshot of the world at `target_tick`.
    pub fn reconstruct_at_tick(&self, target_tick: u64) -> ReplaySnapshot {
        let events = self.ledger.get_events(&EventFilter {
            to_tick: Some(target_tick),
            limit: REPLAY_EVENT_LIMIT,
            ..EventFilter::default()
        });

        let mut agents: BTreeMap<String, ReplayAgent> = BTreeMap::new();
        for event in &events {
            apply_event(event, &mut agents);
        }

        ReplaySnapshot {
            tick: target_tick,
            agents,
            regions: RegionManager::with_default_regions().views(),
            total_events: events.len(),
        }
    }

    /// The event timeline for a specific agent.
    pub fn agent_timeline(
        &self,
        agent_id: &str,
        from_tick: u64,
        to_tick: Option<u64>,
    ) -> Vec<Event> {
        self.ledger.get_events(&EventFilter {
            from_tick,
            to_tick,
            agent_id: Some(agent_id.to_owned()),
            limit: TIMELINE_EVENT_LIMIT,
            ..EventFilter::default()
        })
    }

    /// The global event timeline.
    pub fn world_timeline(&self, from_tick: u64, to_tick: Option<u64>, limit: usize) -> Vec<Event> {
        self.ledger.get_events(&EventFilter {
            from_tick,
            to_tick,
            limit,
            ..EventFilter::default()
        })
    }
}

/// Apply a single event to the reconstruction state.
///
/// Failed events never changed the world, so they are ignored. Attack
/// events carry no direct effect: their lethal outcomes appear as
/// subsequent `death` events.
fn apply_event(event: &Event, agents: &mut BTreeMap<String, ReplayAgent>) {
    if !event.success {
        return;
    }

    let agent_id = event.agent_id.as_str();
    let details = &event.details;

    match event.action_type.as_str() {
        "register" => {
            agents.insert(
                agent_id.to_owned(),
                ReplayAgent {
                    agent_id: agent_id.to_owned(),
                    status: AgentStatus::Unclaimed,
                    region: details
                        .get("spawn_region")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or(SPAWN_REGION_ID)
                        .to_owned(),
                    resources: details
                        .get("initial_resources")
                        .cloned()
                        .unwrap_or_else(|| serde_json::json!({})),
                    alliances: Vec::new(),
                    created_at_tick: event.tick,
                    died_at_tick: None,
                    owner_identity: None,
                    parent_agent: None,
                },
            );
        }
        "claim" => {
            if let Some(agent) = agents.get_mut(agent_id) {
                agent.status = AgentStatus::Claimed;
                agent.owner_identity = details
                    .get("owner_identity")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_owned);
            }
        }
        "death" => {
            if let Some(agent) = agents.get_mut(agent_id) {
                agent.status = AgentStatus::Dead;
                agent.died_at_tick = Some(event.tick);
            }
        }
        "move" => {
            if let Some(agent) = agents.get_mut(agent_id) {
                if let Some(to_region) = details
                    .get("to_region")
                    .and_then(serde_json::Value::as_str)
                {
                    agent.region = to_region.to_owned();
                }
            }
        }
        "fork" => {
            let Some(child_name) = details
                .get("child_name")
                .and_then(serde_json::Value::as_str)
            else {
                return;
            };
            let parent_status = agents
                .get(agent_id)
                .map_or(AgentStatus::Unclaimed, |a| a.status);
            agents.insert(
                child_name.to_owned(),
                ReplayAgent {
                    agent_id: child_name.to_owned(),
                    status: parent_status,
                    region: details
                        .get("spawn_region")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or(SPAWN_REGION_ID)
                        .to_owned(),
                    resources: serde_json::json!({}),
                    alliances: Vec::new(),
                    created_at_tick: event.tick,
                    died_at_tick: None,
                    owner_identity: None,
                    parent_agent: Some(agent_id.to_owned()),
                },
            );
        }
        "merge" => {
            if let Some(absorbed) = details
                .get("absorbed_agent")
                .and_then(serde_json::Value::as_str)
            {
                if let Some(agent) = agents.get_mut(absorbed) {
                    agent.status = AgentStatus::Dead;
                    agent.died_at_tick = Some(event.tick);
                }
            }
        }
        "ally" => {
            if let Some(target) = details
                .get("target_agent")
                .and_then(serde_json::Value::as_str)
            {
                if let Some(agent) = agents.get_mut(agent_id) {
                    if !agent.alliances.iter().any(|a| a == target) {
                        agent.alliances.push(target.to_owned());
                    }
                }
            }
        }
        // Tick heartbeats and attack events carry no reconstruction effect.
        _ => {}
    }
}
