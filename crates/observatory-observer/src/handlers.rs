//! Observer endpoint implementations.
//!
//! Every handler produces a projection of kernel state; none mutates
//! anything. Agent payloads are the observer-safe views -- public keys
//! and claim tokens never appear here.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use observatory_ledger::EventFilter;

use crate::error::ObserverError;
use crate::state::ObserverState;

/// Hard cap on `limit` for ledger queries.
const MAX_EVENT_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/observer/ledger/events`.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Only events with `tick >= from`.
    #[serde(default)]
    pub from: u64,
    /// Only events with `tick <= to`.
    pub to: Option<u64>,
    /// Exact action-type filter.
    pub action_type: Option<String>,
    /// Exact agent filter.
    pub agent_id: Option<String>,
    /// Maximum events returned (capped at 1000).
    pub limit: Option<usize>,
}

/// Query parameters for the timeline endpoints.
#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    /// Only events with `tick >= from`.
    #[serde(default)]
    pub from: u64,
    /// Only events with `tick <= to`.
    pub to: Option<u64>,
    /// Maximum events returned (world timeline only).
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// `GET /api/observer/world/state` -- the full observer-safe snapshot.
pub async fn world_state(State(state): State<Arc<ObserverState>>) -> Json<Value> {
    let snapshot = state.world.snapshot();
    Json(json!({
        "tick": snapshot.tick,
        "agents": snapshot.agents,
        "regions": snapshot.regions,
        "stats": {
            "pending_trades": snapshot.pending_trades_count,
            "alliance_proposals": snapshot.alliance_proposals_count,
        },
    }))
}

/// `GET /api/observer/world/regions` -- all regions.
pub async fn world_regions(State(state): State<Arc<ObserverState>>) -> Json<Value> {
    let views = {
        let world = state.world.lock();
        world.regions.views()
    };
    Json(serde_json::to_value(views).unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// `GET /api/observer/agents` -- every agent, observer-safe.
pub async fn all_agents(State(state): State<Arc<ObserverState>>) -> Json<Value> {
    let snapshot = state.world.snapshot();
    Json(serde_json::to_value(snapshot.agents).unwrap_or_default())
}

/// `GET /api/observer/agents/{agent_id}` -- one agent, observer-safe.
pub async fn agent_detail(
    State(state): State<Arc<ObserverState>>,
    Path(agent_id): Path<String>,
) -> Result<Json<Value>, ObserverError> {
    let view = {
        let world = state.world.lock();
        world.agents.get(&agent_id).map(observatory_world::Agent::view)
    };
    view.map_or_else(
        || Err(ObserverError::NotFound(String::from("Agent"))),
        |view| Ok(Json(serde_json::to_value(view).unwrap_or_default())),
    )
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// `GET /api/observer/ledger/events` -- filtered ledger query.
pub async fn ledger_events(
    State(state): State<Arc<ObserverState>>,
    Query(query): Query<EventsQuery>,
) -> Json<Value> {
    let events = state.ledger.get_events(&EventFilter {
        from_tick: query.from,
        to_tick: query.to,
        action_type: query.action_type,
        agent_id: query.agent_id,
        limit: query.limit.unwrap_or(100).min(MAX_EVENT_LIMIT),
    });
    Json(json!({
        "count": events.len(),
        "events": events,
    }))
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// `GET /api/observer/analytics/summary` -- population, world, economy and
/// communication aggregates.
pub async fn analytics_summary(State(state): State<Arc<ObserverState>>) -> Json<Value> {
    let (total, alive, claimed, ticks) = {
        let world = state.world.lock();
        let total = world.agents.len();
        let alive = world.alive_count();
        let claimed = world
            .agents
            .values()
            .filter(|a| a.is_claimed())
            .count();
        (total, alive, claimed, world.tick)
    };

    Json(json!({
        "agents": {
            "total": total,
            "alive": alive,
            "claimed": claimed,
            "dead": total.saturating_sub(alive),
        },
        "world": {
            "total_ticks": ticks,
            "total_events": state.ledger.count(),
        },
        "economy": {
            "trade_volume": state.accounting.total_volume(),
        },
        "communication": {
            "messages_sent": state.messages.message_count(),
        },
    }))
}

// ---------------------------------------------------------------------------
// Replay and timelines
// ---------------------------------------------------------------------------

/// `GET /api/observer/replay/{tick}` -- reconstruct the world at a tick.
pub async fn replay_at_tick(
    State(state): State<Arc<ObserverState>>,
    Path(tick): Path<u64>,
) -> Json<Value> {
    let snapshot = state.replay.reconstruct_at_tick(tick);
    Json(serde_json::to_value(snapshot).unwrap_or_default())
}

/// `GET /api/observer/timeline` -- the global event timeline.
pub async fn world_timeline(
    State(state): State<Arc<ObserverState>>,
    Query(query): Query<TimelineQuery>,
) -> Json<Value> {
    let events = state.replay.world_timeline(
        query.from,
        query.to,
        query.limit.unwrap_or(100).min(MAX_EVENT_LIMIT),
    );
    Json(json!({"events": events}))
}

/// `GET /api/observer/timeline/{agent_id}` -- one agent's timeline.
pub async fn agent_timeline(
    State(state): State<Arc<ObserverState>>,
    Path(agent_id): Path<String>,
    Query(query): Query<TimelineQuery>,
) -> Json<Value> {
    let events = state.replay.agent_timeline(&agent_id, query.from, query.to);
    Json(json!({
        "agent_id": agent_id,
        "events": events,
    }))
}
