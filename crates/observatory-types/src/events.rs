//! The append-only ledger event record.
//!
//! Events are immutable once appended: ids are assigned by the ledger,
//! strictly increase, and are never rewritten. One JSON object per line in
//! the persisted ledger file.

use serde::{Deserialize, Serialize};

/// Agent id recorded on synthetic world events (tick heartbeats).
pub const WORLD_AGENT_ID: &str = "__world__";

/// An immutable record of one action outcome or synthetic world effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonically increasing, gap-free id assigned at append time.
    pub event_id: u64,
    /// The world tick the event belongs to.
    pub tick: u64,
    /// Ledger name of the action (`move`, `register`, `death`, `tick`, ...).
    pub action_type: String,
    /// The acting agent, or [`WORLD_AGENT_ID`] for heartbeats.
    pub agent_id: String,
    /// Whether the recorded action succeeded.
    pub success: bool,
    /// Action-specific payload.
    #[serde(default)]
    pub details: serde_json::Value,
    /// Failure reason for unsuccessful actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock append time, unix seconds.
    #[serde(default)]
    pub timestamp: f64,
}

/// The caller-supplied portion of an event; the ledger assigns the id and
/// timestamp at append time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    /// The world tick the event belongs to.
    pub tick: u64,
    /// Ledger name of the action.
    pub action_type: String,
    /// The acting agent, or [`WORLD_AGENT_ID`].
    pub agent_id: String,
    /// Whether the recorded action succeeded.
    pub success: bool,
    /// Action-specific payload.
    pub details: serde_json::Value,
    /// Failure reason for unsuccessful actions.
    pub error: Option<String>,
}

impl EventDraft {
    /// Draft the synthetic heartbeat event emitted once per completed tick.
    pub fn heartbeat(tick: u64, details: serde_json::Value) -> Self {
        Self {
            tick,
            action_type: String::from("tick"),
            agent_id: String::from(WORLD_AGENT_ID),
            success: true,
            details,
            error: None,
        }
    }
}
