//! Action queue entries and resolution results.
//!
//! An agent's write request becomes a [`QueuedAction`] on the tick engine's
//! FIFO queue; the rules engine turns each entry into an [`ActionResult`]
//! at the next tick boundary. Every result -- success or failure -- is
//! recorded in the event ledger so failed attempts stay auditable.

use serde::{Deserialize, Serialize};

use crate::enums::ActionType;

/// Default number of ticks a queued intent remains valid after submission.
pub const DEFAULT_VALID_FOR_TICKS: u64 = 1;

/// An agent action waiting on the tick engine's queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    /// The agent submitting this action.
    pub agent_id: String,
    /// The type of action being taken.
    pub action_type: ActionType,
    /// Action-specific parameters, as submitted.
    pub params: serde_json::Value,
    /// The world tick at which the action was enqueued.
    pub submitted_at_tick: u64,
    /// How many ticks this intent remains valid; stale entries are
    /// discarded during the queue drain.
    pub valid_for_ticks: u64,
}

impl QueuedAction {
    /// Create a queue entry with the default validity window.
    pub const fn new(
        agent_id: String,
        action_type: ActionType,
        params: serde_json::Value,
        submitted_at_tick: u64,
    ) -> Self {
        Self {
            agent_id,
            action_type,
            params,
            submitted_at_tick,
            valid_for_ticks: DEFAULT_VALID_FOR_TICKS,
        }
    }
}

/// The outcome of resolving one action (or one synthetic world effect,
/// such as a danger death).
///
/// `action_type` is a string rather than [`ActionType`] because the
/// resolver also emits synthetic kinds (`death`) that are never
/// submittable, and the ledger stores lifecycle kinds (`register`,
/// `claim`, `tick`) through the same record shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the action was applied.
    pub success: bool,
    /// Ledger name of the action (or synthetic effect).
    pub action_type: String,
    /// The acting agent.
    pub agent_id: String,
    /// Resolution details; on success these drive side-effect application.
    pub details: serde_json::Value,
    /// The tick at which resolution happened.
    pub tick: u64,
    /// Failure reason, present only when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    /// Build a successful result.
    pub fn ok(
        action_type: ActionType,
        agent_id: &str,
        details: serde_json::Value,
        tick: u64,
    ) -> Self {
        Self {
            success: true,
            action_type: action_type.as_str().to_owned(),
            agent_id: agent_id.to_owned(),
            details,
            tick,
            error: None,
        }
    }

    /// Build a failed result. Failures never carry side effects and never
    /// debit resources.
    pub fn fail(action_type: ActionType, agent_id: &str, tick: u64, error: &str) -> Self {
        Self {
            success: false,
            action_type: action_type.as_str().to_owned(),
            agent_id: agent_id.to_owned(),
            details: serde_json::Value::Object(serde_json::Map::new()),
            tick,
            error: Some(error.to_owned()),
        }
    }
}
