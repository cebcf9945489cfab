//! Closed enumeration types for the Observatory data model.
//!
//! Every enum here is a closed set: adding a variant is a deliberate
//! world-rules change (the action cost table and the rules resolver must
//! be extended together with [`ActionType`]).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Resource kinds
// ---------------------------------------------------------------------------

/// A scarce resource kind that constrains agent behavior.
///
/// Every agent holds a current value and a cap for each kind; values
/// regenerate per tick at region-scaled rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Spent by almost every action; depletion is death.
    Energy,
    /// Spent by communication-heavy actions.
    Bandwidth,
    /// Long-term storage; consumed by forking.
    Memory,
    /// Processing capacity; feeds attack strength.
    Compute,
}

impl ResourceKind {
    /// All resource kinds, in canonical order.
    pub const ALL: [Self; 4] = [Self::Energy, Self::Bandwidth, Self::Memory, Self::Compute];

    /// The wire/persistence name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Bandwidth => "bandwidth",
            Self::Memory => "memory",
            Self::Compute => "compute",
        }
    }

    /// Parse a wire name into a resource kind.
    ///
    /// Returns `None` for anything outside the closed set.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "energy" => Some(Self::Energy),
            "bandwidth" => Some(Self::Bandwidth),
            "memory" => Some(Self::Memory),
            "compute" => Some(Self::Compute),
            _ => None,
        }
    }
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Action types
// ---------------------------------------------------------------------------

/// An action an agent can submit to the world for tick resolution.
///
/// `accept_trade` is deliberately absent: trade acceptance resolves
/// immediately against the trade book at the gateway, never through the
/// action queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Travel to another region; cost scales with distance.
    Move,
    /// Propose a resource exchange to another agent.
    Trade,
    /// Send a (noise-corrupted) message to another agent.
    SendMessage,
    /// Look around the current region.
    Observe,
    /// Split into a child agent, halving remaining holdings.
    Fork,
    /// Absorb another agent's holdings; the absorbed agent dies.
    Merge,
    /// Damage a co-located agent's energy.
    Attack,
    /// Unilaterally declare an alliance with another agent.
    Ally,
}

impl ActionType {
    /// The wire/ledger name of this action.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Trade => "trade",
            Self::SendMessage => "send_message",
            Self::Observe => "observe",
            Self::Fork => "fork",
            Self::Merge => "merge",
            Self::Attack => "attack",
            Self::Ally => "ally",
        }
    }

    /// Parse a wire name into an action type.
    ///
    /// Returns `None` for anything outside the closed set.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "move" => Some(Self::Move),
            "trade" => Some(Self::Trade),
            "send_message" => Some(Self::SendMessage),
            "observe" => Some(Self::Observe),
            "fork" => Some(Self::Fork),
            "merge" => Some(Self::Merge),
            "attack" => Some(Self::Attack),
            "ally" => Some(Self::Ally),
            _ => None,
        }
    }
}

impl core::fmt::Display for ActionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Agent status
// ---------------------------------------------------------------------------

/// Lifecycle state of an agent.
///
/// Transitions are `unclaimed -> claimed -> dead` or `unclaimed -> dead`.
/// `Dead` is terminal: there is no transition out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Registered, but no human operator has verified ownership yet.
    /// Restricted to `observe` actions.
    Unclaimed,
    /// Ownership verified; full world access.
    Claimed,
    /// Terminal. The id remains visible through the ledger and replay.
    Dead,
}

impl AgentStatus {
    /// Whether this status counts as alive for world rules.
    pub const fn is_alive(self) -> bool {
        matches!(self, Self::Unclaimed | Self::Claimed)
    }

    /// The wire/persistence name of this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unclaimed => "unclaimed",
            Self::Claimed => "claimed",
            Self::Dead => "dead",
        }
    }
}

impl core::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Trade offer status
// ---------------------------------------------------------------------------

/// Lifecycle state of a trade offer: `pending` then exactly one of
/// `accepted`, `rejected` or `expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    /// Open and awaiting the counterparty.
    Pending,
    /// Executed; both transfers completed atomically.
    Accepted,
    /// Refused by validation at accept-time (dead party, bad balance).
    Rejected,
    /// The offer window elapsed before acceptance.
    Expired,
}

impl OfferStatus {
    /// The wire/persistence name of this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

impl core::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
