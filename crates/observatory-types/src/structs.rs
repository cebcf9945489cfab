//! Trade, transaction, messaging and view records shared across crates.

use serde::{Deserialize, Serialize};

use crate::enums::{AgentStatus, OfferStatus, ResourceKind};

// ---------------------------------------------------------------------------
// Trade offers
// ---------------------------------------------------------------------------

/// A pending (or settled) resource exchange proposal between two agents.
///
/// Resource kinds are typed at creation; offers with unknown kinds or
/// negative amounts are rejected before an offer ever exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOffer {
    /// Sequential id, `trade_<seq>`.
    pub offer_id: String,
    /// The tick at which the offer was created.
    pub tick: u64,
    /// The proposing agent (gives `offer_*`, receives `request_*`).
    pub from_agent: String,
    /// The counterparty; only this agent may accept.
    pub to_agent: String,
    /// Resource kind offered by `from_agent`.
    pub offer_resource: ResourceKind,
    /// Amount of `offer_resource` transferred on acceptance.
    pub offer_amount: f64,
    /// Resource kind requested from `to_agent`.
    pub request_resource: ResourceKind,
    /// Amount of `request_resource` transferred on acceptance.
    pub request_amount: f64,
    /// Lifecycle state of the offer.
    pub status: OfferStatus,
    /// Wall-clock creation time, unix seconds.
    pub created_at: f64,
    /// The last tick at which the offer may still be accepted.
    pub expires_at_tick: u64,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// An immutable record of one directed resource transfer.
///
/// Every executed trade produces two transactions (one per direction)
/// sharing the offer id in `trade_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sequential id, `tx_<seq>`.
    pub transaction_id: String,
    /// The tick at which the transfer executed.
    pub tick: u64,
    /// Debited agent.
    pub from_agent: String,
    /// Credited agent.
    pub to_agent: String,
    /// The resource kind transferred.
    pub resource: ResourceKind,
    /// Amount transferred (pre-clamp; credits clamp at the recipient cap).
    pub amount: f64,
    /// Wall-clock record time, unix seconds.
    pub timestamp: f64,
    /// The trade offer this transfer settles, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A delivered agent-to-agent message, post noise corruption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sequential id, `msg_<seq>`.
    pub message_id: String,
    /// The tick at which the message was delivered.
    pub tick: u64,
    /// Sending agent.
    pub from_agent: String,
    /// Receiving agent.
    pub to_agent: String,
    /// Content as delivered (noise already applied).
    pub content: String,
    /// Per-character corruption probability that was applied.
    pub noise_factor: f64,
    /// Whether the message reached the recipient's inbox.
    pub delivered: bool,
    /// Region the sender occupied at send time.
    pub sender_region: String,
    /// Region the receiver occupied at send time.
    pub receiver_region: String,
    /// Wall-clock delivery time, unix seconds.
    pub timestamp: f64,
}

// ---------------------------------------------------------------------------
// Alliances
// ---------------------------------------------------------------------------

/// A unilateral alliance declaration. Mutual alliance requires a
/// symmetric proposal from the other side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceProposal {
    /// The declaring agent.
    pub from: String,
    /// The agent being allied with.
    pub to: String,
    /// The tick of the declaration.
    pub tick: u64,
}

// ---------------------------------------------------------------------------
// Rules-engine view
// ---------------------------------------------------------------------------

/// The minimal per-agent view the rules engine resolves against.
///
/// Captured once at the start of each tick, so every action in the tick
/// validates against the same pre-tick picture of the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    /// The region the agent occupied at snapshot time.
    pub region: String,
    /// The agent's status at snapshot time.
    pub status: AgentStatus,
}
