//! Shared type definitions for the Observatory world server.
//!
//! This crate is the single source of truth for the types that cross crate
//! boundaries: the closed enumerations of the data model, the ledger event
//! record, the action queue entry and resolution result, and the trade,
//! transaction and message records.
//!
//! # Modules
//!
//! - [`enums`] -- Closed sets (resource kinds, action types, statuses)
//! - [`actions`] -- Queue entry and resolution result for the tick engine
//! - [`events`] -- The append-only ledger event record
//! - [`structs`] -- Trade offers, transactions, messages, alliance proposals
//!
//! Entity identifiers in this world are content-derived strings
//! (`agent_<digest>`, `trade_<seq>`, `msg_<seq>`), matching the persisted
//! JSON formats, so they are carried as plain [`String`]s rather than UUID
//! newtypes.

pub mod actions;
pub mod enums;
pub mod events;
pub mod structs;

pub use actions::{ActionResult, QueuedAction};
pub use enums::{ActionType, AgentStatus, OfferStatus, ResourceKind};
pub use events::{Event, EventDraft};
pub use structs::{AgentSummary, AllianceProposal, Message, TradeOffer, Transaction};

/// Current wall-clock time as unix seconds with sub-second precision.
///
/// This is the timestamp format used by the persisted ledger and message
/// records, and by the `X-Timestamp` auth header.
#[allow(clippy::cast_precision_loss)]
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
