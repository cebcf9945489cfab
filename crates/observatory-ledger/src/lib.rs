//! Append-only event ledger and historical replay.
//!
//! Every validated action produces an immutable [`Event`]. No deletions,
//! no edits: history is permanent. The [`ReplayEngine`] folds the ledger
//! into a snapshot of identity, status, location and alliance topology at
//! any historical tick.
//!
//! [`Event`]: observatory_types::Event
//! [`ReplayEngine`]: replay::ReplayEngine

pub mod events;
pub mod replay;

pub use events::{EventFilter, EventLedger};
pub use replay::{ReplayAgent, ReplayEngine, ReplaySnapshot};
