//! Shared read handles for the observer API.

use std::sync::Arc;

use observatory_agents::MessageBus;
use observatory_economy::TransactionLog;
use observatory_ledger::{EventLedger, ReplayEngine};
use observatory_world::WorldState;

/// Non-owning references to the kernel stores, read-only by convention
/// and by route construction.
#[derive(Clone)]
pub struct ObserverState {
    /// The canonical world (snapshots only).
    pub world: Arc<WorldState>,
    /// The append-only event ledger.
    pub ledger: Arc<EventLedger>,
    /// Historical reconstruction over the ledger.
    pub replay: Arc<ReplayEngine>,
    /// The immutable transfer log.
    pub accounting: Arc<TransactionLog>,
    /// The message bus (counts only).
    pub messages: Arc<MessageBus>,
}
