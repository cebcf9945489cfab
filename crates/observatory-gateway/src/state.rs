//! Shared state for the write gateway.

use std::sync::Arc;

use observatory_agents::{LifecycleManager, MessageBus};
use observatory_core::TickEngine;
use observatory_economy::TradeBook;
use observatory_ledger::EventLedger;
use observatory_world::WorldState;

/// Handles to the kernel singletons, threaded through every handler.
///
/// The gateway owns no world data itself; it only holds non-owning
/// references to the canonical stores plus the public domain used to
/// build claim URLs.
#[derive(Clone)]
pub struct GatewayState {
    /// The canonical world.
    pub world: Arc<WorldState>,
    /// The tick engine (action queue).
    pub engine: Arc<TickEngine>,
    /// The append-only event ledger.
    pub ledger: Arc<EventLedger>,
    /// Claim-token lifecycle.
    pub lifecycle: Arc<LifecycleManager>,
    /// The trade book.
    pub trades: Arc<TradeBook>,
    /// The message bus.
    pub messages: Arc<MessageBus>,
    /// Public domain for claim URLs (e.g. `observatory.example`).
    pub domain: String,
}

impl GatewayState {
    /// The claim URL returned to a freshly registered agent.
    ///
    /// Local domains get plain HTTP so development flows work end to end.
    pub fn claim_url(&self, claim_token: &str) -> String {
        let scheme = if self.domain.contains("localhost") || self.domain.contains("127.0.0.1") {
            "http"
        } else {
            "https"
        };
        format!("{scheme}://{}/claim/{claim_token}", self.domain)
    }
}
