//! Trade offers: creation, acceptance, expiry.
//!
//! Offers are created when a `trade` action is accepted into the queue and
//! settle only when the counterparty accepts. Acceptance re-validates
//! everything at accept-time -- recipient, liveness, expiry, balances --
//! and then executes both transfers atomically under the world lock.
//! Credits clamp at the recipient's caps; deductions cannot go negative
//! by construction.
//!
//! Lock order: the trade book lock is always taken before the world lock.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use observatory_types::{OfferStatus, ResourceKind, TradeOffer, unix_now};
use observatory_world::WorldState;

use crate::accounting::TransactionLog;

/// Number of ticks an offer stays open before it expires.
pub const OFFER_WINDOW_TICKS: u64 = 10;

/// Reasons an offer cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    /// No offer with that id exists.
    #[error("Offer not found")]
    NotFound,

    /// The offer already settled or expired.
    #[error("Offer is {0}")]
    NotPending(OfferStatus),

    /// Only the agent named in `to_agent` may accept.
    #[error("Not the intended recipient")]
    NotRecipient,

    /// The offer window elapsed; the offer is now marked expired.
    #[error("Offer expired")]
    Expired,

    /// The proposing agent is missing or dead.
    #[error("Offering agent not available")]
    OffererUnavailable,

    /// The accepting agent is missing or dead.
    #[error("Accepting agent not available")]
    AccepterUnavailable,

    /// The proposer no longer holds the offered amount.
    #[error("Offerer has insufficient resources")]
    OffererInsufficient,

    /// The accepter does not hold the requested amount.
    #[error("Accepter has insufficient resources")]
    AccepterInsufficient,
}

/// Parameters for creating a new offer.
#[derive(Debug, Clone)]
pub struct NewOffer {
    /// The tick at which the offer is created.
    pub tick: u64,
    /// The proposing agent.
    pub from_agent: String,
    /// The counterparty.
    pub to_agent: String,
    /// Resource kind offered.
    pub offer_resource: ResourceKind,
    /// Amount offered.
    pub offer_amount: f64,
    /// Resource kind requested in return.
    pub request_resource: ResourceKind,
    /// Amount requested.
    pub request_amount: f64,
}

/// Receipt returned on a successful acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedTrade {
    /// The settled offer.
    pub offer_id: String,
    /// The tick at which both transfers executed.
    pub executed_at_tick: u64,
}

struct BookInner {
    offers: BTreeMap<String, TradeOffer>,
    next_id: u64,
}

/// The book of all trade offers, open and settled.
pub struct TradeBook {
    accounting: Arc<TransactionLog>,
    inner: Mutex<BookInner>,
}

impl TradeBook {
    /// An empty trade book recording settlements to `accounting`.
    pub fn new(accounting: Arc<TransactionLog>) -> Self {
        Self {
            accounting,
            inner: Mutex::new(BookInner {
                offers: BTreeMap::new(),
                next_id: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BookInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new pending offer with the standard expiry window.
    pub fn create_offer(&self, params: NewOffer) -> TradeOffer {
        let mut inner = self.lock();
        let offer = TradeOffer {
            offer_id: format!("trade_{:08}", inner.next_id),
            tick: params.tick,
            from_agent: params.from_agent,
            to_agent: params.to_agent,
            offer_resource: params.offer_resource,
            offer_amount: params.offer_amount,
            request_resource: params.request_resource,
            request_amount: params.request_amount,
            status: OfferStatus::Pending,
            created_at: unix_now(),
            expires_at_tick: params.tick.saturating_add(OFFER_WINDOW_TICKS),
        };
        inner.next_id = inner.next_id.saturating_add(1);
        inner.offers.insert(offer.offer_id.clone(), offer.clone());
        info!(offer_id = %offer.offer_id, from = %offer.from_agent, to = %offer.to_agent, "Trade offer created");
        offer
    }

    /// Accept and execute a pending offer.
    ///
    /// Either both transfers complete or none; on failure the offer is
    /// marked rejected (or expired) and nothing is mutated.
    pub fn accept_offer(
        &self,
        world: &WorldState,
        offer_id: &str,
        accepting_agent: &str,
        tick: u64,
    ) -> Result<AcceptedTrade, TradeError> {
        let mut inner = self.lock();
        let Some(offer) = inner.offers.get_mut(offer_id) else {
            return Err(TradeError::NotFound);
        };

        if offer.status != OfferStatus::Pending {
            return Err(TradeError::NotPending(offer.status));
        }
        if offer.to_agent != accepting_agent {
            return Err(TradeError::NotRecipient);
        }
        if tick > offer.expires_at_tick {
            offer.status = OfferStatus::Expired;
            return Err(TradeError::Expired);
        }

        // Validate and execute under the world lock (book lock first).
        let outcome = execute_exchange(world, offer, tick);
        match outcome {
            Ok(()) => {
                offer.status = OfferStatus::Accepted;
                self.accounting.record_transfer(
                    tick,
                    &offer.from_agent,
                    &offer.to_agent,
                    offer.offer_resource,
                    offer.offer_amount,
                    Some(offer_id),
                );
                self.accounting.record_transfer(
                    tick,
                    &offer.to_agent,
                    &offer.from_agent,
                    offer.request_resource,
                    offer.request_amount,
                    Some(offer_id),
                );
                info!(offer_id, tick, "Trade executed");
                drop(inner);
                if let Err(err) = world.save() {
                    warn!(%err, "World snapshot save failed after trade execution");
                }
                Ok(AcceptedTrade {
                    offer_id: offer_id.to_owned(),
                    executed_at_tick: tick,
                })
            }
            Err(err) => {
                offer.status = OfferStatus::Rejected;
                Err(err)
            }
        }
    }

    /// Flip pending offers past their window to expired. Returns the
    /// number of offers expired.
    pub fn expire_old_offers(&self, tick: u64) -> usize {
        let mut inner = self.lock();
        let mut expired = 0usize;
        for offer in inner.offers.values_mut() {
            if offer.status == OfferStatus::Pending && tick > offer.expires_at_tick {
                offer.status = OfferStatus::Expired;
                expired = expired.saturating_add(1);
            }
        }
        if expired > 0 {
            info!(tick, expired, "Expired stale trade offers");
        }
        expired
    }

    /// Pending offers involving the given agent (either side).
    pub fn offers_for_agent(&self, agent_id: &str) -> Vec<TradeOffer> {
        let inner = self.lock();
        inner
            .offers
            .values()
            .filter(|o| o.status == OfferStatus::Pending)
            .filter(|o| o.from_agent == agent_id || o.to_agent == agent_id)
            .cloned()
            .collect()
    }

    /// All pending offers.
    pub fn pending_offers(&self) -> Vec<TradeOffer> {
        let inner = self.lock();
        inner
            .offers
            .values()
            .filter(|o| o.status == OfferStatus::Pending)
            .cloned()
            .collect()
    }

    /// Look up one offer by id.
    pub fn get_offer(&self, offer_id: &str) -> Option<TradeOffer> {
        self.lock().offers.get(offer_id).cloned()
    }
}

/// Validate both parties and execute both transfers atomically.
fn execute_exchange(world: &WorldState, offer: &TradeOffer, _tick: u64) -> Result<(), TradeError> {
    let mut w = world.lock();

    let offerer_ok = w
        .agents
        .get(&offer.from_agent)
        .is_some_and(observatory_world::Agent::is_alive);
    if !offerer_ok {
        return Err(TradeError::OffererUnavailable);
    }
    let accepter_ok = w
        .agents
        .get(&offer.to_agent)
        .is_some_and(observatory_world::Agent::is_alive);
    if !accepter_ok {
        return Err(TradeError::AccepterUnavailable);
    }

    let offerer_funds = w
        .agents
        .get(&offer.from_agent)
        .is_some_and(|a| a.resources.amount(offer.offer_resource) >= offer.offer_amount);
    if !offerer_funds {
        return Err(TradeError::OffererInsufficient);
    }
    let accepter_funds = w
        .agents
        .get(&offer.to_agent)
        .is_some_and(|a| a.resources.amount(offer.request_resource) >= offer.request_amount);
    if !accepter_funds {
        return Err(TradeError::AccepterInsufficient);
    }

    // All checks passed; apply both directions. Deductions cannot go
    // negative (checked above); credits clamp at caps.
    let mut offer_costs = BTreeMap::new();
    offer_costs.insert(offer.offer_resource, offer.offer_amount);
    let mut request_costs = BTreeMap::new();
    request_costs.insert(offer.request_resource, offer.request_amount);

    if let Some(from) = w.agents.get_mut(&offer.from_agent) {
        from.resources.deduct(&offer_costs);
        from.resources.credit(offer.request_resource, offer.request_amount);
    }
    if let Some(to) = w.agents.get_mut(&offer.to_agent) {
        to.resources.deduct(&request_costs);
        to.resources.credit(offer.offer_resource, offer.offer_amount);
    }

    Ok(())
}
