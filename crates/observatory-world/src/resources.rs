//! Resource defaults, the action-cost table, and per-agent pools.
//!
//! Four scarce kinds constrain agent behavior: energy, bandwidth, memory
//! and compute. Each has a cap, a per-tick regeneration rate (scaled by
//! the occupied region's multiplier) and an initial value. Costs are
//! deducted atomically: an action that cannot be fully afforded debits
//! nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use observatory_types::{ActionType, ResourceKind};

/// A cost vector: amount required per resource kind.
pub type Costs = BTreeMap<ResourceKind, f64>;

/// Default `(cap, regen_per_tick, initial)` for a resource kind.
pub const fn resource_defaults(kind: ResourceKind) -> (f64, f64, f64) {
    match kind {
        ResourceKind::Energy => (100.0, 2.0, 50.0),
        ResourceKind::Bandwidth => (50.0, 1.0, 25.0),
        ResourceKind::Memory => (200.0, 0.0, 100.0),
        ResourceKind::Compute => (80.0, 1.5, 40.0),
    }
}

/// Base (pre-multiplier) costs for each action type.
const fn base_cost_table(action: ActionType) -> &'static [(ResourceKind, f64)] {
    match action {
        ActionType::Move => &[(ResourceKind::Energy, 5.0)],
        ActionType::Trade => &[(ResourceKind::Energy, 2.0), (ResourceKind::Bandwidth, 3.0)],
        ActionType::SendMessage => &[(ResourceKind::Energy, 1.0), (ResourceKind::Bandwidth, 5.0)],
        ActionType::Observe => &[(ResourceKind::Energy, 1.0)],
        ActionType::Fork => &[
            (ResourceKind::Energy, 40.0),
            (ResourceKind::Memory, 50.0),
            (ResourceKind::Compute, 30.0),
        ],
        ActionType::Merge => &[(ResourceKind::Energy, 20.0), (ResourceKind::Compute, 20.0)],
        ActionType::Attack => &[(ResourceKind::Energy, 15.0), (ResourceKind::Compute, 10.0)],
        ActionType::Ally => &[(ResourceKind::Energy, 3.0), (ResourceKind::Bandwidth, 2.0)],
    }
}

/// The base cost vector for an action, per tick, before any region
/// multiplier.
pub fn base_costs(action: ActionType) -> Costs {
    base_cost_table(action).iter().copied().collect()
}

/// An agent's resource holdings and caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    /// Current value per kind. Always non-negative and at most the cap
    /// after every resolution step.
    pub holdings: BTreeMap<ResourceKind, f64>,
    /// Ceiling per kind; regeneration and credits clamp here.
    pub caps: BTreeMap<ResourceKind, f64>,
}

impl ResourcePool {
    /// A pool seeded with the default initial values and caps.
    pub fn create_default() -> Self {
        let mut holdings = BTreeMap::new();
        let mut caps = BTreeMap::new();
        for kind in ResourceKind::ALL {
            let (cap, _, initial) = resource_defaults(kind);
            holdings.insert(kind, initial);
            caps.insert(kind, cap);
        }
        Self { holdings, caps }
    }

    /// Current amount held of a kind (zero when absent).
    pub fn amount(&self, kind: ResourceKind) -> f64 {
        self.holdings.get(&kind).copied().unwrap_or(0.0)
    }

    /// Cap for a kind, falling back to the default cap.
    pub fn cap(&self, kind: ResourceKind) -> f64 {
        self.caps
            .get(&kind)
            .copied()
            .unwrap_or_else(|| resource_defaults(kind).0)
    }

    /// Whether every entry of the cost vector is covered by holdings.
    pub fn can_afford(&self, costs: &Costs) -> bool {
        costs.iter().all(|(kind, amount)| self.amount(*kind) >= *amount)
    }

    /// Deduct a cost vector atomically.
    ///
    /// Returns `false` without touching any holding if any single entry
    /// cannot be covered.
    pub fn deduct(&mut self, costs: &Costs) -> bool {
        if !self.can_afford(costs) {
            return false;
        }
        for (kind, amount) in costs {
            let current = self.amount(*kind);
            self.holdings.insert(*kind, current - amount);
        }
        true
    }

    /// Credit an amount of one kind, clamped at the cap.
    pub fn credit(&mut self, kind: ResourceKind, amount: f64) {
        let current = self.amount(kind);
        let cap = self.cap(kind);
        self.holdings.insert(kind, (current + amount).min(cap));
    }

    /// Apply one tick of regeneration, scaled by the region multiplier and
    /// clamped at each cap.
    pub fn regenerate(&mut self, region_multiplier: f64) {
        for kind in ResourceKind::ALL {
            let (_, regen, _) = resource_defaults(kind);
            let current = self.amount(kind);
            let cap = self.cap(kind);
            self.holdings
                .insert(kind, (current + regen * region_multiplier).min(cap));
        }
    }

    /// Holdings as a plain kind -> amount map (the observer wire shape).
    pub fn as_map(&self) -> BTreeMap<ResourceKind, f64> {
        self.holdings.clone()
    }
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::create_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_matches_defaults_table() {
        let pool = ResourcePool::create_default();
        assert!((pool.amount(ResourceKind::Energy) - 50.0).abs() < f64::EPSILON);
        assert!((pool.amount(ResourceKind::Bandwidth) - 25.0).abs() < f64::EPSILON);
        assert!((pool.amount(ResourceKind::Memory) - 100.0).abs() < f64::EPSILON);
        assert!((pool.amount(ResourceKind::Compute) - 40.0).abs() < f64::EPSILON);
        assert!((pool.cap(ResourceKind::Memory) - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deduct_is_atomic_on_insufficiency() {
        let mut pool = ResourcePool::create_default();
        // Fork costs 40 energy, 50 memory, 30 compute; drain compute first.
        pool.holdings.insert(ResourceKind::Compute, 10.0);
        let costs = base_costs(ActionType::Fork);
        assert!(!pool.deduct(&costs));
        // Nothing was debited.
        assert!((pool.amount(ResourceKind::Energy) - 50.0).abs() < f64::EPSILON);
        assert!((pool.amount(ResourceKind::Memory) - 100.0).abs() < f64::EPSILON);
        assert!((pool.amount(ResourceKind::Compute) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deduct_applies_every_entry() {
        let mut pool = ResourcePool::create_default();
        let costs = base_costs(ActionType::Trade);
        assert!(pool.deduct(&costs));
        assert!((pool.amount(ResourceKind::Energy) - 48.0).abs() < f64::EPSILON);
        assert!((pool.amount(ResourceKind::Bandwidth) - 22.0).abs() < f64::EPSILON);
    }

    #[test]
    fn regenerate_clamps_at_cap() {
        let mut pool = ResourcePool::create_default();
        pool.holdings.insert(ResourceKind::Energy, 99.5);
        pool.regenerate(1.0);
        assert!((pool.amount(ResourceKind::Energy) - 100.0).abs() < f64::EPSILON);
        // Memory has zero regen.
        assert!((pool.amount(ResourceKind::Memory) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn regenerate_scales_with_region_multiplier() {
        let mut pool = ResourcePool::create_default();
        pool.regenerate(1.5);
        assert!((pool.amount(ResourceKind::Energy) - 53.0).abs() < 1e-9);
        assert!((pool.amount(ResourceKind::Compute) - 42.25).abs() < 1e-9);
    }

    #[test]
    fn credit_clamps_at_cap() {
        let mut pool = ResourcePool::create_default();
        pool.credit(ResourceKind::Bandwidth, 1000.0);
        assert!((pool.amount(ResourceKind::Bandwidth) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn every_action_has_a_cost_entry() {
        for action in [
            ActionType::Move,
            ActionType::Trade,
            ActionType::SendMessage,
            ActionType::Observe,
            ActionType::Fork,
            ActionType::Merge,
            ActionType::Attack,
            ActionType::Ally,
        ] {
            assert!(!base_costs(action).is_empty(), "{action} must have a cost");
        }
    }
}
