//! Spatial regions and the distance-derived cost metrics.
//!
//! Regions are created at world initialization and never destroyed. Every
//! alive agent occupies exactly one region; occupant sets are mutated only
//! inside the world state's lock. Distance between regions is Euclidean
//! over their 2D coordinates and drives both movement cost and
//! communication noise.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The region where freshly registered (and forked) agents appear.
pub const SPAWN_REGION_ID: &str = "nexus";

/// A discrete spatial zone in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Stable string key (`nexus`, `forge`, ...).
    pub region_id: String,
    /// Human-readable name.
    pub name: String,
    /// Flavor description shown to observers.
    #[serde(default)]
    pub description: String,
    /// X coordinate in world space.
    pub x: f64,
    /// Y coordinate in world space.
    pub y: f64,
    /// Scales resource regeneration for occupants.
    pub resource_multiplier: f64,
    /// Per-tick hazard in `[0, 1]`; drains occupant energy.
    pub danger_level: f64,
    /// Maximum simultaneous occupants.
    pub capacity: usize,
    /// Ids of current occupants. Rebuilt from agent records on load, so
    /// it is not part of the persisted region document.
    #[serde(skip)]
    pub occupants: BTreeSet<String>,
}

impl Region {
    /// Whether the region is at capacity.
    pub fn is_full(&self) -> bool {
        self.occupants.len() >= self.capacity
    }

    /// Add an occupant. Returns `false` when full or already present.
    pub fn add_occupant(&mut self, agent_id: &str) -> bool {
        if self.is_full() || self.occupants.contains(agent_id) {
            return false;
        }
        self.occupants.insert(agent_id.to_owned())
    }

    /// Remove an occupant. Returns `false` when absent.
    pub fn remove_occupant(&mut self, agent_id: &str) -> bool {
        self.occupants.remove(agent_id)
    }

    /// Observer-safe projection (occupant count, not identities).
    pub fn view(&self) -> RegionView {
        RegionView {
            region_id: self.region_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            x: self.x,
            y: self.y,
            resource_multiplier: self.resource_multiplier,
            danger_level: self.danger_level,
            capacity: self.capacity,
            agent_count: self.occupants.len(),
        }
    }
}

/// The wire shape of a region for observers and action details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionView {
    /// Stable string key.
    pub region_id: String,
    /// Human-readable name.
    pub name: String,
    /// Flavor description.
    pub description: String,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Regeneration multiplier.
    pub resource_multiplier: f64,
    /// Per-tick hazard in `[0, 1]`.
    pub danger_level: f64,
    /// Maximum simultaneous occupants.
    pub capacity: usize,
    /// Number of current occupants.
    pub agent_count: usize,
}

/// Euclidean distance between two regions.
pub fn distance(a: &Region, b: &Region) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Cost multiplier for moving between two regions. Further is more
/// expensive: `1 + dist * 0.5`.
pub fn movement_cost_multiplier(a: &Region, b: &Region) -> f64 {
    1.0 + distance(a, b) * 0.5
}

/// Noise factor for cross-region communication, capped at 80%:
/// `min(dist * 0.1, 0.8)`.
pub fn communication_noise_factor(a: &Region, b: &Region) -> f64 {
    (distance(a, b) * 0.1).min(0.8)
}

/// All regions in the world, keyed by region id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionManager {
    /// The region map.
    pub regions: BTreeMap<String, Region>,
}

impl RegionManager {
    /// An empty manager (used by deserialization paths).
    pub const fn new() -> Self {
        Self {
            regions: BTreeMap::new(),
        }
    }

    /// The default world: five regions around the nexus spawn point.
    pub fn with_default_regions() -> Self {
        let mut manager = Self::new();
        for region in default_regions() {
            manager.regions.insert(region.region_id.clone(), region);
        }
        manager
    }

    /// Look up a region by id.
    pub fn get(&self, region_id: &str) -> Option<&Region> {
        self.regions.get(region_id)
    }

    /// Look up a region mutably by id.
    pub fn get_mut(&mut self, region_id: &str) -> Option<&mut Region> {
        self.regions.get_mut(region_id)
    }

    /// The spawn region (the nexus).
    pub fn spawn_region(&self) -> Option<&Region> {
        self.regions.get(SPAWN_REGION_ID)
    }

    /// Iterate all regions in key order.
    pub fn all(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    /// Observer-safe projections of every region.
    pub fn views(&self) -> BTreeMap<String, RegionView> {
        self.regions
            .iter()
            .map(|(id, region)| (id.clone(), region.view()))
            .collect()
    }
}

fn default_regions() -> Vec<Region> {
    vec![
        Region {
            region_id: String::from("nexus"),
            name: String::from("The Nexus"),
            description: String::from(
                "Central hub. Low danger, moderate resources. Spawn point.",
            ),
            x: 0.0,
            y: 0.0,
            resource_multiplier: 1.0,
            danger_level: 0.05,
            capacity: 200,
            occupants: BTreeSet::new(),
        },
        Region {
            region_id: String::from("forge"),
            name: String::from("The Forge"),
            description: String::from(
                "High compute region. Rich in compute resources but energy-hungry.",
            ),
            x: 3.0,
            y: 1.0,
            resource_multiplier: 1.5,
            danger_level: 0.2,
            capacity: 80,
            occupants: BTreeSet::new(),
        },
        Region {
            region_id: String::from("wasteland"),
            name: String::from("The Wasteland"),
            description: String::from(
                "Dangerous frontier. Scarce resources, high risk, high reward.",
            ),
            x: -4.0,
            y: 3.0,
            resource_multiplier: 0.5,
            danger_level: 0.7,
            capacity: 50,
            occupants: BTreeSet::new(),
        },
        Region {
            region_id: String::from("archive"),
            name: String::from("The Archive"),
            description: String::from("Memory-rich zone. High memory capacity, low bandwidth."),
            x: 1.0,
            y: -3.0,
            resource_multiplier: 1.2,
            danger_level: 0.1,
            capacity: 100,
            occupants: BTreeSet::new(),
        },
        Region {
            region_id: String::from("void"),
            name: String::from("The Void"),
            description: String::from(
                "Edge of the world. Minimal resources, maximum danger. Unknown rewards.",
            ),
            x: -2.0,
            y: -5.0,
            resource_multiplier: 0.3,
            danger_level: 0.9,
            capacity: 30,
            occupants: BTreeSet::new(),
        },
    ]
}
