//! Geography, resources, and canonical state for the Observatory world.
//!
//! This crate owns the server-authoritative picture of the world: the
//! spatial regions, every agent's resource pool, and the single-lock
//! [`WorldState`] store that all reads and writes go through. Persistence
//! is a whole-document JSON snapshot written atomically (temp file, then
//! rename).
//!
//! # Modules
//!
//! - [`resources`] -- Resource defaults, action-cost table, per-agent pools
//! - [`region`] -- Spatial zones, distance metrics, the default world
//! - [`state`] -- Agents, the canonical [`World`], locking and persistence
//!
//! [`WorldState`]: state::WorldState
//! [`World`]: state::World

pub mod error;
pub mod region;
pub mod resources;
pub mod state;

pub use error::WorldError;
pub use region::{
    Region, RegionManager, RegionView, SPAWN_REGION_ID, communication_noise_factor, distance,
    movement_cost_multiplier,
};
pub use resources::{Costs, ResourcePool, base_costs, resource_defaults};
pub use state::{Agent, AgentView, World, WorldSnapshot, WorldState};
