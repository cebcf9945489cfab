//! The canonical, single-lock world state and its persistence.
//!
//! [`WorldState`] is the only store for agents and regions. All mutation
//! happens under its mutex: HTTP handlers take the lock for short,
//! bounded sections (registration, claim, reads), and the tick thread
//! takes it once per tick to resolve the drained action queue.
//!
//! The snapshot document is a single JSON file
//! `{ tick, agents, regions, pending_trades, alliance_proposals }` written
//! whole via a temp file and an atomic rename. Occupant sets are not part
//! of the document: they are rebuilt from each alive agent's `region` on
//! load.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use observatory_types::{AgentStatus, AgentSummary, AllianceProposal, ResourceKind, TradeOffer};

use crate::error::WorldError;
use crate::region::{RegionManager, RegionView};
use crate::resources::ResourcePool;

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// A registered agent, including its authentication material.
///
/// `public_key` and `claim_token` are secrets relative to observers; the
/// observer surface only ever sees [`AgentView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Derived id: `agent_` + first 16 hex chars of SHA-256(public key).
    pub agent_id: String,
    /// Display name chosen at registration (defaults to the id).
    pub display_name: String,
    /// The key that signs this agent's requests.
    pub public_key: String,
    /// The region this agent currently occupies.
    pub region: String,
    /// Holdings and caps.
    pub resources: ResourcePool,
    /// Lifecycle status.
    pub status: AgentStatus,
    /// Verified operator identity, set by a successful claim.
    #[serde(default)]
    pub owner_identity: Option<String>,
    /// Single-use claim token; present only while unclaimed.
    #[serde(default)]
    pub claim_token: Option<String>,
    /// Claim token expiry, unix seconds.
    #[serde(default)]
    pub claim_token_expires: Option<f64>,
    /// Unilateral alliance declarations made by this agent.
    #[serde(default)]
    pub alliances: Vec<String>,
    /// Tick at which the agent was created.
    #[serde(default)]
    pub created_at_tick: u64,
    /// Tick of death, once dead.
    #[serde(default)]
    pub died_at_tick: Option<u64>,
    /// Parent agent id when created by a fork.
    #[serde(default)]
    pub parent_agent: Option<String>,
}

impl Agent {
    /// Whether the agent is alive (unclaimed or claimed).
    pub const fn is_alive(&self) -> bool {
        self.status.is_alive()
    }

    /// Whether a human operator has verified ownership.
    pub fn is_claimed(&self) -> bool {
        self.status == AgentStatus::Claimed
    }

    /// Observer-safe projection: no public key, no claim token.
    pub fn view(&self) -> AgentView {
        AgentView {
            agent_id: self.agent_id.clone(),
            display_name: self.display_name.clone(),
            region: self.region.clone(),
            resources: self.resources.as_map(),
            status: self.status,
            owner_identity: self.owner_identity.clone(),
            alliances: self.alliances.clone(),
            created_at_tick: self.created_at_tick,
            died_at_tick: self.died_at_tick,
            parent_agent: self.parent_agent.clone(),
        }
    }

    /// The minimal view the rules engine resolves against.
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            region: self.region.clone(),
            status: self.status,
        }
    }
}

/// The observer wire shape of an agent. Secrets are elided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    /// Derived agent id.
    pub agent_id: String,
    /// Display name.
    pub display_name: String,
    /// Occupied region.
    pub region: String,
    /// Current holdings per kind.
    pub resources: BTreeMap<ResourceKind, f64>,
    /// Lifecycle status.
    pub status: AgentStatus,
    /// Verified operator identity, if claimed.
    pub owner_identity: Option<String>,
    /// Unilateral alliances.
    pub alliances: Vec<String>,
    /// Creation tick.
    pub created_at_tick: u64,
    /// Death tick, once dead.
    pub died_at_tick: Option<u64>,
    /// Fork parent, if any.
    pub parent_agent: Option<String>,
}

// ---------------------------------------------------------------------------
// The world document
// ---------------------------------------------------------------------------

/// The canonical world: everything the snapshot document persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// The current tick counter.
    pub tick: u64,
    /// All agents, alive and dead, keyed by agent id.
    pub agents: BTreeMap<String, Agent>,
    /// All regions.
    pub regions: RegionManager,
    /// Open trade offers, mirrored from the trade book before each save.
    #[serde(default)]
    pub pending_trades: Vec<TradeOffer>,
    /// Unilateral alliance declarations, in order.
    #[serde(default)]
    pub alliance_proposals: Vec<AllianceProposal>,
}

impl World {
    /// A fresh world at tick 0 with the default regions.
    pub fn with_default_regions() -> Self {
        Self {
            tick: 0,
            agents: BTreeMap::new(),
            regions: RegionManager::with_default_regions(),
            pending_trades: Vec::new(),
            alliance_proposals: Vec::new(),
        }
    }

    /// Insert a new agent and place it in its region's occupant set.
    pub fn insert_agent(&mut self, agent: Agent) {
        if let Some(region) = self.regions.get_mut(&agent.region) {
            region.add_occupant(&agent.agent_id);
        }
        self.agents.insert(agent.agent_id.clone(), agent);
    }

    /// Mark an agent dead and drop it from its region's occupant set.
    ///
    /// Returns `false` if the agent is missing or already dead; death is
    /// terminal and `died_at_tick` is written exactly once.
    pub fn kill_agent(&mut self, agent_id: &str, tick: u64) -> bool {
        let Some(agent) = self.agents.get_mut(agent_id) else {
            return false;
        };
        if !agent.is_alive() {
            return false;
        }
        agent.status = AgentStatus::Dead;
        agent.died_at_tick = Some(tick);
        let region_id = agent.region.clone();
        if let Some(region) = self.regions.get_mut(&region_id) {
            region.remove_occupant(agent_id);
        }
        true
    }

    /// The minimal `{agent_id -> {region, status}}` view captured once per
    /// tick for the rules engine.
    pub fn agent_summaries(&self) -> BTreeMap<String, AgentSummary> {
        self.agents
            .iter()
            .map(|(id, agent)| (id.clone(), agent.summary()))
            .collect()
    }

    /// Number of alive agents.
    pub fn alive_count(&self) -> usize {
        self.agents.values().filter(|a| a.is_alive()).count()
    }

    /// Observer-safe snapshot of the whole world.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            agents: self
                .agents
                .iter()
                .map(|(id, agent)| (id.clone(), agent.view()))
                .collect(),
            regions: self.regions.views(),
            pending_trades_count: self.pending_trades.len(),
            alliance_proposals_count: self.alliance_proposals.len(),
        }
    }

    /// Re-derive every region's occupant set from the alive agents'
    /// `region` fields (used after loading a snapshot).
    fn rebuild_occupants(&mut self) {
        let placements: Vec<(String, String)> = self
            .agents
            .values()
            .filter(|a| a.is_alive())
            .map(|a| (a.region.clone(), a.agent_id.clone()))
            .collect();
        for region in self.regions.regions.values_mut() {
            region.occupants.clear();
        }
        for (region_id, agent_id) in placements {
            if let Some(region) = self.regions.get_mut(&region_id) {
                region.occupants.insert(agent_id);
            }
        }
    }
}

/// The observer wire shape of the whole world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Current tick.
    pub tick: u64,
    /// All agents (observer-safe views).
    pub agents: BTreeMap<String, AgentView>,
    /// All regions (views).
    pub regions: BTreeMap<String, RegionView>,
    /// Number of open trade offers.
    pub pending_trades_count: usize,
    /// Number of recorded alliance proposals.
    pub alliance_proposals_count: usize,
}

// ---------------------------------------------------------------------------
// The locked store
// ---------------------------------------------------------------------------

/// The single-lock store wrapping [`World`].
///
/// A poisoned mutex is recovered by taking the inner value: a panicking
/// writer must not permanently wedge the world, and the next save will
/// persist whatever state it left behind.
#[derive(Debug)]
pub struct WorldState {
    inner: Mutex<World>,
    state_file: PathBuf,
}

impl WorldState {
    /// A fresh world with default regions, persisting to `state_file`.
    pub fn new(state_file: impl Into<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(World::with_default_regions()),
            state_file: state_file.into(),
        }
    }

    /// Load the snapshot at `state_file`, or initialize a fresh world if
    /// the file is missing or unreadable.
    pub fn load_or_init(state_file: impl Into<PathBuf>) -> Self {
        let path = state_file.into();
        let world = match load_document(&path) {
            Ok(Some(world)) => {
                info!(path = %path.display(), tick = world.tick, agents = world.agents.len(), "World snapshot loaded");
                world
            }
            Ok(None) => {
                info!(path = %path.display(), "No world snapshot found, initializing fresh world");
                World::with_default_regions()
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "World snapshot unreadable, initializing fresh world");
                World::with_default_regions()
            }
        };
        Self {
            inner: Mutex::new(world),
            state_file: path,
        }
    }

    /// Acquire the world lock.
    pub fn lock(&self) -> MutexGuard<'_, World> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The configured snapshot path.
    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// The current tick (brief lock).
    pub fn current_tick(&self) -> u64 {
        self.lock().tick
    }

    /// Clone one agent record (brief lock).
    pub fn get_agent(&self, agent_id: &str) -> Option<Agent> {
        self.lock().agents.get(agent_id).cloned()
    }

    /// Insert a new agent (brief lock).
    pub fn insert_agent(&self, agent: Agent) {
        self.lock().insert_agent(agent);
    }

    /// Observer-safe world snapshot (brief lock).
    pub fn snapshot(&self) -> WorldSnapshot {
        self.lock().snapshot()
    }

    /// Persist the current world document atomically.
    pub fn save(&self) -> Result<(), WorldError> {
        let json = {
            let world = self.lock();
            serde_json::to_string_pretty(&*world)?
        };
        write_atomically(&self.state_file, &json)?;
        Ok(())
    }
}

/// Write `contents` to `path` via a sibling temp file and a rename.
fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

/// Read and parse the snapshot document. `Ok(None)` when the file does
/// not exist.
fn load_document(path: &Path) -> Result<Option<World>, WorldError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    let mut world: World = serde_json::from_str(&contents)?;
    world.rebuild_occupants();
    Ok(Some(world))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_agent(agent_id: &str, region: &str) -> Agent {
        Agent {
            agent_id: agent_id.to_owned(),
            display_name: agent_id.to_owned(),
            public_key: format!("pk_{agent_id}"),
            region: region.to_owned(),
            resources: ResourcePool::create_default(),
            status: AgentStatus::Unclaimed,
            owner_identity: None,
            claim_token: Some(String::from("token")),
            claim_token_expires: Some(1e12),
            alliances: Vec::new(),
            created_at_tick: 0,
            died_at_tick: None,
            parent_agent: None,
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("observatory-state-{}-{name}.json", std::process::id()));
        path
    }

    #[test]
    fn insert_places_agent_in_region() {
        let mut world = World::with_default_regions();
        world.insert_agent(make_agent("agent_a", "nexus"));
        let occupants = world
            .regions
            .get("nexus")
            .map(|r| r.occupants.clone())
            .unwrap_or_default();
        assert!(occupants.contains("agent_a"));
    }

    #[test]
    fn kill_is_terminal_and_single_shot() {
        let mut world = World::with_default_regions();
        world.insert_agent(make_agent("agent_a", "nexus"));
        assert!(world.kill_agent("agent_a", 4));
        assert!(!world.kill_agent("agent_a", 9));
        let agent = world.agents.get("agent_a").cloned();
        assert_eq!(agent.as_ref().map(|a| a.status), Some(AgentStatus::Dead));
        assert_eq!(agent.and_then(|a| a.died_at_tick), Some(4));
        let occupants = world
            .regions
            .get("nexus")
            .map(|r| r.occupants.len())
            .unwrap_or(usize::MAX);
        assert_eq!(occupants, 0);
    }

    #[test]
    fn snapshot_elides_secrets() {
        let mut world = World::with_default_regions();
        world.insert_agent(make_agent("agent_a", "nexus"));
        let snapshot = world.snapshot();
        let json = serde_json::to_value(&snapshot).ok().unwrap_or_default();
        let agent = &json["agents"]["agent_a"];
        assert!(agent.get("public_key").is_none());
        assert!(agent.get("claim_token").is_none());
        assert_eq!(agent["status"], "unclaimed");
    }

    #[test]
    fn save_and_reload_rebuilds_occupants() {
        let path = temp_path("roundtrip");
        let _ = fs::remove_file(&path);

        let state = WorldState::new(&path);
        {
            let mut world = state.lock();
            world.tick = 12;
            world.insert_agent(make_agent("agent_a", "forge"));
            world.insert_agent(make_agent("agent_b", "nexus"));
            world.kill_agent("agent_b", 12);
        }
        assert!(state.save().is_ok());

        let restored = WorldState::load_or_init(&path);
        let world = restored.lock();
        assert_eq!(world.tick, 12);
        assert_eq!(world.agents.len(), 2);
        // Alive agent is back in its region; the dead one is not.
        let forge_occupants = world
            .regions
            .get("forge")
            .map(|r| r.occupants.clone())
            .unwrap_or_default();
        assert!(forge_occupants.contains("agent_a"));
        let nexus_occupants = world
            .regions
            .get("nexus")
            .map(|r| r.occupants.len())
            .unwrap_or(usize::MAX);
        assert_eq!(nexus_occupants, 0);
        drop(world);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_or_init_survives_corrupt_snapshot() {
        let path = temp_path("corrupt");
        let _ = fs::write(&path, "{not json");
        let state = WorldState::load_or_init(&path);
        assert_eq!(state.current_tick(), 0);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn alive_count_ignores_dead_agents() {
        let mut world = World::with_default_regions();
        world.insert_agent(make_agent("agent_a", "nexus"));
        world.insert_agent(make_agent("agent_b", "nexus"));
        world.kill_agent("agent_a", 1);
        assert_eq!(world.alive_count(), 1);
    }
}
