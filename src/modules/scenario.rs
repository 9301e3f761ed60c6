use std::fs;
use std::io;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::modules::dispatch::desired_agent_count;
use crate::modules::layout::{BaseLayout, Coord, Quadrant};
use crate::modules::resource::{Carry, ResourceKind};
use crate::modules::structure::{RawStructure, Structure, StructureId};
use crate::modules::world::{Position, TransportAgent, World};

const AGENT_CAPACITY: u32 = 100;
const EXTENSION_CAPACITY: u32 = 50;
const SPAWN_CAPACITY: u32 = 300;
const TOWER_CAPACITY: u32 = 1_000;
const LAB_CAPACITY: u32 = 2_000;
const STORAGE_CAPACITY: u32 = 1_000_000;
const TERMINAL_CAPACITY: u32 = 300_000;
const CONTAINER_CAPACITY: u32 = 2_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub cycle: u64,
    #[serde(default)]
    pub agents: Vec<TransportAgent>,
    #[serde(default)]
    pub structures: Vec<RawStructure>,
}

impl Scenario {
    /// Classifies every raw structure and builds the world. Structures with no
    /// dispatcher role are dropped.
    pub fn to_world(&self) -> World {
        let mut world = World::new();
        world.cycle = self.cycle;
        for raw in &self.structures {
            match Structure::from_raw(raw) {
                Some(structure) => world.add_structure(structure),
                None => debug!(
                    id = raw.id,
                    structure_type = %raw.structure_type,
                    "structure ignored"
                ),
            }
        }
        for agent in &self.agents {
            world.add_agent(agent.clone());
        }
        world
    }

    pub fn from_world(world: &World) -> Self {
        Self {
            cycle: world.cycle(),
            agents: world.agents().cloned().collect(),
            structures: world.structures().iter().map(Structure::to_raw).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub seed: Option<u64>,
    /// Defaults to the base's wishlist count.
    pub agents: Option<usize>,
    pub extensions: usize,
}

/// Lays out a random base on `layout`: stores on the road cross, supply
/// structures scattered over the quadrant cells, and a small fleet.
pub fn generate(layout: &BaseLayout, opts: &GenerateOptions) -> Scenario {
    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut cells: Vec<Position> = Quadrant::CANONICAL_ORDER
        .into_iter()
        .flat_map(|q| layout.coords(q).iter().copied())
        .filter_map(|coord| layout.resolve(coord))
        .collect();
    cells.shuffle(&mut rng);

    let mut next_id: StructureId = 0;
    let mut structures = Vec::new();
    let mut push = |structure_type: &str,
                    position: Position,
                    capacity: u32,
                    store: Carry,
                    targets: Carry,
                    reserve: bool| {
        next_id += 1;
        structures.push(RawStructure {
            id: next_id,
            structure_type: structure_type.to_string(),
            position,
            store,
            capacity,
            targets,
            reserve,
        });
    };

    let store_at = |dx: i32, dy: i32| layout.resolve(Coord::new(dx, dy)).unwrap_or(layout.anchor);

    let mut storage = Carry::new();
    storage.add(ResourceKind::Energy, rng.gen_range(2_000..=6_000));
    storage.add(ResourceKind::Utrium, rng.gen_range(0..=600));
    push("storage", layout.anchor, STORAGE_CAPACITY, storage, Carry::new(), false);

    if rng.gen_bool(0.5) {
        let mut terminal = Carry::new();
        terminal.add(ResourceKind::Hydrogen, rng.gen_range(200..=1_000));
        terminal.add(ResourceKind::Oxygen, rng.gen_range(200..=1_000));
        push("terminal", store_at(-4, 0), TERMINAL_CAPACITY, terminal, Carry::new(), false);
    }

    let mut container = Carry::new();
    container.add(ResourceKind::Energy, rng.gen_range(0..=CONTAINER_CAPACITY));
    push("container", store_at(0, 4), CONTAINER_CAPACITY, container, Carry::new(), true);
    // An ordinary container has no role and is filtered out on load.
    push("container", store_at(4, 0), CONTAINER_CAPACITY, Carry::new(), Carry::new(), false);

    let mut cells = cells.into_iter();
    let spawns = rng.gen_range(1..=2);
    for _ in 0..spawns {
        let Some(cell) = cells.next() else { break };
        let stock = rng.gen_range(0..=SPAWN_CAPACITY);
        push(
            "spawn",
            cell,
            SPAWN_CAPACITY,
            [(ResourceKind::Energy, stock)].into_iter().collect(),
            [(ResourceKind::Energy, SPAWN_CAPACITY)].into_iter().collect(),
            false,
        );
    }

    if let Some(cell) = cells.next() {
        let stock = rng.gen_range(0..=TOWER_CAPACITY);
        push(
            "tower",
            cell,
            TOWER_CAPACITY,
            [(ResourceKind::Energy, stock)].into_iter().collect(),
            [(ResourceKind::Energy, TOWER_CAPACITY)].into_iter().collect(),
            false,
        );
    }

    if let Some(cell) = cells.next() {
        // Leftover hydrogen produces a removal request; the utrium target a delivery.
        let mut store = Carry::new();
        store.add(ResourceKind::Hydrogen, rng.gen_range(0..=200));
        push(
            "lab",
            cell,
            LAB_CAPACITY,
            store,
            [(ResourceKind::Utrium, 500)].into_iter().collect(),
            false,
        );
    }

    for _ in 0..opts.extensions {
        let Some(cell) = cells.next() else { break };
        let stock = rng.gen_range(0..=EXTENSION_CAPACITY);
        push(
            "extension",
            cell,
            EXTENSION_CAPACITY,
            [(ResourceKind::Energy, stock)].into_iter().collect(),
            [(ResourceKind::Energy, EXTENSION_CAPACITY)].into_iter().collect(),
            false,
        );
    }

    let mut scenario = Scenario {
        cycle: 0,
        agents: Vec::new(),
        structures,
    };

    let count = opts
        .agents
        .unwrap_or_else(|| desired_agent_count(&scenario.to_world()));
    for idx in 0..count {
        let mut agent = TransportAgent::new(
            format!("hauler-{}", idx + 1),
            layout.anchor.offset(rng.gen_range(-3..=3), rng.gen_range(-3..=3)),
            AGENT_CAPACITY,
        );
        // Every agent after the first is still being produced.
        if idx > 0 {
            agent.spawning = rng.gen_range(1..=5);
        }
        scenario.agents.push(agent);
    }

    scenario
}

fn scenario_dir() -> PathBuf {
    PathBuf::from(".hauler")
}

pub fn scenario_file_path() -> PathBuf {
    scenario_dir().join("scenario.json")
}

pub fn load_scenario() -> io::Result<Option<Scenario>> {
    let path = scenario_file_path();
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(&path)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    let scenario = serde_json::from_slice(&bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "failed to parse scenario {}; delete it or run `hauler world generate`: {}",
                path.display(),
                e
            ),
        )
    })?;
    Ok(Some(scenario))
}

pub fn save_scenario(scenario: &Scenario) -> io::Result<PathBuf> {
    let path = scenario_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(scenario)?;
    fs::write(&path, json)?;
    Ok(path)
}
