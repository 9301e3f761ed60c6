use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::modules::manifest::TaskManifest;
use crate::modules::resource::Carry;
use crate::modules::structure::{Structure, StructureId, StructureKind};

pub const ROOM_SIZE: i32 = 50;
pub const INTERACT_RANGE: u32 = 1;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub const fn in_bounds(self) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < ROOM_SIZE && self.y < ROOM_SIZE
    }

    pub fn range_to(self, other: Position) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    pub fn step_toward(self, target: Position) -> Position {
        self.offset((target.x - self.x).signum(), (target.y - self.y).signum())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTask {
    pub manifest: TaskManifest,
    pub cursor: usize,
}

impl ActiveTask {
    pub fn new(manifest: TaskManifest) -> Self {
        Self {
            manifest,
            cursor: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.manifest.operations().len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportAgent {
    pub name: String,
    pub position: Position,
    pub capacity: u32,
    #[serde(default)]
    pub carry: Carry,
    /// Cycles left until the agent is produced. Non-zero means not yet active.
    #[serde(default)]
    pub spawning: u32,
    #[serde(default)]
    pub task: Option<ActiveTask>,
    /// Standby spot the agent was last sent to while idle.
    #[serde(default)]
    pub standby: Option<Position>,
}

impl TransportAgent {
    pub fn new(name: impl Into<String>, position: Position, capacity: u32) -> Self {
        Self {
            name: name.into(),
            position,
            capacity,
            carry: Carry::new(),
            spawning: 0,
            task: None,
            standby: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.spawning == 0
    }

    pub fn is_idle(&self) -> bool {
        self.task.is_none()
    }

    pub fn free_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.carry.total())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct World {
    pub(crate) cycle: u64,
    agents: BTreeMap<String, TransportAgent>,
    structures: Vec<Structure>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn add_agent(&mut self, agent: TransportAgent) {
        self.agents.insert(agent.name.clone(), agent);
    }

    pub fn add_structure(&mut self, structure: Structure) {
        let idx = self
            .structures
            .partition_point(|existing| existing.id < structure.id);
        if self
            .structures
            .get(idx)
            .is_some_and(|existing| existing.id == structure.id)
        {
            self.structures[idx] = structure;
        } else {
            self.structures.insert(idx, structure);
        }
    }

    pub fn agent(&self, name: &str) -> Option<&TransportAgent> {
        self.agents.get(name)
    }

    pub fn agent_mut(&mut self, name: &str) -> Option<&mut TransportAgent> {
        self.agents.get_mut(name)
    }

    pub fn agents(&self) -> impl Iterator<Item = &TransportAgent> {
        self.agents.values()
    }

    pub fn agent_names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|idx| &self.structures[idx])
    }

    pub fn structure_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.structures
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|idx| &mut self.structures[idx])
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn structures_at(&self, position: Position) -> impl Iterator<Item = &Structure> {
        self.structures
            .iter()
            .filter(move |s| s.position == position)
    }

    pub fn reserves(&self) -> Vec<&Structure> {
        let mut reserves: Vec<&Structure> = self
            .structures
            .iter()
            .filter(|s| s.kind.is_reserve())
            .collect();
        reserves.sort_by_key(|s| (reserve_rank(s.kind), s.id));
        reserves
    }
}

fn reserve_rank(kind: StructureKind) -> u8 {
    match kind {
        StructureKind::Terminal => 0,
        StructureKind::Storage => 1,
        _ => 2,
    }
}
