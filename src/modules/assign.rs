use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::modules::layout::Quadrant;
use crate::modules::structure::StructureId;
use crate::modules::world::TransportAgent;
use crate::modules::zone::Zone;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAssignment {
    pub zones: Vec<Quadrant>,
    pub structures: Vec<StructureId>,
}

impl AgentAssignment {
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub agents: BTreeMap<String, AgentAssignment>,
}

impl Assignment {
    pub fn get(&self, agent: &str) -> Option<&AgentAssignment> {
        self.agents.get(agent)
    }

    pub fn owner_of(&self, quadrant: Quadrant) -> Option<&str> {
        self.agents
            .iter()
            .find(|(_, a)| a.zones.contains(&quadrant))
            .map(|(name, _)| name.as_str())
    }
}

/// Round-robin the zones over the active agents, sorted by name.
///
/// Zones are expected in canonical order; zone `i` goes to active agent
/// `i % n`. Spawning agents are listed with an empty assignment, as is every
/// agent when nobody is active.
pub fn assign_zones<'a>(
    agents: impl IntoIterator<Item = &'a TransportAgent>,
    zones: &[Zone],
) -> Assignment {
    let mut assignment = Assignment::default();
    let mut active: Vec<&str> = Vec::new();

    for agent in agents {
        assignment
            .agents
            .insert(agent.name.clone(), AgentAssignment::default());
        if agent.is_active() {
            active.push(agent.name.as_str());
        }
    }

    if active.is_empty() {
        return assignment;
    }
    active.sort_unstable();
    active.dedup();

    for (idx, zone) in zones.iter().enumerate() {
        let owner = active[idx % active.len()];
        if let Some(slot) = assignment.agents.get_mut(owner) {
            slot.zones.push(zone.quadrant);
            slot.structures.extend(zone.structures.iter().copied());
        }
    }

    assignment
}
