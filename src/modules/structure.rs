use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::modules::resource::{Carry, ResourceKind};
use crate::modules::world::Position;

pub type StructureId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    Extension,
    Spawn,
    Tower,
    Lab,
    Terminal,
    Storage,
    ReserveContainer,
}

impl StructureKind {
    pub const fn is_supply_target(self) -> bool {
        matches!(
            self,
            StructureKind::Extension
                | StructureKind::Spawn
                | StructureKind::Tower
                | StructureKind::Lab
        )
    }

    pub const fn is_reserve(self) -> bool {
        matches!(
            self,
            StructureKind::Terminal | StructureKind::Storage | StructureKind::ReserveContainer
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            StructureKind::Extension => "extension",
            StructureKind::Spawn => "spawn",
            StructureKind::Tower => "tower",
            StructureKind::Lab => "lab",
            StructureKind::Terminal => "terminal",
            StructureKind::Storage => "storage",
            StructureKind::ReserveContainer => "reserve_container",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for StructureKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "extension" => Ok(StructureKind::Extension),
            "spawn" => Ok(StructureKind::Spawn),
            "tower" => Ok(StructureKind::Tower),
            "lab" => Ok(StructureKind::Lab),
            "terminal" => Ok(StructureKind::Terminal),
            "storage" => Ok(StructureKind::Storage),
            "reserve_container" | "reserve-container" | "reservecontainer" => {
                Ok(StructureKind::ReserveContainer)
            }
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStructure {
    pub id: StructureId,
    pub structure_type: String,
    pub position: Position,
    #[serde(default)]
    pub store: Carry,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub targets: Carry,
    /// Only meaningful for containers: marks the container as a reserve.
    #[serde(default)]
    pub reserve: bool,
}

/// Maps a raw structure onto the closed role set. Containers only count when
/// flagged as reserves; unknown types yield `None`.
pub fn classify(raw: &RawStructure) -> Option<StructureKind> {
    match raw.structure_type.trim().to_lowercase().as_str() {
        "container" if raw.reserve => Some(StructureKind::ReserveContainer),
        "container" => None,
        other => StructureKind::from_str(other).ok(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub id: StructureId,
    pub kind: StructureKind,
    pub position: Position,
    #[serde(default)]
    pub store: Carry,
    pub capacity: u32,
    /// Desired stock levels, read by the request board when it surveys the base.
    #[serde(default)]
    pub targets: Carry,
}

impl Structure {
    pub fn from_raw(raw: &RawStructure) -> Option<Self> {
        let kind = classify(raw)?;
        Some(Self {
            id: raw.id,
            kind,
            position: raw.position,
            store: raw.store.clone(),
            capacity: raw.capacity,
            targets: raw.targets.clone(),
        })
    }

    pub fn to_raw(&self) -> RawStructure {
        let (structure_type, reserve) = match self.kind {
            StructureKind::ReserveContainer => ("container", true),
            other => (other.label(), false),
        };
        RawStructure {
            id: self.id,
            structure_type: structure_type.to_string(),
            position: self.position,
            store: self.store.clone(),
            capacity: self.capacity,
            targets: self.targets.clone(),
            reserve,
        }
    }

    pub fn stock(&self, kind: ResourceKind) -> u32 {
        self.store.get(kind)
    }

    pub fn free_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.store.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(structure_type: &str, reserve: bool) -> RawStructure {
        RawStructure {
            id: 1,
            structure_type: structure_type.to_string(),
            position: Position::new(10, 10),
            store: Carry::new(),
            capacity: 50,
            targets: Carry::new(),
            reserve,
        }
    }

    #[test]
    fn classifies_known_roles() {
        assert_eq!(classify(&raw("extension", false)), Some(StructureKind::Extension));
        assert_eq!(classify(&raw("Spawn", false)), Some(StructureKind::Spawn));
        assert_eq!(classify(&raw("terminal", false)), Some(StructureKind::Terminal));
        assert_eq!(classify(&raw("road", false)), None);
    }

    #[test]
    fn containers_need_reserve_flag() {
        assert_eq!(classify(&raw("container", false)), None);
        assert_eq!(
            classify(&raw("container", true)),
            Some(StructureKind::ReserveContainer)
        );
    }

    #[test]
    fn supply_and_reserve_roles_are_disjoint() {
        for kind in [
            StructureKind::Extension,
            StructureKind::Spawn,
            StructureKind::Tower,
            StructureKind::Lab,
            StructureKind::Terminal,
            StructureKind::Storage,
            StructureKind::ReserveContainer,
        ] {
            assert_ne!(kind.is_supply_target(), kind.is_reserve(), "{}", kind);
        }
    }
}
