use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::modules::layout::{BaseLayout, Quadrant};
use crate::modules::structure::StructureId;
use crate::modules::world::World;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub quadrant: Quadrant,
    pub structures: Vec<StructureId>,
}

/// Zone contents keyed by quadrant, each entry stamped with the cycle it was
/// computed for. An entry from another cycle is a miss.
#[derive(Debug, Default)]
pub struct ZoneCache {
    entries: HashMap<Quadrant, (u64, Zone)>,
}

impl ZoneCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, quadrant: Quadrant, cycle: u64) -> Option<&Zone> {
        match self.entries.get(&quadrant) {
            Some((stamp, zone)) if *stamp == cycle => Some(zone),
            _ => None,
        }
    }

    pub fn insert(&mut self, cycle: u64, zone: Zone) {
        self.entries.insert(zone.quadrant, (cycle, zone));
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Default)]
pub struct ZonePartitioner {
    cache: ZoneCache,
}

impl ZonePartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zones(&mut self, cycle: u64, layout: &BaseLayout, world: &World) -> Vec<Zone> {
        Quadrant::CANONICAL_ORDER
            .into_iter()
            .map(|quadrant| self.zone(quadrant, cycle, layout, world))
            .collect()
    }

    pub fn zone(
        &mut self,
        quadrant: Quadrant,
        cycle: u64,
        layout: &BaseLayout,
        world: &World,
    ) -> Zone {
        if let Some(zone) = self.cache.get(quadrant, cycle) {
            return zone.clone();
        }

        // Any stale quadrant means the whole partition is stale.
        self.cache.invalidate();
        let mut found = Zone {
            quadrant,
            structures: Vec::new(),
        };
        for zone in partition(layout, world) {
            if zone.quadrant == quadrant {
                found = zone.clone();
            }
            self.cache.insert(cycle, zone);
        }
        found
    }
}

/// Computes every zone in one pass. Quadrants are visited in canonical order
/// and coordinates in fill order; a structure already claimed by an earlier
/// quadrant is not repeated.
pub fn partition(layout: &BaseLayout, world: &World) -> Vec<Zone> {
    let mut claimed: HashSet<StructureId> = HashSet::new();
    let mut zones = Vec::with_capacity(Quadrant::CANONICAL_ORDER.len());

    for quadrant in Quadrant::CANONICAL_ORDER {
        let mut structures = Vec::new();
        for coord in layout.coords(quadrant) {
            let Some(position) = layout.resolve(*coord) else {
                continue;
            };
            for structure in world.structures_at(position) {
                if structure.kind.is_supply_target() && claimed.insert(structure.id) {
                    structures.push(structure.id);
                }
            }
        }
        zones.push(Zone {
            quadrant,
            structures,
        });
    }

    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::layout::Coord;
    use crate::modules::resource::Carry;
    use crate::modules::structure::{Structure, StructureKind};
    use crate::modules::world::Position;

    fn place(world: &mut World, id: StructureId, kind: StructureKind, position: Position) {
        world.add_structure(Structure {
            id,
            kind,
            position,
            store: Carry::new(),
            capacity: 50,
            targets: Carry::new(),
        });
    }

    fn sample_world(layout: &BaseLayout) -> World {
        let mut world = World::new();
        let at = |coord: Coord| layout.resolve(coord).unwrap();
        place(&mut world, 1, StructureKind::Extension, at(Coord::new(2, 1)));
        place(&mut world, 2, StructureKind::Extension, at(Coord::new(1, 1)));
        place(&mut world, 3, StructureKind::Spawn, at(Coord::new(-1, -1)));
        place(&mut world, 4, StructureKind::Tower, at(Coord::new(-2, 3)));
        place(&mut world, 5, StructureKind::Lab, at(Coord::new(4, -4)));
        // Stores inside a quadrant never join a zone.
        place(&mut world, 6, StructureKind::Storage, at(Coord::new(-1, 1)));
        // Supply structures off the fill pattern are ignored too.
        place(&mut world, 7, StructureKind::Extension, at(Coord::new(0, 3)));
        world
    }

    #[test]
    fn each_qualifying_structure_lands_in_exactly_one_zone() {
        let layout = BaseLayout::default();
        let world = sample_world(&layout);
        let zones = partition(&layout, &world);

        let quadrants: Vec<_> = zones.iter().map(|z| z.quadrant).collect();
        assert_eq!(quadrants, Quadrant::CANONICAL_ORDER.to_vec());

        let all: Vec<StructureId> = zones.iter().flat_map(|z| z.structures.clone()).collect();
        let mut sorted = all.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn zone_order_follows_fill_order_not_ids() {
        let layout = BaseLayout::default();
        let world = sample_world(&layout);
        let zones = partition(&layout, &world);
        assert_eq!(zones[0].structures, vec![2, 1]);
        assert_eq!(zones[1].structures, vec![3]);
        assert_eq!(zones[2].structures, vec![4]);
        assert_eq!(zones[3].structures, vec![5]);
    }

    #[test]
    fn overlapping_layout_claims_structure_once() {
        let mut layout = BaseLayout::new(Position::new(10, 10));
        layout
            .quadrants
            .insert(Quadrant::LowerRight, vec![Coord::new(1, 1)]);
        layout
            .quadrants
            .insert(Quadrant::UpperLeft, vec![Coord::new(1, 1), Coord::new(-1, -1)]);
        let mut world = World::new();
        place(&mut world, 1, StructureKind::Extension, Position::new(11, 11));
        place(&mut world, 2, StructureKind::Extension, Position::new(9, 9));

        let zones = partition(&layout, &world);
        assert_eq!(zones[0].structures, vec![1]);
        assert_eq!(zones[1].structures, vec![2]);
        assert!(zones[2].structures.is_empty());
    }

    #[test]
    fn cache_recomputes_on_new_cycle_only() {
        let layout = BaseLayout::default();
        let mut world = sample_world(&layout);
        let mut partitioner = ZonePartitioner::new();

        let first = partitioner.zones(1, &layout, &world);

        // Same cycle: a structure added mid-cycle is not picked up.
        let extra = layout.resolve(Coord::new(3, 3)).unwrap();
        place(&mut world, 9, StructureKind::Extension, extra);
        assert_eq!(partitioner.zones(1, &layout, &world), first);

        let next = partitioner.zones(2, &layout, &world);
        assert!(next[0].structures.contains(&9));
        assert_eq!(next[0].structures[..2], first[0].structures[..]);
    }
}
