use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::modules::resource::ResourceKind;
use crate::modules::structure::StructureId;
use crate::modules::world::World;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    NeedsDelivery,
    NeedsRemoval,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub target: StructureId,
    pub resource: ResourceKind,
    pub amount: u32,
    pub direction: Direction,
}

impl ResourceRequest {
    pub fn delivery(target: StructureId, resource: ResourceKind, amount: u32) -> Self {
        Self {
            target,
            resource,
            amount,
            direction: Direction::NeedsDelivery,
        }
    }

    pub fn removal(target: StructureId, resource: ResourceKind, amount: u32) -> Self {
        Self {
            target,
            resource,
            amount,
            direction: Direction::NeedsRemoval,
        }
    }
}

pub trait RequestIndex {
    fn supply_requests_for(&self, structure: StructureId) -> Vec<ResourceRequest>;
    fn withdraw_requests_for(&self, structure: StructureId) -> Vec<ResourceRequest>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingRequests {
    pub supply: Vec<ResourceRequest>,
    pub withdraw: Vec<ResourceRequest>,
}

impl PendingRequests {
    pub fn is_empty(&self) -> bool {
        self.supply.is_empty() && self.withdraw.is_empty()
    }
}

pub fn aggregate_requests(index: &impl RequestIndex, structures: &[StructureId]) -> PendingRequests {
    let mut pending = PendingRequests::default();
    for id in structures {
        pending.withdraw.extend(
            index
                .withdraw_requests_for(*id)
                .into_iter()
                .filter(|r| r.amount > 0),
        );
        pending.supply.extend(
            index
                .supply_requests_for(*id)
                .into_iter()
                .filter(|r| r.amount > 0),
        );
    }
    pending
}

#[derive(Clone, Debug, Default)]
pub struct RequestBoard {
    supply: BTreeMap<StructureId, Vec<ResourceRequest>>,
    withdraw: BTreeMap<StructureId, Vec<ResourceRequest>>,
}

impl RequestBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: ResourceRequest) {
        let queue = match request.direction {
            Direction::NeedsDelivery => &mut self.supply,
            Direction::NeedsRemoval => &mut self.withdraw,
        };
        queue.entry(request.target).or_default().push(request);
    }

    pub fn len(&self) -> usize {
        self.supply.values().map(Vec::len).sum::<usize>()
            + self.withdraw.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds a fresh board from the world: a supply structure below a target
    /// level asks for the difference; stock above target (or with no target at
    /// all) asks to be removed.
    pub fn survey(world: &World) -> Self {
        let mut board = RequestBoard::new();
        for structure in world.structures() {
            if !structure.kind.is_supply_target() {
                continue;
            }

            let mut room = structure.free_capacity();
            for (resource, target) in structure.targets.iter() {
                let missing = target.saturating_sub(structure.stock(resource)).min(room);
                if missing > 0 {
                    room -= missing;
                    board.push(ResourceRequest::delivery(structure.id, resource, missing));
                }
            }

            for (resource, stock) in structure.store.iter() {
                let excess = stock.saturating_sub(structure.targets.get(resource));
                if excess > 0 {
                    board.push(ResourceRequest::removal(structure.id, resource, excess));
                }
            }
        }
        board
    }
}

impl RequestIndex for RequestBoard {
    fn supply_requests_for(&self, structure: StructureId) -> Vec<ResourceRequest> {
        self.supply.get(&structure).cloned().unwrap_or_default()
    }

    fn withdraw_requests_for(&self, structure: StructureId) -> Vec<ResourceRequest> {
        self.withdraw.get(&structure).cloned().unwrap_or_default()
    }
}
