use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::modules::error::{DispatchError, DispatchResult};
use crate::modules::request::{Direction, ResourceRequest};
use crate::modules::resource::{Carry, ResourceKind};
use crate::modules::structure::{Structure, StructureId};
use crate::modules::world::{Position, TransportAgent, World};

/// Travel cost between two positions. `None` means unreachable.
pub trait DistanceOracle {
    fn distance(&self, from: Position, to: Position) -> Option<u32>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ChebyshevDistance;

impl DistanceOracle for ChebyshevDistance {
    fn distance(&self, from: Position, to: Position) -> Option<u32> {
        Some(from.range_to(to))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Unload everything carried into `target`.
    TransferAll { target: StructureId },
    Transfer {
        target: StructureId,
        resource: ResourceKind,
        amount: u32,
    },
    Withdraw {
        source: StructureId,
        resource: ResourceKind,
        amount: u32,
    },
}

impl Operation {
    /// The structure this operation has to be performed next to.
    pub const fn structure(&self) -> StructureId {
        match *self {
            Operation::TransferAll { target } | Operation::Transfer { target, .. } => target,
            Operation::Withdraw { source, .. } => source,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Operation::TransferAll { .. } => "transfer_all",
            Operation::Transfer { .. } => "transfer",
            Operation::Withdraw { .. } => "withdraw",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::TransferAll { target } => write!(f, "transfer all -> #{}", target),
            Operation::Transfer {
                target,
                resource,
                amount,
            } => write!(f, "transfer {} {} -> #{}", amount, resource, target),
            Operation::Withdraw {
                source,
                resource,
                amount,
            } => write!(f, "withdraw {} {} <- #{}", amount, resource, source),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    Supply,
    Withdraw,
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestKind::Supply => write!(f, "supply"),
            ManifestKind::Withdraw => write!(f, "withdraw"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskManifest {
    kind: ManifestKind,
    operations: Vec<Operation>,
}

impl TaskManifest {
    pub fn new(kind: ManifestKind, operations: Vec<Operation>) -> Self {
        Self { kind, operations }
    }

    pub fn kind(&self) -> ManifestKind {
        self.kind
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn withdrawn(&self) -> Carry {
        self.operations
            .iter()
            .filter_map(|op| match *op {
                Operation::Withdraw {
                    resource, amount, ..
                } => Some((resource, amount)),
                _ => None,
            })
            .collect()
    }
}

pub struct ManifestBuilder<'a, D: DistanceOracle> {
    world: &'a World,
    oracle: &'a D,
}

impl<'a, D: DistanceOracle> ManifestBuilder<'a, D> {
    pub fn new(world: &'a World, oracle: &'a D) -> Self {
        Self { world, oracle }
    }

    /// Where carried resources are dumped: terminal, else storage, else the
    /// first reserve container.
    pub fn fallback_store(&self) -> Option<&'a Structure> {
        self.world.reserves().into_iter().next()
    }

    pub fn availability(&self) -> Carry {
        let mut total = Carry::new();
        for reserve in self.world.reserves() {
            total.merge(&reserve.store);
        }
        total
    }

    /// Supply chain for the agent's delivery requests:
    /// `[flush?] + [withdraws] + [deliveries]`.
    ///
    /// Deliveries are simulated first so the total need is known before one
    /// source is picked, then the withdraws are placed ahead of them. Returns
    /// `Ok(None)` when nothing could be allocated and the agent carries nothing.
    pub fn build_supply(
        &self,
        agent: &TransportAgent,
        requests: &[ResourceRequest],
    ) -> DispatchResult<Option<TaskManifest>> {
        let (flush, origin) = self.flush(agent)?;
        let availability = self.availability();

        let mut simulated = Carry::new();
        let mut deliveries = Vec::new();
        for request in requests
            .iter()
            .filter(|r| r.direction == Direction::NeedsDelivery)
        {
            let remaining = agent.capacity.saturating_sub(simulated.total());
            if remaining == 0 {
                break;
            }
            let amount = request
                .amount
                .min(remaining)
                .min(availability.get(request.resource));
            if amount == 0 {
                debug!(
                    agent = %agent.name,
                    target = request.target,
                    resource = %request.resource,
                    "delivery skipped, nothing available"
                );
                continue;
            }
            simulated.add(request.resource, amount);
            deliveries.push(Operation::Transfer {
                target: request.target,
                resource: request.resource,
                amount,
            });
        }

        if simulated.is_empty() {
            return Ok(flush.map(|op| TaskManifest::new(ManifestKind::Supply, vec![op])));
        }

        let source = self.select_source(agent, &simulated, origin)?;

        let mut operations: Vec<Operation> = flush.into_iter().collect();
        operations.extend(simulated.iter().map(|(resource, amount)| Operation::Withdraw {
            source: source.id,
            resource,
            amount,
        }));
        operations.extend(deliveries);

        Ok(Some(TaskManifest::new(ManifestKind::Supply, operations)))
    }

    /// Withdraw chain for the agent's removal requests:
    /// `[flush?] + [withdraws] + [final flush]`. The final flush is always
    /// present, even when no withdraw fit.
    pub fn build_withdraw(
        &self,
        agent: &TransportAgent,
        requests: &[ResourceRequest],
    ) -> DispatchResult<TaskManifest> {
        let store = self
            .fallback_store()
            .ok_or_else(|| DispatchError::NoFallbackStore {
                agent: agent.name.clone(),
            })?;

        let mut operations = Vec::new();
        if !agent.carry.is_empty() {
            operations.push(Operation::TransferAll { target: store.id });
        }

        let mut simulated = Carry::new();
        for request in requests
            .iter()
            .filter(|r| r.direction == Direction::NeedsRemoval)
        {
            let remaining = agent.capacity.saturating_sub(simulated.total());
            if remaining == 0 {
                break;
            }
            let amount = request.amount.min(remaining);
            if amount == 0 {
                continue;
            }
            simulated.add(request.resource, amount);
            operations.push(Operation::Withdraw {
                source: request.target,
                resource: request.resource,
                amount,
            });
        }

        operations.push(Operation::TransferAll { target: store.id });
        Ok(TaskManifest::new(ManifestKind::Withdraw, operations))
    }

    /// Flush operation for a loaded agent plus the position the agent will be
    /// at once it has run.
    fn flush(&self, agent: &TransportAgent) -> DispatchResult<(Option<Operation>, Position)> {
        if agent.carry.is_empty() {
            return Ok((None, agent.position));
        }
        let store = self
            .fallback_store()
            .ok_or_else(|| DispatchError::NoFallbackStore {
                agent: agent.name.clone(),
            })?;
        Ok((
            Some(Operation::TransferAll { target: store.id }),
            store.position,
        ))
    }

    /// A reserve qualifies only if it alone covers every needed resource.
    /// Resources split across several reserves therefore stall the request.
    fn select_source(
        &self,
        agent: &TransportAgent,
        needed: &Carry,
        origin: Position,
    ) -> DispatchResult<&'a Structure> {
        let qualifying: Vec<&'a Structure> = self
            .world
            .reserves()
            .into_iter()
            .filter(|reserve| {
                needed
                    .iter()
                    .all(|(resource, amount)| reserve.stock(resource) >= amount)
            })
            .collect();

        match qualifying.as_slice() {
            [] => Err(DispatchError::NoFeasibleSource {
                agent: agent.name.clone(),
                needed: needed.clone(),
            }),
            [only] => Ok(*only),
            many => Ok(many
                .iter()
                .copied()
                .min_by_key(|reserve| {
                    self.oracle
                        .distance(origin, reserve.position)
                        .unwrap_or(u32::MAX)
                })
                .unwrap_or(many[0])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::structure::StructureKind;

    const X: StructureId = 100;

    fn carry(items: &[(ResourceKind, u32)]) -> Carry {
        items.iter().copied().collect()
    }

    fn add(world: &mut World, id: StructureId, kind: StructureKind, at: (i32, i32), store: Carry) {
        world.add_structure(Structure {
            id,
            kind,
            position: Position::new(at.0, at.1),
            store,
            capacity: 10_000,
            targets: Carry::new(),
        });
    }

    fn agent(capacity: u32) -> TransportAgent {
        TransportAgent::new("hauler-1", Position::new(20, 20), capacity)
    }

    #[test]
    fn supply_caps_at_capacity() {
        let mut world = World::new();
        add(&mut world, 1, StructureKind::Storage, (10, 10), carry(&[(ResourceKind::Energy, 200)]));
        add(&mut world, X, StructureKind::Extension, (30, 30), Carry::new());
        let requests = [ResourceRequest::delivery(X, ResourceKind::Energy, 80)];

        let builder = ManifestBuilder::new(&world, &ChebyshevDistance);
        let manifest = builder.build_supply(&agent(50), &requests).unwrap().unwrap();

        assert_eq!(manifest.kind(), ManifestKind::Supply);
        assert_eq!(
            manifest.operations(),
            &[
                Operation::Withdraw {
                    source: 1,
                    resource: ResourceKind::Energy,
                    amount: 50
                },
                Operation::Transfer {
                    target: X,
                    resource: ResourceKind::Energy,
                    amount: 50
                },
            ]
        );
    }

    #[test]
    fn source_must_cover_every_resource() {
        let mut world = World::new();
        add(
            &mut world,
            1,
            StructureKind::ReserveContainer,
            (21, 21),
            carry(&[(ResourceKind::Energy, 40), (ResourceKind::Utrium, 5)]),
        );
        add(
            &mut world,
            2,
            StructureKind::ReserveContainer,
            (40, 40),
            carry(&[(ResourceKind::Energy, 40), (ResourceKind::Utrium, 20)]),
        );
        let requests = [
            ResourceRequest::delivery(X, ResourceKind::Energy, 30),
            ResourceRequest::delivery(X + 1, ResourceKind::Utrium, 10),
        ];

        let builder = ManifestBuilder::new(&world, &ChebyshevDistance);
        let manifest = builder.build_supply(&agent(100), &requests).unwrap().unwrap();

        let sources: Vec<_> = manifest
            .operations()
            .iter()
            .filter(|op| op.label() == "withdraw")
            .map(Operation::structure)
            .collect();
        assert_eq!(sources, vec![2, 2]);
        assert_eq!(
            manifest.withdrawn(),
            carry(&[(ResourceKind::Energy, 30), (ResourceKind::Utrium, 10)])
        );
    }

    #[test]
    fn fragmented_stock_starves_the_request() {
        let mut world = World::new();
        add(&mut world, 1, StructureKind::Storage, (10, 10), carry(&[(ResourceKind::Energy, 50)]));
        add(&mut world, 2, StructureKind::Terminal, (12, 10), carry(&[(ResourceKind::Oxygen, 50)]));
        let requests = [
            ResourceRequest::delivery(X, ResourceKind::Energy, 10),
            ResourceRequest::delivery(X, ResourceKind::Oxygen, 10),
        ];

        let builder = ManifestBuilder::new(&world, &ChebyshevDistance);
        let err = builder.build_supply(&agent(50), &requests).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::NoFeasibleSource { ref needed, .. } if needed.total() == 20
        ));
    }

    #[test]
    fn nearest_qualifying_source_wins_from_post_flush_position() {
        let mut world = World::new();
        // Terminal is the flush target and sits far from the agent.
        add(&mut world, 1, StructureKind::Terminal, (45, 45), carry(&[(ResourceKind::Energy, 100)]));
        add(&mut world, 2, StructureKind::Storage, (21, 21), carry(&[(ResourceKind::Energy, 100)]));
        let requests = [ResourceRequest::delivery(X, ResourceKind::Energy, 10)];
        let builder = ManifestBuilder::new(&world, &ChebyshevDistance);

        let empty = agent(50);
        let manifest = builder.build_supply(&empty, &requests).unwrap().unwrap();
        assert_eq!(manifest.operations()[0].structure(), 2);

        let mut loaded = agent(50);
        loaded.carry.add(ResourceKind::Hydrogen, 5);
        let manifest = builder.build_supply(&loaded, &requests).unwrap().unwrap();
        assert_eq!(manifest.operations()[0], Operation::TransferAll { target: 1 });
        assert_eq!(manifest.operations()[1].structure(), 1);
    }

    #[test]
    fn unreachable_sources_lose_the_tie_break() {
        struct Walls;
        impl DistanceOracle for Walls {
            fn distance(&self, _from: Position, to: Position) -> Option<u32> {
                (to.x < 30).then_some(1)
            }
        }

        let mut world = World::new();
        add(&mut world, 1, StructureKind::Terminal, (40, 20), carry(&[(ResourceKind::Energy, 100)]));
        add(&mut world, 2, StructureKind::Storage, (10, 20), carry(&[(ResourceKind::Energy, 100)]));
        let requests = [ResourceRequest::delivery(X, ResourceKind::Energy, 10)];

        let builder = ManifestBuilder::new(&world, &Walls);
        let manifest = builder.build_supply(&agent(50), &requests).unwrap().unwrap();
        assert_eq!(manifest.operations()[0].structure(), 2);
    }

    #[test]
    fn no_store_and_loaded_agent_fails() {
        let mut world = World::new();
        add(&mut world, X, StructureKind::Extension, (30, 30), Carry::new());
        let mut loaded = agent(50);
        loaded.carry.add(ResourceKind::Energy, 10);
        let requests = [ResourceRequest::delivery(X, ResourceKind::Energy, 10)];

        let builder = ManifestBuilder::new(&world, &ChebyshevDistance);
        assert_eq!(
            builder.build_supply(&loaded, &requests),
            Err(DispatchError::NoFallbackStore {
                agent: "hauler-1".into()
            })
        );
        assert!(builder.build_withdraw(&loaded, &[]).is_err());
    }

    #[test]
    fn greedy_fill_skips_unavailable_and_stops_when_full() {
        let mut world = World::new();
        add(
            &mut world,
            1,
            StructureKind::Storage,
            (10, 10),
            carry(&[(ResourceKind::Energy, 500), (ResourceKind::Keanium, 500)]),
        );
        let requests = [
            ResourceRequest::delivery(X, ResourceKind::Ghodium, 40),
            ResourceRequest::delivery(X, ResourceKind::Energy, 30),
            ResourceRequest::delivery(X + 1, ResourceKind::Keanium, 30),
            ResourceRequest::delivery(X + 2, ResourceKind::Energy, 30),
        ];

        let builder = ManifestBuilder::new(&world, &ChebyshevDistance);
        let manifest = builder.build_supply(&agent(50), &requests).unwrap().unwrap();

        let deliveries: Vec<_> = manifest
            .operations()
            .iter()
            .filter_map(|op| match *op {
                Operation::Transfer {
                    target, amount, ..
                } => Some((target, amount)),
                _ => None,
            })
            .collect();
        assert_eq!(deliveries, vec![(X, 30), (X + 1, 20)]);
        assert!(manifest.withdrawn().total() <= 50);
    }

    #[test]
    fn each_request_is_checked_against_the_full_snapshot() {
        let mut world = World::new();
        add(&mut world, 1, StructureKind::Storage, (10, 10), carry(&[(ResourceKind::Energy, 25)]));
        let requests = [
            ResourceRequest::delivery(X, ResourceKind::Energy, 20),
            ResourceRequest::delivery(X + 1, ResourceKind::Energy, 20),
        ];

        // Both requests fit the snapshot on their own; together no store covers them.
        let builder = ManifestBuilder::new(&world, &ChebyshevDistance);
        let err = builder.build_supply(&agent(100), &requests).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::NoFeasibleSource { ref needed, .. }
                if needed.get(ResourceKind::Energy) == 40
        ));
    }

    #[test]
    fn zero_entries_in_loaded_carry_do_not_trigger_a_flush() {
        let mut world = World::new();
        add(&mut world, 1, StructureKind::Storage, (10, 10), carry(&[(ResourceKind::Energy, 100)]));
        let agent: TransportAgent = serde_json::from_str(
            r#"{"name":"hauler-1","position":{"x":20,"y":20},"capacity":50,"carry":{"energy":0}}"#,
        )
        .unwrap();
        let requests = [ResourceRequest::delivery(X, ResourceKind::Energy, 10)];

        let builder = ManifestBuilder::new(&world, &ChebyshevDistance);
        let manifest = builder.build_supply(&agent, &requests).unwrap().unwrap();
        assert_eq!(manifest.operations()[0].label(), "withdraw");
        assert_eq!(manifest.operations().len(), 2);

        let manifest = builder.build_withdraw(&agent, &[]).unwrap();
        assert_eq!(manifest.operations(), &[Operation::TransferAll { target: 1 }]);
    }

    #[test]
    fn withdraw_without_store_fails_even_when_empty() {
        let mut world = World::new();
        add(&mut world, X, StructureKind::Lab, (30, 30), carry(&[(ResourceKind::Hydrogen, 40)]));
        let requests = [ResourceRequest::removal(X, ResourceKind::Hydrogen, 40)];

        let builder = ManifestBuilder::new(&world, &ChebyshevDistance);
        assert_eq!(
            builder.build_withdraw(&agent(50), &requests),
            Err(DispatchError::NoFallbackStore {
                agent: "hauler-1".into()
            })
        );
    }

    #[test]
    fn nothing_to_deliver_yields_flush_only_or_nothing() {
        let mut world = World::new();
        add(&mut world, 1, StructureKind::Storage, (10, 10), Carry::new());
        let requests = [ResourceRequest::delivery(X, ResourceKind::Energy, 20)];
        let builder = ManifestBuilder::new(&world, &ChebyshevDistance);

        assert_eq!(builder.build_supply(&agent(50), &requests), Ok(None));

        let mut loaded = agent(50);
        loaded.carry.add(ResourceKind::Energy, 3);
        let manifest = builder.build_supply(&loaded, &requests).unwrap().unwrap();
        assert_eq!(manifest.operations(), &[Operation::TransferAll { target: 1 }]);
    }

    #[test]
    fn withdraw_chain_always_ends_with_flush() {
        let mut world = World::new();
        add(&mut world, 1, StructureKind::ReserveContainer, (10, 10), Carry::new());
        add(&mut world, 2, StructureKind::Storage, (12, 10), Carry::new());
        let requests = [
            ResourceRequest::removal(X, ResourceKind::Hydrogen, 30),
            ResourceRequest::removal(X + 1, ResourceKind::Oxygen, 30),
            ResourceRequest::removal(X + 2, ResourceKind::Oxygen, 30),
        ];
        let builder = ManifestBuilder::new(&world, &ChebyshevDistance);

        let mut loaded = agent(50);
        loaded.carry.add(ResourceKind::Energy, 1);
        let manifest = builder.build_withdraw(&loaded, &requests).unwrap();
        assert_eq!(manifest.kind(), ManifestKind::Withdraw);
        assert_eq!(
            manifest.operations(),
            &[
                Operation::TransferAll { target: 2 },
                Operation::Withdraw {
                    source: X,
                    resource: ResourceKind::Hydrogen,
                    amount: 30
                },
                Operation::Withdraw {
                    source: X + 1,
                    resource: ResourceKind::Oxygen,
                    amount: 20
                },
                Operation::TransferAll { target: 2 },
            ]
        );

        let manifest = builder.build_withdraw(&agent(50), &[]).unwrap();
        assert_eq!(manifest.operations(), &[Operation::TransferAll { target: 2 }]);
    }
}
