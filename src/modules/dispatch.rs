use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::modules::assign::{Assignment, assign_zones};
use crate::modules::error::DispatchError;
use crate::modules::idle::route_idle;
use crate::modules::layout::BaseLayout;
use crate::modules::manifest::{
    ChebyshevDistance, DistanceOracle, ManifestBuilder, ManifestKind, TaskManifest,
};
use crate::modules::request::{RequestIndex, aggregate_requests};
use crate::modules::structure::StructureKind;
use crate::modules::vm::StepOutcome;
use crate::modules::world::{Position, TransportAgent, World};
use crate::modules::zone::{Zone, ZonePartitioner};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    Manifest(TaskManifest),
    MoveTo(Position),
}

/// The side that owns the world and actually moves agents.
pub trait ExecutionLayer {
    fn world(&self) -> &World;

    fn begin_cycle(&mut self) -> u64;

    fn commit(&mut self, agent: &str, directive: Directive);

    fn execute_step(&mut self, agent: &str) -> StepOutcome;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Spawning,
    Busy,
    Manifest {
        kind: ManifestKind,
        operations: usize,
    },
    Idle(Position),
}

impl Decision {
    pub const fn label(&self) -> &'static str {
        match self {
            Decision::Spawning => "spawning",
            Decision::Busy => "busy",
            Decision::Manifest {
                kind: ManifestKind::Supply,
                ..
            } => "supply",
            Decision::Manifest {
                kind: ManifestKind::Withdraw,
                ..
            } => "withdraw",
            Decision::Idle(_) => "idle",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Manifest { kind, operations } => {
                write!(f, "{} manifest ({} ops)", kind, operations)
            }
            Decision::Idle(at) => write!(f, "idle -> ({},{})", at.x, at.y),
            other => write!(f, "{}", other.label()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CycleReport {
    pub cycle: u64,
    pub zones: Vec<Zone>,
    pub assignment: Assignment,
    pub decisions: BTreeMap<String, Decision>,
    pub warnings: Vec<DispatchError>,
    pub outcomes: BTreeMap<String, StepOutcome>,
}

#[derive(Clone, Debug, Default)]
pub struct CyclePlan {
    pub zones: Vec<Zone>,
    pub assignment: Assignment,
    pub directives: Vec<(String, Directive)>,
    pub decisions: BTreeMap<String, Decision>,
    pub warnings: Vec<DispatchError>,
}

pub struct Dispatcher<D: DistanceOracle = ChebyshevDistance> {
    layout: BaseLayout,
    partitioner: ZonePartitioner,
    oracle: D,
}

impl Dispatcher<ChebyshevDistance> {
    pub fn new(layout: BaseLayout) -> Self {
        Self::with_oracle(layout, ChebyshevDistance)
    }
}

impl<D: DistanceOracle> Dispatcher<D> {
    pub fn with_oracle(layout: BaseLayout, oracle: D) -> Self {
        Self {
            layout,
            partitioner: ZonePartitioner::new(),
            oracle,
        }
    }

    pub fn layout(&self) -> &BaseLayout {
        &self.layout
    }

    /// Runs one full cycle: plan against the current snapshot, commit the
    /// directives, then step every agent once.
    pub fn run_cycle<E: ExecutionLayer, R: RequestIndex>(
        &mut self,
        exec: &mut E,
        index: &R,
    ) -> CycleReport {
        let cycle = exec.begin_cycle();
        let plan = self.plan(cycle, exec.world(), index);

        for (agent, directive) in plan.directives {
            exec.commit(&agent, directive);
        }

        let mut outcomes = BTreeMap::new();
        for name in exec.world().agent_names() {
            let outcome = exec.execute_step(&name);
            outcomes.insert(name, outcome);
        }

        info!(
            cycle,
            agents = plan.decisions.len(),
            warnings = plan.warnings.len(),
            "dispatch cycle complete"
        );

        CycleReport {
            cycle,
            zones: plan.zones,
            assignment: plan.assignment,
            decisions: plan.decisions,
            warnings: plan.warnings,
            outcomes,
        }
    }

    pub fn plan<R: RequestIndex>(&mut self, cycle: u64, world: &World, index: &R) -> CyclePlan {
        let zones = self.partitioner.zones(cycle, &self.layout, world);
        let assignment = assign_zones(world.agents(), &zones);
        let builder = ManifestBuilder::new(world, &self.oracle);

        let mut plan = CyclePlan {
            zones,
            ..CyclePlan::default()
        };

        for agent in world.agents() {
            if !agent.is_active() {
                plan.decisions.insert(agent.name.clone(), Decision::Spawning);
                continue;
            }
            if !agent.is_idle() {
                plan.decisions.insert(agent.name.clone(), Decision::Busy);
                continue;
            }

            let structures = assignment
                .get(&agent.name)
                .map(|a| a.structures.as_slice())
                .unwrap_or(&[]);
            let pending = aggregate_requests(index, structures);

            let built = if !pending.withdraw.is_empty() {
                builder.build_withdraw(agent, &pending.withdraw).map(Some)
            } else if !pending.supply.is_empty() {
                builder.build_supply(agent, &pending.supply)
            } else {
                Ok(None)
            };

            let manifest = match built {
                Ok(manifest) => manifest,
                Err(err) => {
                    warn!(agent = %agent.name, kind = err.label(), "{}", err);
                    plan.warnings.push(err);
                    None
                }
            };

            let (decision, directive) = match manifest {
                Some(manifest) => (
                    Decision::Manifest {
                        kind: manifest.kind(),
                        operations: manifest.operations().len(),
                    },
                    Directive::Manifest(manifest),
                ),
                None => self.idle(agent, &assignment, &mut plan.warnings),
            };

            debug!(agent = %agent.name, decision = %decision, "dispatch decision");
            plan.decisions.insert(agent.name.clone(), decision);
            plan.directives.push((agent.name.clone(), directive));
        }

        plan.assignment = assignment;
        plan
    }

    fn idle(
        &self,
        agent: &TransportAgent,
        assignment: &Assignment,
        warnings: &mut Vec<DispatchError>,
    ) -> (Decision, Directive) {
        let route = route_idle(
            agent,
            assignment.get(&agent.name),
            &self.layout,
            &self.oracle,
        );
        if let Some(err) = route.warning {
            warn!(agent = %agent.name, kind = err.label(), "{}", err);
            warnings.push(err);
        }
        (
            Decision::Idle(route.destination),
            Directive::MoveTo(route.destination),
        )
    }
}

/// How many transport agents the base would like to keep: one, or two once
/// it has more than one spawn. Only reported.
pub fn desired_agent_count(world: &World) -> usize {
    let spawns = world
        .structures()
        .iter()
        .filter(|s| s.kind == StructureKind::Spawn)
        .count();
    if spawns > 1 { 2 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::manifest::Operation;
    use crate::modules::request::{RequestBoard, ResourceRequest};
    use crate::modules::resource::{Carry, ResourceKind};
    use crate::modules::structure::{Structure, StructureId};
    use crate::modules::vm::Vm;
    use crate::modules::world::ActiveTask;

    fn structure(id: StructureId, kind: StructureKind, at: (i32, i32), store: Carry) -> Structure {
        Structure {
            id,
            kind,
            position: Position::new(at.0, at.1),
            store,
            capacity: 1_000,
            targets: Carry::new(),
        }
    }

    fn energy(amount: u32) -> Carry {
        [(ResourceKind::Energy, amount)].into_iter().collect()
    }

    fn base() -> World {
        let mut world = World::new();
        world.add_structure(structure(1, StructureKind::Extension, (26, 26), Carry::new()));
        world.add_structure(structure(2, StructureKind::Storage, (20, 30), energy(500)));
        world
    }

    #[test]
    fn idle_agent_gets_supply_manifest() {
        let mut world = base();
        world.add_agent(TransportAgent::new("hauler-1", Position::new(21, 30), 50));
        let mut board = RequestBoard::new();
        board.push(ResourceRequest::delivery(1, ResourceKind::Energy, 30));

        let mut vm = Vm::new(world);
        let mut dispatcher = Dispatcher::new(BaseLayout::default());
        let report = dispatcher.run_cycle(&mut vm, &board);

        assert_eq!(report.cycle, 1);
        assert!(report.warnings.is_empty());
        assert_eq!(
            report.decisions.get("hauler-1"),
            Some(&Decision::Manifest {
                kind: ManifestKind::Supply,
                operations: 2
            })
        );
        // Adjacent to storage, so the first step is the withdraw itself.
        assert!(matches!(
            report.outcomes.get("hauler-1"),
            Some(StepOutcome::Performed(Operation::Withdraw { amount: 30, .. }))
        ));
    }

    #[test]
    fn removal_requests_take_priority_over_supply() {
        let mut world = base();
        world.add_structure(structure(3, StructureKind::Lab, (24, 24), energy(40)));
        world.add_agent(TransportAgent::new("hauler-1", Position::new(25, 25), 50));
        let mut board = RequestBoard::new();
        board.push(ResourceRequest::delivery(1, ResourceKind::Energy, 30));
        board.push(ResourceRequest::removal(3, ResourceKind::Energy, 40));

        let mut dispatcher = Dispatcher::new(BaseLayout::default());
        let plan = dispatcher.plan(1, &world, &board);
        assert!(matches!(
            plan.decisions.get("hauler-1"),
            Some(Decision::Manifest {
                kind: ManifestKind::Withdraw,
                ..
            })
        ));
    }

    #[test]
    fn agent_without_zones_routes_idle_with_warning() {
        let mut world = base();
        for name in ["a", "b", "c", "d", "e"] {
            world.add_agent(TransportAgent::new(name, Position::new(10, 10), 50));
        }
        let board = RequestBoard::new();

        let mut dispatcher = Dispatcher::new(BaseLayout::default());
        let plan = dispatcher.plan(1, &world, &board);

        assert!(plan.assignment.get("e").is_some_and(|a| a.is_empty()));
        assert_eq!(
            plan.decisions.get("e"),
            Some(&Decision::Idle(Position::new(10, 10)))
        );
        assert_eq!(
            plan.warnings,
            vec![DispatchError::NoChargingSpot {
                agent: "e".to_string()
            }]
        );
        // Agent "a" serves lowerRight and heads for its standby spot.
        assert_eq!(
            plan.decisions.get("a"),
            Some(&Decision::Idle(Position::new(27, 25)))
        );
    }

    #[test]
    fn missing_store_is_reported_and_agent_idles() {
        let mut world = World::new();
        world.add_structure(structure(1, StructureKind::Extension, (26, 26), Carry::new()));
        let mut agent = TransportAgent::new("hauler-1", Position::new(30, 30), 50);
        agent.carry.add(ResourceKind::Energy, 10);
        world.add_agent(agent);
        let mut board = RequestBoard::new();
        board.push(ResourceRequest::delivery(1, ResourceKind::Energy, 30));

        let mut vm = Vm::new(world);
        let mut dispatcher = Dispatcher::new(BaseLayout::default());
        let report = dispatcher.run_cycle(&mut vm, &board);

        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            report.warnings[0],
            DispatchError::NoFallbackStore { .. }
        ));
        assert!(matches!(
            report.decisions.get("hauler-1"),
            Some(Decision::Idle(_))
        ));
        assert!(vm.world().agent("hauler-1").is_some_and(|a| a.is_idle()));
    }

    #[test]
    fn removal_without_store_idles_an_empty_agent() {
        let mut world = World::new();
        world.add_structure(structure(3, StructureKind::Lab, (24, 24), energy(40)));
        world.add_agent(TransportAgent::new("hauler-1", Position::new(25, 25), 50));
        let mut board = RequestBoard::new();
        board.push(ResourceRequest::removal(3, ResourceKind::Energy, 40));

        let mut dispatcher = Dispatcher::new(BaseLayout::default());
        let plan = dispatcher.plan(1, &world, &board);

        assert_eq!(
            plan.warnings,
            vec![DispatchError::NoFallbackStore {
                agent: "hauler-1".to_string()
            }]
        );
        assert!(matches!(
            plan.decisions.get("hauler-1"),
            Some(Decision::Idle(_))
        ));
    }

    #[test]
    fn busy_and_spawning_agents_get_nothing_new() {
        let mut world = base();
        let mut busy = TransportAgent::new("busy", Position::new(21, 30), 50);
        busy.task = Some(ActiveTask::new(TaskManifest::new(
            ManifestKind::Withdraw,
            vec![Operation::TransferAll { target: 2 }],
        )));
        busy.carry.add(ResourceKind::Energy, 5);
        let mut spawning = TransportAgent::new("fresh", Position::new(20, 20), 50);
        spawning.spawning = 3;
        world.add_agent(busy);
        world.add_agent(spawning);
        let mut board = RequestBoard::new();
        board.push(ResourceRequest::delivery(1, ResourceKind::Energy, 30));

        let mut dispatcher = Dispatcher::new(BaseLayout::default());
        let plan = dispatcher.plan(1, &world, &board);

        assert_eq!(plan.decisions.get("busy"), Some(&Decision::Busy));
        assert_eq!(plan.decisions.get("fresh"), Some(&Decision::Spawning));
        assert!(plan.directives.is_empty());
        // The only active agent owns every zone.
        assert_eq!(plan.assignment.get("busy").map(|a| a.zones.len()), Some(4));
    }

    #[test]
    fn wishlist_follows_spawn_count() {
        let mut world = World::new();
        assert_eq!(desired_agent_count(&world), 1);
        world.add_structure(structure(1, StructureKind::Spawn, (5, 5), Carry::new()));
        assert_eq!(desired_agent_count(&world), 1);
        world.add_structure(structure(2, StructureKind::Spawn, (6, 5), Carry::new()));
        assert_eq!(desired_agent_count(&world), 2);
    }
}
