use tracing::debug;

use crate::modules::dispatch::{Directive, ExecutionLayer};
use crate::modules::manifest::{ManifestKind, Operation};
use crate::modules::resource::{Carry, ResourceKind};
use crate::modules::structure::StructureId;
use crate::modules::world::{ActiveTask, INTERACT_RANGE, Position, World};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    CycleStarted {
        cycle: u64,
    },
    AgentActivated {
        agent: String,
    },
    ManifestAssigned {
        agent: String,
        kind: ManifestKind,
        operations: usize,
    },
    AgentMoved {
        agent: String,
        from: Position,
        to: Position,
    },
    Withdrew {
        agent: String,
        source: StructureId,
        resource: ResourceKind,
        amount: u32,
    },
    Transferred {
        agent: String,
        target: StructureId,
        resource: ResourceKind,
        amount: u32,
    },
    OperationSkipped {
        agent: String,
        structure: StructureId,
    },
    ManifestCompleted {
        agent: String,
        kind: ManifestKind,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Spawning,
    Moved { from: Position, to: Position },
    Performed(Operation),
    Holding,
    Missing,
}

/// Reference execution layer: owns the world and carries out one movement
/// step or one operation per agent per cycle.
#[derive(Debug, Default)]
pub struct Vm {
    world: World,
    events: Vec<Event>,
}

impl Vm {
    pub fn new(world: World) -> Self {
        Self {
            world,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn move_agent(&mut self, name: &str, target: Position) -> StepOutcome {
        let Some(agent) = self.world.agent_mut(name) else {
            return StepOutcome::Missing;
        };
        let from = agent.position;
        let to = from.step_toward(target);
        if to == from {
            return StepOutcome::Holding;
        }
        agent.position = to;
        self.events.push(Event::AgentMoved {
            agent: name.to_string(),
            from,
            to,
        });
        StepOutcome::Moved { from, to }
    }

    fn perform(&mut self, name: &str, op: Operation) {
        match op {
            Operation::Withdraw {
                source,
                resource,
                amount,
            } => {
                let room = self.world.agent(name).map_or(0, |a| a.free_capacity());
                let taken = match self.world.structure_mut(source) {
                    Some(structure) => structure.store.take(resource, amount.min(room)),
                    None => 0,
                };
                if let Some(agent) = self.world.agent_mut(name) {
                    agent.carry.add(resource, taken);
                }
                self.events.push(Event::Withdrew {
                    agent: name.to_string(),
                    source,
                    resource,
                    amount: taken,
                });
            }
            Operation::Transfer {
                target,
                resource,
                amount,
            } => {
                let moved = self.transfer(name, target, resource, amount);
                self.events.push(Event::Transferred {
                    agent: name.to_string(),
                    target,
                    resource,
                    amount: moved,
                });
            }
            Operation::TransferAll { target } => {
                let carried: Carry = self
                    .world
                    .agent(name)
                    .map(|a| a.carry.clone())
                    .unwrap_or_default();
                for (resource, amount) in carried.iter() {
                    let moved = self.transfer(name, target, resource, amount);
                    self.events.push(Event::Transferred {
                        agent: name.to_string(),
                        target,
                        resource,
                        amount: moved,
                    });
                }
            }
        }
    }

    /// Moves up to `amount` from the agent into the structure, bounded by what
    /// the agent holds and the structure's free capacity.
    fn transfer(
        &mut self,
        name: &str,
        target: StructureId,
        resource: ResourceKind,
        amount: u32,
    ) -> u32 {
        let room = self
            .world
            .structure(target)
            .map_or(0, |s| s.free_capacity());
        let moved = match self.world.agent_mut(name) {
            Some(agent) => agent.carry.take(resource, amount.min(room)),
            None => 0,
        };
        if let Some(structure) = self.world.structure_mut(target) {
            structure.store.add(resource, moved);
        }
        moved
    }
}

impl ExecutionLayer for Vm {
    fn world(&self) -> &World {
        &self.world
    }

    fn begin_cycle(&mut self) -> u64 {
        self.world.cycle += 1;
        let cycle = self.world.cycle;
        self.events.push(Event::CycleStarted { cycle });

        for name in self.world.agent_names() {
            let Some(agent) = self.world.agent_mut(&name) else {
                continue;
            };
            if agent.spawning == 0 {
                continue;
            }
            agent.spawning -= 1;
            if agent.spawning == 0 {
                self.events.push(Event::AgentActivated { agent: name });
            }
        }
        cycle
    }

    fn commit(&mut self, name: &str, directive: Directive) {
        let Some(agent) = self.world.agent_mut(name) else {
            return;
        };
        match directive {
            Directive::Manifest(manifest) => {
                self.events.push(Event::ManifestAssigned {
                    agent: name.to_string(),
                    kind: manifest.kind(),
                    operations: manifest.operations().len(),
                });
                agent.task = Some(ActiveTask::new(manifest));
                agent.standby = None;
            }
            Directive::MoveTo(position) => {
                agent.standby = Some(position);
            }
        }
    }

    fn execute_step(&mut self, name: &str) -> StepOutcome {
        let Some(agent) = self.world.agent(name) else {
            return StepOutcome::Missing;
        };
        if !agent.is_active() {
            return StepOutcome::Spawning;
        }

        let standby = agent.standby;
        let Some(task) = agent.task.as_ref() else {
            return match standby {
                Some(spot) => self.move_agent(name, spot),
                None => StepOutcome::Holding,
            };
        };

        let Some(op) = task.manifest.operations().get(task.cursor).copied() else {
            return self.finish_task(name, StepOutcome::Holding);
        };
        let here = agent.position;

        let Some(site) = self.world.structure(op.structure()).map(|s| s.position) else {
            debug!(agent = name, structure = op.structure(), "operation target vanished");
            self.events.push(Event::OperationSkipped {
                agent: name.to_string(),
                structure: op.structure(),
            });
            return self.advance(name, StepOutcome::Holding);
        };

        if here.range_to(site) > INTERACT_RANGE {
            return self.move_agent(name, site);
        }

        self.perform(name, op);
        self.advance(name, StepOutcome::Performed(op))
    }
}

impl Vm {
    fn advance(&mut self, name: &str, outcome: StepOutcome) -> StepOutcome {
        let finished = match self.world.agent_mut(name).and_then(|a| a.task.as_mut()) {
            Some(task) => {
                task.cursor += 1;
                task.is_finished()
            }
            None => false,
        };
        if finished {
            return self.finish_task(name, outcome);
        }
        outcome
    }

    fn finish_task(&mut self, name: &str, outcome: StepOutcome) -> StepOutcome {
        if let Some(task) = self.world.agent_mut(name).and_then(|a| a.task.take()) {
            self.events.push(Event::ManifestCompleted {
                agent: name.to_string(),
                kind: task.manifest.kind(),
            });
        }
        outcome
    }
}
