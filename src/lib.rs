pub mod modules;

pub use modules::assign::{AgentAssignment, Assignment, assign_zones};
pub use modules::dispatch::{
    CyclePlan, CycleReport, Decision, Directive, Dispatcher, ExecutionLayer, desired_agent_count,
};
pub use modules::error::{DispatchError, DispatchResult};
pub use modules::idle::{IdleRoute, route_idle};
pub use modules::layout::{BaseLayout, Coord, Quadrant, load_layout, save_layout};
pub use modules::manifest::{
    ChebyshevDistance, DistanceOracle, ManifestBuilder, ManifestKind, Operation, TaskManifest,
};
pub use modules::request::{
    Direction, PendingRequests, RequestBoard, RequestIndex, ResourceRequest, aggregate_requests,
};
pub use modules::resource::{Carry, ResourceKind};
pub use modules::scenario::{self, GenerateOptions, Scenario, load_scenario, save_scenario};
pub use modules::state::{self, RuntimeState, Status};
pub use modules::stats::{
    DispatchStats, DispatchStatsStore, load_dispatch_stats, reset_dispatch_stats,
    save_dispatch_stats,
};
pub use modules::structure::{RawStructure, Structure, StructureId, StructureKind, classify};
pub use modules::vm::{Event, StepOutcome, Vm};
pub use modules::world::{ActiveTask, Position, TransportAgent, World};
pub use modules::zone::{Zone, ZoneCache, ZonePartitioner, partition};
