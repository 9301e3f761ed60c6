use crate::modules::assign::AgentAssignment;
use crate::modules::error::DispatchError;
use crate::modules::layout::BaseLayout;
use crate::modules::manifest::DistanceOracle;
use crate::modules::world::{Position, TransportAgent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdleRoute {
    pub destination: Position,
    pub warning: Option<DispatchError>,
}

/// Sends an idle agent to the nearest reachable standby spot of the zones it
/// was assigned. Ties go to the spot listed first.
pub fn route_idle(
    agent: &TransportAgent,
    assignment: Option<&AgentAssignment>,
    layout: &BaseLayout,
    oracle: &impl DistanceOracle,
) -> IdleRoute {
    let mut best: Option<(u32, Position)> = None;

    for quadrant in assignment.map(|a| a.zones.as_slice()).unwrap_or(&[]) {
        for coord in layout.standby_coords(*quadrant) {
            let Some(spot) = layout.resolve(*coord) else {
                continue;
            };
            let Some(distance) = oracle.distance(agent.position, spot) else {
                continue;
            };
            if best.is_none_or(|(best_distance, _)| distance < best_distance) {
                best = Some((distance, spot));
            }
        }
    }

    match best {
        Some((_, destination)) => IdleRoute {
            destination,
            warning: None,
        },
        None => IdleRoute {
            destination: agent.position,
            warning: Some(DispatchError::NoChargingSpot {
                agent: agent.name.clone(),
            }),
        },
    }
}
