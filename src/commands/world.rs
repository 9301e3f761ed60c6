use clap::Subcommand;
use hauler::{
    GenerateOptions, ResourceKind, assign_zones, load_layout, load_scenario, partition, save_scenario,
    scenario,
};

#[derive(Subcommand)]
pub enum WorldCommand {
    /// Generate a fresh random base and persist it as the scenario
    Generate {
        /// Optional RNG seed for a reproducible base
        #[arg(long)]
        seed: Option<u64>,
        /// Number of transport agents (defaults to the base's wishlist)
        #[arg(long)]
        agents: Option<usize>,
        /// Number of extensions to place
        #[arg(long, default_value_t = 10)]
        extensions: usize,
    },
    /// List scenario content
    List {
        /// Show transport agents
        #[arg(long)]
        agents: bool,
        /// Show structures
        #[arg(long)]
        structures: bool,
        /// Only show entries holding or wanting this resource
        #[arg(long, value_enum)]
        resource: Option<ResourceKind>,
    },
    /// Show the zone partition and which agent serves each zone
    Zones,
}

pub(super) fn run_world(cmd: WorldCommand) -> Result<(), String> {
    match cmd {
        WorldCommand::Generate {
            seed,
            agents,
            extensions,
        } => {
            let layout = load_layout().map_err(|e| e.to_string())?;
            let generated = scenario::generate(
                &layout,
                &GenerateOptions {
                    seed,
                    agents,
                    extensions,
                },
            );
            let path = save_scenario(&generated).map_err(|e| e.to_string())?;
            println!(
                "Generated {} agent(s) and {} structure(s) into {}",
                generated.agents.len(),
                generated.structures.len(),
                path.display()
            );
        }
        WorldCommand::List {
            agents,
            structures,
            resource,
        } => {
            let show_agents = agents || (!agents && !structures);
            let show_structures = structures || (!agents && !structures);
            let Some(scenario) = load_scenario().map_err(|e| e.to_string())? else {
                println!("No scenario yet. Run `hauler world generate`.");
                return Ok(());
            };
            let world = scenario.to_world();

            if show_agents {
                println!("Agents (cycle {}):", world.cycle());
                for agent in world
                    .agents()
                    .filter(|a| resource.is_none_or(|r| a.carry.get(r) > 0))
                {
                    let state = if !agent.is_active() {
                        format!("spawning ({} left)", agent.spawning)
                    } else if let Some(task) = &agent.task {
                        format!(
                            "{} manifest, op {}/{}",
                            task.manifest.kind(),
                            task.cursor + 1,
                            task.manifest.operations().len()
                        )
                    } else {
                        "idle".to_string()
                    };
                    println!(
                        " - {} at ({}, {}) capacity={} carry={} {}",
                        agent.name,
                        agent.position.x,
                        agent.position.y,
                        agent.capacity,
                        agent.carry,
                        state
                    );
                }
            }

            if show_structures {
                println!("Structures:");
                for s in world.structures().iter().filter(|s| {
                    resource.is_none_or(|r| s.stock(r) > 0 || s.targets.get(r) > 0)
                }) {
                    println!(
                        " - #{} {} at ({}, {}) store={} capacity={} targets={}",
                        s.id, s.kind, s.position.x, s.position.y, s.store, s.capacity, s.targets
                    );
                }
                let ignored = scenario.structures.len() - world.structures().len();
                if ignored > 0 {
                    println!("({} structure(s) without a dispatch role ignored)", ignored);
                }
            }
        }
        WorldCommand::Zones => {
            let layout = load_layout().map_err(|e| e.to_string())?;
            let scenario = load_scenario()
                .map_err(|e| e.to_string())?
                .ok_or_else(|| "no scenario found; run `hauler world generate`".to_string())?;
            let world = scenario.to_world();
            let zones = partition(&layout, &world);
            let assignment = assign_zones(world.agents(), &zones);

            for zone in &zones {
                let owner = assignment.owner_of(zone.quadrant).unwrap_or("-");
                let ids: Vec<String> = zone.structures.iter().map(|id| format!("#{}", id)).collect();
                println!(
                    "{:<11} owner={:<10} structures=[{}]",
                    zone.quadrant.label(),
                    owner,
                    ids.join(", ")
                );
            }
            let unassigned: Vec<&str> = assignment
                .agents
                .iter()
                .filter(|(_, a)| a.is_empty())
                .map(|(name, _)| name.as_str())
                .collect();
            if !unassigned.is_empty() {
                println!("Without zones: {}", unassigned.join(", "));
            }
        }
    }
    Ok(())
}
