use std::time::Duration;

use clap::{Parser, Subcommand};
use hauler::{
    BaseLayout, CycleReport, Dispatcher, Event, ExecutionLayer, GenerateOptions, RequestBoard,
    Scenario, Vm, desired_agent_count, load_dispatch_stats, load_layout, load_scenario,
    reset_dispatch_stats, save_dispatch_stats, save_layout, save_scenario, scenario,
    state::{self, Status},
};

mod world;

use world::{WorldCommand, run_world};

const DEFAULT_EXTENSIONS: usize = 10;
const DEFAULT_SEED: u64 = 1;

#[derive(Parser)]
#[command(
    name = "hauler",
    version,
    about = "Per-cycle logistics dispatcher for transport agents",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize local state, the default layout and a seeded scenario
    Init,
    /// Run dispatch cycles against the stored scenario
    Run {
        /// Number of cycles to run (omit to run until stopped)
        #[arg(short = 'c', long)]
        cycles: Option<u64>,
        /// Delay between cycles in milliseconds
        #[arg(short = 'd', long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Show runtime status and dispatch stats
    Status,
    /// Mark the runtime as stopped
    Stop,
    /// Scenario operations (generate, list, zones)
    World {
        #[command(subcommand)]
        command: WorldCommand,
    },
}

pub fn run() {
    let cli = Cli::parse();
    if let Err(err) = dispatch(cli.command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn dispatch(command: Command) -> Result<(), String> {
    match command {
        Command::Init => run_init(),
        Command::Run { cycles, delay_ms } => run_cycles(cycles, Duration::from_millis(delay_ms)),
        Command::Status => run_status(),
        Command::Stop => run_stop(),
        Command::World { command } => run_world(command),
    }
}

fn run_init() -> Result<(), String> {
    state::init_state().map_err(|e| e.to_string())?;
    println!(
        "Initialized state at {}",
        state::state_file_path().display()
    );

    let layout = BaseLayout::default();
    save_layout(&layout).map_err(|e| e.to_string())?;

    let generated = scenario::generate(
        &layout,
        &GenerateOptions {
            seed: Some(DEFAULT_SEED),
            agents: None,
            extensions: DEFAULT_EXTENSIONS,
        },
    );
    let path = save_scenario(&generated).map_err(|e| e.to_string())?;
    println!(
        "Wrote scenario with {} agent(s), {} structure(s) to {}",
        generated.agents.len(),
        generated.structures.len(),
        path.display()
    );

    reset_dispatch_stats().map_err(|e| e.to_string())?;
    Ok(())
}

fn run_status() -> Result<(), String> {
    match state::load_state().map_err(|e| e.to_string())? {
        None => {
            println!("Status: not initialized. Run `hauler init`.");
            return Ok(());
        }
        Some(state) => {
            println!(
                "Status: {:?} | last_cycle={} | updated_at={} | message={}",
                state.status,
                state.last_cycle,
                state.updated_at.unwrap_or_else(|| "-".into()),
                state.message.unwrap_or_else(|| "-".into())
            );
        }
    }

    if let Some(scenario) = load_scenario().map_err(|e| e.to_string())? {
        let world = scenario.to_world();
        let active = world.agents().filter(|a| a.is_active()).count();
        println!(
            "Agents: {} ({} active) | wishlist={}",
            scenario.agents.len(),
            active,
            desired_agent_count(&world)
        );
    }
    print_stats_summary()
}

fn run_stop() -> Result<(), String> {
    let current = state::load_state().map_err(|e| e.to_string())?;
    let Some(prev) = current else {
        return Err("Not initialized. Run `hauler init` first.".into());
    };
    let updated = state::set_status(
        Status::Stopped,
        prev.last_cycle,
        Some("stopped by user".into()),
    )
    .map_err(|e| e.to_string())?;
    println!("Stopped. last_cycle={}", updated.last_cycle);
    print_stats_summary()
}

fn run_cycles(cycles: Option<u64>, delay: Duration) -> Result<(), String> {
    if state::load_state().map_err(|e| e.to_string())?.is_none() {
        return Err("Not initialized. Run `hauler init` first.".into());
    }
    let layout = load_layout().map_err(|e| e.to_string())?;
    let scenario = load_scenario()
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "no scenario found; run `hauler world generate`".to_string())?;

    let mut vm = Vm::new(scenario.to_world());
    let mut dispatcher = Dispatcher::new(layout);
    let mut stats = load_dispatch_stats().map_err(|e| e.to_string())?;

    state::set_status(
        Status::Running,
        vm.world().cycle(),
        Some("dispatch loop running".into()),
    )
    .map_err(|e| e.to_string())?;

    let mut remaining = cycles;
    loop {
        if matches!(remaining, Some(0)) {
            break;
        }

        let board = RequestBoard::survey(vm.world());
        let report = dispatcher.run_cycle(&mut vm, &board);
        print_cycle(&report, board.len(), &vm.drain_events());

        stats.absorb(&report);
        if let Err(err) = save_dispatch_stats(&stats) {
            eprintln!("warning: failed to save dispatch stats: {}", err);
        }
        save_scenario(&Scenario::from_world(vm.world())).map_err(|e| e.to_string())?;
        let recorded = state::record_cycle(report.cycle).map_err(|e| e.to_string())?;
        // `hauler stop` from another shell ends an open-ended run.
        if remaining.is_none() && recorded.is_stopped() {
            println!("Stop requested; leaving dispatch loop.");
            break;
        }

        if let Some(n) = remaining.as_mut() {
            *n = n.saturating_sub(1);
        }
        if delay > Duration::ZERO {
            std::thread::sleep(delay);
        }
    }

    let last = vm.world().cycle();
    state::set_status(Status::Stopped, last, Some("dispatch loop finished".into()))
        .map_err(|e| e.to_string())?;
    println!("Finished at cycle {}", last);
    Ok(())
}

fn print_cycle(report: &CycleReport, requests: usize, events: &[Event]) {
    println!(
        "Cycle {}: {} request(s), {} warning(s)",
        report.cycle,
        requests,
        report.warnings.len()
    );
    for (agent, decision) in &report.decisions {
        let zones: Vec<&str> = report
            .assignment
            .get(agent)
            .map(|a| a.zones.iter().map(|q| q.label()).collect())
            .unwrap_or_default();
        println!(
            " - {} [{}]: {}",
            agent,
            if zones.is_empty() {
                "-".to_string()
            } else {
                zones.join(",")
            },
            decision
        );
    }
    for warning in &report.warnings {
        println!("   warning: {}", warning);
    }
    for event in events {
        if let Some(line) = describe_event(event) {
            println!("   {}", line);
        }
    }
}

fn describe_event(event: &Event) -> Option<String> {
    let line = match event {
        Event::CycleStarted { .. } => return None,
        Event::AgentActivated { agent } => format!("{} finished spawning", agent),
        Event::ManifestAssigned {
            agent,
            kind,
            operations,
        } => format!("{} took a {} manifest of {} op(s)", agent, kind, operations),
        Event::AgentMoved { agent, from, to } => format!(
            "{} moved ({},{}) -> ({},{})",
            agent, from.x, from.y, to.x, to.y
        ),
        Event::Withdrew {
            agent,
            source,
            resource,
            amount,
        } => format!("{} withdrew {} {} from #{}", agent, amount, resource, source),
        Event::Transferred {
            agent,
            target,
            resource,
            amount,
        } => format!("{} delivered {} {} to #{}", agent, amount, resource, target),
        Event::OperationSkipped { agent, structure } => {
            format!("{} skipped an operation on missing #{}", agent, structure)
        }
        Event::ManifestCompleted { agent, kind } => {
            format!("{} completed its {} manifest", agent, kind)
        }
    };
    Some(line)
}

fn print_stats_summary() -> Result<(), String> {
    let store = load_dispatch_stats().map_err(|e| e.to_string())?;
    if store.per_agent.is_empty() {
        println!("No dispatch stats recorded.");
        return Ok(());
    }

    println!("Dispatch summary per agent:");
    for (agent, stats) in store.per_agent.iter() {
        println!(
            " - {} | supply={} withdraw={} idle={} busy={} ops={} moves={} failures={}",
            agent,
            stats.supply_manifests,
            stats.withdraw_manifests,
            stats.idle_routes,
            stats.busy_cycles,
            stats.operations,
            stats.moves,
            stats.failure_count()
        );
    }
    Ok(())
}
