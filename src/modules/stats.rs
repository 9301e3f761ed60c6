use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::modules::dispatch::{CycleReport, Decision};
use crate::modules::error::DispatchError;
use crate::modules::manifest::ManifestKind;
use crate::modules::vm::StepOutcome;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub supply_manifests: u64,
    pub withdraw_manifests: u64,
    pub idle_routes: u64,
    pub busy_cycles: u64,
    pub operations: u64,
    pub moves: u64,
    /// Warning counts keyed by error label.
    #[serde(default)]
    pub failures: BTreeMap<String, u64>,
}

impl DispatchStats {
    pub fn record(&mut self, decision: &Decision) {
        match decision {
            Decision::Manifest {
                kind: ManifestKind::Supply,
                ..
            } => self.supply_manifests = self.supply_manifests.saturating_add(1),
            Decision::Manifest {
                kind: ManifestKind::Withdraw,
                ..
            } => self.withdraw_manifests = self.withdraw_manifests.saturating_add(1),
            Decision::Idle(_) => self.idle_routes = self.idle_routes.saturating_add(1),
            Decision::Busy => self.busy_cycles = self.busy_cycles.saturating_add(1),
            Decision::Spawning => {}
        }
    }

    pub fn record_outcome(&mut self, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::Moved { .. } => self.moves = self.moves.saturating_add(1),
            StepOutcome::Performed(_) => self.operations = self.operations.saturating_add(1),
            _ => {}
        }
    }

    pub fn record_warning(&mut self, warning: &DispatchError) {
        let count = self.failures.entry(warning.label().to_string()).or_default();
        *count = count.saturating_add(1);
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.values().sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchStatsStore {
    pub per_agent: BTreeMap<String, DispatchStats>,
}

impl DispatchStatsStore {
    pub fn absorb(&mut self, report: &CycleReport) {
        for (agent, decision) in &report.decisions {
            self.per_agent
                .entry(agent.clone())
                .or_default()
                .record(decision);
        }
        for warning in &report.warnings {
            self.per_agent
                .entry(warning.agent().to_string())
                .or_default()
                .record_warning(warning);
        }
        for (agent, outcome) in &report.outcomes {
            self.per_agent
                .entry(agent.clone())
                .or_default()
                .record_outcome(outcome);
        }
    }
}

fn stats_dir() -> PathBuf {
    PathBuf::from(".hauler")
}

fn stats_path() -> PathBuf {
    stats_dir().join("dispatch_stats.json")
}

pub fn reset_dispatch_stats() -> io::Result<()> {
    let store = DispatchStatsStore::default();
    save_dispatch_stats(&store)
}

pub fn load_dispatch_stats() -> io::Result<DispatchStatsStore> {
    let path = stats_path();
    if !path.exists() {
        return Ok(DispatchStatsStore::default());
    }

    let bytes = fs::read(&path)?;
    if bytes.is_empty() {
        return Ok(DispatchStatsStore::default());
    }

    let store: DispatchStatsStore = serde_json::from_slice(&bytes)?;
    Ok(store)
}

pub fn save_dispatch_stats(store: &DispatchStatsStore) -> io::Result<()> {
    let dir = stats_dir();
    fs::create_dir_all(&dir)?;
    let json = serde_json::to_vec_pretty(store)?;
    fs::write(stats_path(), json)?;
    Ok(())
}
