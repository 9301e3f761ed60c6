use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Status {
    Initialized,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeState {
    pub status: Status,
    pub last_cycle: u64,
    pub message: Option<String>,
    /// RFC 3339 timestamp of the last write.
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            status: Status::Initialized,
            last_cycle: 0,
            message: None,
            updated_at: None,
        }
    }
}

impl RuntimeState {
    /// Advances `last_cycle` without touching the status, so a stop written
    /// from another shell survives the next cycle.
    pub fn record_cycle(&mut self, cycle: u64) {
        self.last_cycle = cycle;
    }

    pub fn is_stopped(&self) -> bool {
        self.status == Status::Stopped
    }
}

fn state_dir() -> PathBuf {
    PathBuf::from(".hauler")
}

fn state_path() -> PathBuf {
    state_dir().join("state.json")
}

pub fn state_file_path() -> PathBuf {
    state_path()
}

pub fn init_state() -> io::Result<RuntimeState> {
    let mut state = RuntimeState::default();
    save_state(&mut state)?;
    Ok(state)
}

pub fn load_state() -> io::Result<Option<RuntimeState>> {
    let path = state_path();
    if !path.exists() {
        return Ok(None);
    }

    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        return Ok(None);
    }

    let state: RuntimeState = serde_json::from_slice(&bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "failed to parse state file {}; delete it or run `hauler init` to reset: {}",
                state_path().display(),
                e
            ),
        )
    })?;
    Ok(Some(state))
}

pub fn save_state(state: &mut RuntimeState) -> io::Result<()> {
    state.updated_at = Some(Utc::now().to_rfc3339());
    let dir = state_dir();
    fs::create_dir_all(&dir)?;
    let json = serde_json::to_vec_pretty(state)?;
    fs::write(state_path(), json)?;
    Ok(())
}

pub fn set_status(
    status: Status,
    last_cycle: u64,
    message: Option<String>,
) -> io::Result<RuntimeState> {
    let mut state = load_state()?.unwrap_or_default();
    state.status = status;
    state.last_cycle = last_cycle;
    state.message = message;
    save_state(&mut state)?;
    Ok(state)
}

pub fn record_cycle(cycle: u64) -> io::Result<RuntimeState> {
    let mut state = load_state()?.unwrap_or_default();
    state.record_cycle(cycle);
    save_state(&mut state)?;
    Ok(state)
}
