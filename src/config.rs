/// Run-wide configuration: register file size, memory latencies and the
/// blocked policy's switch penalty. Read-only for the duration of a run.
use crate::error::{SimError, SimResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

mod defaults {
    pub const REGS_COUNT: usize = 8;
    pub const LOAD_LATENCY: u32 = 4;
    pub const STORE_LATENCY: u32 = 4;
    pub const SWITCH_CYCLES: u32 = 2;
}

/// Where and how often to publish live metrics snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SnapshotConfig {
    pub path: PathBuf,
    /// Publish every N retired instructions (0 = only at start and end)
    #[serde(default)]
    pub every: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Registers per hardware thread
    pub regs_count: usize,
    /// Stall cycles charged to a thread after a LOAD
    pub load_latency: u32,
    /// Stall cycles charged to a thread after a STORE
    pub store_latency: u32,
    /// Pipeline refill penalty for a blocked-policy switch
    pub switch_cycles: u32,
    /// Live metrics output; disabled when absent
    pub snapshot: Option<SnapshotConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            regs_count: defaults::REGS_COUNT,
            load_latency: defaults::LOAD_LATENCY,
            store_latency: defaults::STORE_LATENCY,
            switch_cycles: defaults::SWITCH_CYCLES,
            snapshot: None,
        }
    }
}

impl SimConfig {
    pub fn new(load_latency: u32, store_latency: u32, switch_cycles: u32) -> Self {
        SimConfig {
            load_latency,
            store_latency,
            switch_cycles,
            ..Self::default()
        }
    }

    pub fn with_latencies(mut self, load_latency: u32, store_latency: u32) -> Self {
        self.load_latency = load_latency;
        self.store_latency = store_latency;
        self
    }

    pub fn with_switch_cycles(mut self, switch_cycles: u32) -> Self {
        self.switch_cycles = switch_cycles;
        self
    }

    pub fn with_regs_count(mut self, regs_count: usize) -> Self {
        self.regs_count = regs_count;
        self
    }

    pub fn with_snapshot(mut self, path: impl Into<PathBuf>, every: u64) -> Self {
        self.snapshot = Some(SnapshotConfig {
            path: path.into(),
            every,
        });
        self
    }

    pub fn from_toml_str(src: &str) -> SimResult<Self> {
        Ok(toml::from_str(src)?)
    }

    pub fn from_file(path: &Path) -> SimResult<Self> {
        let src = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&src)
    }
}
