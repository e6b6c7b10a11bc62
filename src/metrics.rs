/// Live metrics for the TUI visualizer.
///
/// A run publishes a JSON snapshot to the configured path at start, every N
/// retired instructions, and on completion. The viz binary polls that file
/// and re-renders the dashboard. Writes are atomic (write to .tmp then
/// rename) to avoid torn reads.
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const METRICS_PATH: &str = "/tmp/mtsim_live.json";

/// Scheduler-visible condition of a hardware thread.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    /// Currently owns the issue slot
    Running,
    #[default]
    Ready,
    /// Waiting out memory latency
    Stalled,
    Halted,
}

impl std::fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreadStatus::Running => write!(f, "running"),
            ThreadStatus::Ready   => write!(f, "ready"),
            ThreadStatus::Stalled => write!(f, "stalled"),
            ThreadStatus::Halted  => write!(f, "halted"),
        }
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct ThreadSnapshot {
    pub id: usize,
    pub status: ThreadStatus,
    pub stall_cycles: u32,
    /// Instructions retired by this thread so far
    pub retired: usize,
    /// Length of the thread's instruction stream
    pub program_len: usize,
}

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct LiveMetrics {
    /// "idle" | "running" | "complete"
    pub status: String,
    pub program_name: String,
    pub scheduling_policy: String,
    pub load_latency: u32,
    pub store_latency: u32,
    pub switch_cycles: u32,
    pub cycles: u64,
    pub instructions: u64,
    /// Total instructions across all threads (progress denominator)
    pub instructions_total: u64,
    /// instructions / cycles, 0 before the first cycle
    pub ipc: f64,
    pub switches: u64,
    pub switch_penalty_cycles: u64,
    pub idle_cycles: u64,
    pub current_thread: usize,
    pub threads: Vec<ThreadSnapshot>,
    /// Unix timestamp in ms when this snapshot was written
    pub timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// I/O helpers
// ---------------------------------------------------------------------------

/// Atomically write metrics to `path`.
pub fn write_metrics(path: &Path, metrics: &LiveMetrics) -> std::io::Result<()> {
    let json = serde_json::to_string(metrics).map_err(std::io::Error::other)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, &json)?;
    std::fs::rename(&tmp, path)
}

/// Read the latest metrics snapshot. Returns None if the file doesn't exist
/// or can't be parsed (e.g. no simulation has run yet).
pub fn read_metrics(path: &Path) -> Option<LiveMetrics> {
    let data = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

/// Returns current Unix time in milliseconds.
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
