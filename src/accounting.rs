/// Cycle and instruction accounting for a single run.
use crate::error::{SimError, SimResult};

/// Running totals collected while a scheduler drives a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleAccountant {
    /// Total simulated cycles, including penalties and idle cycles
    pub cycles: u64,
    /// Instructions retired (HALT included)
    pub instructions: u64,
    /// Times the issuing thread actually changed
    pub switches: u64,
    /// Cycles charged as switch penalty
    pub switch_penalty_cycles: u64,
    /// Cycles burned with no thread able to issue
    pub idle_cycles: u64,
}

impl CycleAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retired instructions per elapsed cycle.
    ///
    /// Historically reported under the name CPI; the ratio is really IPC.
    pub fn cpi(&self, policy: &'static str) -> SimResult<f64> {
        if self.cycles == 0 {
            return Err(SimError::EmptyRun { policy });
        }
        Ok(self.instructions as f64 / self.cycles as f64)
    }

    /// Like [`cpi`](Self::cpi) but reports `-1.0` with a diagnostic instead of
    /// an error.
    pub fn cpi_or_sentinel(&self, policy: &'static str) -> f64 {
        match self.cpi(policy) {
            Ok(cpi) => cpi,
            Err(e) => {
                log::error!("{}", e);
                -1.0
            }
        }
    }
}
