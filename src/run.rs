/// Per-run simulation state.
/// A `SimulationRun` owns the thread array and the accountant for exactly one
/// execution of one policy. Nothing in it is shared with any other run.
use crate::accounting::CycleAccountant;
use crate::config::SimConfig;
use crate::executor::{execute, ExecOutcome};
use crate::isa::Instruction;
use crate::memory::MemoryPort;
use crate::metrics::{now_ms, write_metrics, LiveMetrics, ThreadSnapshot, ThreadStatus};
use crate::program::InstructionSource;
use crate::thread::{load_stream, RegisterFile, ThreadState};
use std::sync::Arc;

pub struct SimulationRun {
    pub policy: &'static str,
    pub program_name: String,
    pub accountant: CycleAccountant,
    threads: Vec<ThreadState>,
    config: SimConfig,
    /// Thread that owns the issue slot
    current: usize,
}

impl SimulationRun {
    /// Fresh run over pre-loaded instruction streams, one per thread.
    pub fn new(streams: &[Arc<[Instruction]>], config: &SimConfig, policy: &'static str) -> Self {
        let threads = streams
            .iter()
            .enumerate()
            .map(|(id, stream)| ThreadState::new(id, Arc::clone(stream), config.regs_count))
            .collect();
        SimulationRun {
            policy,
            program_name: String::new(),
            accountant: CycleAccountant::new(),
            threads,
            config: config.clone(),
            current: 0,
        }
    }

    pub fn from_source(
        source: &dyn InstructionSource,
        config: &SimConfig,
        policy: &'static str,
    ) -> Self {
        let streams: Vec<Arc<[Instruction]>> = (0..source.thread_count())
            .map(|tid| load_stream(source, tid))
            .collect();
        Self::new(&streams, config, policy)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn threads(&self) -> &[ThreadState] {
        &self.threads
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn thread(&self, id: usize) -> &ThreadState {
        &self.threads[id]
    }

    pub fn thread_mut(&mut self, id: usize) -> &mut ThreadState {
        &mut self.threads[id]
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Vacuously true for a run with no threads.
    pub fn all_halted(&self) -> bool {
        self.threads.iter().all(|t| t.is_halted())
    }

    /// Readiness snapshot for the selector.
    pub fn ready_mask(&self) -> Vec<bool> {
        self.threads.iter().map(|t| t.is_ready()).collect()
    }

    /// Final register file of thread `id`.
    ///
    /// # Panics
    /// If `id` is not a thread of this run.
    pub fn context(&self, id: usize) -> RegisterFile {
        assert!(
            id < self.threads.len(),
            "thread id {} out of range (run has {} threads)",
            id,
            self.threads.len()
        );
        self.threads[id].registers().clone()
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    /// Advance the clock and let every thread's stall decay by the same amount.
    pub fn tick(&mut self, cycles: u32) {
        self.accountant.cycles += cycles as u64;
        for t in self.threads.iter_mut() {
            t.decay_stall(cycles);
        }
    }

    /// One cycle in which no instruction issues.
    pub fn idle_cycle(&mut self) {
        self.tick(1);
        self.accountant.idle_cycles += 1;
    }

    /// Switch penalty during which stalled threads keep draining.
    pub fn charge_switch_penalty(&mut self, cycles: u32) {
        self.tick(cycles);
        self.accountant.switch_penalty_cycles += cycles as u64;
    }

    /// Switch penalty that only advances the clock.
    pub fn charge_switch_penalty_undecayed(&mut self, cycles: u32) {
        self.accountant.cycles += cycles as u64;
        self.accountant.switch_penalty_cycles += cycles as u64;
    }

    // -----------------------------------------------------------------------
    // Issue
    // -----------------------------------------------------------------------

    /// Fetch and execute one instruction on the current thread, retiring it
    /// and spending one base cycle.
    pub fn step(&mut self, mem: &mut dyn MemoryPort) -> ExecOutcome {
        let cycle = self.accountant.cycles + 1;
        let thread = &mut self.threads[self.current];
        let inst = thread.fetch_next();
        let outcome = execute(thread.registers_mut(), &inst, mem);
        log::trace!(
            "[{}] cycle {}: thread {} executes {}",
            self.policy,
            cycle,
            thread.id,
            inst
        );
        self.accountant.instructions += 1;
        self.tick(1);
        self.maybe_publish();
        outcome
    }

    pub fn switch_to(&mut self, target: usize) {
        if target != self.current {
            log::debug!(
                "[{}] cycle {}: switch thread {} -> {}",
                self.policy,
                self.accountant.cycles,
                self.current,
                target
            );
            self.accountant.switches += 1;
            self.current = target;
        }
    }

    // -----------------------------------------------------------------------
    // Live metrics
    // -----------------------------------------------------------------------

    pub fn snapshot(&self, status: &str) -> LiveMetrics {
        let threads = self
            .threads
            .iter()
            .map(|t| {
                let status = if t.is_halted() {
                    ThreadStatus::Halted
                } else if t.stall_cycles() > 0 {
                    ThreadStatus::Stalled
                } else if t.id == self.current {
                    ThreadStatus::Running
                } else {
                    ThreadStatus::Ready
                };
                ThreadSnapshot {
                    id: t.id,
                    status,
                    stall_cycles: t.stall_cycles(),
                    retired: t.retired(),
                    program_len: t.program_len(),
                }
            })
            .collect();
        let acc = &self.accountant;
        LiveMetrics {
            status: status.to_string(),
            program_name: self.program_name.clone(),
            scheduling_policy: self.policy.to_string(),
            load_latency: self.config.load_latency,
            store_latency: self.config.store_latency,
            switch_cycles: self.config.switch_cycles,
            cycles: acc.cycles,
            instructions: acc.instructions,
            instructions_total: self.threads.iter().map(|t| t.program_len() as u64).sum(),
            ipc: acc.cpi(self.policy).unwrap_or(0.0),
            switches: acc.switches,
            switch_penalty_cycles: acc.switch_penalty_cycles,
            idle_cycles: acc.idle_cycles,
            current_thread: self.current,
            threads,
            timestamp_ms: now_ms(),
        }
    }

    /// Write a snapshot if live metrics are configured.
    pub fn publish(&self, status: &str) {
        if let Some(snap) = &self.config.snapshot {
            if let Err(e) = write_metrics(&snap.path, &self.snapshot(status)) {
                log::warn!("could not write metrics to {}: {}", snap.path.display(), e);
            }
        }
    }

    fn maybe_publish(&self) {
        if let Some(snap) = &self.config.snapshot {
            if snap.every > 0 && self.accountant.instructions % snap.every == 0 {
                self.publish("running");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::DataMemory;
    use crate::program::Program;

    fn two_thread_run() -> SimulationRun {
        let prog = Program::new(vec![
            vec![Instruction::addi(1, 0, 3), Instruction::halt()],
            vec![Instruction::halt()],
        ]);
        SimulationRun::from_source(&prog, &SimConfig::default(), "test")
    }

    #[test]
    fn fresh_run_has_clean_state() {
        let run = two_thread_run();
        assert_eq!(run.thread_count(), 2);
        assert_eq!(run.accountant, CycleAccountant::new());
        assert_eq!(run.ready_mask(), vec![true, true]);
        assert!(!run.all_halted());
    }

    #[test]
    fn tick_decays_every_thread() {
        let mut run = two_thread_run();
        run.thread_mut(0).set_stall(3);
        run.thread_mut(1).set_stall(1);
        run.tick(2);
        assert_eq!(run.accountant.cycles, 2);
        assert_eq!(run.thread(0).stall_cycles(), 1);
        assert_eq!(run.thread(1).stall_cycles(), 0);
    }

    #[test]
    fn undecayed_penalty_leaves_stalls() {
        let mut run = two_thread_run();
        run.thread_mut(0).set_stall(3);
        run.charge_switch_penalty_undecayed(2);
        assert_eq!(run.accountant.cycles, 2);
        assert_eq!(run.accountant.switch_penalty_cycles, 2);
        assert_eq!(run.thread(0).stall_cycles(), 3);
    }

    #[test]
    fn step_retires_and_spends_one_cycle() {
        let mut run = two_thread_run();
        let mut mem = DataMemory::new();
        assert_eq!(run.step(&mut mem), ExecOutcome::Alu);
        assert_eq!(run.accountant.instructions, 1);
        assert_eq!(run.accountant.cycles, 1);
        assert_eq!(run.context(0).get(1), 3);
    }

    #[test]
    fn switch_to_counts_only_real_changes() {
        let mut run = two_thread_run();
        run.switch_to(0);
        run.switch_to(1);
        assert_eq!(run.accountant.switches, 1);
        assert_eq!(run.current(), 1);
    }

    #[test]
    fn snapshot_reflects_thread_status() {
        let mut run = two_thread_run();
        run.thread_mut(1).set_stall(2);
        let snap = run.snapshot("running");
        assert_eq!(snap.threads[0].status, ThreadStatus::Running);
        assert_eq!(snap.threads[1].status, ThreadStatus::Stalled);
        assert_eq!(snap.instructions_total, 3);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn context_rejects_bad_thread_id() {
        two_thread_run().context(2);
    }
}
