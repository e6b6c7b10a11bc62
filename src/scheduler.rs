/// Multithreading scheduling policies.
///
/// Several hardware threads share one single-issue pipeline. Each iteration the
/// driver issues one instruction from the current thread, then decides whether
/// to keep it or hand the pipeline to another thread. Two disciplines:
///   - Blocked      — keep running until a memory op stalls the thread or it
///                    halts; every such switch attempt pays a refill penalty
///   - FineGrained  — switch every cycle, round-robin, no penalty
///
/// Both pick their next thread with the same round-robin selector.
use crate::executor::ExecOutcome;
use crate::memory::MemoryPort;
use crate::run::SimulationRun;
use crate::thread::ThreadState;

// ---------------------------------------------------------------------------
// Round-robin selection
// ---------------------------------------------------------------------------

/// First ready slot after `current`, scanning cyclically and visiting every
/// other slot exactly once. `current` itself is never returned.
pub fn select_next(ready: &[bool], current: usize) -> Option<usize> {
    let n = ready.len();
    (1..n)
        .map(|i| (current + i) % n)
        .find(|&idx| ready[idx])
}

/// `select_next` over the threads' current readiness.
pub fn select_next_thread(threads: &[ThreadState], current: usize) -> Option<usize> {
    let ready: Vec<bool> = threads.iter().map(|t| t.is_ready()).collect();
    select_next(&ready, current)
}

/// A multithreading discipline that drives a run to completion.
pub trait MtScheduler: Send {
    fn run(&mut self, run: &mut SimulationRun, mem: &mut dyn MemoryPort);

    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Blocked multithreading
// ---------------------------------------------------------------------------

/// Runs one thread until it issues a LOAD/STORE or halts.
///
/// A memory op stalls its thread for the configured latency and always costs
/// `switch_cycles` (with stalls draining meanwhile), whether or not another
/// thread could take over. With no taker the thread idles out its own stall.
/// A HALT waits for any ready thread, then pays `switch_cycles` once more on
/// the clock only.
pub struct BlockedScheduler;

impl BlockedScheduler {
    pub fn new() -> Self {
        BlockedScheduler
    }
}

impl Default for BlockedScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MtScheduler for BlockedScheduler {
    fn run(&mut self, run: &mut SimulationRun, mem: &mut dyn MemoryPort) {
        let load_latency = run.config().load_latency;
        let store_latency = run.config().store_latency;
        let switch_cycles = run.config().switch_cycles;

        while !run.all_halted() {
            let current = run.current();
            match run.step(mem) {
                ExecOutcome::Alu => {}
                outcome @ (ExecOutcome::Load { .. } | ExecOutcome::Store { .. }) => {
                    let latency = match outcome {
                        ExecOutcome::Load { .. } => load_latency,
                        _ => store_latency,
                    };
                    run.thread_mut(current).set_stall(latency);

                    let target = select_next(&run.ready_mask(), current);
                    run.charge_switch_penalty(switch_cycles);

                    match target {
                        Some(target) => run.switch_to(target),
                        None => {
                            while run.thread(current).stall_cycles() > 0 {
                                run.idle_cycle();
                            }
                        }
                    }
                }
                ExecOutcome::Halt => {
                    run.thread_mut(current).mark_halted();
                    log::debug!(
                        "[{}] cycle {}: thread {} halted",
                        run.policy,
                        run.accountant.cycles,
                        current
                    );

                    let target = loop {
                        if let Some(target) = select_next(&run.ready_mask(), current) {
                            break Some(target);
                        }
                        if run.all_halted() {
                            break None;
                        }
                        run.idle_cycle();
                    };

                    if let Some(target) = target {
                        run.switch_to(target);
                        run.charge_switch_penalty_undecayed(switch_cycles);
                    }
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "Blocked"
    }
}

// ---------------------------------------------------------------------------
// Fine-grained multithreading
// ---------------------------------------------------------------------------

/// Hands the pipeline to the next ready thread after every instruction.
///
/// Memory ops set no stall; latency is assumed hidden by interleaving. When no
/// other thread is ready the current one keeps issuing if it can, otherwise
/// the pipeline idles until some thread becomes ready.
pub struct FineGrainedScheduler;

impl FineGrainedScheduler {
    pub fn new() -> Self {
        FineGrainedScheduler
    }
}

impl Default for FineGrainedScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MtScheduler for FineGrainedScheduler {
    fn run(&mut self, run: &mut SimulationRun, mem: &mut dyn MemoryPort) {
        while !run.all_halted() {
            let current = run.current();
            if run.step(mem) == ExecOutcome::Halt {
                run.thread_mut(current).mark_halted();
                log::debug!(
                    "[{}] cycle {}: thread {} halted",
                    run.policy,
                    run.accountant.cycles,
                    current
                );
            }

            let target = loop {
                if let Some(target) = select_next(&run.ready_mask(), current) {
                    break Some(target);
                }
                if run.all_halted() {
                    break None;
                }
                if run.thread(current).is_ready() {
                    break Some(current);
                }
                run.idle_cycle();
            };

            if let Some(target) = target {
                run.switch_to(target);
            }
        }
    }

    fn name(&self) -> &'static str {
        "Fine-Grained"
    }
}

// ---------------------------------------------------------------------------
// Policy selector
// ---------------------------------------------------------------------------

/// Selectable multithreading policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulingPolicy {
    Blocked,
    FineGrained,
}

impl SchedulingPolicy {
    pub const ALL: [SchedulingPolicy; 2] = [SchedulingPolicy::Blocked, SchedulingPolicy::FineGrained];

    pub fn build(self) -> Box<dyn MtScheduler> {
        match self {
            SchedulingPolicy::Blocked => Box::new(BlockedScheduler::new()),
            SchedulingPolicy::FineGrained => Box::new(FineGrainedScheduler::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SchedulingPolicy::Blocked => "Blocked",
            SchedulingPolicy::FineGrained => "Fine-Grained",
        }
    }
}

impl std::fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
