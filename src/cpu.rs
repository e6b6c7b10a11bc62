/// Top-level multithreaded core.
/// Holds the loaded program and one independent `SimulationRun` per policy,
/// so a blocked run and a fine-grained run of the same program never see each
/// other's threads or counters.
use crate::accounting::CycleAccountant;
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::isa::Instruction;
use crate::memory::MemoryPort;
use crate::program::{InstructionSource, Program};
use crate::run::SimulationRun;
use crate::scheduler::SchedulingPolicy;
use crate::thread::{load_stream, RegisterFile};
use std::sync::Arc;

pub struct Cpu {
    pub config: SimConfig,
    pub program_name: String,
    /// Per-thread instruction streams, loaded once and shared by both runs
    streams: Vec<Arc<[Instruction]>>,
    blocked: Option<SimulationRun>,
    fine_grained: Option<SimulationRun>,
}

impl Cpu {
    /// Load every thread's stream from `source`. The source must honour the
    /// `InstructionSource` contract; use [`Cpu::from_program`] to validate
    /// a `Program` first.
    pub fn new(source: &dyn InstructionSource, config: SimConfig) -> Self {
        let streams = (0..source.thread_count())
            .map(|tid| load_stream(source, tid))
            .collect();
        Cpu {
            config,
            program_name: String::new(),
            streams,
            blocked: None,
            fine_grained: None,
        }
    }

    pub fn from_program(program: &Program, config: SimConfig) -> SimResult<Self> {
        program.validate(config.regs_count)?;
        let mut cpu = Self::new(program, config);
        cpu.program_name = program.name.clone();
        Ok(cpu)
    }

    pub fn thread_count(&self) -> usize {
        self.streams.len()
    }

    /// Run `policy` to completion on a fresh thread array, replacing any
    /// earlier run of the same policy.
    pub fn run(&mut self, policy: SchedulingPolicy, mem: &mut dyn MemoryPort) -> &CycleAccountant {
        let mut run = SimulationRun::new(&self.streams, &self.config, policy.name());
        run.program_name = self.program_name.clone();

        log::info!(
            "[mtsim] {} run: {} threads, load={} store={} switch={}",
            policy,
            run.thread_count(),
            self.config.load_latency,
            self.config.store_latency,
            self.config.switch_cycles,
        );
        run.publish("running");

        policy.build().run(&mut run, mem);

        run.publish("complete");
        log::info!(
            "[mtsim] {} complete: {} instructions in {} cycles ({} switches, {} penalty, {} idle)",
            policy,
            run.accountant.instructions,
            run.accountant.cycles,
            run.accountant.switches,
            run.accountant.switch_penalty_cycles,
            run.accountant.idle_cycles,
        );

        let slot = self.slot_mut(policy);
        &slot.insert(run).accountant
    }

    pub fn run_blocked(&mut self, mem: &mut dyn MemoryPort) -> &CycleAccountant {
        self.run(SchedulingPolicy::Blocked, mem)
    }

    pub fn run_fine_grained(&mut self, mem: &mut dyn MemoryPort) -> &CycleAccountant {
        self.run(SchedulingPolicy::FineGrained, mem)
    }

    /// The completed run for `policy`, if it has been run.
    pub fn report(&self, policy: SchedulingPolicy) -> Option<&SimulationRun> {
        match policy {
            SchedulingPolicy::Blocked => self.blocked.as_ref(),
            SchedulingPolicy::FineGrained => self.fine_grained.as_ref(),
        }
    }

    /// Instructions per cycle of the last `policy` run.
    pub fn cpi(&self, policy: SchedulingPolicy) -> SimResult<f64> {
        self.completed(policy)?.accountant.cpi(policy.name())
    }

    pub fn blocked_cpi(&self) -> SimResult<f64> {
        self.cpi(SchedulingPolicy::Blocked)
    }

    pub fn fine_grained_cpi(&self) -> SimResult<f64> {
        self.cpi(SchedulingPolicy::FineGrained)
    }

    /// Final registers of `thread` after the last `policy` run.
    ///
    /// # Panics
    /// If `thread` is not in `0..thread_count()`.
    pub fn context(&self, policy: SchedulingPolicy, thread: usize) -> SimResult<RegisterFile> {
        Ok(self.completed(policy)?.context(thread))
    }

    pub fn blocked_context(&self, thread: usize) -> SimResult<RegisterFile> {
        self.context(SchedulingPolicy::Blocked, thread)
    }

    pub fn fine_grained_context(&self, thread: usize) -> SimResult<RegisterFile> {
        self.context(SchedulingPolicy::FineGrained, thread)
    }

    fn completed(&self, policy: SchedulingPolicy) -> SimResult<&SimulationRun> {
        self.report(policy).ok_or(SimError::NotRun {
            policy: policy.name(),
        })
    }

    fn slot_mut(&mut self, policy: SchedulingPolicy) -> &mut Option<SimulationRun> {
        match policy {
            SchedulingPolicy::Blocked => &mut self.blocked,
            SchedulingPolicy::FineGrained => &mut self.fine_grained,
        }
    }
}
