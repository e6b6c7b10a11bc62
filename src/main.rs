use clap::{Parser, ValueEnum};
use mtsim::config::SimConfig;
use mtsim::cpu::Cpu;
use mtsim::metrics::METRICS_PATH;
use mtsim::program::Program;
use mtsim::scheduler::SchedulingPolicy;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Blocked,
    FineGrained,
    Both,
}

impl PolicyArg {
    fn policies(self) -> Vec<SchedulingPolicy> {
        match self {
            PolicyArg::Blocked => vec![SchedulingPolicy::Blocked],
            PolicyArg::FineGrained => vec![SchedulingPolicy::FineGrained],
            PolicyArg::Both => SchedulingPolicy::ALL.to_vec(),
        }
    }
}

/// mtsim - blocked vs. fine-grained multithreading on a single-issue pipeline
#[derive(Parser, Debug)]
#[command(name = "mtsim")]
#[command(version)]
#[command(about = "Cycle-level multithreading simulator", long_about = None)]
struct Args {
    /// Program file (TOML) with one instruction list per hardware thread
    program: PathBuf,

    /// Simulator configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the LOAD latency in cycles
    #[arg(long)]
    load_latency: Option<u32>,

    /// Override the STORE latency in cycles
    #[arg(long)]
    store_latency: Option<u32>,

    /// Override the blocked-policy switch penalty in cycles
    #[arg(long)]
    switch_cycles: Option<u32>,

    /// Which policy to run
    #[arg(short, long, value_enum, default_value = "both")]
    policy: PolicyArg,

    /// Publish live metrics for the viz monitor (default /tmp/mtsim_live.json)
    #[arg(long)]
    live: bool,

    /// Live metrics output path (implies --live)
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Publish a snapshot every N retired instructions
    #[arg(long, default_value_t = 1)]
    snapshot_every: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(lat) = args.load_latency {
        config.load_latency = lat;
    }
    if let Some(lat) = args.store_latency {
        config.store_latency = lat;
    }
    if let Some(cycles) = args.switch_cycles {
        config.switch_cycles = cycles;
    }
    if args.live || args.snapshot.is_some() {
        let path = args.snapshot.clone().unwrap_or_else(|| PathBuf::from(METRICS_PATH));
        config = config.with_snapshot(path, args.snapshot_every);
    }

    let program = Program::from_file(&args.program)?;
    let mut cpu = Cpu::from_program(&program, config)?;

    println!(
        "Loaded '{}': {} threads, {} instructions (load={} store={} switch={})",
        program.name,
        cpu.thread_count(),
        program.instruction_count(),
        cpu.config.load_latency,
        cpu.config.store_latency,
        cpu.config.switch_cycles,
    );

    for policy in args.policy.policies() {
        // Each policy starts from the program's pristine memory image
        let mut mem = program.memory_image();
        cpu.run(policy, &mut mem);

        let Some(run) = cpu.report(policy) else {
            continue;
        };
        let acc = &run.accountant;
        println!(
            "\n{} MT: {} instructions / {} cycles | CPI={:.4} | switches={} penalty={} idle={}",
            policy,
            acc.instructions,
            acc.cycles,
            acc.cpi_or_sentinel(policy.name()),
            acc.switches,
            acc.switch_penalty_cycles,
            acc.idle_cycles,
        );
        for tid in 0..run.thread_count() {
            let regs = run.context(tid);
            let cells: Vec<String> = regs
                .as_slice()
                .iter()
                .enumerate()
                .map(|(i, v)| format!("${}={}", i, v))
                .collect();
            println!("  thread {}: {}", tid, cells.join(" "));
        }
    }

    Ok(())
}
