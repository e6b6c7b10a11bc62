use mtsim::config::SimConfig;
use mtsim::cpu::Cpu;
use mtsim::memory::DataMemory;
use mtsim::metrics::{read_metrics, ThreadStatus};
use mtsim::program::Program;
use mtsim::scheduler::SchedulingPolicy;
use std::path::{Path, PathBuf};

fn demo(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn load(name: &str) -> Program {
    Program::from_file(&demo(name)).unwrap()
}

#[test]
fn demo_config_is_reference_machine() {
    let cfg = SimConfig::from_file(&demo("mtsim.toml")).unwrap();
    assert_eq!(cfg, SimConfig::default());
}

#[test]
fn worked_example_from_file() {
    let program = load("worked_example.toml");
    assert_eq!(program.name, "worked_example");

    let mut cpu = Cpu::from_program(&program, SimConfig::new(4, 4, 2)).unwrap();
    cpu.run_blocked(&mut program.memory_image());
    cpu.run_fine_grained(&mut program.memory_image());

    assert!((cpu.blocked_cpi().unwrap() - 5.0 / 9.0).abs() < 1e-12);
    assert_eq!(cpu.fine_grained_cpi().unwrap(), 1.0);
    assert_eq!(cpu.blocked_context(0).unwrap().get(2), 123);
}

#[test]
fn memory_heavy_results_under_both_policies() {
    let program = load("memory_heavy.toml");
    let mut cpu = Cpu::from_program(&program, SimConfig::default()).unwrap();

    for policy in SchedulingPolicy::ALL {
        let mut mem = program.memory_image();
        cpu.run(policy, &mut mem);

        assert_eq!(cpu.context(policy, 0).unwrap().as_slice()[1..5], [0, 10, 20, 30]);
        assert_eq!(cpu.context(policy, 1).unwrap().as_slice()[1..5], [16, -4, 9, 5]);
        assert_eq!(cpu.context(policy, 2).unwrap().get(2), 99);
        let t3 = cpu.context(policy, 3).unwrap();
        assert_eq!((t3.get(5), t3.get(6)), (3, -3));

        assert_eq!(mem.peek(2), 30);
        assert_eq!(mem.peek(18), 5);
        assert_eq!(mem.peek(32), 99);
    }

    // Latency is hidden better by switching every cycle.
    let blocked = cpu.blocked_cpi().unwrap();
    let fine = cpu.fine_grained_cpi().unwrap();
    assert!(blocked < fine, "blocked {} fine {}", blocked, fine);
}

#[test]
fn bad_program_file_is_reported() {
    let err = Program::from_toml_str("[[threads]]\ninstructions = [{ op = \"ADD\", bogus = 1 }]\n")
        .unwrap_err();
    assert!(err.to_string().contains("bogus"));
}

#[test]
fn completed_run_publishes_snapshot() {
    let path = std::env::temp_dir().join(format!("mtsim_it_{}.json", std::process::id()));
    let program = load("worked_example.toml");
    let config = SimConfig::new(4, 4, 2).with_snapshot(&path, 1);
    let mut cpu = Cpu::from_program(&program, config).unwrap();
    cpu.run_blocked(&mut DataMemory::new());

    let snap = read_metrics(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(snap.status, "complete");
    assert_eq!(snap.program_name, "worked_example");
    assert_eq!(snap.scheduling_policy, "Blocked");
    assert_eq!((snap.instructions, snap.cycles), (5, 9));
    assert!(snap.threads.iter().all(|t| t.status == ThreadStatus::Halted));
}
