use mtsim::config::SimConfig;
use mtsim::cpu::Cpu;
use mtsim::isa::{Instruction, Opcode, Operand};
use mtsim::memory::{DataMemory, MemoryWord};
use mtsim::program::Program;
use mtsim::scheduler::SchedulingPolicy;

/// T0 = [ADDI r1<-r0+5, LOAD r2<-[r1+0], HALT], T1 = [ADDI r1<-r0+7, HALT]
fn worked_example() -> Program {
    Program::new(vec![
        vec![
            Instruction::addi(1, 0, 5),
            Instruction::load(2, 1, Operand::Imm(0)),
            Instruction::halt(),
        ],
        vec![Instruction::addi(1, 0, 7), Instruction::halt()],
    ])
    .with_memory(vec![MemoryWord { address: 5, value: 123 }])
}

/// Small deterministic generator so the property tests need no extra crates.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

fn random_program(seed: u64, threads: usize, with_memory: bool) -> Program {
    let mut rng = Lcg(seed);
    let streams = (0..threads)
        .map(|_| {
            let len = rng.next(12) as usize;
            let mut insts: Vec<Instruction> = (0..len)
                .map(|_| {
                    let dst = rng.next(8) as usize;
                    let src1 = rng.next(8) as usize;
                    let kinds = if with_memory { 7 } else { 5 };
                    match rng.next(kinds) {
                        0 => Instruction::add(dst, src1, rng.next(8) as usize),
                        1 => Instruction::sub(dst, src1, rng.next(8) as usize),
                        2 => Instruction::addi(dst, src1, rng.next(100) as i32 - 50),
                        3 => Instruction::subi(dst, src1, rng.next(100) as i32),
                        4 => Instruction::nop(),
                        5 => Instruction::load(dst, src1, Operand::Imm(rng.next(16) as i32)),
                        _ => Instruction::store(dst, src1, Operand::Reg(rng.next(8) as usize)),
                    }
                })
                .collect();
            insts.push(Instruction::halt());
            insts
        })
        .collect();
    Program::new(streams)
}

fn run(program: &Program, config: SimConfig, policy: SchedulingPolicy) -> (u64, u64, Cpu) {
    let mut cpu = Cpu::from_program(program, config).unwrap();
    let mut mem = program.memory_image();
    let acc = cpu.run(policy, &mut mem).clone();
    (acc.instructions, acc.cycles, cpu)
}

fn memory_ops(program: &Program) -> u64 {
    program
        .threads
        .iter()
        .flat_map(|t| t.instructions.iter())
        .filter(|i| i.opcode.is_memory())
        .count() as u64
}

#[test]
fn worked_example_blocked_trace() {
    let (instructions, cycles, cpu) =
        run(&worked_example(), SimConfig::new(4, 4, 2), SchedulingPolicy::Blocked);
    // c1 ADDI, c2 LOAD (+2 penalty -> c4), c5 T1 ADDI, c6 T1 HALT (T0 ready
    // again, +2 -> c8), c9 T0 HALT.
    assert_eq!(instructions, 5);
    assert_eq!(cycles, 9);
    assert!((cpu.blocked_cpi().unwrap() - 5.0 / 9.0).abs() < 1e-12);

    let t0 = cpu.blocked_context(0).unwrap();
    assert_eq!(t0.get(1), 5);
    assert_eq!(t0.get(2), 123);
    assert_eq!(cpu.blocked_context(1).unwrap().get(1), 7);

    let acc = &cpu.report(SchedulingPolicy::Blocked).unwrap().accountant;
    assert_eq!(acc.switches, 2);
    assert_eq!(acc.switch_penalty_cycles, 4);
    assert_eq!(acc.idle_cycles, 0);
}

#[test]
fn worked_example_fine_grained_trace() {
    let (instructions, cycles, cpu) =
        run(&worked_example(), SimConfig::new(4, 4, 2), SchedulingPolicy::FineGrained);
    assert_eq!(instructions, 5);
    assert_eq!(cycles, 5);
    assert_eq!(cpu.fine_grained_cpi().unwrap(), 1.0);
    assert_eq!(cpu.fine_grained_context(0).unwrap().get(2), 123);
    assert_eq!(cpu.fine_grained_context(1).unwrap().get(1), 7);
}

#[test]
fn both_policies_terminate_and_never_exceed_one_ipc() {
    for seed in 0..40u64 {
        let threads = 1 + (seed % 5) as usize;
        let program = random_program(seed, threads, true);
        let total = program.instruction_count() as u64;
        for policy in SchedulingPolicy::ALL {
            let config = SimConfig::new((seed % 7) as u32, (seed % 5) as u32, (seed % 3) as u32);
            let (instructions, cycles, _) = run(&program, config, policy);
            assert_eq!(instructions, total, "seed {} {}", seed, policy);
            assert!(instructions <= cycles, "seed {} {}", seed, policy);
        }
    }
}

#[test]
fn single_thread_blocked_idles_out_each_latency() {
    for seed in 0..20u64 {
        let program = random_program(seed, 1, true);
        let (load, store, switch) = (5u32, 3u32, 2u32);
        let expected: u64 = program.threads[0]
            .instructions
            .iter()
            .map(|i| match i.opcode {
                Opcode::Load => 1 + load.max(switch) as u64,
                Opcode::Store => 1 + store.max(switch) as u64,
                _ => 1,
            })
            .sum();
        let (_, cycles, _) = run(&program, SimConfig::new(load, store, switch), SchedulingPolicy::Blocked);
        assert_eq!(cycles, expected, "seed {}", seed);
    }
}

#[test]
fn fine_grained_never_idles() {
    for seed in 0..20u64 {
        for with_memory in [false, true] {
            let program = random_program(seed, 1 + (seed % 4) as usize, with_memory);
            let (instructions, cycles, _) =
                run(&program, SimConfig::new(8, 8, 3), SchedulingPolicy::FineGrained);
            assert_eq!(cycles, instructions, "seed {}", seed);
        }
    }
}

#[test]
fn blocked_switch_cost_sensitivity() {
    for seed in 0..20u64 {
        let threads = 1 + (seed % 4) as usize;
        let program = random_program(seed, threads, true);
        let (_, base, _) = run(&program, SimConfig::new(0, 0, 1), SchedulingPolicy::Blocked);
        let (_, raised, _) = run(&program, SimConfig::new(0, 0, 4), SchedulingPolicy::Blocked);
        // Every memory op pays the penalty, and every HALT but the last finds
        // a ready successor.
        let charged = memory_ops(&program) + threads as u64 - 1;
        assert_eq!(raised - base, 3 * charged, "seed {}", seed);
    }
}

#[test]
fn runs_are_independent() {
    let program = random_program(7, 3, true);
    let config = SimConfig::new(6, 2, 1);

    let (_, fg_alone, fg_cpu) = run(&program, config.clone(), SchedulingPolicy::FineGrained);

    let mut cpu = Cpu::from_program(&program, config).unwrap();
    let first = cpu.run_blocked(&mut program.memory_image()).clone();
    let fg = cpu.run_fine_grained(&mut program.memory_image()).clone();
    let again = cpu.run_blocked(&mut program.memory_image()).clone();

    assert_eq!(fg.cycles, fg_alone);
    assert_eq!(first, again);
    for tid in 0..3 {
        assert_eq!(
            cpu.fine_grained_context(tid).unwrap(),
            fg_cpu.fine_grained_context(tid).unwrap()
        );
    }
}

#[test]
fn register_results_do_not_depend_on_policy_without_sharing() {
    // Each thread works in its own address range.
    let program = Program::new(
        (0..3)
            .map(|t| {
                let base = 100 * (t as i32 + 1);
                vec![
                    Instruction::addi(1, 0, base),
                    Instruction::addi(2, 0, t as i32 + 10),
                    Instruction::store(1, 2, Operand::Imm(0)),
                    Instruction::load(3, 1, Operand::Imm(0)),
                    Instruction::add(4, 3, 2),
                    Instruction::subi(5, 4, 1),
                    Instruction::halt(),
                ]
            })
            .collect(),
    );
    let mut cpu = Cpu::from_program(&program, SimConfig::default()).unwrap();
    let mut blocked_mem = DataMemory::new();
    let mut fg_mem = DataMemory::new();
    cpu.run_blocked(&mut blocked_mem);
    cpu.run_fine_grained(&mut fg_mem);

    for t in 0..3 {
        let blocked = cpu.blocked_context(t).unwrap();
        assert_eq!(blocked, cpu.fine_grained_context(t).unwrap());
        assert_eq!(blocked.get(3), t as i32 + 10);
        assert_eq!(blocked.get(5), 2 * (t as i32 + 10) - 1);
        let addr = 100 * (t as u32 + 1);
        assert_eq!(blocked_mem.peek(addr), fg_mem.peek(addr));
    }
}
