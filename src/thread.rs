/// Hardware threads.
/// A hardware thread is one instruction stream with its own register file and
/// fetch cursor. All threads share a single issue slot; which one occupies it
/// each cycle is the scheduler's business.
use crate::isa::{Instruction, Opcode};
use crate::program::InstructionSource;
use std::sync::Arc;

/// Fixed-size integer register file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    regs: Box<[i32]>,
}

impl RegisterFile {
    pub fn new(regs_count: usize) -> Self {
        RegisterFile {
            regs: vec![0; regs_count].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    pub fn get(&self, idx: usize) -> i32 {
        self.regs[idx]
    }

    pub fn set(&mut self, idx: usize, value: i32) {
        self.regs[idx] = value;
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.regs
    }
}

/// Copy a thread's instruction stream out of the source, up to and including
/// its HALT.
pub fn load_stream(source: &dyn InstructionSource, thread: usize) -> Arc<[Instruction]> {
    let mut stream = Vec::new();
    loop {
        let inst = source.instruction(thread, stream.len());
        stream.push(inst);
        if inst.opcode == Opcode::Halt {
            break;
        }
    }
    stream.into()
}

/// Mutable simulation state of one hardware thread.
#[derive(Debug, Clone)]
pub struct ThreadState {
    pub id: usize,
    registers: RegisterFile,
    /// Immutable instruction stream, shared between runs of the same program
    program: Arc<[Instruction]>,
    /// Index of the next instruction to fetch
    cursor: usize,
    halted: bool,
    /// Cycles left before this thread may issue again
    stall_cycles: u32,
}

impl ThreadState {
    pub fn new(id: usize, program: Arc<[Instruction]>, regs_count: usize) -> Self {
        ThreadState {
            id,
            registers: RegisterFile::new(regs_count),
            program,
            cursor: 0,
            halted: false,
            stall_cycles: 0,
        }
    }

    /// Return the instruction under the cursor and advance past it.
    ///
    /// # Panics
    /// If the thread has already halted.
    pub fn fetch_next(&mut self) -> Instruction {
        assert!(
            !self.halted,
            "thread {} fetched after HALT (cursor {})",
            self.id, self.cursor
        );
        let inst = self.program[self.cursor];
        self.cursor += 1;
        inst
    }

    pub fn is_ready(&self) -> bool {
        !self.halted && self.stall_cycles == 0
    }

    pub fn decay_stall(&mut self, cycles: u32) {
        self.stall_cycles = self.stall_cycles.saturating_sub(cycles);
    }

    pub fn set_stall(&mut self, cycles: u32) {
        self.stall_cycles = cycles;
    }

    pub fn mark_halted(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn stall_cycles(&self) -> u32 {
        self.stall_cycles
    }

    /// Instructions fetched (and therefore retired) so far.
    pub fn retired(&self) -> usize {
        self.cursor
    }

    pub fn program_len(&self) -> usize {
        self.program.len()
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }
}
