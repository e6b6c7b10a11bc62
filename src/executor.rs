/// Instruction execution.
/// Applies one instruction to a thread's register file. Both scheduling
/// policies share this step; they differ only in what they do afterwards.
use crate::isa::{Instruction, Opcode, Operand};
use crate::memory::MemoryPort;
use crate::thread::RegisterFile;

/// What the scheduler needs to know about an executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Register-only work (including NOP and unrecognized opcodes)
    Alu,
    Load { addr: u32 },
    Store { addr: u32 },
    Halt,
}

impl ExecOutcome {
    pub fn is_memory(&self) -> bool {
        matches!(self, ExecOutcome::Load { .. } | ExecOutcome::Store { .. })
    }
}

fn operand(regs: &RegisterFile, op: Operand) -> i32 {
    match op {
        Operand::Reg(idx) => regs.get(idx),
        Operand::Imm(value) => value,
    }
}

fn effective_address(base: i32, offset: i32) -> u32 {
    base.wrapping_add(offset) as u32
}

/// Execute `inst` against `regs`, issuing memory accesses through `mem`.
/// Arithmetic wraps on overflow.
pub fn execute(regs: &mut RegisterFile, inst: &Instruction, mem: &mut dyn MemoryPort) -> ExecOutcome {
    match inst.opcode {
        Opcode::Add | Opcode::Addi => {
            let value = regs.get(inst.src1).wrapping_add(operand(regs, inst.src2));
            regs.set(inst.dst, value);
            ExecOutcome::Alu
        }
        Opcode::Sub | Opcode::Subi => {
            let value = regs.get(inst.src1).wrapping_sub(operand(regs, inst.src2));
            regs.set(inst.dst, value);
            ExecOutcome::Alu
        }
        Opcode::Load => {
            let addr = effective_address(regs.get(inst.src1), operand(regs, inst.src2));
            let value = mem.read(addr);
            regs.set(inst.dst, value);
            ExecOutcome::Load { addr }
        }
        Opcode::Store => {
            let addr = effective_address(regs.get(inst.dst), operand(regs, inst.src2));
            mem.write(addr, regs.get(inst.src1));
            ExecOutcome::Store { addr }
        }
        Opcode::Halt => ExecOutcome::Halt,
        Opcode::Nop => ExecOutcome::Alu,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{DataMemory, MemoryWord};

    fn regs_with(values: &[(usize, i32)]) -> RegisterFile {
        let mut regs = RegisterFile::new(8);
        for &(idx, v) in values {
            regs.set(idx, v);
        }
        regs
    }

    #[test]
    fn register_arithmetic() {
        let mut mem = DataMemory::new();
        let mut regs = regs_with(&[(1, 10), (2, 3)]);
        assert_eq!(execute(&mut regs, &Instruction::add(3, 1, 2), &mut mem), ExecOutcome::Alu);
        assert_eq!(regs.get(3), 13);
        execute(&mut regs, &Instruction::sub(4, 1, 2), &mut mem);
        assert_eq!(regs.get(4), 7);
    }

    #[test]
    fn immediate_arithmetic() {
        let mut mem = DataMemory::new();
        let mut regs = RegisterFile::new(8);
        execute(&mut regs, &Instruction::addi(1, 0, 5), &mut mem);
        execute(&mut regs, &Instruction::subi(2, 1, 8), &mut mem);
        assert_eq!(regs.get(1), 5);
        assert_eq!(regs.get(2), -3);
    }

    #[test]
    fn arithmetic_wraps() {
        let mut mem = DataMemory::new();
        let mut regs = regs_with(&[(1, i32::MAX), (2, i32::MIN)]);
        execute(&mut regs, &Instruction::addi(3, 1, 1), &mut mem);
        execute(&mut regs, &Instruction::subi(4, 2, 1), &mut mem);
        execute(&mut regs, &Instruction::add(5, 1, 1), &mut mem);
        assert_eq!(regs.get(3), i32::MIN);
        assert_eq!(regs.get(4), i32::MAX);
        assert_eq!(regs.get(5), -2);
    }

    #[test]
    fn load_with_immediate_and_register_offset() {
        let mut mem = DataMemory::with_image(&[
            MemoryWord { address: 12, value: 77 },
            MemoryWord { address: 15, value: -1 },
        ]);
        let mut regs = regs_with(&[(1, 10), (2, 5)]);
        let out = execute(&mut regs, &Instruction::load(3, 1, Operand::Imm(2)), &mut mem);
        assert_eq!(out, ExecOutcome::Load { addr: 12 });
        assert_eq!(regs.get(3), 77);
        execute(&mut regs, &Instruction::load(4, 1, Operand::Reg(2)), &mut mem);
        assert_eq!(regs.get(4), -1);
    }

    #[test]
    fn store_uses_dst_as_base() {
        let mut mem = DataMemory::new();
        let mut regs = regs_with(&[(1, 100), (2, 42)]);
        let out = execute(&mut regs, &Instruction::store(1, 2, Operand::Imm(4)), &mut mem);
        assert_eq!(out, ExecOutcome::Store { addr: 104 });
        assert_eq!(mem.peek(104), 42);
        assert_eq!(regs, regs_with(&[(1, 100), (2, 42)]));
    }

    #[test]
    fn negative_address_wraps() {
        let mut mem = DataMemory::new();
        let mut regs = regs_with(&[(1, 0), (2, 9)]);
        let out = execute(&mut regs, &Instruction::store(1, 2, Operand::Imm(-1)), &mut mem);
        assert_eq!(out, ExecOutcome::Store { addr: u32::MAX });
        assert_eq!(mem.peek(u32::MAX), 9);
    }

    #[test]
    fn halt_and_nop_leave_state_untouched() {
        let mut mem = DataMemory::new();
        let mut regs = regs_with(&[(1, 1)]);
        assert_eq!(execute(&mut regs, &Instruction::halt(), &mut mem), ExecOutcome::Halt);
        assert_eq!(execute(&mut regs, &Instruction::nop(), &mut mem), ExecOutcome::Alu);
        assert_eq!(regs, regs_with(&[(1, 1)]));
        assert_eq!(mem.reads() + mem.writes(), 0);
    }
}
