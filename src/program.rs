/// Programs: the per-thread instruction streams fed to the pipeline.
///
/// The scheduler only sees the `InstructionSource` trait. `Program` is the
/// stock implementation, deserialized from TOML and validated before a run.
use crate::error::{ProgramError, SimError, SimResult};
use crate::isa::{Instruction, Opcode, Operand};
use crate::memory::{DataMemory, MemoryWord};
use serde::Deserialize;
use std::path::Path;

/// Instruction-fetch collaborator.
///
/// `instruction(thread, index)` must be deterministic, and every thread's
/// sequence must be finite and end with HALT. Callers never fetch past it.
pub trait InstructionSource {
    fn thread_count(&self) -> usize;
    fn instruction(&self, thread: usize, index: usize) -> Instruction;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreadProgram {
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Program {
    #[serde(default)]
    pub name: String,
    pub threads: Vec<ThreadProgram>,
    /// Initial data-memory contents
    #[serde(default)]
    pub memory: Vec<MemoryWord>,
}

impl Program {
    pub fn new(threads: Vec<Vec<Instruction>>) -> Self {
        Program {
            name: String::new(),
            threads: threads
                .into_iter()
                .map(|instructions| ThreadProgram { instructions })
                .collect(),
            memory: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_memory(mut self, memory: Vec<MemoryWord>) -> Self {
        self.memory = memory;
        self
    }

    pub fn from_toml_str(src: &str) -> SimResult<Self> {
        Ok(toml::from_str(src)?)
    }

    pub fn from_file(path: &Path) -> SimResult<Self> {
        let src = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut program = Self::from_toml_str(&src)?;
        if program.name.is_empty() {
            if let Some(stem) = path.file_stem() {
                program.name = stem.to_string_lossy().into_owned();
            }
        }
        Ok(program)
    }

    /// A fresh data memory seeded with this program's image.
    pub fn memory_image(&self) -> DataMemory {
        DataMemory::with_image(&self.memory)
    }

    /// Check the structural guarantees the scheduler relies on.
    pub fn validate(&self, regs_count: usize) -> Result<(), ProgramError> {
        if self.threads.is_empty() {
            return Err(ProgramError::NoThreads);
        }
        for (thread, tp) in self.threads.iter().enumerate() {
            let last = match tp.instructions.last() {
                Some(inst) => inst,
                None => return Err(ProgramError::EmptyThread { thread }),
            };
            if last.opcode != Opcode::Halt {
                return Err(ProgramError::MissingHalt { thread });
            }
            for (index, inst) in tp.instructions.iter().enumerate() {
                if inst.opcode == Opcode::Halt && index + 1 != tp.instructions.len() {
                    return Err(ProgramError::EarlyHalt { thread, index });
                }
                if let Some(register) = inst.registers().into_iter().find(|&r| r >= regs_count) {
                    return Err(ProgramError::RegisterOutOfRange {
                        thread,
                        index,
                        register,
                        regs_count,
                    });
                }
                let expected = match (inst.opcode, inst.src2) {
                    (Opcode::Add | Opcode::Sub, Operand::Imm(_)) => Some("a register"),
                    (Opcode::Addi | Opcode::Subi, Operand::Reg(_)) => Some("an immediate"),
                    _ => None,
                };
                if let Some(expected) = expected {
                    return Err(ProgramError::OperandKind {
                        thread,
                        index,
                        opcode: inst.opcode.mnemonic(),
                        expected,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn instruction_count(&self) -> usize {
        self.threads.iter().map(|t| t.instructions.len()).sum()
    }
}

impl InstructionSource for Program {
    fn thread_count(&self) -> usize {
        self.threads.len()
    }

    fn instruction(&self, thread: usize, index: usize) -> Instruction {
        let stream = &self.threads[thread].instructions;
        assert!(
            index < stream.len(),
            "thread {} fetched past its last instruction (index {})",
            thread,
            index
        );
        stream[index]
    }
}
