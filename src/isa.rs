/// Instruction set of the simulated pipeline.
///
/// A deliberately tiny RISC-like ISA: register/immediate arithmetic, one load,
/// one store and HALT. Every instruction carries the same four fields; the
/// second source is either a register index or an immediate.
use serde::Deserialize;
use std::fmt;

/// Operation performed by an instruction.
///
/// Unknown mnemonics decode to `Nop`. Reserved encodings are tolerated rather
/// than rejected so newer programs still run on this model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Opcode {
    Nop,
    /// dst <- src1 + src2
    Add,
    /// dst <- src1 - src2
    Sub,
    /// dst <- src1 + imm
    Addi,
    /// dst <- src1 - imm
    Subi,
    /// dst <- Mem[src1 + src2]
    Load,
    /// Mem[dst + src2] <- src1
    Store,
    Halt,
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Addi => "ADDI",
            Opcode::Subi => "SUBI",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Halt => "HALT",
        }
    }

    /// LOAD and STORE are the only long-latency operations.
    pub fn is_memory(&self) -> bool {
        matches!(self, Opcode::Load | Opcode::Store)
    }
}

impl From<&str> for Opcode {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "NOP" => Opcode::Nop,
            "ADD" => Opcode::Add,
            "SUB" => Opcode::Sub,
            "ADDI" => Opcode::Addi,
            "SUBI" => Opcode::Subi,
            "LOAD" => Opcode::Load,
            "STORE" => Opcode::Store,
            "HALT" => Opcode::Halt,
            other => {
                log::debug!("unrecognized opcode '{}', decoding as NOP", other);
                Opcode::Nop
            }
        }
    }
}

impl From<String> for Opcode {
    fn from(name: String) -> Self {
        Opcode::from(name.as_str())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Second source operand: a register index or an immediate constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(usize),
    Imm(i32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(idx) => write!(f, "${}", idx),
            Operand::Imm(value) => write!(f, "{}", value),
        }
    }
}

/// A decoded instruction. Immutable once fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawInstruction")]
pub struct Instruction {
    pub opcode: Opcode,
    pub dst: usize,
    pub src1: usize,
    pub src2: Operand,
}

impl Instruction {
    pub fn new(opcode: Opcode, dst: usize, src1: usize, src2: Operand) -> Self {
        Instruction {
            opcode,
            dst,
            src1,
            src2,
        }
    }

    pub fn add(dst: usize, src1: usize, src2: usize) -> Self {
        Self::new(Opcode::Add, dst, src1, Operand::Reg(src2))
    }

    pub fn sub(dst: usize, src1: usize, src2: usize) -> Self {
        Self::new(Opcode::Sub, dst, src1, Operand::Reg(src2))
    }

    pub fn addi(dst: usize, src1: usize, imm: i32) -> Self {
        Self::new(Opcode::Addi, dst, src1, Operand::Imm(imm))
    }

    pub fn subi(dst: usize, src1: usize, imm: i32) -> Self {
        Self::new(Opcode::Subi, dst, src1, Operand::Imm(imm))
    }

    /// dst <- Mem[src1 + offset]
    pub fn load(dst: usize, src1: usize, offset: Operand) -> Self {
        Self::new(Opcode::Load, dst, src1, offset)
    }

    /// Mem[base + offset] <- value. `base` travels in the dst field.
    pub fn store(base: usize, value: usize, offset: Operand) -> Self {
        Self::new(Opcode::Store, base, value, offset)
    }

    pub fn halt() -> Self {
        Self::new(Opcode::Halt, 0, 0, Operand::Imm(0))
    }

    pub fn nop() -> Self {
        Self::new(Opcode::Nop, 0, 0, Operand::Imm(0))
    }

    /// Register indices this instruction touches, for validation.
    pub fn registers(&self) -> Vec<usize> {
        match self.opcode {
            Opcode::Halt | Opcode::Nop => vec![],
            _ => {
                let mut regs = vec![self.dst, self.src1];
                if let Operand::Reg(idx) = self.src2 {
                    regs.push(idx);
                }
                regs
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Opcode::Halt | Opcode::Nop => write!(f, "{}", self.opcode),
            _ => write!(
                f,
                "{} ${}, ${}, {}",
                self.opcode, self.dst, self.src1, self.src2
            ),
        }
    }
}

/// On-disk shape of an instruction: `src2` names a register, `imm` a constant.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInstruction {
    op: Opcode,
    #[serde(default)]
    dst: usize,
    #[serde(default)]
    src1: usize,
    src2: Option<usize>,
    imm: Option<i32>,
}

impl TryFrom<RawInstruction> for Instruction {
    type Error = String;

    fn try_from(raw: RawInstruction) -> Result<Self, Self::Error> {
        let src2 = match (raw.src2, raw.imm) {
            (Some(reg), None) => Operand::Reg(reg),
            (None, Some(imm)) => Operand::Imm(imm),
            (None, None) => Operand::Imm(0),
            (Some(_), Some(_)) => {
                return Err(format!(
                    "{} sets both src2 and imm; pick one",
                    raw.op.mnemonic()
                ));
            }
        };
        Ok(Instruction::new(raw.op, raw.dst, raw.src1, src2))
    }
}
