/// Error types for the simulator.
///
/// Caller-contract breaches (thread id out of range, fetching past HALT) are
/// not represented here: they panic at the point of misuse.
use std::path::PathBuf;
use thiserror::Error;

/// Problems found while validating a program before a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("program has no threads")]
    NoThreads,
    #[error("thread {thread} has no instructions")]
    EmptyThread { thread: usize },
    #[error("thread {thread} does not end with HALT")]
    MissingHalt { thread: usize },
    #[error("thread {thread} has HALT at {index} before its last instruction")]
    EarlyHalt { thread: usize, index: usize },
    #[error("thread {thread} instruction {index} uses register ${register} (register file has {regs_count})")]
    RegisterOutOfRange {
        thread: usize,
        index: usize,
        register: usize,
        regs_count: usize,
    },
    #[error("thread {thread} instruction {index}: {opcode} expects {expected} as second operand")]
    OperandKind {
        thread: usize,
        index: usize,
        opcode: &'static str,
        expected: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum SimError {
    /// CPI requested for a run that elapsed zero cycles.
    #[error("no cycles were run in {policy}")]
    EmptyRun { policy: &'static str },
    #[error("{policy} has not been run yet")]
    NotRun { policy: &'static str },
    #[error("invalid program: {0}")]
    Program(#[from] ProgramError),
    #[error("failed to parse TOML: {0}")]
    Config(#[from] toml::de::Error),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type SimResult<T> = Result<T, SimError>;
