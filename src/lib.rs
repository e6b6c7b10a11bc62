pub mod accounting;
pub mod config;
pub mod cpu;
pub mod error;
pub mod executor;
pub mod isa;
pub mod memory;
pub mod metrics;
pub mod program;
pub mod run;
pub mod scheduler;
pub mod thread;
