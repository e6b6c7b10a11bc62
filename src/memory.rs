/// Data memory seen by LOAD and STORE.
///
/// The scheduler only needs a synchronous read/write port; latency is modeled
/// by stall counters, never by the access itself. `DataMemory` is a sparse
/// word-addressed store so programs can touch any 32-bit address without
/// allocating the whole space.
use serde::Deserialize;
use std::collections::HashMap;

/// Synchronous data-memory port.
pub trait MemoryPort {
    fn read(&mut self, addr: u32) -> i32;
    fn write(&mut self, addr: u32, value: i32);
}

/// One initialised word of a memory image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MemoryWord {
    pub address: u32,
    pub value: i32,
}

/// Sparse word-addressed memory. Unwritten words read as zero.
#[derive(Debug, Clone, Default)]
pub struct DataMemory {
    data: HashMap<u32, i32>,
    reads: u64,
    writes: u64,
}

impl DataMemory {
    pub fn new() -> Self {
        DataMemory::default()
    }

    pub fn with_image(image: &[MemoryWord]) -> Self {
        let mut mem = DataMemory::new();
        for word in image {
            mem.data.insert(word.address, word.value);
        }
        mem
    }

    /// Inspect a word without counting it as an access.
    pub fn peek(&self, addr: u32) -> i32 {
        *self.data.get(&addr).unwrap_or(&0)
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl MemoryPort for DataMemory {
    fn read(&mut self, addr: u32) -> i32 {
        self.reads += 1;
        self.peek(addr)
    }

    fn write(&mut self, addr: u32, value: i32) {
        self.writes += 1;
        self.data.insert(addr, value);
    }
}
