use std::collections::HashMap;

/// A sparse 64-bit register file keyed by ESR offset within its subregion.
/// The reference model's per-category ESR files (`hart_esr_t`,
/// `neigh_esr_t`, ...) are plain structs with a handful of named fields;
/// modelling them as a sparse map keeps every subregion's read/write path
/// uniform instead of hand-writing one struct per category, while still
/// reading-as-zero for any offset nothing has ever written (the reset
/// value every one of those structs zero-initializes to).
#[derive(Debug, Clone, Default)]
pub struct RegFile(HashMap<u64, u64>);

impl RegFile {
    pub fn new() -> Self {
        RegFile(HashMap::new())
    }

    pub fn read(&self, offset: u64) -> u64 {
        self.0.get(&offset).copied().unwrap_or(0)
    }

    pub fn write(&mut self, offset: u64, value: u64) {
        self.0.insert(offset, value);
    }
}
