use crate::BusError;

/// A byte-addressable region of the physical address space, mirroring the
/// reference model's `main_memory_region` read/write split.
pub trait MemoryRegion {
    fn contains(&self, addr: u64) -> bool;
    fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<(), BusError>;
    fn write(&mut self, addr: u64, buf: &[u8]) -> Result<(), BusError>;
}
