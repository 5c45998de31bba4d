use crate::region::MemoryRegion;
use crate::BusError;
use et_types::topology::DRAM_BASE;

/// Flat backing store for the DRAM physical address range, based at
/// `DRAM_BASE` (physical address bit 38 set).
pub struct Dram {
    base: u64,
    bytes: Vec<u8>,
}

impl Dram {
    pub fn new(size: u64) -> Self {
        Dram {
            base: DRAM_BASE,
            bytes: vec![0u8; size as usize],
        }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Direct slice access for the ELF/raw loader, which writes large
    /// contiguous ranges up front rather than going through the bus.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl MemoryRegion for Dram {
    fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.bytes.len() as u64
    }

    fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<(), BusError> {
        let off = (addr - self.base) as usize;
        let end = off
            .checked_add(buf.len())
            .filter(|&e| e <= self.bytes.len())
            .ok_or(BusError::Unmapped { addr })?;
        buf.copy_from_slice(&self.bytes[off..end]);
        Ok(())
    }

    fn write(&mut self, addr: u64, buf: &[u8]) -> Result<(), BusError> {
        let off = (addr - self.base) as usize;
        let end = off
            .checked_add(buf.len())
            .filter(|&e| e <= self.bytes.len())
            .ok_or(BusError::Unmapped { addr })?;
        self.bytes[off..end].copy_from_slice(buf);
        Ok(())
    }
}
