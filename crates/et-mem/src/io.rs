use crate::region::MemoryRegion;
use crate::BusError;
use tracing::trace;

/// PU RVtimer registers, pinned from `main_memory_region_io.h`'s
/// `IO_R_PU_TIMER_REG_*` addresses.
const IO_PU_TIMER_MTIME: u64 = 0x0012_0050_00;
const IO_PU_TIMER_MTIMECMP: u64 = 0x0012_0050_08;

/// Miscellaneous memory-mapped IO registers that aren't DRAM or scratchpad:
/// currently just the PU RVtimer. Distinct device registers are added here
/// the same way the reference model's `main_memory_region_io` grows: one
/// more `match` arm, not a new region type.
pub struct IoRegion {
    mtime: u64,
    mtimecmp: u64,
}

impl IoRegion {
    pub fn new() -> Self {
        IoRegion {
            mtime: 0,
            mtimecmp: u64::MAX,
        }
    }

    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    pub fn mtimecmp(&self) -> u64 {
        self.mtimecmp
    }

    pub fn advance(&mut self, delta: u64) {
        self.mtime = self.mtime.wrapping_add(delta);
    }

    pub fn timer_pending(&self) -> bool {
        self.mtime >= self.mtimecmp
    }
}

impl Default for IoRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegion for IoRegion {
    fn contains(&self, addr: u64) -> bool {
        matches!(addr, IO_PU_TIMER_MTIME | IO_PU_TIMER_MTIMECMP)
    }

    fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<(), BusError> {
        if buf.len() != 8 {
            return Err(BusError::Misaligned { addr, size: buf.len() as u32 });
        }
        let value = match addr {
            IO_PU_TIMER_MTIME => self.mtime,
            IO_PU_TIMER_MTIMECMP => self.mtimecmp,
            _ => return Err(BusError::Unmapped { addr }),
        };
        trace!(addr, value, "io read");
        buf.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write(&mut self, addr: u64, buf: &[u8]) -> Result<(), BusError> {
        if buf.len() != 8 {
            return Err(BusError::Misaligned { addr, size: buf.len() as u32 });
        }
        let value = u64::from_le_bytes(buf.try_into().unwrap());
        trace!(addr, value, "io write");
        match addr {
            IO_PU_TIMER_MTIME => self.mtime = value,
            IO_PU_TIMER_MTIMECMP => self.mtimecmp = value,
            _ => return Err(BusError::Unmapped { addr }),
        }
        Ok(())
    }
}
