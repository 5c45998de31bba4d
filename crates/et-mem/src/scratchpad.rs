use crate::region::MemoryRegion;
use crate::BusError;
use et_types::topology::L2_SCP_SIZE;

/// One shire's 4 MiB L2 scratchpad, addressed within the shire-relative
/// offset the bus already resolved.
pub struct L2Scratchpad {
    bytes: Vec<u8>,
}

impl L2Scratchpad {
    pub fn new() -> Self {
        L2Scratchpad {
            bytes: vec![0u8; L2_SCP_SIZE as usize],
        }
    }
}

impl Default for L2Scratchpad {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegion for L2Scratchpad {
    fn contains(&self, addr: u64) -> bool {
        addr < self.bytes.len() as u64
    }

    fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<(), BusError> {
        let off = addr as usize;
        let end = off
            .checked_add(buf.len())
            .filter(|&e| e <= self.bytes.len())
            .ok_or(BusError::Unmapped { addr })?;
        buf.copy_from_slice(&self.bytes[off..end]);
        Ok(())
    }

    fn write(&mut self, addr: u64, buf: &[u8]) -> Result<(), BusError> {
        let off = addr as usize;
        let end = off
            .checked_add(buf.len())
            .filter(|&e| e <= self.bytes.len())
            .ok_or(BusError::Unmapped { addr })?;
        self.bytes[off..end].copy_from_slice(buf);
        Ok(())
    }
}
