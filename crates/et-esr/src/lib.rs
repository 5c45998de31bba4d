//! The ESR (Esperanto System Register) subsystem: address decode for the
//! per-hart/per-neighborhood/per-shire-cache/per-rbox/per-shire-other
//! register files, the debug module, and broadcast fan-out, all grounded
//! on `emu_defines.h`'s `ESR_*` bit layout. Deliberately separate from
//! `et-mem`'s byte-addressable bus: an ESR access can fan out to every
//! shire (broadcast writes) or target a hart that doesn't own the
//! requesting core, which doesn't fit a single `read(addr, buf)` call.

pub mod address;
pub mod broadcast;
pub mod debug;
mod ports;
mod regs;

pub use address::{decode, hart_port, is_esr_address, EsrAddress, EsrTargetKind, NEIGH_BROADCAST};
pub use broadcast::Broadcast;
pub use debug::{DebugModule, DmControl, HartDebugStatus};
pub use ports::MessagePort;
pub use regs::RegFile;

use et_types::topology;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EsrError {
    #[error("esr address {addr:#x} does not resolve to a known register file")]
    Unmapped { addr: u64 },
    #[error("esr access to shire {shire} out of range")]
    ShireOutOfRange { shire: u8 },
}

/// One shire's worth of ESR state: hart, neighborhood, shire-cache, rbox,
/// and shire-other register files, plus its debug module and message
/// ports. Indexed out of [`EsrSpace`] by shire number.
pub struct ShireEsr {
    hart: Vec<RegFile>,
    hart_ports: Vec<[MessagePort; topology::NR_MSG_PORTS as usize]>,
    neigh: Vec<RegFile>,
    cache_banks: Vec<RegFile>,
    rbox: RegFile,
    other: RegFile,
    pub debug: DebugModule,
}

impl ShireEsr {
    fn new(harts_per_shire: usize) -> Self {
        ShireEsr {
            hart: (0..harts_per_shire).map(|_| RegFile::new()).collect(),
            hart_ports: (0..harts_per_shire)
                .map(|_| std::array::from_fn(|_| MessagePort::default()))
                .collect(),
            // Neighborhood broadcast (index NEIGH_BROADCAST) is handled as
            // fan-out at the access layer, so only the real neighborhoods
            // need a backing register file here.
            neigh: (0..topology::NEIGH_PER_SHIRE as usize).map(|_| RegFile::new()).collect(),
            cache_banks: (0..4).map(|_| RegFile::new()).collect(),
            rbox: RegFile::new(),
            other: RegFile::new(),
            debug: DebugModule::new(harts_per_shire),
        }
    }
}

/// All ESR state for every shire in the system.
pub struct EsrSpace {
    shires: Vec<ShireEsr>,
}

impl EsrSpace {
    pub fn new(num_shires: u32, harts_per_shire: u32) -> Self {
        EsrSpace {
            shires: (0..num_shires).map(|_| ShireEsr::new(harts_per_shire as usize)).collect(),
        }
    }

    fn shire(&self, shire: u8) -> Result<&ShireEsr, EsrError> {
        self.shires.get(shire as usize).ok_or(EsrError::ShireOutOfRange { shire })
    }

    fn shire_mut(&mut self, shire: u8) -> Result<&mut ShireEsr, EsrError> {
        self.shires.get_mut(shire as usize).ok_or(EsrError::ShireOutOfRange { shire })
    }

    /// Resolves and reads a single ESR at physical address `addr`, as seen
    /// by a requester on `requester_shire` (used to resolve the "local
    /// shire" alias).
    pub fn read(&self, addr: u64, requester_shire: u8) -> Result<u64, EsrError> {
        let decoded = decode(addr, requester_shire);
        let shire = self.shire(decoded.shire)?;
        match decoded.target {
            EsrTargetKind::Hart { hart, offset } => {
                if let Some(port) = hart_port(offset) {
                    let ports = shire
                        .hart_ports
                        .get(hart as usize)
                        .ok_or(EsrError::Unmapped { addr })?;
                    return Ok(ports[port as usize].read());
                }
                let file = shire.hart.get(hart as usize).ok_or(EsrError::Unmapped { addr })?;
                Ok(file.read(offset))
            }
            EsrTargetKind::Neighborhood { neigh, offset } => {
                let file = shire.neigh.get(neigh as usize).ok_or(EsrError::Unmapped { addr })?;
                Ok(file.read(offset))
            }
            EsrTargetKind::ShireCache { bank, offset } => {
                let file = shire.cache_banks.get(bank as usize).ok_or(EsrError::Unmapped { addr })?;
                Ok(file.read(offset))
            }
            EsrTargetKind::Rbox { offset } => Ok(shire.rbox.read(offset)),
            EsrTargetKind::ShireOther { offset } => Ok(shire.other.read(offset)),
            EsrTargetKind::Unmapped => Err(EsrError::Unmapped { addr }),
        }
    }

    /// Resolves and writes a single ESR, fanning out to every neighborhood
    /// of the target shire when the address selects the neighborhood
    /// broadcast alias (`neigh == 0xF`).
    pub fn write(&mut self, addr: u64, value: u64, requester_shire: u8) -> Result<(), EsrError> {
        let decoded = decode(addr, requester_shire);
        let shire = self.shire_mut(decoded.shire)?;
        match decoded.target {
            EsrTargetKind::Hart { hart, offset } => {
                if let Some(port) = hart_port(offset) {
                    let ports = shire
                        .hart_ports
                        .get_mut(hart as usize)
                        .ok_or(EsrError::Unmapped { addr })?;
                    ports[port as usize].write(value);
                    return Ok(());
                }
                let file = shire.hart.get_mut(hart as usize).ok_or(EsrError::Unmapped { addr })?;
                file.write(offset, value);
                Ok(())
            }
            EsrTargetKind::Neighborhood { neigh, offset } => {
                if neigh == NEIGH_BROADCAST {
                    for file in shire.neigh.iter_mut() {
                        file.write(offset, value);
                    }
                    return Ok(());
                }
                let file = shire.neigh.get_mut(neigh as usize).ok_or(EsrError::Unmapped { addr })?;
                file.write(offset, value);
                Ok(())
            }
            EsrTargetKind::ShireCache { bank, offset } => {
                let file = shire.cache_banks.get_mut(bank as usize).ok_or(EsrError::Unmapped { addr })?;
                file.write(offset, value);
                Ok(())
            }
            EsrTargetKind::Rbox { offset } => {
                shire.rbox.write(offset, value);
                Ok(())
            }
            EsrTargetKind::ShireOther { offset } => {
                shire.other.write(offset, value);
                Ok(())
            }
            EsrTargetKind::Unmapped => Err(EsrError::Unmapped { addr }),
        }
    }

    /// Applies a staged `mbroadcast`/`ubroadcast`/`sbroadcast` write: replays
    /// `broadcast.esr_addr` (reconstructed into a full shire-ESR address at
    /// the decoded sub-region) against every shire whose bit is set in the
    /// shire mask.
    pub fn apply_broadcast(&mut self, broadcast: Broadcast, value: u64) -> Result<(), EsrError> {
        for shire in broadcast.targets() {
            let addr = address::ESR_REGION_BASE
                | ((broadcast.prot as u64) << 30)
                | ((shire as u64) << 22)
                | ((broadcast.subregion as u64) << 20)
                | broadcast.esr_addr as u64;
            self.write(addr, value, shire)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hart_esr_round_trips() {
        let mut space = EsrSpace::new(2, 4);
        let addr = address::ESR_REGION_BASE | (1u64 << 22) | (2u64 << 12) | 0x40;
        space.write(addr, 0xdead_beef, 0).unwrap();
        assert_eq!(space.read(addr, 0).unwrap(), 0xdead_beef);
    }

    #[test]
    fn neighborhood_broadcast_writes_all_neighborhoods() {
        let mut space = EsrSpace::new(1, 4);
        let addr = address::ESR_REGION_BASE
            | (1u64 << 20)
            | ((NEIGH_BROADCAST as u64) << 16)
            | 0x10;
        space.write(addr, 7, 0).unwrap();
        for neigh in 0..topology::NEIGH_PER_SHIRE {
            let read_addr = address::ESR_REGION_BASE | (1u64 << 20) | ((neigh as u64) << 16) | 0x10;
            assert_eq!(space.read(read_addr, 0).unwrap(), 7);
        }
    }

    #[test]
    fn message_port_round_trips() {
        let mut space = EsrSpace::new(1, 2);
        let addr = address::ESR_REGION_BASE | (1u64 << 12) | 0x810;
        space.write(addr, 42, 0).unwrap();
        assert_eq!(space.read(addr, 0).unwrap(), 42);
    }

    #[test]
    fn shire_out_of_range_errors() {
        let space = EsrSpace::new(1, 4);
        let addr = address::ESR_REGION_BASE | (5u64 << 22);
        assert!(matches!(space.read(addr, 9), Err(EsrError::ShireOutOfRange { shire: 5 })));
    }
}
