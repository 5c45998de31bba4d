//! `TensorLoadL2`: DMA from main memory directly into a shire's L2
//! scratchpad, bypassing the L1 path entirely.

use crate::error::TensorError;
use et_mem::MemoryBus;
use et_mmu::{TranslationContext, TranslationState};
use et_types::topology;
use et_types::{AccessType, Agent, Trap};

#[derive(Debug, Clone, Copy)]
pub struct LoadL2Params {
    pub tm: bool,
    pub dst: u16,
    pub rows: u8,
    pub addr: u64,
    pub stride: u64,
    pub id: u8,
    pub tensor_mask: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Loaded,
    MaskedOff,
    BusErrorSkipped,
}

/// Executes a `TensorLoadL2`: each enabled row is translated and read from
/// memory, then written to `L2_SCP_BASE + shire*OFFSET + (dst+i)*64`. An
/// MMU fault aborts the whole operation and should set `tensor_error.7` in
/// the caller.
pub fn execute(
    params: &LoadL2Params,
    shire: u8,
    translation: &TranslationState,
    ctx: &TranslationContext,
    mem: &mut MemoryBus,
    agent: Agent,
) -> Result<Vec<RowOutcome>, Trap> {
    let rows = params.rows.max(1) as usize;
    let mut outcomes = Vec::with_capacity(rows);

    for i in 0..rows {
        if params.tm && params.tensor_mask & (1 << (i % 8)) == 0 {
            outcomes.push(RowOutcome::MaskedOff);
            continue;
        }
        let src = params.addr.wrapping_add((i as u64).wrapping_mul(params.stride));
        let pa = et_mmu::translate_address(translation, ctx, src, 64, mem, agent)?;
        let mut buf = [0u8; 64];
        if mem.read(agent, AccessType::TxLoad, pa, &mut buf).is_err() {
            outcomes.push(RowOutcome::BusErrorSkipped);
            continue;
        }
        let dst_index = (params.dst as usize + i) as u64;
        let dst_addr = topology::L2_SCP_BASE
            + shire as u64 * topology::L2_SCP_OFFSET
            + dst_index * 64;
        match mem.write(agent, AccessType::TxStore, dst_addr, &buf) {
            Ok(()) => outcomes.push(RowOutcome::Loaded),
            Err(_) => outcomes.push(RowOutcome::BusErrorSkipped),
        }
    }
    Ok(outcomes)
}

pub fn tensor_error_on_mmu_fault() -> TensorError {
    TensorError::MMU_FAULT
}

#[cfg(test)]
mod tests {
    use super::*;
    use et_types::Privilege;

    #[test]
    fn writes_rows_into_shire_l2() {
        let mut mem = MemoryBus::new(16 * 1024 * 1024);
        let agent = Agent::new(0, 0, Privilege::Machine);
        let src = topology::DRAM_BASE;
        mem.write(agent, AccessType::Store, src, &[3u8; 64]).unwrap();

        let params = LoadL2Params {
            tm: false,
            dst: 0,
            rows: 1,
            addr: src,
            stride: 64,
            id: 0,
            tensor_mask: 0xff,
        };
        let translation = TranslationState::bare();
        let ctx = TranslationContext {
            privilege: Privilege::Machine,
            access: AccessType::TxLoad,
            mxr: false,
            sum: false,
        };
        let outcomes = execute(&params, 0, &translation, &ctx, &mut mem, agent).unwrap();
        assert_eq!(outcomes, vec![RowOutcome::Loaded]);

        let mut readback = [0u8; 64];
        mem.read(agent, AccessType::Load, topology::L2_SCP_BASE, &mut readback).unwrap();
        assert_eq!(readback, [3u8; 64]);
    }
}
