//! `TensorStore`: writes scratchpad rows or vector-register columns back
//! to main memory.

use crate::error::TensorError;
use crate::scratchpad::ScratchpadLines;
use et_mem::MemoryBus;
use et_mmu::{TranslationContext, TranslationState};
use et_types::{AccessType, Agent, Trap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSource {
    Scratchpad,
    VectorRegisters { cols: u8 },
}

#[derive(Debug, Clone, Copy)]
pub struct StoreParams {
    pub source: StoreSource,
    pub coop: bool,
    pub src_index: u8,
    pub rows: u8,
    pub addr: u64,
    pub stride: u64,
}

/// Validates a `TensorStore` request: cooperative stores require shire
/// cooperative mode, and vector-register stores only support 1/2/4 columns
/// per row (spec: "illegal {coop, cols} combinations set tensor_error.8").
pub fn validate(params: &StoreParams, shire_cooperative: bool) -> Result<(), TensorError> {
    if params.coop && !shire_cooperative {
        return Err(TensorError::STORE_ILLEGAL);
    }
    if let StoreSource::VectorRegisters { cols } = params.source {
        if !matches!(cols, 1 | 2 | 4) {
            return Err(TensorError::STORE_ILLEGAL);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Stored,
    BusErrorSkipped,
}

/// Stores from the L1 scratchpad: one 64-byte row per enabled row index.
pub fn execute_from_scratchpad(
    params: &StoreParams,
    scratchpad: &ScratchpadLines,
    translation: &TranslationState,
    ctx: &TranslationContext,
    mem: &mut MemoryBus,
    agent: Agent,
) -> Result<Vec<RowOutcome>, Trap> {
    let rows = params.rows.max(1) as usize;
    let mut outcomes = Vec::with_capacity(rows);
    for i in 0..rows {
        let dst = params.addr.wrapping_add((i as u64).wrapping_mul(params.stride));
        let pa = et_mmu::translate_address(translation, ctx, dst, 64, mem, agent)?;
        let line = scratchpad.line(params.src_index as usize + i);
        match mem.write(agent, AccessType::TxStore, pa, line) {
            Ok(()) => outcomes.push(RowOutcome::Stored),
            Err(_) => outcomes.push(RowOutcome::BusErrorSkipped),
        }
    }
    Ok(outcomes)
}

/// Stores from vector registers: `cols` columns of 16 bytes each per row.
pub fn execute_from_registers(
    params: &StoreParams,
    cols: u8,
    rows_data: &[Vec<[u8; 16]>],
    translation: &TranslationState,
    ctx: &TranslationContext,
    mem: &mut MemoryBus,
    agent: Agent,
) -> Result<Vec<RowOutcome>, Trap> {
    let rows = params.rows.max(1) as usize;
    let mut outcomes = Vec::with_capacity(rows);
    for i in 0..rows {
        let dst = params.addr.wrapping_add((i as u64).wrapping_mul(params.stride));
        let size = cols as u64 * 16;
        let pa = et_mmu::translate_address(translation, ctx, dst, size, mem, agent)?;
        let mut buf = Vec::with_capacity(cols as usize * 16);
        for col in rows_data[i].iter().take(cols as usize) {
            buf.extend_from_slice(col);
        }
        match mem.write(agent, AccessType::TxStore, pa, &buf) {
            Ok(()) => outcomes.push(RowOutcome::Stored),
            Err(_) => outcomes.push(RowOutcome::BusErrorSkipped),
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_illegal_column_count() {
        let params = StoreParams {
            source: StoreSource::VectorRegisters { cols: 3 },
            coop: false,
            src_index: 0,
            rows: 1,
            addr: 0,
            stride: 64,
        };
        assert_eq!(validate(&params, false), Err(TensorError::STORE_ILLEGAL));
    }

    #[test]
    fn validate_rejects_coop_without_shire_support() {
        let params = StoreParams {
            source: StoreSource::Scratchpad,
            coop: true,
            src_index: 0,
            rows: 1,
            addr: 0,
            stride: 64,
        };
        assert_eq!(validate(&params, false), Err(TensorError::STORE_ILLEGAL));
    }

    #[test]
    fn stores_scratchpad_rows_to_memory() {
        let mut mem = MemoryBus::new(1024 * 1024);
        let agent = Agent::new(0, 0, et_types::Privilege::Machine);
        let mut scratchpad = ScratchpadLines::new();
        scratchpad.line_mut(0).copy_from_slice(&[5u8; 64]);
        let params = StoreParams {
            source: StoreSource::Scratchpad,
            coop: false,
            src_index: 0,
            rows: 1,
            addr: et_types::topology::DRAM_BASE,
            stride: 64,
        };
        let translation = TranslationState::bare();
        let ctx = TranslationContext {
            privilege: et_types::Privilege::Machine,
            access: AccessType::TxStore,
            mxr: false,
            sum: false,
        };
        let outcomes = execute_from_scratchpad(&params, &scratchpad, &translation, &ctx, &mut mem, agent).unwrap();
        assert_eq!(outcomes, vec![RowOutcome::Stored]);
        let mut readback = [0u8; 64];
        mem.read(agent, AccessType::Load, et_types::topology::DRAM_BASE, &mut readback).unwrap();
        assert_eq!(readback, [5u8; 64]);
    }
}
