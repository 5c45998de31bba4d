//! `TensorLoad`: transform-dispatching DMA from main memory into the L1
//! scratchpad (or the paired "TenB" extension), gated per-row by the
//! tensor mask and cooperative across harts sharing a load id.

use crate::error::TensorError;
use crate::scratchpad::ScratchpadLines;
use et_mem::MemoryBus;
use et_mmu::{TranslationContext, TranslationState};
use et_types::{AccessType, Agent, Trap};

pub const NUM_LOAD_IDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    NoTrans,
    Interleave8,
    Interleave16,
    Transpose1,
    Transpose2,
    Transpose4,
}

impl Transform {
    /// `trans` field decode; `3`/`4` are reserved and `5..=7` select
    /// transpose element width 1/2/4 respectively.
    pub fn decode(trans: u8) -> Option<Self> {
        match trans {
            0 => Some(Transform::NoTrans),
            1 => Some(Transform::Interleave8),
            2 => Some(Transform::Interleave16),
            5 => Some(Transform::Transpose1),
            6 => Some(Transform::Transpose2),
            7 => Some(Transform::Transpose4),
            _ => None,
        }
    }

    fn element_size(self) -> Option<usize> {
        match self {
            Transform::Transpose1 => Some(1),
            Transform::Transpose2 => Some(2),
            Transform::Transpose4 => Some(4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoadParams {
    pub tm: bool,
    pub use_coop: bool,
    pub trans: u8,
    pub dst: u8,
    pub tenb: bool,
    pub addr: u64,
    pub boffset: u32,
    pub rows: u8,
    pub stride: u64,
    pub id: u8,
    pub tensor_mask: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Off,
    L1d,
    L1dL2,
}

/// Validates the parsed parameters before a load executes, per spec
/// §4.6.1: cache mode must allow L1 scratchpad fills, the transform
/// selector must resolve, and cooperative loads require shire cooperative
/// mode.
pub fn validate(params: &LoadParams, cache_mode: CacheMode, shire_cooperative: bool) -> Result<Transform, TensorError> {
    if cache_mode != CacheMode::L1dL2 {
        return Err(TensorError::CACHE_MODE);
    }
    let transform = Transform::decode(params.trans).ok_or(TensorError::BAD_TRANSFORM)?;
    if let Some(size) = transform.element_size() {
        if !matches!(size, 1 | 2 | 4) {
            return Err(TensorError::BAD_TRANSFORM);
        }
    }
    if params.use_coop && !shire_cooperative {
        return Err(TensorError::BAD_TRANSFORM);
    }
    Ok(transform)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Loaded,
    MaskedOff,
    BusErrorSkipped,
}

/// Executes a validated load against `mem`, writing enabled rows into
/// `dest` (the L1 scratchpad or TenB extension, per `params.tenb`).
/// Returns `Err` on an MMU fault (the whole operation aborts per spec);
/// a bus error on an individual row is recorded in the returned per-row
/// outcomes and the operation continues with the next row.
pub fn execute(
    params: &LoadParams,
    transform: Transform,
    translation: &TranslationState,
    ctx: &TranslationContext,
    mem: &mut MemoryBus,
    agent: Agent,
    dest: &mut ScratchpadLines,
) -> Result<Vec<RowOutcome>, Trap> {
    let rows = params.rows.max(1) as usize;
    let mut outcomes = Vec::with_capacity(rows);

    for i in 0..rows {
        if params.tm && params.tensor_mask & (1 << (i % 8)) == 0 {
            outcomes.push(RowOutcome::MaskedOff);
            continue;
        }
        let row = load_one_row(params, transform, i, translation, ctx, mem, agent)?;
        match row {
            Some(bytes) => {
                dest.line_mut(params.dst as usize + i).copy_from_slice(&bytes);
                outcomes.push(RowOutcome::Loaded);
            }
            None => outcomes.push(RowOutcome::BusErrorSkipped),
        }
    }
    Ok(outcomes)
}

fn read_phys(
    addr: u64,
    len: usize,
    translation: &TranslationState,
    ctx: &TranslationContext,
    mem: &mut MemoryBus,
    agent: Agent,
) -> Result<Option<Vec<u8>>, Trap> {
    let pa = et_mmu::translate_address(translation, ctx, addr, len as u64, mem, agent)?;
    let mut buf = vec![0u8; len];
    match mem.read(agent, AccessType::TxLoad, pa, &mut buf) {
        Ok(()) => Ok(Some(buf)),
        Err(_) => Ok(None),
    }
}

fn load_one_row(
    params: &LoadParams,
    transform: Transform,
    i: usize,
    translation: &TranslationState,
    ctx: &TranslationContext,
    mem: &mut MemoryBus,
    agent: Agent,
) -> Result<Option<[u8; 64]>, Trap> {
    let mut out = [0u8; 64];
    match transform {
        Transform::NoTrans => {
            let addr = params.addr.wrapping_add((i as u64).wrapping_mul(params.stride));
            match read_phys(addr, 64, translation, ctx, mem, agent)? {
                Some(bytes) => out.copy_from_slice(&bytes),
                None => return Ok(None),
            }
        }
        Transform::Interleave8 => {
            let mut chunks = [[0u8; 16]; 4];
            for r in 0..4 {
                let addr = params.addr.wrapping_add(params.boffset as u64)
                    .wrapping_add((r as u64) * 16)
                    .wrapping_add(((4 * i + r) as u64).wrapping_mul(params.stride));
                match read_phys(addr, 16, translation, ctx, mem, agent)? {
                    Some(bytes) => chunks[r].copy_from_slice(&bytes),
                    None => return Ok(None),
                }
            }
            for c in 0..16 {
                for r in 0..4 {
                    out[c * 4 + r] = chunks[r][c];
                }
            }
        }
        Transform::Interleave16 => {
            let mut chunks = [[0u8; 32]; 2];
            for r in 0..2 {
                let addr = params.addr.wrapping_add(params.boffset as u64)
                    .wrapping_add((r as u64) * 32)
                    .wrapping_add(((2 * i + r) as u64).wrapping_mul(params.stride));
                match read_phys(addr, 32, translation, ctx, mem, agent)? {
                    Some(bytes) => chunks[r].copy_from_slice(&bytes),
                    None => return Ok(None),
                }
            }
            for c in 0..16 {
                for r in 0..2 {
                    out[(c * 2 + r) * 2..(c * 2 + r) * 2 + 2].copy_from_slice(&chunks[r][c * 2..c * 2 + 2]);
                }
            }
        }
        Transform::Transpose1 | Transform::Transpose2 | Transform::Transpose4 => {
            let size = transform.element_size().unwrap();
            let elements = 64 / size;
            for e in 0..elements {
                let addr = params.addr
                    .wrapping_add((e as u64).wrapping_mul(params.stride));
                match read_phys(addr, 64, translation, ctx, mem, agent)? {
                    Some(bytes) => {
                        out[e * size..e * size + size].copy_from_slice(&bytes[i * size..i * size + size]);
                    }
                    None => return Ok(None),
                }
            }
        }
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use et_types::Privilege;

    fn agent() -> Agent {
        Agent::new(0, 0, Privilege::Machine)
    }

    fn ctx() -> TranslationContext {
        TranslationContext {
            privilege: Privilege::Machine,
            access: AccessType::TxLoad,
            mxr: false,
            sum: false,
        }
    }

    fn params() -> LoadParams {
        LoadParams {
            tm: false,
            use_coop: false,
            trans: 0,
            dst: 0,
            tenb: false,
            addr: et_types::topology::DRAM_BASE,
            boffset: 0,
            rows: 2,
            stride: 64,
            id: 0,
            tensor_mask: 0xff,
        }
    }

    #[test]
    fn validate_rejects_non_l1d_l2_cache_mode() {
        let err = validate(&params(), CacheMode::Off, false).unwrap_err();
        assert_eq!(err, TensorError::CACHE_MODE);
    }

    #[test]
    fn no_trans_loads_rows_from_memory() {
        let mut mem = MemoryBus::new(1024 * 1024);
        let base = et_types::topology::DRAM_BASE;
        mem.write(agent(), AccessType::Store, base, &[7u8; 64]).unwrap();
        mem.write(agent(), AccessType::Store, base + 64, &[9u8; 64]).unwrap();

        let p = params();
        let transform = validate(&p, CacheMode::L1dL2, false).unwrap();
        let translation = TranslationState::bare();
        let mut dest = ScratchpadLines::new();
        let outcomes = execute(&p, transform, &translation, &ctx(), &mut mem, agent(), &mut dest).unwrap();

        assert_eq!(outcomes, vec![RowOutcome::Loaded, RowOutcome::Loaded]);
        assert_eq!(dest.line(0), &[7u8; 64]);
        assert_eq!(dest.line(1), &[9u8; 64]);
    }

    #[test]
    fn masked_rows_are_skipped() {
        let mut mem = MemoryBus::new(1024 * 1024);
        let mut p = params();
        p.tm = true;
        p.tensor_mask = 0b01;
        let transform = validate(&p, CacheMode::L1dL2, false).unwrap();
        let translation = TranslationState::bare();
        let mut dest = ScratchpadLines::new();
        let outcomes = execute(&p, transform, &translation, &ctx(), &mut mem, agent(), &mut dest).unwrap();
        assert_eq!(outcomes, vec![RowOutcome::Loaded, RowOutcome::MaskedOff]);
    }
}
