//! Virtual-to-physical address translation: `Bare`, standard `Sv39`/`Sv48`,
//! and the Esperanto machine-mode `Mv39`/`Mv48` variants that walk from
//! `matp` instead of `satp` so M-mode code can run translated without
//! disturbing the S-mode page tables. The page-table entry
//! layout, permission checks, and accessed/dirty handling follow the
//! standard RISC-V privileged spec; `translate_address` takes the access
//! size in bytes so an unaligned access that straddles a page boundary
//! raises the distinct load/store split-page-fault cause instead of an
//! ordinary page fault, since hardware can't service two different
//! translations for one bus beat.

mod pte;
mod walk;

pub use pte::{Pte, PteFlags};
pub use walk::{translate, TranslationMode};

use et_types::{AccessType, Privilege, Trap};

/// `satp`/`matp`-equivalent state driving a translation: the active mode,
/// the root page table's physical page number, and the ASID (currently
/// unused for cache invalidation since this model re-walks on every
/// access, but kept so `sfence.vma` call sites have somewhere to pass it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationState {
    pub mode: TranslationMode,
    pub root_ppn: u64,
    pub asid: u16,
}

impl TranslationState {
    pub const fn bare() -> Self {
        TranslationState {
            mode: TranslationMode::Bare,
            root_ppn: 0,
            asid: 0,
        }
    }

    /// Decodes the mode field the same way `satp`/`matp`'s top 4 bits do:
    /// `0` is Bare, `8` is Sv39, `9` is Sv48. The Esperanto `Mv*` modes
    /// reuse `10`/`11` in the machine-mode-only `matp` register, since that
    /// CSR has no S-mode-visible encoding to stay compatible with.
    pub fn mode_from_bits(bits: u8) -> Option<TranslationMode> {
        match bits {
            0 => Some(TranslationMode::Bare),
            8 => Some(TranslationMode::Sv39),
            9 => Some(TranslationMode::Sv48),
            10 => Some(TranslationMode::Mv39),
            11 => Some(TranslationMode::Mv48),
            _ => None,
        }
    }
}

/// Inputs the page walker needs beyond the virtual address itself: which
/// privilege is making the access (for U-bit / SUM-style checks), whether
/// this is a fetch/load/store (for X/R/W bit checks), and the `mstatus`
/// bits that modify translation (`MXR`, `SUM`).
#[derive(Debug, Clone, Copy)]
pub struct TranslationContext {
    pub privilege: Privilege,
    pub access: AccessType,
    pub mxr: bool,
    pub sum: bool,
}

const PAGE_SIZE: u64 = 4096;

fn split_page_fault(access: AccessType, tval: u64) -> Trap {
    if access.is_write() {
        Trap::StoreSplitPageFault { tval }
    } else {
        Trap::LoadSplitPageFault { tval }
    }
}

/// Translates `vaddr` for an access of `size` bytes. `size` is taken in
/// bytes (0 counts as a single-byte/no-crossing access, which every caller
/// that doesn't care about crossing can just pass) so a load/store whose
/// byte range spans two pages is caught here and reported distinctly from
/// an ordinary page fault, before either page is even walked.
pub fn translate_address(
    state: &TranslationState,
    ctx: &TranslationContext,
    vaddr: u64,
    size: u64,
    mem: &mut et_mem::MemoryBus,
    agent: et_types::Agent,
) -> Result<u64, Trap> {
    if state.mode != TranslationMode::Bare && size > 1 {
        let page_offset = vaddr & (PAGE_SIZE - 1);
        if page_offset + size > PAGE_SIZE {
            return Err(split_page_fault(ctx.access, vaddr));
        }
    }
    walk::translate(state, ctx, vaddr, mem, agent)
}
