use crate::pte::{Pte, PteFlags};
use crate::{TranslationContext, TranslationState};
use et_types::{AccessType, Agent, Privilege, Trap};

const PAGE_SIZE: u64 = 4096;
const PTE_SIZE: u64 = 8;
const PTES_PER_PAGE: u64 = PAGE_SIZE / PTE_SIZE;

/// Which page-table format governs the current translation. `Sv39`/`Sv48`
/// are the standard S-mode schemes, walked from `satp`; `Mv39`/`Mv48` are
/// the Esperanto M-mode-only schemes walked from `matp`, giving
/// M-mode code its own translated address space without touching `satp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationMode {
    Bare,
    Sv39,
    Sv48,
    Mv39,
    Mv48,
}

impl TranslationMode {
    fn levels(self) -> u32 {
        match self {
            TranslationMode::Bare => 0,
            TranslationMode::Sv39 | TranslationMode::Mv39 => 3,
            TranslationMode::Sv48 | TranslationMode::Mv48 => 4,
        }
    }

    fn va_bits(self) -> u32 {
        match self {
            TranslationMode::Bare => 0,
            TranslationMode::Sv39 | TranslationMode::Mv39 => 39,
            TranslationMode::Sv48 | TranslationMode::Mv48 => 48,
        }
    }

    /// Whether a violation should be reported as an M-mode page fault
    /// distinct from the S-mode kind. The reference model doesn't define
    /// separate cause numbers for `Mv*`, so we fold this into the ordinary
    /// page fault causes exactly as if a `satp`-driven walk had failed.
    fn is_machine_mode_scheme(self) -> bool {
        matches!(self, TranslationMode::Mv39 | TranslationMode::Mv48)
    }
}

fn page_fault(access: AccessType, tval: u64) -> Trap {
    match access {
        AccessType::Fetch => Trap::InstructionPageFault { tval },
        AccessType::Store | AccessType::AmoLocal | AccessType::AmoGlobal | AccessType::TxStore => {
            Trap::StorePageFault { tval }
        }
        _ => Trap::LoadPageFault { tval },
    }
}

/// Checks that a sign-extended virtual address's upper bits are all copies
/// of bit `va_bits - 1`, per the standard Sv39/Sv48 canonical-address rule.
fn is_canonical(vaddr: u64, va_bits: u32) -> bool {
    let top = (vaddr as i64) >> (va_bits - 1);
    top == 0 || top == -1
}

fn read_pte(mem: &mut et_mem::MemoryBus, agent: Agent, pa: u64) -> Result<Pte, Trap> {
    let mut buf = [0u8; 8];
    mem.read(agent, AccessType::PageTableWalk, pa, &mut buf)
        .map_err(|e| e.into_trap(AccessType::PageTableWalk))?;
    Ok(Pte(u64::from_le_bytes(buf)))
}

fn check_permissions(
    flags: PteFlags,
    ctx: &TranslationContext,
) -> bool {
    let need_u = ctx.privilege == Privilege::User;
    if need_u != flags.contains(PteFlags::U) {
        // S-mode may touch a U page only when SUM is set and this isn't a fetch.
        if !(ctx.privilege == Privilege::Supervisor
            && flags.contains(PteFlags::U)
            && ctx.sum
            && ctx.access != AccessType::Fetch)
        {
            return false;
        }
    }
    match ctx.access {
        AccessType::Fetch => flags.contains(PteFlags::X),
        AccessType::Load | AccessType::TxLoad | AccessType::Prefetch | AccessType::CacheOp => {
            flags.contains(PteFlags::R) || (ctx.mxr && flags.contains(PteFlags::X))
        }
        AccessType::Store | AccessType::AmoLocal | AccessType::AmoGlobal | AccessType::TxStore => {
            flags.contains(PteFlags::W)
        }
        AccessType::PageTableWalk => true,
    }
}

/// Walks the active page table (if any) to translate `vaddr`, following the
/// standard Sv39/Sv48 algorithm: the Esperanto `Mv39`/`Mv48` modes reuse it
/// verbatim against `matp`'s root rather than `satp`'s, since machine mode
/// translation has no reason to diverge in mechanics, only in which root
/// it's rooted at and who's allowed to enable it.
pub fn translate(
    state: &TranslationState,
    ctx: &TranslationContext,
    vaddr: u64,
    mem: &mut et_mem::MemoryBus,
    agent: Agent,
) -> Result<u64, Trap> {
    if state.mode == TranslationMode::Bare {
        return Ok(vaddr & et_types::PA_MASK);
    }

    let va_bits = state.mode.va_bits();
    if !is_canonical(vaddr, va_bits) {
        return Err(page_fault(ctx.access, vaddr));
    }

    let levels = state.mode.levels();
    let mut ppn = state.root_ppn;
    let mut level = levels - 1;
    let mut pte;
    let mut pte_addr;

    loop {
        let vpn = (vaddr >> (12 + 9 * level)) & 0x1ff;
        pte_addr = (ppn * PAGE_SIZE) + vpn * PTE_SIZE;
        pte = read_pte(mem, agent, pte_addr)?;
        let flags = pte.flags();

        if !flags.contains(PteFlags::V) || (!flags.contains(PteFlags::R) && flags.contains(PteFlags::W)) {
            return Err(page_fault(ctx.access, vaddr));
        }

        if flags.is_leaf() {
            break;
        }

        if level == 0 {
            return Err(page_fault(ctx.access, vaddr));
        }
        ppn = pte.ppn();
        level -= 1;
    }

    let flags = pte.flags();
    if !check_permissions(flags, ctx) {
        return Err(page_fault(ctx.access, vaddr));
    }

    // Misaligned superpage: any skipped level's PPN bits must be zero.
    for skipped in 0..level {
        if pte.ppn_level(skipped) != 0 {
            return Err(page_fault(ctx.access, vaddr));
        }
    }

    // Accessed/dirty are software-managed: hardware never sets them itself,
    // it faults and leaves the trap handler to update the PTE and resume.
    if !flags.contains(PteFlags::A) || (ctx.access.is_write() && !flags.contains(PteFlags::D)) {
        return Err(page_fault(ctx.access, vaddr));
    }

    let page_offset = vaddr & (PAGE_SIZE - 1);
    let mut pa_ppn = pte.ppn();
    for skipped in 0..level {
        let mask = 0x1ffu64 << (9 * skipped);
        pa_ppn = (pa_ppn & !mask) | (((vaddr >> (12 + 9 * skipped)) & 0x1ff) << (9 * skipped));
    }
    let pa = (pa_ppn * PAGE_SIZE) + page_offset;
    let _ = state.mode.is_machine_mode_scheme();
    let _ = PTES_PER_PAGE;
    Ok(pa & et_types::PA_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pte::PteFlags;
    use et_types::{AccessType, Privilege};

    fn agent() -> Agent {
        Agent::new(0, 0, Privilege::Supervisor)
    }

    fn ctx(access: AccessType) -> TranslationContext {
        TranslationContext {
            privilege: Privilege::Supervisor,
            access,
            mxr: false,
            sum: false,
        }
    }

    #[test]
    fn bare_mode_is_identity() {
        let state = TranslationState::bare();
        let mut mem = et_mem::MemoryBus::new(1024 * 1024);
        let pa = translate(&state, &ctx(AccessType::Load), 0x1234, &mut mem, agent()).unwrap();
        assert_eq!(pa, 0x1234);
    }

    #[test]
    fn sv39_single_level_leaf_translates() {
        let mut mem = et_mem::MemoryBus::new(16 * 1024 * 1024);
        let root_pa = et_types::topology::DRAM_BASE;
        let root_ppn = root_pa / PAGE_SIZE;

        // Two-level walk: root -> leaf PTE mapping VPN[1]=0 at level 1 to a
        // megapage so a single leaf covers the test address.
        let vaddr = 0x2000u64;
        let vpn1 = (vaddr >> 21) & 0x1ff;
        let leaf_ppn = 0x10; // arbitrary 2 MiB-aligned PPN
        let leaf_pte = Pte(((leaf_ppn) << 10) | (PteFlags::V | PteFlags::R | PteFlags::W | PteFlags::A | PteFlags::D).bits() as u64);
        let pte_addr = root_pa + vpn1 * PTE_SIZE;
        mem.write(agent(), AccessType::Store, pte_addr, &leaf_pte.0.to_le_bytes()).unwrap();

        let state = TranslationState {
            mode: TranslationMode::Sv39,
            root_ppn,
            asid: 0,
        };
        let pa = translate(&state, &ctx(AccessType::Load), vaddr, &mut mem, agent()).unwrap();
        let expected = leaf_ppn * PAGE_SIZE + (vaddr & (PAGE_SIZE - 1));
        assert_eq!(pa, expected);
    }

    #[test]
    fn accessed_bit_clear_faults_instead_of_being_set_by_hardware() {
        let mut mem = et_mem::MemoryBus::new(16 * 1024 * 1024);
        let root_pa = et_types::topology::DRAM_BASE;
        let root_ppn = root_pa / PAGE_SIZE;
        let vaddr = 0x2000u64;
        let vpn1 = (vaddr >> 21) & 0x1ff;
        let leaf_ppn = 0x10;
        // Leaf is valid and readable but A is clear: software-managed A/D
        // means this must fault, not get silently set by the walker.
        let leaf_pte = Pte((leaf_ppn << 10) | (PteFlags::V | PteFlags::R).bits() as u64);
        let pte_addr = root_pa + vpn1 * PTE_SIZE;
        mem.write(agent(), AccessType::Store, pte_addr, &leaf_pte.0.to_le_bytes()).unwrap();

        let state = TranslationState {
            mode: TranslationMode::Sv39,
            root_ppn,
            asid: 0,
        };
        let err = translate(&state, &ctx(AccessType::Load), vaddr, &mut mem, agent()).unwrap_err();
        assert!(matches!(err, Trap::LoadPageFault { .. }));

        // And the PTE itself must be left untouched, not hardware-updated.
        let mut buf = [0u8; 8];
        mem.read(agent(), AccessType::Load, pte_addr, &mut buf).unwrap();
        assert_eq!(Pte(u64::from_le_bytes(buf)), leaf_pte);
    }

    #[test]
    fn dirty_bit_clear_on_store_faults() {
        let mut mem = et_mem::MemoryBus::new(16 * 1024 * 1024);
        let root_pa = et_types::topology::DRAM_BASE;
        let root_ppn = root_pa / PAGE_SIZE;
        let vaddr = 0x2000u64;
        let vpn1 = (vaddr >> 21) & 0x1ff;
        let leaf_ppn = 0x10;
        // Accessed but not dirty: a load is fine, a store must fault.
        let leaf_pte = Pte((leaf_ppn << 10) | (PteFlags::V | PteFlags::R | PteFlags::W | PteFlags::A).bits() as u64);
        let pte_addr = root_pa + vpn1 * PTE_SIZE;
        mem.write(agent(), AccessType::Store, pte_addr, &leaf_pte.0.to_le_bytes()).unwrap();

        let state = TranslationState {
            mode: TranslationMode::Sv39,
            root_ppn,
            asid: 0,
        };
        translate(&state, &ctx(AccessType::Load), vaddr, &mut mem, agent()).unwrap();
        let err = translate(&state, &ctx(AccessType::Store), vaddr, &mut mem, agent()).unwrap_err();
        assert!(matches!(err, Trap::StorePageFault { .. }));
    }

    #[test]
    fn invalid_pte_faults() {
        let mut mem = et_mem::MemoryBus::new(1024 * 1024);
        let state = TranslationState {
            mode: TranslationMode::Sv39,
            root_ppn: et_types::topology::DRAM_BASE / PAGE_SIZE,
            asid: 0,
        };
        let err = translate(&state, &ctx(AccessType::Load), 0x4000, &mut mem, agent()).unwrap_err();
        assert!(matches!(err, Trap::LoadPageFault { .. }));
    }
}
