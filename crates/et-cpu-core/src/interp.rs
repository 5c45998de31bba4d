//! The fetch/decode/execute/trap loop `et-platform`'s scheduler calls once
//! per hart per scheduling quantum. Pending-interrupt checks happen before
//! fetch so a taken interrupt never races a faulting fetch for the same
//! step.

use crate::core::Core;
use crate::exec::{self, Outcome};
use crate::hart::{Hart, HartOutcome};
use crate::observer::Observer;
use crate::trap;
use et_interrupts::{GlobalEnables, InterruptFlags, InterruptState};
use et_isa::csr::CsrId;
use et_mem::MemoryBus;
use et_types::{AccessType, DebugEntryCause, StepOutcome, Trap};

fn interrupt_state(hart: &Hart) -> InterruptState {
    InterruptState {
        mip: InterruptFlags::from_bits_truncate(hart.csrs.raw(CsrId::MIP) as u32),
        mie: InterruptFlags::from_bits_truncate(hart.csrs.raw(CsrId::MIE) as u32),
        mideleg: InterruptFlags::from_bits_truncate(hart.csrs.raw(CsrId::MIDELEG) as u32),
        ext_seip: false,
    }
}

fn global_enables(hart: &Hart) -> GlobalEnables {
    let mstatus = hart.csrs.raw(CsrId::MSTATUS);
    GlobalEnables {
        mie: mstatus & crate::csr::mstatus_bits::MIE != 0,
        sie: mstatus & crate::csr::mstatus_bits::SIE != 0,
    }
}

fn fetch(hart: &Hart, core: &Core, mem: &mut MemoryBus) -> Result<(u32, u32), Trap> {
    if hart.pc & 1 != 0 {
        return Err(Trap::InstructionAddressMisaligned { tval: hart.pc });
    }
    let agent = et_types::Agent::new(hart.id.shire, hart.id.thread, hart.privilege);
    let (state, ctx) = exec::translation_for(hart, core, AccessType::Fetch);

    let mut low = [0u8; 2];
    let pa0 = et_mmu::translate_address(&state, &ctx, hart.pc, 2, mem, agent)?;
    mem.read(agent, AccessType::Fetch, pa0, &mut low).map_err(|e| e.into_trap(AccessType::Fetch))?;
    let low16 = u16::from_le_bytes(low);
    let size = et_decode::insn_size(low16);

    if size == 2 {
        return Ok((low16 as u32, 2));
    }

    let mut high = [0u8; 2];
    let pa1 = et_mmu::translate_address(&state, &ctx, hart.pc + 2, 2, mem, agent)?;
    mem.read(agent, AccessType::Fetch, pa1, &mut high).map_err(|e| e.into_trap(AccessType::Fetch))?;
    let raw = (low16 as u32) | ((u16::from_le_bytes(high) as u32) << 16);
    Ok((raw, 4))
}

/// Checks the fetched instruction word against the `minstmask`/`minstmatch`
/// breakpoint pair. The trigger is armed only while `minstmask[63:32]` is
/// nonzero; when armed, any fetched word whose masked bits equal
/// `minstmatch`'s low 32 bits raises `McodeInstruction` before the
/// instruction executes.
fn mcode_match(hart: &Hart, bits: u32) -> Option<Trap> {
    let mask = hart.csrs.raw(CsrId::MINSTMASK);
    if mask >> 32 == 0 {
        return None;
    }
    let matchv = hart.csrs.raw(CsrId::MINSTMATCH);
    if (bits ^ matchv as u32) & (mask as u32) == 0 {
        Some(Trap::McodeInstruction { tval: bits as u64 })
    } else {
        None
    }
}

/// Runs one fetch/decode/execute cycle, delivering any trap it raises and
/// reporting whether the hart should keep running or park.
pub fn step(hart: &mut Hart, core: &mut Core, mem: &mut MemoryBus, observer: &mut dyn Observer) -> HartOutcome {
    if !hart.debug_mode {
        if let Some(cause) = interrupt_state(hart).pending(hart.privilege, global_enables(hart)) {
            trap::deliver_trap(hart, cause);
            return HartOutcome::Stepped(StepOutcome::Trap(cause));
        }
    }

    let (raw, size) = match fetch(hart, core, mem) {
        Ok(v) => v,
        Err(t) => {
            trap::deliver_trap(hart, t);
            return HartOutcome::Stepped(StepOutcome::Trap(t));
        }
    };

    let decoded = et_decode::decode(raw);
    hart.next_pc = hart.pc.wrapping_add(size as u64);

    if let Some(t) = mcode_match(hart, raw) {
        trap::deliver_trap(hart, t);
        return HartOutcome::Stepped(StepOutcome::Trap(t));
    }

    match exec::execute(hart, core, mem, &decoded, hart.next_pc, observer) {
        Ok(Outcome::Normal) => {
            hart.pc = hart.next_pc;
            hart.retired_instructions += 1;
            hart.cycles += 1;
            HartOutcome::Stepped(StepOutcome::Completed)
        }
        Ok(Outcome::Branch(target)) => {
            hart.pc = target;
            hart.retired_instructions += 1;
            hart.cycles += 1;
            HartOutcome::Stepped(StepOutcome::Completed)
        }
        Ok(Outcome::Ebreak) => {
            hart.retired_instructions += 1;
            hart.cycles += 1;
            HartOutcome::Stepped(StepOutcome::DebugEntry(DebugEntryCause::Ebreak))
        }
        Ok(Outcome::Wfi) => {
            hart.pc = hart.next_pc;
            hart.retired_instructions += 1;
            HartOutcome::Parked
        }
        Err(t) => {
            trap::deliver_trap(hart, t);
            HartOutcome::Stepped(StepOutcome::Trap(t))
        }
    }
}
