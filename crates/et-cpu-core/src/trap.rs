//! Trap delivery, delegation, and the `mret`/`sret` privilege-restore
//! sequences. `wfi` itself is not handled here: it has no CSR side effects
//! beyond stalling, so the interpreter just reports [`crate::hart::HartOutcome::Parked`]
//! and lets the scheduler decide when to resume.

use crate::csr::mstatus_bits;
use crate::hart::Hart;
use et_isa::csr::CsrId;
use et_types::{Privilege, Trap};

/// Computes the target PC for a trap vector: direct mode always enters at
/// `base`; vectored mode (`tvec[1:0] == 1`) offsets by `4 * cause` for
/// interrupts only, per the standard RISC-V `mtvec`/`stvec` encoding.
fn vectored_pc(tvec: u64, cause: u64, is_interrupt: bool) -> u64 {
    let base = tvec & !0x3;
    if tvec & 0x3 == 1 && is_interrupt {
        base + 4 * cause
    } else {
        base
    }
}

/// Delivers `trap`, picking the S-mode or M-mode handler per `medeleg`/
/// `mideleg` and updating `mstatus`/`sstatus`'s stacked enable/previous-mode
/// bits. Traps taken while already in M-mode are never delegated, matching
/// the standard RISC-V rule that M-mode is the trap floor.
pub fn deliver_trap(hart: &mut Hart, trap: Trap) {
    let cause = trap.cause_number();
    let is_interrupt = trap.is_interrupt();
    let deleg_reg = if is_interrupt { CsrId::MIDELEG } else { CsrId::MEDELEG };
    let delegated = hart.privilege != Privilege::Machine && (hart.csrs.raw(deleg_reg) >> cause) & 1 != 0;

    if delegated {
        hart.csrs.set_raw(CsrId::SEPC, hart.pc);
        hart.csrs.set_raw(CsrId::SCAUSE, trap.mcause());
        hart.csrs.set_raw(CsrId::STVAL, trap.tval());

        let mut mstatus = hart.csrs.raw(CsrId::MSTATUS);
        let sie = mstatus & mstatus_bits::SIE != 0;
        mstatus = if hart.privilege == Privilege::Supervisor {
            mstatus | mstatus_bits::SPP
        } else {
            mstatus & !mstatus_bits::SPP
        };
        mstatus = if sie { mstatus | mstatus_bits::SPIE } else { mstatus & !mstatus_bits::SPIE };
        mstatus &= !mstatus_bits::SIE;
        hart.csrs.set_raw(CsrId::MSTATUS, mstatus);

        hart.privilege = Privilege::Supervisor;
        hart.pc = vectored_pc(hart.csrs.raw(CsrId::STVEC), cause, is_interrupt);
    } else {
        hart.csrs.set_raw(CsrId::MEPC, hart.pc);
        hart.csrs.set_raw(CsrId::MCAUSE, trap.mcause());
        hart.csrs.set_raw(CsrId::MTVAL, trap.tval());

        let mut mstatus = hart.csrs.raw(CsrId::MSTATUS);
        let mie = mstatus & mstatus_bits::MIE != 0;
        mstatus &= !mstatus_bits::MPP_MASK;
        mstatus |= (hart.privilege.bits() as u64) << mstatus_bits::MPP_SHIFT;
        mstatus = if mie { mstatus | mstatus_bits::MPIE } else { mstatus & !mstatus_bits::MPIE };
        mstatus &= !mstatus_bits::MIE;
        hart.csrs.set_raw(CsrId::MSTATUS, mstatus);

        hart.privilege = Privilege::Machine;
        hart.pc = vectored_pc(hart.csrs.raw(CsrId::MTVEC), cause, is_interrupt);
    }
}

/// `mret`: restores privilege from `mstatus.MPP`, restores `mstatus.MIE`
/// from `MPIE`, sets `MPIE` and resets `MPP` to the least-privileged mode,
/// then jumps to `mepc`.
pub fn mret(hart: &mut Hart) {
    let mut mstatus = hart.csrs.raw(CsrId::MSTATUS);
    let mpp = (mstatus & mstatus_bits::MPP_MASK) >> mstatus_bits::MPP_SHIFT;
    let mpie = mstatus & mstatus_bits::MPIE != 0;

    mstatus = if mpie { mstatus | mstatus_bits::MIE } else { mstatus & !mstatus_bits::MIE };
    mstatus |= mstatus_bits::MPIE;
    mstatus &= !mstatus_bits::MPP_MASK;
    hart.csrs.set_raw(CsrId::MSTATUS, mstatus);

    hart.privilege = Privilege::from_bits(mpp as u8);
    hart.pc = hart.csrs.raw(CsrId::MEPC);
}

/// `sret`: the same restore sequence as `mret` over `sstatus`'s `SPP`/`SPIE`.
pub fn sret(hart: &mut Hart) {
    let mut mstatus = hart.csrs.raw(CsrId::MSTATUS);
    let spp = mstatus & mstatus_bits::SPP != 0;
    let spie = mstatus & mstatus_bits::SPIE != 0;

    mstatus = if spie { mstatus | mstatus_bits::SIE } else { mstatus & !mstatus_bits::SIE };
    mstatus |= mstatus_bits::SPIE;
    mstatus &= !mstatus_bits::SPP;
    hart.csrs.set_raw(CsrId::MSTATUS, mstatus);

    hart.privilege = if spp { Privilege::Supervisor } else { Privilege::User };
    hart.pc = hart.csrs.raw(CsrId::SEPC);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hart::HartId;

    fn hart() -> Hart {
        Hart::new(HartId { shire: 0, thread: 0 })
    }

    #[test]
    fn undelegated_trap_enters_machine_mode() {
        let mut h = hart();
        h.privilege = Privilege::User;
        h.pc = 0x1000;
        deliver_trap(&mut h, Trap::IllegalInstruction { tval: 0xdead });
        assert_eq!(h.privilege, Privilege::Machine);
        assert_eq!(h.csrs.raw(CsrId::MEPC), 0x1000);
        assert_eq!(h.csrs.raw(CsrId::MCAUSE), 2);
        assert_eq!(h.csrs.raw(CsrId::MTVAL), 0xdead);
    }

    #[test]
    fn delegated_trap_enters_supervisor_mode() {
        let mut h = hart();
        h.privilege = Privilege::User;
        h.pc = 0x2000;
        h.csrs.set_raw(CsrId::MEDELEG, 1 << Trap::IllegalInstruction { tval: 0 }.cause_number());
        deliver_trap(&mut h, Trap::IllegalInstruction { tval: 0 });
        assert_eq!(h.privilege, Privilege::Supervisor);
        assert_eq!(h.csrs.raw(CsrId::SEPC), 0x2000);
    }

    #[test]
    fn mret_restores_previous_privilege_and_pc() {
        let mut h = hart();
        h.csrs.set_raw(CsrId::MEPC, 0x3000);
        h.csrs.set_raw(CsrId::MSTATUS, (Privilege::User.bits() as u64) << mstatus_bits::MPP_SHIFT);
        mret(&mut h);
        assert_eq!(h.privilege, Privilege::User);
        assert_eq!(h.pc, 0x3000);
    }

    #[test]
    fn sret_restores_previous_privilege_and_pc() {
        let mut h = hart();
        h.csrs.set_raw(CsrId::SEPC, 0x4000);
        h.csrs.set_raw(CsrId::MSTATUS, mstatus_bits::SPP);
        sret(&mut h);
        assert_eq!(h.privilege, Privilege::Supervisor);
        assert_eq!(h.pc, 0x4000);
    }
}
