//! Interrupt pending/enable combination and priority selection: `xip =
//! (mip | ext_seip) & mie`, split into the non-delegated (`mip`) and
//! delegated (`sip`) views by `mideleg`, then picked by the fixed priority
//! order (machine external first, bus-error last).

use bitflags::bitflags;
use et_types::{Privilege, Trap};

bitflags! {
    /// Pending/enable bits, indexed the same way `mcause`'s low bits are
    /// for every interrupt cause (`Trap::cause_number` on an interrupt
    /// variant), so a `Trap` round-trips losslessly through this bitset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InterruptFlags: u32 {
        const USIP = 1 << 0;
        const SSIP = 1 << 1;
        const MSIP = 1 << 3;
        const UTIP = 1 << 4;
        const STIP = 1 << 5;
        const MTIP = 1 << 7;
        const UEIP = 1 << 8;
        const SEIP = 1 << 9;
        const MEIP = 1 << 11;
        const BAD_IPI_REDIRECT = 1 << 16;
        const ICACHE_ECC_OVERFLOW = 1 << 19;
        const BUS_ERROR = 1 << 23;
    }
}

impl InterruptFlags {
    pub fn to_trap(self) -> Option<Trap> {
        // Highest priority first.
        const ORDER: &[(InterruptFlags, fn() -> Trap)] = &[
            (InterruptFlags::MEIP, || Trap::MachineExternalInterrupt),
            (InterruptFlags::MSIP, || Trap::MachineSoftwareInterrupt),
            (InterruptFlags::MTIP, || Trap::MachineTimerInterrupt),
            (InterruptFlags::SEIP, || Trap::SupervisorExternalInterrupt),
            (InterruptFlags::SSIP, || Trap::SupervisorSoftwareInterrupt),
            (InterruptFlags::STIP, || Trap::SupervisorTimerInterrupt),
            (InterruptFlags::BAD_IPI_REDIRECT, || Trap::BadIpiRedirectInterrupt),
            (InterruptFlags::ICACHE_ECC_OVERFLOW, || Trap::IcacheEccCounterOverflowInterrupt),
            (InterruptFlags::BUS_ERROR, || Trap::BusErrorInterrupt),
        ];
        ORDER.iter().find(|(bit, _)| self.contains(*bit)).map(|(_, f)| f())
    }
}

/// `mstatus`'s global interrupt-enable bits, the ones interrupt delivery
/// actually consults (the rest of `mstatus` belongs to `et-cpu-core`).
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalEnables {
    pub mie: bool,
    pub sie: bool,
}

/// The interrupt-pending/enable CSR state: `mip`, `mie`, `mideleg`, and the
/// externally-driven `ext_seip` pin (set by the PLIC-equivalent, separate
/// from `mip.SEIP` so a write to `mip` can't mask a live external line).
#[derive(Debug, Clone, Copy, Default)]
pub struct InterruptState {
    pub mip: InterruptFlags,
    pub mie: InterruptFlags,
    pub mideleg: InterruptFlags,
    pub ext_seip: bool,
}

impl InterruptState {
    /// `xip = (mip | ext_seip) & mie`.
    pub fn xip(&self) -> InterruptFlags {
        let mip = if self.ext_seip { self.mip | InterruptFlags::SEIP } else { self.mip };
        mip & self.mie
    }

    /// `mip`'s non-delegated view: bits `xip` carries that `mideleg` does
    /// not claim for S-mode.
    pub fn mip_view(&self) -> InterruptFlags {
        self.xip() & !self.mideleg
    }

    /// `sip`'s view: bits `xip` carries that `mideleg` delegates.
    pub fn sip_view(&self) -> InterruptFlags {
        self.xip() & self.mideleg
    }

    /// Selects the single highest-priority interrupt that is both pending
    /// and actually eligible to fire at `privilege` given the global
    /// enable bits, or `None` if nothing should be taken right now.
    ///
    /// An interrupt delegated to S-mode (`mideleg` bit set) can only
    /// preempt M-mode code, never U-mode/S-mode code unless `sstatus.SIE`
    /// is set (or the current privilege is below S). A non-delegated
    /// interrupt can only preempt when running below M-mode, or at M-mode
    /// with `mstatus.MIE` set.
    pub fn pending(&self, privilege: Privilege, enables: GlobalEnables) -> Option<Trap> {
        let delegated = self.sip_view();
        let not_delegated = self.mip_view();

        let m_eligible = match privilege {
            Privilege::Machine => enables.mie,
            _ => true,
        };
        let s_eligible = match privilege {
            Privilege::Machine => false,
            Privilege::Supervisor => enables.sie,
            Privilege::User => true,
        };

        let mut candidates = InterruptFlags::empty();
        if m_eligible {
            candidates |= not_delegated;
        }
        if s_eligible {
            candidates |= delegated;
        }
        candidates.to_trap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_picks_machine_external_first() {
        let flags = InterruptFlags::MEIP | InterruptFlags::MTIP | InterruptFlags::BUS_ERROR;
        assert_eq!(flags.to_trap(), Some(Trap::MachineExternalInterrupt));
    }

    #[test]
    fn xip_combines_ext_seip_and_masks_by_mie() {
        let state = InterruptState {
            mip: InterruptFlags::empty(),
            mie: InterruptFlags::SEIP,
            mideleg: InterruptFlags::empty(),
            ext_seip: true,
        };
        assert_eq!(state.xip(), InterruptFlags::SEIP);
    }

    #[test]
    fn delegated_interrupt_does_not_preempt_machine_mode() {
        let state = InterruptState {
            mip: InterruptFlags::STIP,
            mie: InterruptFlags::STIP,
            mideleg: InterruptFlags::STIP,
            ext_seip: false,
        };
        let enables = GlobalEnables { mie: true, sie: true };
        assert_eq!(state.pending(Privilege::Machine, enables), None);
    }

    #[test]
    fn non_delegated_interrupt_preempts_user_mode_regardless_of_enables() {
        let state = InterruptState {
            mip: InterruptFlags::MTIP,
            mie: InterruptFlags::MTIP,
            mideleg: InterruptFlags::empty(),
            ext_seip: false,
        };
        let enables = GlobalEnables { mie: false, sie: false };
        assert_eq!(state.pending(Privilege::User, enables), Some(Trap::MachineTimerInterrupt));
    }

    #[test]
    fn delegated_interrupt_preempts_supervisor_mode_when_sie_set() {
        let state = InterruptState {
            mip: InterruptFlags::SSIP,
            mie: InterruptFlags::SSIP,
            mideleg: InterruptFlags::SSIP,
            ext_seip: false,
        };
        let enables = GlobalEnables { mie: false, sie: true };
        assert_eq!(
            state.pending(Privilege::Supervisor, enables),
            Some(Trap::SupervisorSoftwareInterrupt)
        );
    }
}
