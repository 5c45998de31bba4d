//! Fundamental types shared across every ET-SoC emulator crate: privilege
//! levels, the requester identity carried on every bus transaction, the
//! synchronous/asynchronous trap hierarchy, and the fixed system topology
//! constants pulled from the reference implementation's `emu_defines.h`.

pub mod topology;

use thiserror::Error;

/// RISC-V privilege level, matching the 2-bit `prv_t` encoding used by the
/// reference model (`U=0, S=1, M=3`; `2` is reserved/unused).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Privilege {
    User = 0,
    Supervisor = 1,
    Machine = 3,
}

impl Privilege {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Privilege::User,
            1 => Privilege::Supervisor,
            3 => Privilege::Machine,
            // Reserved encoding 2 ("hypervisor" on real RISC-V) is not
            // implemented; the reference model never produces it, so we
            // treat it as Machine to fail closed rather than panic.
            _ => Privilege::Machine,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// The identity of the agent issuing a bus transaction, used for logging,
/// ESR privilege checks, and the checker hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agent {
    pub shire: u8,
    pub hart: u16,
    pub privilege: Privilege,
}

impl Agent {
    pub const fn new(shire: u8, hart: u16, privilege: Privilege) -> Self {
        Self {
            shire,
            hart,
            privilege,
        }
    }
}

/// The kind of access a bus transaction represents. Distinguished because
/// memory regions apply different alignment/permission rules per kind, and
/// the checker hooks want to discriminate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    Fetch,
    Load,
    Store,
    AmoLocal,
    AmoGlobal,
    TxLoad,
    TxStore,
    PageTableWalk,
    Prefetch,
    CacheOp,
}

impl AccessType {
    pub fn is_write(self) -> bool {
        matches!(
            self,
            AccessType::Store | AccessType::AmoLocal | AccessType::AmoGlobal | AccessType::TxStore
        )
    }
}

/// Translation / memory-mapped-register address space sizes, pinned from
/// `emu_defines.h`.
pub const PA_SIZE: u32 = 40;
pub const VA_SIZE: u32 = 48;
pub const PA_MASK: u64 = (1u64 << PA_SIZE) - 1;
pub const VA_MASK: u64 = (1u64 << VA_SIZE) - 1;

/// Synchronous CPU exceptions and asynchronous interrupts, carrying the
/// exact cause numbers defined by `traps.h` in the reference sources.
/// Interrupts set bit 63 of `mcause`/`scause`, modelled here as a separate
/// variant family rather than folding the bit into every cause number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Trap {
    #[error("instruction address misaligned (tval={tval:#x})")]
    InstructionAddressMisaligned { tval: u64 },
    #[error("instruction access fault (tval={tval:#x})")]
    InstructionAccessFault { tval: u64 },
    #[error("illegal instruction (tval={tval:#x})")]
    IllegalInstruction { tval: u64 },
    #[error("breakpoint (tval={tval:#x})")]
    Breakpoint { tval: u64 },
    #[error("load address misaligned (tval={tval:#x})")]
    LoadAddressMisaligned { tval: u64 },
    #[error("load access fault (tval={tval:#x})")]
    LoadAccessFault { tval: u64 },
    #[error("store/amo address misaligned (tval={tval:#x})")]
    StoreAddressMisaligned { tval: u64 },
    #[error("store/amo access fault (tval={tval:#x})")]
    StoreAccessFault { tval: u64 },
    #[error("environment call from U-mode")]
    UserEcall,
    #[error("environment call from S-mode")]
    SupervisorEcall,
    #[error("environment call from M-mode")]
    MachineEcall,
    #[error("instruction page fault (tval={tval:#x})")]
    InstructionPageFault { tval: u64 },
    #[error("load page fault (tval={tval:#x})")]
    LoadPageFault { tval: u64 },
    #[error("store/amo page fault (tval={tval:#x})")]
    StorePageFault { tval: u64 },
    #[error("instruction bus error")]
    InstructionBusError,
    #[error("instruction ECC error")]
    InstructionEccError,
    #[error("load split-page fault (tval={tval:#x})")]
    LoadSplitPageFault { tval: u64 },
    #[error("store/amo split-page fault (tval={tval:#x})")]
    StoreSplitPageFault { tval: u64 },
    #[error("custom mcode-gated instruction trap (tval={tval:#x})")]
    McodeInstruction { tval: u64 },

    // Interrupts (mcause bit 63 set on the real CSR; represented here as a
    // disjoint family so handlers can match exhaustively without masking).
    #[error("user software interrupt")]
    UserSoftwareInterrupt,
    #[error("supervisor software interrupt")]
    SupervisorSoftwareInterrupt,
    #[error("machine software interrupt")]
    MachineSoftwareInterrupt,
    #[error("user timer interrupt")]
    UserTimerInterrupt,
    #[error("supervisor timer interrupt")]
    SupervisorTimerInterrupt,
    #[error("machine timer interrupt")]
    MachineTimerInterrupt,
    #[error("user external interrupt")]
    UserExternalInterrupt,
    #[error("supervisor external interrupt")]
    SupervisorExternalInterrupt,
    #[error("machine external interrupt")]
    MachineExternalInterrupt,
    #[error("bad IPI redirect interrupt")]
    BadIpiRedirectInterrupt,
    #[error("icache ECC counter overflow interrupt")]
    IcacheEccCounterOverflowInterrupt,
    #[error("bus error interrupt")]
    BusErrorInterrupt,
}

impl Trap {
    /// The RISC-V exception/interrupt cause number this trap maps to,
    /// *without* the interrupt bit; `is_interrupt` tells the caller whether
    /// to set bit 63 when writing `mcause`/`scause`.
    pub fn cause_number(self) -> u64 {
        use Trap::*;
        match self {
            InstructionAddressMisaligned { .. } => 0,
            InstructionAccessFault { .. } => 1,
            IllegalInstruction { .. } => 2,
            Breakpoint { .. } => 3,
            LoadAddressMisaligned { .. } => 4,
            LoadAccessFault { .. } => 5,
            StoreAddressMisaligned { .. } => 6,
            StoreAccessFault { .. } => 7,
            UserEcall => 8,
            SupervisorEcall => 9,
            MachineEcall => 11,
            InstructionPageFault { .. } => 12,
            LoadPageFault { .. } => 13,
            StorePageFault { .. } => 15,
            InstructionBusError => 25,
            InstructionEccError => 26,
            LoadSplitPageFault { .. } => 27,
            StoreSplitPageFault { .. } => 28,
            McodeInstruction { .. } => 30,

            UserSoftwareInterrupt => 0,
            SupervisorSoftwareInterrupt => 1,
            MachineSoftwareInterrupt => 3,
            UserTimerInterrupt => 4,
            SupervisorTimerInterrupt => 5,
            MachineTimerInterrupt => 7,
            UserExternalInterrupt => 8,
            SupervisorExternalInterrupt => 9,
            MachineExternalInterrupt => 11,
            BadIpiRedirectInterrupt => 16,
            IcacheEccCounterOverflowInterrupt => 19,
            BusErrorInterrupt => 23,
        }
    }

    pub fn is_interrupt(self) -> bool {
        use Trap::*;
        matches!(
            self,
            UserSoftwareInterrupt
                | SupervisorSoftwareInterrupt
                | MachineSoftwareInterrupt
                | UserTimerInterrupt
                | SupervisorTimerInterrupt
                | MachineTimerInterrupt
                | UserExternalInterrupt
                | SupervisorExternalInterrupt
                | MachineExternalInterrupt
                | BadIpiRedirectInterrupt
                | IcacheEccCounterOverflowInterrupt
                | BusErrorInterrupt
        )
    }

    /// `mcause`/`scause` encoding: interrupt bit (63) combined with the
    /// cause number.
    pub fn mcause(self) -> u64 {
        let n = self.cause_number();
        if self.is_interrupt() {
            n | (1u64 << 63)
        } else {
            n
        }
    }

    /// `mtval`/`stval` value for this trap; zero for traps that don't carry
    /// one (matches `DEF_TRAP_N` in the reference `traps.h`).
    pub fn tval(self) -> u64 {
        use Trap::*;
        match self {
            InstructionAddressMisaligned { tval }
            | InstructionAccessFault { tval }
            | IllegalInstruction { tval }
            | Breakpoint { tval }
            | LoadAddressMisaligned { tval }
            | LoadAccessFault { tval }
            | StoreAddressMisaligned { tval }
            | StoreAccessFault { tval }
            | InstructionPageFault { tval }
            | LoadPageFault { tval }
            | StorePageFault { tval }
            | LoadSplitPageFault { tval }
            | StoreSplitPageFault { tval }
            | McodeInstruction { tval } => tval,
            _ => 0,
        }
    }

    pub fn trap_bus_error(addr: u64) -> Trap {
        Trap::StoreAccessFault { tval: addr }
    }
}

/// Debug-mode entry is a distinct result kind from an ordinary trap (spec
/// §9): `ebreak`, a trigger-module match, an external halt request, or a
/// single-step completion all divert into debug mode instead of unwinding
/// through the normal trap vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugEntryCause {
    Ebreak,
    Trigger,
    HaltRequest,
    Step,
}

/// Outcome of attempting one instruction step: either it completed (with or
/// without a branch already applied), it trapped synchronously, or it
/// diverted into debug mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Trap(Trap),
    DebugEntry(DebugEntryCause),
}
