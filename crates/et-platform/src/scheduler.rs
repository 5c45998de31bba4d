//! The cooperative hart scheduler: steps one instruction
//! per runnable hart per quantum, advances `emu_cycle`, and ticks
//! peripherals every [`PERIPHERAL_TICK_INSTRUCTIONS`] instructions instead
//! of every cycle — the reference model's `emu_main` loop runs a 10 MHz
//! timer against a 1 GHz core clock the same way. This is not a per-cycle
//! simulator: a parked hart (from `wfi` or a busy `TensorWait`) is simply
//! skipped until a peripheral tick gives it a reason to run again.

use et_cpu_core::hart::HartOutcome;
use et_cpu_core::interp;
use et_cpu_core::observer::Observer;
use et_interrupts::InterruptFlags;
use et_isa::csr::CsrId;
use et_tensor::wait::State as TensorWaitState;

use crate::system::System;

/// Instructions of wall-clock hart progress between peripheral ticks.
pub const PERIPHERAL_TICK_INSTRUCTIONS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    /// `-max_cycles` was reached without the system halting itself.
    MaxCyclesReached,
    /// Every hart is parked and a peripheral tick couldn't wake any of
    /// them; nothing would ever run again.
    AllHartsParked,
}

/// Drives a [`System`] to completion. All mutable state the run needs
/// beyond per-hart parking flags lives on `System` itself, so a caller can
/// freely inspect the system after [`Scheduler::run`] returns.
pub struct Scheduler {
    max_cycles: u64,
    parked: Vec<bool>,
}

impl Scheduler {
    pub fn new(max_cycles: u64, hart_count: usize) -> Self {
        Scheduler { max_cycles, parked: vec![false; hart_count] }
    }

    /// Runs `system` until `-max_cycles` is hit or every hart is
    /// permanently parked.
    pub fn run(&mut self, system: &mut System, observer: &mut dyn Observer) -> RunResult {
        assert_eq!(self.parked.len(), system.harts.len(), "scheduler hart count must match the system");
        let mut since_tick: u64 = 0;

        loop {
            if system.emu_cycle >= self.max_cycles {
                return RunResult::MaxCyclesReached;
            }

            let mut any_ran = false;
            for idx in 0..system.harts.len() {
                if self.parked[idx] {
                    continue;
                }
                any_ran = true;
                self.step_hart(system, idx, observer);
            }

            system.emu_cycle += 1;
            since_tick += 1;
            if since_tick >= PERIPHERAL_TICK_INSTRUCTIONS {
                since_tick = 0;
                self.tick_peripherals(system);
            }

            if !any_ran {
                // Nobody ran this quantum; force a tick rather than looping
                // forever waiting for `since_tick` to reach the threshold.
                self.tick_peripherals(system);
                if self.parked.iter().all(|&p| p) {
                    return RunResult::AllHartsParked;
                }
            }
        }
    }

    fn step_hart(&mut self, system: &mut System, idx: usize, observer: &mut dyn Observer) {
        let core_idx = system.core_for_hart(idx);
        let (hart, core) = {
            let System { harts, cores, .. } = system;
            (&mut harts[idx], &mut cores[core_idx])
        };
        let outcome = interp::step(hart, core, &mut system.mem, observer);

        if matches!(outcome, HartOutcome::Parked) {
            self.parked[idx] = true;
        }

        // `TensorWait`'s hart-parking isn't surfaced through `HartOutcome`
        // (it's a side effect on `hart.tensor_wait`), so it's checked
        // independently of the fetch/execute outcome above.
        if matches!(
            hart.tensor_wait,
            TensorWaitState::Wait | TensorWaitState::WaitReady | TensorWaitState::TxFma
        ) {
            self.parked[idx] = true;
        }
    }

    /// Advances the RVtimer by one tick's worth of instructions, raises
    /// `mip.MTIP` on every hart once `mtime` crosses `mtimecmp`, and wakes
    /// any hart parked on a tensor resource that has since retired.
    fn tick_peripherals(&mut self, system: &mut System) {
        system.mem.io_mut().advance(PERIPHERAL_TICK_INSTRUCTIONS);
        let timer_pending = system.mem.io().timer_pending();

        for (idx, hart) in system.harts.iter_mut().enumerate() {
            if timer_pending {
                let mip = hart.csrs.raw(CsrId::MIP);
                hart.csrs.set_raw(CsrId::MIP, mip | InterruptFlags::MTIP.bits() as u64);
                self.parked[idx] = false;
            }

            if matches!(
                hart.tensor_wait,
                TensorWaitState::Wait | TensorWaitState::WaitReady | TensorWaitState::TxFma
            ) {
                // The tensor engines in this model retire synchronously
                // (FMA/Quant/Reduce are instantaneous), so by the next
                // tick the awaited resource is already idle.
                hart.tensor_wait = TensorWaitState::Idle;
                self.parked[idx] = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::SystemConfig;
    use et_cpu_core::observer::NullObserver;
    use et_types::{AccessType, Agent, Privilege};

    fn minimal_system(shire_mask: u64) -> System {
        let mut config = SystemConfig::default();
        config.shire_mask = shire_mask;
        config.single_thread = true;
        config.dram_size = 4096;
        config.reset_pc = et_types::topology::DRAM_BASE;
        System::new(&config)
    }

    #[test]
    fn max_cycles_halts_the_run() {
        let mut system = minimal_system(1);
        // `addi x1, x1, 1` looping on itself forever.
        system
            .mem
            .write(
                Agent::new(0, 0, Privilege::Machine),
                AccessType::Store,
                et_types::topology::DRAM_BASE,
                &0x0010_8093u32.to_le_bytes(),
            )
            .unwrap();
        let mut scheduler = Scheduler::new(10, system.harts.len());
        let mut observer = NullObserver;
        assert_eq!(scheduler.run(&mut system, &mut observer), RunResult::MaxCyclesReached);
        assert_eq!(system.emu_cycle, 10);
    }

    #[test]
    fn wfi_parks_and_the_scheduler_detects_the_deadlock() {
        let mut system = minimal_system(1);
        // `wfi` at the reset vector; `mtimecmp` is never programmed, so it
        // stays at its `u64::MAX` reset value and no timer interrupt will
        // ever arrive to wake this hart.
        system
            .mem
            .write(
                Agent::new(0, 0, Privilege::Machine),
                AccessType::Store,
                et_types::topology::DRAM_BASE,
                &0x1050_0073u32.to_le_bytes(),
            )
            .unwrap();
        system.harts[0].csrs.set_raw(CsrId::MIE, InterruptFlags::MTIP.bits() as u64);
        let mut scheduler = Scheduler::new(1000, system.harts.len());
        let mut observer = NullObserver;
        assert_eq!(scheduler.run(&mut system, &mut observer), RunResult::AllHartsParked);
    }
}
