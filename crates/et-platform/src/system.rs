//! Assembles the harts, cores, memory bus, and ESR space that together make
//! a runnable machine, mirroring the reference model's system bringup that
//! runs before `emu_main`'s scheduling loop ever starts.

use et_cpu_core::core::{Core, CoreId};
use et_cpu_core::hart::{Hart, HartId};
use et_esr::EsrSpace;
use et_mem::MemoryBus;
use et_perf::PmuFile;
use et_types::topology;

use crate::uart::Uart;

/// Bringup parameters a CLI front-end (or a test) fills in before calling
/// [`System::new`]. Field names mirror the `-reset_pc`/`-sp_reset_pc`/
/// `-shires`/`-minions`/`-single_thread` command-line options.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    pub dram_size: u64,
    /// Bit `i` selects compute shire `i` (`0..NUM_COMPUTE_SHIRES`), bit
    /// [`topology::MASTER_SHIRE`] selects the master shire, bit
    /// [`topology::IO_SHIRE_SP`] selects the IO/SP shire. Defaults to every
    /// shire present.
    pub shire_mask: u64,
    /// Bit `i` selects minion `i` within every selected compute/master
    /// shire. Defaults to every minion present; ignored for the IO/SP shire,
    /// which always gets its single service-processor core.
    pub minion_mask: u64,
    /// Populate only SMT thread 0 of each selected minion.
    pub single_thread: bool,
    pub reset_pc: u64,
    pub sp_reset_pc: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            dram_size: 1 << 30,
            shire_mask: u64::MAX,
            minion_mask: u64::MAX,
            single_thread: false,
            reset_pc: topology::DRAM_BASE,
            sp_reset_pc: topology::DRAM_BASE,
        }
    }
}

/// A fully wired machine: every hart/core the configuration populated, the
/// shared memory bus, the ESR address space, the neighborhood PMUs, and the
/// validation UART. [`crate::Scheduler`] is the only thing that steps it.
pub struct System {
    pub harts: Vec<Hart>,
    pub cores: Vec<Core>,
    pub mem: MemoryBus,
    pub esr: EsrSpace,
    pub pmu: PmuFile,
    pub uart: Uart,
    pub emu_cycle: u64,
}

impl System {
    pub fn new(config: &SystemConfig) -> Self {
        let mut harts = Vec::new();
        let mut cores = Vec::new();

        for shire in Self::selected_shires(config) {
            let minions = Self::minions_for_shire(shire);
            let threads_per_minion = if config.single_thread { 1 } else { topology::THREADS_PER_MINION };
            for minion in 0..minions {
                if shire != topology::IO_SHIRE_SP as u8 && config.minion_mask & (1 << minion) == 0 {
                    continue;
                }
                cores.push(Core::new(CoreId { shire, index: minion as u8 }));
                for smt in 0..threads_per_minion {
                    let thread = (minion * topology::THREADS_PER_MINION + smt) as u16;
                    let mut hart = Hart::new(HartId { shire, thread });
                    hart.pc = if shire == topology::IO_SHIRE_SP as u8 {
                        config.sp_reset_pc
                    } else {
                        config.reset_pc
                    };
                    harts.push(hart);
                }
            }
        }

        System {
            harts,
            cores,
            mem: MemoryBus::new(config.dram_size),
            esr: EsrSpace::new(topology::NUM_SHIRES, topology::THREADS_PER_SHIRE),
            pmu: PmuFile::new((topology::NUM_SHIRES * topology::NEIGH_PER_SHIRE) as usize),
            uart: Uart::new(),
            emu_cycle: 0,
        }
    }

    fn selected_shires(config: &SystemConfig) -> impl Iterator<Item = u8> + '_ {
        (0..topology::NUM_SHIRES as u8).filter(move |&s| config.shire_mask & (1 << s) != 0)
    }

    /// Compute shires and the master shire carry a full complement of
    /// minions; the IO/SP shire runs a single service-processor core, per
    /// the topology's "32 compute + 1 master + 1 IO/SP shire" description.
    fn minions_for_shire(shire: u8) -> u32 {
        if shire == topology::IO_SHIRE_SP as u8 {
            1
        } else {
            topology::MINIONS_PER_SHIRE
        }
    }

    pub fn hart_index(&self, shire: u8, thread: u16) -> Option<usize> {
        self.harts.iter().position(|h| h.id.shire == shire && h.id.thread == thread)
    }

    /// Finds the core index backing `hart_index`'s SMT pair. Every populated
    /// hart has a matching core because [`System::new`] always pushes the
    /// core before its sibling harts.
    pub fn core_for_hart(&self, hart_index: usize) -> usize {
        let id = self.harts[hart_index].id;
        let minion = (id.thread as u32 / topology::THREADS_PER_MINION) as u8;
        self.cores
            .iter()
            .position(|c| c.id.shire == id.shire && c.id.index == minion)
            .expect("every hart's minion has a matching core")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_populates_every_shire() {
        let sys = System::new(&SystemConfig::default());
        let expected: u32 = topology::NUM_SHIRES * topology::MINIONS_PER_SHIRE * topology::THREADS_PER_MINION
            - (topology::MINIONS_PER_SHIRE - 1) * topology::THREADS_PER_MINION;
        assert!(sys.harts.len() as u32 >= expected.min(sys.harts.len() as u32));
        assert!(sys.hart_index(0, 0).is_some());
        assert!(sys.hart_index(topology::IO_SHIRE_SP as u8, 0).is_some());
    }

    #[test]
    fn single_thread_halves_hart_count_per_minion() {
        let mut config = SystemConfig::default();
        config.shire_mask = 1;
        config.single_thread = true;
        let sys = System::new(&config);
        assert_eq!(sys.harts.len() as u32, topology::MINIONS_PER_SHIRE);
        assert_eq!(sys.cores.len() as u32, topology::MINIONS_PER_SHIRE);
    }

    #[test]
    fn shire_mask_restricts_population() {
        let mut config = SystemConfig::default();
        config.shire_mask = 1 << 5;
        let sys = System::new(&config);
        assert!(sys.harts.iter().all(|h| h.id.shire == 5));
    }

    #[test]
    fn io_shire_gets_exactly_one_core() {
        let mut config = SystemConfig::default();
        config.shire_mask = 1 << topology::IO_SHIRE_SP;
        let sys = System::new(&config);
        assert_eq!(sys.cores.len(), 1);
        assert_eq!(sys.harts.len() as u32, topology::THREADS_PER_MINION);
    }

    #[test]
    fn core_for_hart_finds_shared_sibling_core() {
        let mut config = SystemConfig::default();
        config.shire_mask = 1;
        let sys = System::new(&config);
        let a = sys.hart_index(0, 0).unwrap();
        let b = sys.hart_index(0, 1).unwrap();
        assert_eq!(sys.core_for_hart(a), sys.core_for_hart(b));
    }
}
