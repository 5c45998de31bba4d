//! System assembly and scheduling: wires `et-cpu-core` harts/cores, the
//! memory bus, and the ESR subsystem into one runnable machine, and drives
//! it the way the reference model's `emu_main` loop does — a cooperative
//! scheduler stepping one runnable hart at a time, ticking peripherals
//! every few hundred instructions rather than every cycle.

pub mod loader;
pub mod scheduler;
pub mod system;
pub mod uart;

pub use loader::{load_elf, load_raw, mem_write32, LoadError};
pub use scheduler::{RunResult, Scheduler};
pub use system::{System, SystemConfig};
pub use uart::{Uart, UartEffect};
