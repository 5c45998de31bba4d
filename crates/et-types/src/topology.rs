//! Fixed ET-SoC system topology constants, pinned from the reference
//! model's `emu_defines.h` rather than re-derived.

pub const NUM_SHIRES: u32 = 34;
pub const NUM_COMPUTE_SHIRES: u32 = 32;
pub const MASTER_SHIRE: u32 = 32;
pub const IO_SHIRE_SP: u32 = 33;
/// Sentinel shire id used by the IO shire's own internal addressing
/// (`emu_defines.h`'s `IO_SHIRE_ID`), distinct from its bus shire number 33.
pub const IO_SHIRE_ID: u8 = 254;

pub const NEIGH_PER_SHIRE: u32 = 4;
pub const MINIONS_PER_NEIGH: u32 = 8;
pub const MINIONS_PER_SHIRE: u32 = NEIGH_PER_SHIRE * MINIONS_PER_NEIGH;
pub const THREADS_PER_MINION: u32 = 2;
pub const THREADS_PER_NEIGH: u32 = THREADS_PER_MINION * MINIONS_PER_NEIGH;
pub const THREADS_PER_SHIRE: u32 = THREADS_PER_NEIGH * NEIGH_PER_SHIRE;
pub const NUM_MINIONS: u32 = NUM_SHIRES * MINIONS_PER_SHIRE;
pub const NUM_THREADS: u32 = THREADS_PER_SHIRE * NUM_SHIRES;

pub const TBOXES_PER_SHIRE: u32 = 2;
pub const RBOXES_PER_SHIRE: u32 = 1;

pub const NR_MSG_PORTS: u32 = 4;

pub const L1D_NUM_SETS: u32 = 16;
pub const L1D_NUM_WAYS: u32 = 4;
pub const L1D_LINE_SIZE: u32 = 64;

pub const FAST_LOCAL_BARRIERS: u32 = 32;
pub const NUM_FCC_COUNTERS_PER_THREAD: u32 = 2;
pub const TQUANT_MAX_TRANSFORMS: u32 = 10;

pub const TFMA_MAX_AROWS: u32 = 16;
pub const TFMA_MAX_ACOLS: u32 = 16;
pub const TFMA_MAX_BCOLS: u32 = 16;

/// L1 scratchpad geometry: 64 lines of 64 bytes, addressable as 32-bit lanes.
pub const SCP_NUM_LINES: usize = 64;
pub const SCP_LINE_BYTES: usize = 64;

/// Vector register lane count (`VL`): eight 32-bit lanes per 256-bit vector
/// register, and the width of a mask register.
pub const VL: usize = 8;

/// DRAM base physical address and maximum size.
pub const DRAM_BASE: u64 = 0x40_0000_0000;
pub const DRAM_MAX_SIZE: u64 = 64 * 1024 * 1024 * 1024;

/// L2 scratchpad base and per-shire stride.
pub const L2_SCP_BASE: u64 = 0x8000_0000;
pub const L2_SCP_OFFSET: u64 = 0x0080_0000;
pub const L2_SCP_SIZE: u64 = 4 * 1024 * 1024;
/// Linear (non-per-shire-indexed) mirror of the whole L2 scratchpad region.
pub const L2_SCP_LINEAR_BASE: u64 = 0xC000_0000;
pub const L2_SCP_LINEAR_SIZE: u64 = 1024 * 1024 * 1024;
