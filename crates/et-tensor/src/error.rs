use bitflags::bitflags;

bitflags! {
    /// Sticky `tensor_error` bits. Bit 1 (bad
    /// transform/element-size selector), bit 4 (scratchpad cache mode not
    /// enabled), bit 6 (TenB pairing mismatch), bit 7 (MMU fault during a
    /// tensor access), bit 8 (illegal TensorStore {coop, cols}
    /// combination). Other bits are reserved for engines not modelled here
    /// in full and are never set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TensorError: u32 {
        const BAD_TRANSFORM      = 1 << 1;
        const CACHE_MODE         = 1 << 4;
        const TENB_MISMATCH      = 1 << 6;
        const MMU_FAULT          = 1 << 7;
        const STORE_ILLEGAL      = 1 << 8;
    }
}
