//! ISA-level constant tables shared between the decoder and the
//! interpreter: the `insn_flags` bitset, the opcode/mnemonic space, CSR
//! addresses, and floating-point rounding-mode encoding.

pub mod csr;
pub mod opcode;

use bitflags::bitflags;

bitflags! {
    /// Per-instruction flags returned by the decoder, pinned bit-for-bit
    /// from the reference `insn_t` flag enum (`insn.h`) so that a decoded
    /// instruction's flags are directly comparable to the hardware model's.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InsnFlags: u16 {
        const ONE_ULP        = 0x0001;
        const CMO            = 0x0002;
        const CSR_READ       = 0x0004;
        const CSR_WRITE      = 0x0008;
        const LOAD           = 0x0020;
        const WFI            = 0x0040;
        const REDUCE         = 0x0080;
        const TENSOR_LOAD    = 0x0100;
        const TENSOR_QUANT   = 0x0200;
        const TENSOR_STORE   = 0x0400;
        const TENSOR_WAIT    = 0x0800;
        const TENSOR_FMA     = 0x1000;
        const STALL          = 0x2000;
        const FCC            = 0x4000;
        const FLB            = 0x8000;
    }
}

impl InsnFlags {
    pub fn is_fcc_write(self) -> bool {
        self.contains(InsnFlags::FCC) && self.contains(InsnFlags::CSR_WRITE)
    }
    pub fn is_stall_write(self) -> bool {
        self.contains(InsnFlags::STALL) && self.contains(InsnFlags::CSR_WRITE)
    }
    pub fn is_tensor_fma_write(self) -> bool {
        self.contains(InsnFlags::TENSOR_FMA) && self.contains(InsnFlags::CSR_WRITE)
    }
    pub fn is_tensor_load_write(self) -> bool {
        self.contains(InsnFlags::TENSOR_LOAD) && self.contains(InsnFlags::CSR_WRITE)
    }
    pub fn is_tensor_quant_write(self) -> bool {
        self.contains(InsnFlags::TENSOR_QUANT) && self.contains(InsnFlags::CSR_WRITE)
    }
    pub fn is_tensor_store_write(self) -> bool {
        self.contains(InsnFlags::TENSOR_STORE) && self.contains(InsnFlags::CSR_WRITE)
    }
    pub fn is_tensor_wait_write(self) -> bool {
        self.contains(InsnFlags::TENSOR_WAIT) && self.contains(InsnFlags::CSR_WRITE)
    }
}

/// `frm`/instruction `rm` field rounding modes. `5` and `6` are reserved and
/// must fault with illegal-instruction at decode/execute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    NearestEven,
    TowardZero,
    TowardNegative,
    TowardPositive,
    NearestMaxMagnitude,
    Dynamic,
}

impl RoundingMode {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits & 0x7 {
            0 => Some(RoundingMode::NearestEven),
            1 => Some(RoundingMode::TowardZero),
            2 => Some(RoundingMode::TowardNegative),
            3 => Some(RoundingMode::TowardPositive),
            4 => Some(RoundingMode::NearestMaxMagnitude),
            7 => Some(RoundingMode::Dynamic),
            _ => None, // 5, 6 reserved
        }
    }
}
