//! The decoded-instruction mnemonic space. Variants are grouped the way the
//! reference `insns/*.cpp` files are split: base arith, branches,
//! load/store, mul/div, atomics (plus Esperanto coherent local/global
//! variants), float, packed-single/packed-integer/mask/graphics, and the
//! System class (CSR + privileged + tensor-engine triggers, since every
//! tensor engine is started by a `CSRRW`-family write to its control CSR).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Opcode {
    // Base integer register-register / register-immediate
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Addw,
    Subw,
    Sllw,
    Srlw,
    Sraw,
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
    Addiw,
    Slliw,
    Srliw,
    Sraiw,
    Lui,
    Auipc,

    // Control transfer
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
    Jal,
    Jalr,

    // Loads / stores
    Lb,
    Lh,
    Lw,
    Ld,
    Lbu,
    Lhu,
    Lwu,
    Sb,
    Sh,
    Sw,
    Sd,

    // Fences
    Fence,
    FenceI,

    // Mul/div (RV64M)
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
    Mulw,
    Divw,
    Divuw,
    Remw,
    Remuw,

    // Atomics (RV64A)
    LrW,
    ScW,
    LrD,
    ScD,
    AmoswapW,
    AmoaddW,
    AmoxorW,
    AmoandW,
    AmoorW,
    AmominW,
    AmomaxW,
    AmominuW,
    AmomaxuW,
    AmoswapD,
    AmoaddD,
    AmoxorD,
    AmoandD,
    AmoorD,
    AmominD,
    AmomaxD,
    AmominuD,
    AmomaxuD,

    /// `amo<op>{l,g}.{w,d}`: coherent atomics with an explicit local/global
    /// ordering domain; `AmoOp`/`local` select the operation and
    /// scope, `is_64` selects word vs. doubleword.
    CoherentAmo {
        op: AmoOp,
        local: bool,
        is_64: bool,
    },
    /// `amocmpswap{l,g}.{w,d}`: `x31` holds the expected value, `rs2` the
    /// desired value.
    CoherentCmpSwap { local: bool, is_64: bool },
    /// Coherent byte/halfword read-modify-write stores (`sbl/sbg/shl/shg`).
    CoherentByteStore { local: bool, halfword: bool },

    // System / privileged
    Ecall,
    Ebreak,
    Mret,
    Sret,
    Wfi,
    SfenceVma,
    Csrrw(Csr),
    Csrrs(Csr),
    Csrrc(Csr),
    Csrrwi(Csr),
    Csrrsi(Csr),
    Csrrci(Csr),

    // Float load/store/compute (F extension, single precision only)
    Flw,
    Fsw,
    FmaddS,
    FmsubS,
    FnmsubS,
    FnmaddS,
    FaddS,
    FsubS,
    FmulS,
    FdivS,
    FsqrtS,
    FsgnjS,
    FsgnjnS,
    FsgnjxS,
    FminS,
    FmaxS,
    FcvtWS,
    FcvtWuS,
    FmvXW,
    FeqS,
    FltS,
    FleS,
    FclassS,
    FcvtSW,
    FcvtSWu,
    FmvWX,
    FcvtLS,
    FcvtLuS,
    FcvtSL,
    FcvtSLu,

    // Packed-single (.ps) SIMD math, Esperanto extension
    FaddPs,
    FsubPs,
    FmulPs,
    FmaddPs,
    FmsubPs,
    RcpPs,
    RsqrtPs,
    Log2Ps,
    Exp2Ps,
    Sin2piPs,
    FracPs,

    /// Packed-integer (narrow-lane) arithmetic.
    PackedIntArith { op: PackedIntOp, lane_bits: u8 },
    /// Mask-register operations (`maskpopc`, `maskpopcz`, boolean combinators).
    MaskOp(MaskOp),
    /// Graphics helper ops layered on packed registers.
    GraphicsOp(GraphicsOp),

    /// Compressed-instruction forms are expanded by the decoder into their
    /// 32-bit equivalent `Opcode` plus an `is_compressed` flag carried
    /// alongside in `Decoded`; there is no separate compressed variant here.
    Illegal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmoOp {
    Add,
    Swap,
    And,
    Or,
    Xor,
    Min,
    Max,
    Minu,
    Maxu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedIntOp {
    Add,
    Sub,
    Mul,
    Min,
    Max,
    Minu,
    Maxu,
    Shl,
    Shr,
    Shra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskOp {
    Popc,
    Popcz,
    And,
    Or,
    Xor,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsOp {
    Blend,
    Clamp01,
    DepthTest,
}

/// A CSR operand resolved at decode time to its well-known `CsrId` when the
/// address is recognised, so execution never has to re-parse `csrimm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Csr {
    pub addr: u16,
    pub id: Option<crate::csr::CsrId>,
}
