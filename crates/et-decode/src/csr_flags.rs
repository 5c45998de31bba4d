//! Per-CSR flag augmentation: a `csrrw`/`csrrs`/... instruction's flags
//! depend on *which* CSR it addresses, since the tensor engines and the
//! fast-local-barrier/FCC counters are triggered purely by writes to their
//! control CSR rather than by a distinct opcode (matching
//! "every tensor engine is started by a CSR write").

use et_isa::csr::CsrId;
use et_isa::InsnFlags;

pub fn extra_flags(id: CsrId) -> InsnFlags {
    match id {
        CsrId::TENSOR_LOAD | CsrId::TENSOR_LOAD_L2 => InsnFlags::TENSOR_LOAD,
        CsrId::TENSOR_QUANT => InsnFlags::TENSOR_QUANT,
        CsrId::TENSOR_STORE => InsnFlags::TENSOR_STORE,
        CsrId::TENSOR_WAIT => InsnFlags::TENSOR_WAIT,
        CsrId::TENSOR_FMA => InsnFlags::TENSOR_FMA,
        CsrId::TENSOR_REDUCE => InsnFlags::REDUCE,
        CsrId::FCC | CsrId::FCCNB => InsnFlags::FCC,
        CsrId::STALL => InsnFlags::STALL,
        CsrId::FLB => InsnFlags::FLB,
        _ => InsnFlags::empty(),
    }
}
