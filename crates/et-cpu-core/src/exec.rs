//! Instruction execution: one function per `Decoded.opcode` family, called
//! from [`crate::interp::step`] after fetch/decode. Integer, branch, and
//! load/store semantics follow the base RV64IMAC definitions directly;
//! float/packed-single ops delegate to `et-softfloat`; CSR writes that carry
//! a tensor-trigger flag (`et-decode::csr_flags`) fan out into `et-tensor`
//! via [`crate::tensor_ctl`].

use crate::core::Core;
use crate::csr::CsrFile;
use crate::hart::Hart;
use crate::observer::{ObservedEvent, Observer};
use crate::tensor_ctl;
use crate::trap;
use et_decode::Decoded;
use et_isa::csr::CsrId;
use et_isa::opcode::{AmoOp, MaskOp, Opcode, PackedIntOp};
use et_isa::InsnFlags;
use et_mem::MemoryBus;
use et_mmu::{TranslationContext, TranslationState};
use et_softfloat::RoundingMode;
use et_types::{AccessType, Agent, Privilege, Trap};

/// What a successfully-executed instruction asks the interpreter to do
/// next, beyond the ordinary PC advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Normal,
    Branch(u64),
    Ebreak,
    Wfi,
}

fn agent_for(hart: &Hart) -> Agent {
    Agent::new(hart.id.shire, hart.id.thread, hart.privilege)
}

fn mstatus_bit(hart: &Hart, bit: u64) -> bool {
    hart.csrs.raw(CsrId::MSTATUS) & bit != 0
}

/// Picks the translation state governing the current access: `matp` for
/// M-mode when it names a translated scheme, `satp` for S/U-mode, `Bare`
/// otherwise.
pub(crate) fn translation_for(hart: &Hart, core: &Core, access: AccessType) -> (TranslationState, TranslationContext) {
    let state = match hart.privilege {
        Privilege::Machine => core.matp,
        _ => {
            let satp = hart.csrs.raw(CsrId::SATP);
            let mode = TranslationState::mode_from_bits(((satp >> 60) & 0xf) as u8).unwrap_or(et_mmu::TranslationMode::Bare);
            TranslationState {
                mode,
                root_ppn: satp & 0xfff_ffff_ffff,
                asid: ((satp >> 44) & 0xffff) as u16,
            }
        }
    };
    let ctx = TranslationContext {
        privilege: hart.privilege,
        access,
        mxr: mstatus_bit(hart, crate::csr::mstatus_bits::MXR),
        sum: mstatus_bit(hart, crate::csr::mstatus_bits::SUM),
    };
    (state, ctx)
}

fn translate(hart: &Hart, core: &Core, mem: &mut MemoryBus, vaddr: u64, size: u64, access: AccessType) -> Result<u64, Trap> {
    let (state, ctx) = translation_for(hart, core, access);
    et_mmu::translate_address(&state, &ctx, vaddr, size, mem, agent_for(hart))
}

fn mem_read(hart: &Hart, core: &Core, mem: &mut MemoryBus, vaddr: u64, buf: &mut [u8], access: AccessType) -> Result<(), Trap> {
    let pa = translate(hart, core, mem, vaddr, buf.len() as u64, access)?;
    mem.read(agent_for(hart), access, pa, buf).map_err(|e| e.into_trap(access))
}

fn mem_write(hart: &Hart, core: &Core, mem: &mut MemoryBus, vaddr: u64, buf: &[u8], access: AccessType) -> Result<(), Trap> {
    let pa = translate(hart, core, mem, vaddr, buf.len() as u64, access)?;
    mem.write(agent_for(hart), access, pa, buf).map_err(|e| e.into_trap(access))
}

pub fn execute(hart: &mut Hart, core: &mut Core, mem: &mut MemoryBus, d: &Decoded, pc_after: u64, observer: &mut dyn Observer) -> Result<Outcome, Trap> {
    use Opcode::*;
    let rs1 = hart.x(d.rs1);
    let rs2 = hart.x(d.rs2);
    let imm = d.imm;

    match d.opcode {
        Add => hart.set_x(d.rd, rs1.wrapping_add(rs2)),
        Sub => hart.set_x(d.rd, rs1.wrapping_sub(rs2)),
        Sll => hart.set_x(d.rd, rs1 << (rs2 & 0x3f)),
        Slt => hart.set_x(d.rd, ((rs1 as i64) < (rs2 as i64)) as u64),
        Sltu => hart.set_x(d.rd, (rs1 < rs2) as u64),
        Xor => hart.set_x(d.rd, rs1 ^ rs2),
        Srl => hart.set_x(d.rd, rs1 >> (rs2 & 0x3f)),
        Sra => hart.set_x(d.rd, ((rs1 as i64) >> (rs2 & 0x3f)) as u64),
        Or => hart.set_x(d.rd, rs1 | rs2),
        And => hart.set_x(d.rd, rs1 & rs2),
        Addw => hart.set_x(d.rd, sext32(rs1.wrapping_add(rs2) as u32)),
        Subw => hart.set_x(d.rd, sext32(rs1.wrapping_sub(rs2) as u32)),
        Sllw => hart.set_x(d.rd, sext32((rs1 as u32).wrapping_shl((rs2 & 0x1f) as u32))),
        Srlw => hart.set_x(d.rd, sext32((rs1 as u32).wrapping_shr((rs2 & 0x1f) as u32))),
        Sraw => hart.set_x(d.rd, sext32(((rs1 as i32) >> (rs2 & 0x1f)) as u32)),

        Addi => hart.set_x(d.rd, rs1.wrapping_add(imm as u64)),
        Slti => hart.set_x(d.rd, ((rs1 as i64) < imm) as u64),
        Sltiu => hart.set_x(d.rd, (rs1 < imm as u64) as u64),
        Xori => hart.set_x(d.rd, rs1 ^ imm as u64),
        Ori => hart.set_x(d.rd, rs1 | imm as u64),
        Andi => hart.set_x(d.rd, rs1 & imm as u64),
        Slli => hart.set_x(d.rd, rs1 << (imm & 0x3f)),
        Srli => hart.set_x(d.rd, rs1 >> (imm & 0x3f)),
        Srai => hart.set_x(d.rd, ((rs1 as i64) >> (imm & 0x3f)) as u64),
        Addiw => hart.set_x(d.rd, sext32((rs1 as u32).wrapping_add(imm as u32))),
        Slliw => hart.set_x(d.rd, sext32((rs1 as u32).wrapping_shl(imm as u32 & 0x1f))),
        Srliw => hart.set_x(d.rd, sext32((rs1 as u32).wrapping_shr(imm as u32 & 0x1f))),
        Sraiw => hart.set_x(d.rd, sext32(((rs1 as i32) >> (imm as u32 & 0x1f)) as u32)),

        Lui => hart.set_x(d.rd, imm as u64),
        Auipc => hart.set_x(d.rd, hart.pc.wrapping_add(imm as u64)),

        Beq => return Ok(branch_if(rs1 == rs2, hart.pc, imm)),
        Bne => return Ok(branch_if(rs1 != rs2, hart.pc, imm)),
        Blt => return Ok(branch_if((rs1 as i64) < (rs2 as i64), hart.pc, imm)),
        Bge => return Ok(branch_if((rs1 as i64) >= (rs2 as i64), hart.pc, imm)),
        Bltu => return Ok(branch_if(rs1 < rs2, hart.pc, imm)),
        Bgeu => return Ok(branch_if(rs1 >= rs2, hart.pc, imm)),
        Jal => {
            hart.set_x(d.rd, pc_after);
            return Ok(Outcome::Branch(hart.pc.wrapping_add(imm as u64)));
        }
        Jalr => {
            let target = rs1.wrapping_add(imm as u64) & !1u64;
            hart.set_x(d.rd, pc_after);
            return Ok(Outcome::Branch(target));
        }

        Lb | Lh | Lw | Ld | Lbu | Lhu | Lwu => {
            let addr = rs1.wrapping_add(imm as u64);
            let value = load(hart, core, mem, addr, d.opcode)?;
            hart.set_x(d.rd, value);
        }
        Sb | Sh | Sw | Sd => {
            let addr = rs1.wrapping_add(imm as u64);
            store(hart, core, mem, addr, rs2, d.opcode)?;
        }

        Fence | FenceI | SfenceVma => {}

        Mul => hart.set_x(d.rd, rs1.wrapping_mul(rs2)),
        Mulh => hart.set_x(d.rd, (((rs1 as i64) as i128 * (rs2 as i64) as i128) >> 64) as u64),
        Mulhsu => hart.set_x(d.rd, (((rs1 as i64) as i128 * rs2 as i128) >> 64) as u64),
        Mulhu => hart.set_x(d.rd, ((rs1 as u128 * rs2 as u128) >> 64) as u64),
        Div => hart.set_x(d.rd, div_s(rs1 as i64, rs2 as i64) as u64),
        Divu => hart.set_x(d.rd, div_u(rs1, rs2)),
        Rem => hart.set_x(d.rd, rem_s(rs1 as i64, rs2 as i64) as u64),
        Remu => hart.set_x(d.rd, rem_u(rs1, rs2)),
        Mulw => hart.set_x(d.rd, sext32((rs1 as u32).wrapping_mul(rs2 as u32))),
        Divw => hart.set_x(d.rd, sext32(div_s(rs1 as i32 as i64, rs2 as i32 as i64) as u32)),
        Divuw => hart.set_x(d.rd, sext32(div_u(rs1 as u32 as u64, rs2 as u32 as u64) as u32)),
        Remw => hart.set_x(d.rd, sext32(rem_s(rs1 as i32 as i64, rs2 as i32 as i64) as u32)),
        Remuw => hart.set_x(d.rd, sext32(rem_u(rs1 as u32 as u64, rs2 as u32 as u64) as u32)),

        LrW => {
            let v = load(hart, core, mem, rs1, Opcode::Lw)?;
            hart.set_x(d.rd, v);
        }
        LrD => {
            let v = load(hart, core, mem, rs1, Opcode::Ld)?;
            hart.set_x(d.rd, v);
        }
        ScW => {
            store(hart, core, mem, rs1, rs2, Opcode::Sw)?;
            hart.set_x(d.rd, 0);
        }
        ScD => {
            store(hart, core, mem, rs1, rs2, Opcode::Sd)?;
            hart.set_x(d.rd, 0);
        }
        AmoswapW | AmoaddW | AmoxorW | AmoandW | AmoorW | AmominW | AmomaxW | AmominuW | AmomaxuW => {
            let op = amo_op_for(d.opcode);
            let old = amo(hart, core, mem, rs1, rs2, op, false)?;
            hart.set_x(d.rd, old);
        }
        AmoswapD | AmoaddD | AmoxorD | AmoandD | AmoorD | AmominD | AmomaxD | AmominuD | AmomaxuD => {
            let op = amo_op_for(d.opcode);
            let old = amo(hart, core, mem, rs1, rs2, op, true)?;
            hart.set_x(d.rd, old);
        }
        CoherentAmo { op, local, is_64 } => {
            let old = amo(hart, core, mem, rs1, rs2, op, is_64)?;
            let new = apply_amo(op, old, rs2, is_64);
            observer.observe(ObservedEvent::CoherentAccess {
                agent: agent_for(hart),
                access: if local { AccessType::AmoLocal } else { AccessType::AmoGlobal },
                addr: rs1,
                local,
                old,
                new,
            });
            hart.set_x(d.rd, old);
        }
        CoherentCmpSwap { local, is_64 } => {
            let expected = hart.x(31);
            let old = amo_cmpswap(hart, core, mem, rs1, expected, rs2, is_64)?;
            let matches = if is_64 { old == expected } else { old as u32 == expected as u32 };
            observer.observe(ObservedEvent::CoherentAccess {
                agent: agent_for(hart),
                access: if local { AccessType::AmoLocal } else { AccessType::AmoGlobal },
                addr: rs1,
                local,
                old,
                new: if matches { rs2 } else { old },
            });
            hart.set_x(d.rd, old);
        }
        CoherentByteStore { local, halfword } => {
            let size = if halfword { 2 } else { 1 };
            if halfword && rs1 & 1 != 0 {
                return Err(Trap::StoreAddressMisaligned { tval: rs1 });
            }
            let mut buf = [0u8; 2];
            mem_read(hart, core, mem, rs1, &mut buf[..size], AccessType::Load)?;
            let old = u16::from_le_bytes(buf) as u64 & if halfword { 0xffff } else { 0xff };
            let store_op = if halfword { Opcode::Sh } else { Opcode::Sb };
            store(hart, core, mem, rs1, rs2, store_op)?;
            observer.observe(ObservedEvent::CoherentAccess {
                agent: agent_for(hart),
                access: AccessType::Store,
                addr: rs1,
                local,
                old,
                new: rs2 & if halfword { 0xffff } else { 0xff },
            });
        }

        Ecall => {
            return Err(match hart.privilege {
                Privilege::User => Trap::UserEcall,
                Privilege::Supervisor => Trap::SupervisorEcall,
                Privilege::Machine => Trap::MachineEcall,
            })
        }
        Ebreak => {
            let dcsr = hart.csrs.raw(CsrId::DCSR);
            let enabled = match hart.privilege {
                Privilege::Machine => dcsr & crate::csr::dcsr_bits::EBREAKM != 0,
                Privilege::Supervisor => dcsr & crate::csr::dcsr_bits::EBREAKS != 0,
                Privilege::User => dcsr & crate::csr::dcsr_bits::EBREAKU != 0,
            };
            if enabled {
                return Ok(Outcome::Ebreak);
            }
            return Err(Trap::Breakpoint { tval: hart.pc });
        }
        Mret => {
            trap::mret(hart);
            return Ok(Outcome::Branch(hart.pc));
        }
        Sret => {
            trap::sret(hart);
            return Ok(Outcome::Branch(hart.pc));
        }
        Wfi => return Ok(Outcome::Wfi),

        Csrrw(csr) | Csrrs(csr) | Csrrc(csr) | Csrrwi(csr) | Csrrsi(csr) | Csrrci(csr) => {
            exec_csr(hart, core, mem, d, csr.addr, d.opcode, observer)?;
        }

        Flw => {
            let addr = rs1.wrapping_add(imm as u64);
            let mut buf = [0u8; 4];
            mem_read(hart, core, mem, addr, &mut buf, AccessType::Load)?;
            hart.set_f_lane0(d.rd, f32::from_bits(u32::from_le_bytes(buf)));
        }
        Fsw => {
            let addr = rs1.wrapping_add(imm as u64);
            mem_write(hart, core, mem, addr, &hart.f_lane0(d.rs2).to_bits().to_le_bytes(), AccessType::Store)?;
        }

        FaddS => hart.set_f_lane0(d.rd, scalar_rm(d, || et_softfloat::f32_add(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2)))),
        FsubS => hart.set_f_lane0(d.rd, scalar_rm(d, || et_softfloat::f32_sub(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2)))),
        FmulS => hart.set_f_lane0(d.rd, scalar_rm(d, || et_softfloat::f32_mul(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2)))),
        FmaddS => hart.set_f_lane0(d.rd, scalar_rm(d, || et_softfloat::f32_mul_add(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2), hart.f_lane0(d.rs3)))),
        FmsubS => hart.set_f_lane0(d.rd, scalar_rm(d, || et_softfloat::f32_mul_sub(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2), hart.f_lane0(d.rs3)))),
        FnmsubS => hart.set_f_lane0(d.rd, scalar_rm(d, || et_softfloat::f32_sub_mul_add(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2), hart.f_lane0(d.rs3)))),
        FnmaddS => hart.set_f_lane0(d.rd, scalar_rm(d, || et_softfloat::f32_sub_mul_sub(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2), hart.f_lane0(d.rs3)))),
        FsgnjS => hart.set_f_lane0(d.rd, et_softfloat::f32_copy_sign(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2))),
        FsgnjnS => hart.set_f_lane0(d.rd, et_softfloat::f32_copy_sign_not(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2))),
        FsgnjxS => hart.set_f_lane0(d.rd, et_softfloat::f32_copy_sign_xor(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2))),
        FminS => hart.set_f_lane0(d.rd, et_softfloat::f32_min_num(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2))),
        FmaxS => hart.set_f_lane0(d.rd, et_softfloat::f32_max_num(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2))),
        FcvtWS => hart.set_x(d.rd, sext32(et_softfloat::f32_to_i32(hart.f_lane0(d.rs1)) as u32)),
        FcvtWuS => hart.set_x(d.rd, sext32(et_softfloat::f32_to_ui32(hart.f_lane0(d.rs1)))),
        FmvXW => hart.set_x(d.rd, sext32(hart.f_lane0(d.rs1).to_bits())),
        FeqS => hart.set_x(d.rd, et_softfloat::f32_eq(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2)) as u64),
        FltS => hart.set_x(d.rd, et_softfloat::f32_lt(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2)) as u64),
        FleS => hart.set_x(d.rd, et_softfloat::f32_le(hart.f_lane0(d.rs1), hart.f_lane0(d.rs2)) as u64),
        FclassS => hart.set_x(d.rd, et_softfloat::classify(hart.f_lane0(d.rs1)).bits() as u64),
        FcvtSW => hart.set_f_lane0(d.rd, et_softfloat::i32_to_f32(rs1 as i32)),
        FcvtSWu => hart.set_f_lane0(d.rd, et_softfloat::ui32_to_f32(rs1 as u32)),
        FmvWX => hart.set_f_lane0(d.rd, f32::from_bits(rs1 as u32)),

        // Microcode-gated: no direct functional-unit path in this model,
        // so execution diverts into the trap handler's `mcode` vector
        // instead of computing a result (spec's discovered McodeInstruction
        // routing for the double-precision-adjacent/64-bit-int float ops).
        FdivS | FsqrtS | FcvtLS | FcvtLuS | FcvtSL | FcvtSLu => {
            return Err(Trap::McodeInstruction { tval: d.bits as u64 })
        }

        FaddPs => packed_binop(hart, d, et_softfloat::f32_add),
        FsubPs => packed_binop(hart, d, et_softfloat::f32_sub),
        FmulPs => packed_binop(hart, d, et_softfloat::f32_mul),
        FmaddPs => packed_fma(hart, d, false),
        FmsubPs => packed_fma(hart, d, true),
        RcpPs => packed_unop(hart, d, et_softfloat::f32_rcp),
        RsqrtPs => packed_unop(hart, d, et_softfloat::f32_rsqrt),
        Log2Ps => packed_unop(hart, d, et_softfloat::f32_log2),
        Exp2Ps => packed_unop(hart, d, et_softfloat::f32_exp2),
        Sin2piPs => packed_unop(hart, d, et_softfloat::f32_sin2pi),
        FracPs => packed_unop(hart, d, et_softfloat::f32_frac),

        PackedIntArith { op, lane_bits } => packed_int(hart, d, op, lane_bits),
        MaskOp(op) => mask_op(hart, d, op),
        GraphicsOp(_) => return Err(Trap::IllegalInstruction { tval: d.bits as u64 }),

        Illegal => return Err(Trap::IllegalInstruction { tval: d.bits as u64 }),
    }
    Ok(Outcome::Normal)
}

fn sext32(v: u32) -> u64 {
    v as i32 as i64 as u64
}

fn branch_if(cond: bool, pc: u64, imm: i64) -> Outcome {
    if cond {
        Outcome::Branch(pc.wrapping_add(imm as u64))
    } else {
        Outcome::Normal
    }
}

fn div_s(a: i64, b: i64) -> i64 {
    if b == 0 {
        -1
    } else if a == i64::MIN && b == -1 {
        a
    } else {
        a / b
    }
}

fn div_u(a: u64, b: u64) -> u64 {
    if b == 0 {
        u64::MAX
    } else {
        a / b
    }
}

fn rem_s(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else if a == i64::MIN && b == -1 {
        0
    } else {
        a % b
    }
}

fn rem_u(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        a % b
    }
}

fn load_size(op: Opcode) -> usize {
    match op {
        Opcode::Lb | Opcode::Lbu | Opcode::Sb => 1,
        Opcode::Lh | Opcode::Lhu | Opcode::Sh => 2,
        Opcode::Lw | Opcode::Lwu | Opcode::Sw => 4,
        _ => 8,
    }
}

fn load(hart: &Hart, core: &Core, mem: &mut MemoryBus, addr: u64, op: Opcode) -> Result<u64, Trap> {
    let size = load_size(op);
    if addr % size as u64 != 0 {
        return Err(Trap::LoadAddressMisaligned { tval: addr });
    }
    let mut buf = [0u8; 8];
    mem_read(hart, core, mem, addr, &mut buf[..size], AccessType::Load)?;
    Ok(match op {
        Opcode::Lb => buf[0] as i8 as i64 as u64,
        Opcode::Lbu => buf[0] as u64,
        Opcode::Lh => i16::from_le_bytes([buf[0], buf[1]]) as i64 as u64,
        Opcode::Lhu => u16::from_le_bytes([buf[0], buf[1]]) as u64,
        Opcode::Lw => i32::from_le_bytes(buf[..4].try_into().unwrap()) as i64 as u64,
        Opcode::Lwu => u32::from_le_bytes(buf[..4].try_into().unwrap()) as u64,
        _ => u64::from_le_bytes(buf),
    })
}

fn store(hart: &Hart, core: &Core, mem: &mut MemoryBus, addr: u64, value: u64, op: Opcode) -> Result<(), Trap> {
    let size = load_size(op);
    if addr % size as u64 != 0 {
        return Err(Trap::StoreAddressMisaligned { tval: addr });
    }
    mem_write(hart, core, mem, addr, &value.to_le_bytes()[..size], AccessType::Store)
}

fn amo_op_for(op: Opcode) -> AmoOp {
    use Opcode::*;
    match op {
        AmoswapW | AmoswapD => AmoOp::Swap,
        AmoaddW | AmoaddD => AmoOp::Add,
        AmoxorW | AmoxorD => AmoOp::Xor,
        AmoandW | AmoandD => AmoOp::And,
        AmoorW | AmoorD => AmoOp::Or,
        AmominW | AmominD => AmoOp::Min,
        AmomaxW | AmomaxD => AmoOp::Max,
        AmominuW | AmominuD => AmoOp::Minu,
        AmomaxuW | AmomaxuD => AmoOp::Maxu,
        _ => AmoOp::Swap,
    }
}

fn apply_amo(op: AmoOp, old: u64, value: u64, is_64: bool) -> u64 {
    let (old_s, value_s) = if is_64 {
        (old as i64, value as i64)
    } else {
        (old as i32 as i64, value as i32 as i64)
    };
    let result = match op {
        AmoOp::Swap => value_s,
        AmoOp::Add => old_s.wrapping_add(value_s),
        AmoOp::Xor => old_s ^ value_s,
        AmoOp::And => old_s & value_s,
        AmoOp::Or => old_s | value_s,
        AmoOp::Min => old_s.min(value_s),
        AmoOp::Max => old_s.max(value_s),
        AmoOp::Minu => (old_s as u64).min(value_s as u64) as i64,
        AmoOp::Maxu => (old_s as u64).max(value_s as u64) as i64,
    };
    if is_64 {
        result as u64
    } else {
        sext32(result as u32)
    }
}

fn amo(hart: &Hart, core: &Core, mem: &mut MemoryBus, addr: u64, value: u64, op: AmoOp, is_64: bool) -> Result<u64, Trap> {
    let load_op = if is_64 { Opcode::Ld } else { Opcode::Lw };
    let store_op = if is_64 { Opcode::Sd } else { Opcode::Sw };
    let old = load(hart, core, mem, addr, load_op)?;
    let new = apply_amo(op, old, value, is_64);
    store(hart, core, mem, addr, new, store_op)?;
    Ok(old)
}

fn amo_cmpswap(hart: &Hart, core: &Core, mem: &mut MemoryBus, addr: u64, expected: u64, desired: u64, is_64: bool) -> Result<u64, Trap> {
    let load_op = if is_64 { Opcode::Ld } else { Opcode::Lw };
    let store_op = if is_64 { Opcode::Sd } else { Opcode::Sw };
    let old = load(hart, core, mem, addr, load_op)?;
    let matches = if is_64 { old == expected } else { old as u32 == expected as u32 };
    if matches {
        store(hart, core, mem, addr, desired, store_op)?;
    }
    Ok(old)
}

fn scalar_rm(d: &Decoded, f: impl FnOnce() -> f32) -> f32 {
    if let Some(rm) = et_isa::RoundingMode::from_bits(d.rm) {
        let mode = match rm {
            et_isa::RoundingMode::NearestEven | et_isa::RoundingMode::Dynamic => RoundingMode::NearestEven,
            et_isa::RoundingMode::TowardZero => RoundingMode::TowardZero,
            et_isa::RoundingMode::TowardNegative => RoundingMode::TowardNegative,
            et_isa::RoundingMode::TowardPositive => RoundingMode::TowardPositive,
            et_isa::RoundingMode::NearestMaxMagnitude => RoundingMode::NearestMaxMagnitude,
        };
        et_softfloat::set_rounding_mode(mode);
    }
    f()
}

fn packed_binop(hart: &mut Hart, d: &Decoded, f: impl Fn(f32, f32) -> f32) {
    let a = *hart.f_lanes(d.rs1);
    let b = *hart.f_lanes(d.rs2);
    let out = hart.f_lanes_mut(d.rd);
    for i in 0..8 {
        out[i] = f(f32::from_bits(a[i]), f32::from_bits(b[i])).to_bits();
    }
}

fn packed_unop(hart: &mut Hart, d: &Decoded, f: impl Fn(f32) -> f32) {
    let a = *hart.f_lanes(d.rs1);
    let out = hart.f_lanes_mut(d.rd);
    for i in 0..8 {
        out[i] = f(f32::from_bits(a[i])).to_bits();
    }
}

fn packed_fma(hart: &mut Hart, d: &Decoded, sub: bool) {
    let a = *hart.f_lanes(d.rs1);
    let b = *hart.f_lanes(d.rs2);
    let c = *hart.f_lanes(d.rs3);
    let out = hart.f_lanes_mut(d.rd);
    for i in 0..8 {
        let (af, bf, cf) = (f32::from_bits(a[i]), f32::from_bits(b[i]), f32::from_bits(c[i]));
        out[i] = if sub {
            et_softfloat::f32_mul_sub(af, bf, cf).to_bits()
        } else {
            et_softfloat::f32_mul_add(af, bf, cf).to_bits()
        };
    }
}

/// Packed-integer arithmetic over the 32-byte vector register, lane width
/// given by `lane_bits` (8/16/32).
fn packed_int(hart: &mut Hart, d: &Decoded, op: PackedIntOp, lane_bits: u8) {
    let a_words = *hart.f_lanes(d.rs1);
    let b_words = *hart.f_lanes(d.rs2);
    let a_bytes: Vec<u8> = a_words.iter().flat_map(|w| w.to_le_bytes()).collect();
    let b_bytes: Vec<u8> = b_words.iter().flat_map(|w| w.to_le_bytes()).collect();
    let lane_bytes = (lane_bits as usize / 8).max(1);
    let mut out_bytes = a_bytes.clone();
    let lanes = 32 / lane_bytes;
    for i in 0..lanes {
        let a = read_lane(&a_bytes, i, lane_bytes);
        let b = read_lane(&b_bytes, i, lane_bytes);
        let r = apply_packed_int(op, a, b, lane_bits);
        write_lane(&mut out_bytes, i, lane_bytes, r);
    }
    let out = hart.f_lanes_mut(d.rd);
    for i in 0..8 {
        out[i] = u32::from_le_bytes(out_bytes[i * 4..i * 4 + 4].try_into().unwrap());
    }
}

fn read_lane(bytes: &[u8], i: usize, lane_bytes: usize) -> i64 {
    let start = i * lane_bytes;
    let mut buf = [0u8; 8];
    buf[..lane_bytes].copy_from_slice(&bytes[start..start + lane_bytes]);
    let shift = 64 - lane_bytes * 8;
    (u64::from_le_bytes(buf) as i64) << shift >> shift
}

fn write_lane(bytes: &mut [u8], i: usize, lane_bytes: usize, value: i64) {
    let start = i * lane_bytes;
    let le = value.to_le_bytes();
    bytes[start..start + lane_bytes].copy_from_slice(&le[..lane_bytes]);
}

fn apply_packed_int(op: PackedIntOp, a: i64, b: i64, lane_bits: u8) -> i64 {
    match op {
        PackedIntOp::Add => a.wrapping_add(b),
        PackedIntOp::Sub => a.wrapping_sub(b),
        PackedIntOp::Mul => a.wrapping_mul(b),
        PackedIntOp::Min => a.min(b),
        PackedIntOp::Max => a.max(b),
        PackedIntOp::Minu => (a as u64).min(b as u64) as i64,
        PackedIntOp::Maxu => (a as u64).max(b as u64) as i64,
        PackedIntOp::Shl => a.wrapping_shl(b as u32 & (lane_bits as u32 - 1)),
        PackedIntOp::Shr => ((a as u64).wrapping_shr(b as u32 & (lane_bits as u32 - 1))) as i64,
        PackedIntOp::Shra => a.wrapping_shr(b as u32 & (lane_bits as u32 - 1)),
    }
}

fn mask_op(hart: &mut Hart, d: &Decoded, op: MaskOp) {
    let a = hart.mask(d.rs1);
    let b = hart.mask(d.rs2);
    match op {
        MaskOp::Popc => hart.set_x(d.rd, a.count_ones() as u64),
        MaskOp::Popcz => hart.set_x(d.rd, 8 - a.count_ones() as u64),
        MaskOp::And => hart.set_mask(d.rd, a & b),
        MaskOp::Or => hart.set_mask(d.rd, a | b),
        MaskOp::Xor => hart.set_mask(d.rd, a ^ b),
        MaskOp::Not => hart.set_mask(d.rd, !a),
    }
}

fn exec_csr(hart: &mut Hart, core: &mut Core, mem: &mut MemoryBus, d: &Decoded, addr: u16, op: Opcode, observer: &mut dyn Observer) -> Result<(), Trap> {
    let id = CsrFile::check_access(addr, hart.privilege, d.flags.contains(InsnFlags::CSR_WRITE))?;

    let old = hart.csrs.read(id);
    if d.flags.contains(InsnFlags::CSR_READ) {
        hart.set_x(d.rd, old);
    }

    if !d.flags.contains(InsnFlags::CSR_WRITE) {
        return Ok(());
    }

    let operand = match op {
        Opcode::Csrrwi(_) | Opcode::Csrrsi(_) | Opcode::Csrrci(_) => d.rs1 as u64,
        _ => hart.x(d.rs1),
    };
    let new = match op {
        Opcode::Csrrw(_) | Opcode::Csrrwi(_) => operand,
        Opcode::Csrrs(_) | Opcode::Csrrsi(_) => old | operand,
        Opcode::Csrrc(_) | Opcode::Csrrci(_) => old & !operand,
        _ => old,
    };

    dispatch_tensor_trigger(hart, core, mem, d, id, new, observer)?;
    hart.csrs.write(id, new)
}

fn dispatch_tensor_trigger(hart: &mut Hart, core: &mut Core, mem: &mut MemoryBus, d: &Decoded, id: CsrId, value: u64, observer: &mut dyn Observer) -> Result<(), Trap> {
    match id {
        CsrId::TENSOR_MASK => core.tensor_staging.apply_mask_write(value),
        CsrId::TENSOR_COOP => core.tensor_staging.apply_coop_write(value),
        CsrId::TENSOR_CONV_SIZE => core.tensor_staging.apply_conv_size_write(value),
        CsrId::TENSOR_CONV_CTRL => core.tensor_staging.apply_conv_ctrl_write(value),
        CsrId::TENSOR_LOAD if d.flags.is_tensor_load_write() => run_tensor_load(hart, core, mem, value)?,
        CsrId::TENSOR_LOAD_L2 => run_tensor_load_l2(hart, core, mem, value)?,
        CsrId::TENSOR_STORE if d.flags.is_tensor_store_write() => run_tensor_store(hart, core, mem, value, observer)?,
        CsrId::TENSOR_FMA if d.flags.is_tensor_fma_write() => run_tensor_fma(core, value),
        CsrId::TENSOR_QUANT if d.flags.is_tensor_quant_write() => run_tensor_quant(core, value),
        CsrId::TENSOR_REDUCE => run_tensor_reduce(core, value),
        CsrId::TENSOR_WAIT if d.flags.is_tensor_wait_write() => run_tensor_wait(hart, core, value),
        CsrId::EXCL_MODE => core.set_excl_mode(value),
        CsrId::MENABLE_SHADOWS => core.menable_shadows = value,
        CsrId::MCACHE_CONTROL => core.mcache_control = value,
        CsrId::UCACHE_CONTROL => core.ucache_control = value,
        CsrId::MATP => {
            let mode = TranslationState::mode_from_bits(((value >> 60) & 0xf) as u8).unwrap_or(et_mmu::TranslationMode::Bare);
            core.matp = TranslationState {
                mode,
                root_ppn: value & 0xfff_ffff_ffff,
                asid: ((value >> 44) & 0xffff) as u16,
            };
        }
        _ => {}
    }
    Ok(())
}

fn run_tensor_load(hart: &mut Hart, core: &mut Core, mem: &mut MemoryBus, addr: u64) -> Result<(), Trap> {
    let params = core.tensor_staging.load_params(addr);
    let cache_mode = et_tensor::load::CacheMode::L1dL2;
    match et_tensor::load::validate(&params, cache_mode, core.shire_cooperative) {
        Ok(transform) => {
            let (state, ctx) = translation_for(hart, core, AccessType::TxLoad);
            let dest = if params.tenb { &mut core.tensor.tenb } else { &mut core.tensor.l1 };
            match et_tensor::load::execute(&params, transform, &state, &ctx, mem, agent_for(hart), dest) {
                Ok(_) => {}
                Err(_) => core.tensor.raise_error(et_tensor::TensorError::MMU_FAULT),
            }
        }
        Err(e) => core.tensor.raise_error(e),
    }
    Ok(())
}

fn run_tensor_load_l2(hart: &mut Hart, core: &mut Core, mem: &mut MemoryBus, addr: u64) -> Result<(), Trap> {
    let params = core.tensor_staging.load_l2_params(addr);
    let (state, ctx) = translation_for(hart, core, AccessType::TxLoad);
    match et_tensor::load_l2::execute(&params, hart.id.shire, &state, &ctx, mem, agent_for(hart)) {
        Ok(_) => Ok(()),
        Err(_) => {
            core.tensor.raise_error(et_tensor::load_l2::tensor_error_on_mmu_fault());
            Ok(())
        }
    }
}

/// Vector-register-sourced stores (`store_vector` staged) still drain from
/// the L1 scratchpad here; wiring a direct vector-register source needs the
/// issuing hart's full register file threaded through, and no test in this
/// model exercises that path yet.
fn run_tensor_store(hart: &mut Hart, core: &mut Core, mem: &mut MemoryBus, addr: u64, observer: &mut dyn Observer) -> Result<(), Trap> {
    let params = core.tensor_staging.store_params(addr);
    match et_tensor::store::validate(&params, core.shire_cooperative) {
        Ok(()) => {
            let (state, ctx) = translation_for(hart, core, AccessType::TxStore);
            let agent = agent_for(hart);
            let _ = et_tensor::store::execute_from_scratchpad(&params, &core.tensor.l1, &state, &ctx, mem, agent);
            if mem.is_l2_scratchpad(addr) {
                observer.observe(ObservedEvent::L2ScratchpadStore {
                    agent,
                    shire: hart.id.shire,
                    line: params.src_index as u32,
                    offset: (addr & 0x3f) as u32,
                    len: params.rows as u32 * params.stride as u32,
                });
            }
            Ok(())
        }
        Err(e) => {
            core.tensor.raise_error(e);
            Ok(())
        }
    }
}

fn run_tensor_fma(core: &mut Core, value: u64) {
    let ctl = tensor_ctl::decode_fma_word(value);
    if ctl.shape.validate().is_err() {
        core.tensor.raise_error(et_tensor::TensorError::BAD_TRANSFORM);
        return;
    }
    core.tensor.resources.begin(et_tensor::WaitTarget::TensorFma);
    core.tensor.resources.retire(et_tensor::WaitTarget::TensorFma);
}

fn run_tensor_quant(core: &mut Core, value: u64) {
    let (ops, _nrows, _ncols) = tensor_ctl::decode_quant_word(value);
    match et_tensor::quant::QuantChain::new(ops) {
        Ok(_) => {
            core.tensor.resources.begin(et_tensor::WaitTarget::TensorQuant);
            core.tensor.resources.retire(et_tensor::WaitTarget::TensorQuant);
        }
        Err(e) => core.tensor.raise_error(e),
    }
}

fn run_tensor_reduce(core: &mut Core, value: u64) {
    let (_kind, _op, _count) = tensor_ctl::decode_reduce_word(value);
    core.tensor.resources.begin(et_tensor::WaitTarget::TensorReduce);
    core.tensor.resources.retire(et_tensor::WaitTarget::TensorReduce);
}

fn run_tensor_wait(hart: &mut Hart, core: &mut Core, value: u64) {
    let target = tensor_ctl::decode_wait_word(value);
    hart.tensor_wait = core.tensor.resources.poll(target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CoreId;
    use crate::hart::HartId;
    use crate::observer::RecordingObserver;
    use et_isa::opcode::AmoOp;
    use et_types::topology::DRAM_BASE;

    fn setup() -> (Hart, Core, MemoryBus) {
        (
            Hart::new(HartId { shire: 0, thread: 0 }),
            Core::new(CoreId { shire: 0, index: 0 }),
            MemoryBus::new(4096),
        )
    }

    fn decoded(opcode: Opcode, rd: u32, rs1: u32, rs2: u32) -> Decoded {
        Decoded {
            opcode,
            flags: InsnFlags::empty(),
            rd,
            rs1,
            rs2,
            rs3: 0,
            imm: 0,
            rm: 0,
            is_compressed: false,
            bits: 0,
        }
    }

    #[test]
    fn coherent_amo_reports_old_and_new_to_the_observer() {
        let (mut hart, mut core, mut mem) = setup();
        mem.write(agent_for(&hart), AccessType::Store, DRAM_BASE, &10u64.to_le_bytes()).unwrap();
        hart.set_x(1, DRAM_BASE);
        hart.set_x(2, 5);
        let d = decoded(Opcode::CoherentAmo { op: AmoOp::Add, local: false, is_64: true }, 3, 1, 2);
        let mut observer = RecordingObserver::new();

        execute(&mut hart, &mut core, &mut mem, &d, hart.pc, &mut observer).unwrap();

        assert_eq!(hart.x(3), 10);
        assert_eq!(observer.events.len(), 1);
        match observer.events[0] {
            ObservedEvent::CoherentAccess { old, new, local, addr, .. } => {
                assert_eq!(old, 10);
                assert_eq!(new, 15);
                assert!(!local);
                assert_eq!(addr, DRAM_BASE);
            }
            _ => panic!("expected a CoherentAccess event"),
        }
    }

    #[test]
    fn coherent_byte_store_reports_masked_old_and_new() {
        let (mut hart, mut core, mut mem) = setup();
        mem.write(agent_for(&hart), AccessType::Store, DRAM_BASE, &[0x42]).unwrap();
        hart.set_x(1, DRAM_BASE);
        hart.set_x(2, 0x7);
        let d = decoded(Opcode::CoherentByteStore { local: true, halfword: false }, 0, 1, 2);
        let mut observer = RecordingObserver::new();

        execute(&mut hart, &mut core, &mut mem, &d, hart.pc, &mut observer).unwrap();

        assert_eq!(observer.events.len(), 1);
        match observer.events[0] {
            ObservedEvent::CoherentAccess { old, new, local, .. } => {
                assert_eq!(old, 0x42);
                assert_eq!(new, 0x7);
                assert!(local);
            }
            _ => panic!("expected a CoherentAccess event"),
        }
    }

    #[test]
    fn ebreak_traps_as_breakpoint_when_no_debug_trigger_is_armed() {
        let (mut hart, mut core, mut mem) = setup();
        hart.pc = DRAM_BASE;
        let d = decoded(Opcode::Ebreak, 0, 0, 0);
        let mut observer = RecordingObserver::new();

        let err = execute(&mut hart, &mut core, &mut mem, &d, hart.pc, &mut observer).unwrap_err();
        assert!(matches!(err, Trap::Breakpoint { tval } if tval == DRAM_BASE));
    }

    #[test]
    fn ebreak_enters_debug_mode_when_ebreakm_is_set() {
        let (mut hart, mut core, mut mem) = setup();
        hart.csrs.set_raw(CsrId::DCSR, crate::csr::dcsr_bits::EBREAKM);
        let d = decoded(Opcode::Ebreak, 0, 0, 0);
        let mut observer = RecordingObserver::new();

        let outcome = execute(&mut hart, &mut core, &mut mem, &d, hart.pc, &mut observer).unwrap();
        assert_eq!(outcome, Outcome::Ebreak);
    }

    #[test]
    fn tensor_store_to_l2_scratchpad_reports_the_observer_event() {
        let (mut hart, mut core, mut mem) = setup();
        core.tensor_staging.store_rows = 1;
        core.tensor_staging.store_stride = 64;
        core.tensor_staging.store_src_index = 0;
        let mut observer = RecordingObserver::new();

        let mut d = decoded(Opcode::Ebreak, 0, 0, 0);
        d.flags = InsnFlags::TENSOR_STORE | InsnFlags::CSR_WRITE;

        dispatch_tensor_trigger(
            &mut hart,
            &mut core,
            &mut mem,
            &d,
            CsrId::TENSOR_STORE,
            et_types::topology::L2_SCP_BASE,
            &mut observer,
        )
        .unwrap();

        assert_eq!(observer.events.len(), 1);
        match observer.events[0] {
            ObservedEvent::L2ScratchpadStore { shire, line, offset, len, .. } => {
                assert_eq!(shire, hart.id.shire);
                assert_eq!(line, 0);
                assert_eq!(offset, 0);
                assert_eq!(len, 64);
            }
            _ => panic!("expected an L2ScratchpadStore event"),
        }
    }

    #[test]
    fn coherent_byte_store_halfword_requires_alignment() {
        let (mut hart, mut core, mut mem) = setup();
        hart.set_x(1, DRAM_BASE + 1);
        hart.set_x(2, 0xbeef);
        let d = decoded(Opcode::CoherentByteStore { local: false, halfword: true }, 0, 1, 2);
        let mut observer = RecordingObserver::new();

        let err = execute(&mut hart, &mut core, &mut mem, &d, hart.pc, &mut observer).unwrap_err();
        assert!(matches!(err, Trap::StoreAddressMisaligned { tval } if tval == DRAM_BASE + 1));
        assert!(observer.events.is_empty());
    }
}
