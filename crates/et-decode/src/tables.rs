//! RV64IMAFC decode: the two-level scheme the interpreter dispatch loop
//! mirrors (index `inst[6:2]` first, then `funct3`/`funct7` within each
//! opcode's handler), matching the reference model's handler-per-opcode
//! table and avoiding a single giant flat match.

use crate::csr_flags;
use crate::decoded::Decoded;
use crate::fields::Insn32;
use et_isa::csr::CsrId;
use et_isa::opcode::{AmoOp, Csr, Opcode};
use et_isa::InsnFlags;

pub fn decode_32(raw: u32) -> Decoded {
    let insn = Insn32(raw);
    match insn.opcode() {
        0x37 => simple(raw, Opcode::Lui, insn.rd(), 0, 0, insn.u_imm(), 0),
        0x17 => simple(raw, Opcode::Auipc, insn.rd(), 0, 0, insn.u_imm(), 0),
        0x6f => simple(raw, Opcode::Jal, insn.rd(), 0, 0, insn.j_imm(), 0),
        0x67 if insn.funct3() == 0 => {
            simple(raw, Opcode::Jalr, insn.rd(), insn.rs1(), 0, insn.i_imm(), 0)
        }
        0x63 => decode_branch(raw, insn),
        0x03 => decode_load(raw, insn),
        0x23 => decode_store(raw, insn),
        0x0f => decode_fence(raw, insn),
        0x13 => decode_op_imm(raw, insn),
        0x1b => decode_op_imm_32(raw, insn),
        0x33 => decode_op(raw, insn),
        0x3b => decode_op_32(raw, insn),
        0x73 => decode_system(raw, insn),
        0x2f => decode_amo(raw, insn),
        0x07 if insn.funct3() == 2 => {
            simple(raw, Opcode::Flw, insn.rd(), insn.rs1(), 0, insn.i_imm(), 0)
        }
        0x27 if insn.funct3() == 2 => {
            simple(raw, Opcode::Fsw, 0, insn.rs1(), insn.rs2(), insn.s_imm(), 0)
        }
        0x43 => fused(raw, Opcode::FmaddS, insn),
        0x47 => fused(raw, Opcode::FmsubS, insn),
        0x4b => fused(raw, Opcode::FnmsubS, insn),
        0x4f => fused(raw, Opcode::FnmaddS, insn),
        0x53 => decode_op_fp(raw, insn),
        _ => Decoded::illegal(raw, false),
    }
}

fn simple(bits: u32, opcode: Opcode, rd: u32, rs1: u32, rs2: u32, imm: i64, rm: u32) -> Decoded {
    Decoded {
        opcode,
        flags: InsnFlags::empty(),
        rd,
        rs1,
        rs2,
        rs3: 0,
        imm,
        rm,
        is_compressed: false,
        bits,
    }
}

fn fused(bits: u32, opcode: Opcode, insn: Insn32) -> Decoded {
    Decoded {
        opcode,
        flags: InsnFlags::empty(),
        rd: insn.rd(),
        rs1: insn.rs1(),
        rs2: insn.rs2(),
        rs3: insn.fs3(),
        imm: 0,
        rm: insn.rm(),
        is_compressed: false,
        bits,
    }
}

fn decode_branch(bits: u32, insn: Insn32) -> Decoded {
    let opcode = match insn.funct3() {
        0b000 => Opcode::Beq,
        0b001 => Opcode::Bne,
        0b100 => Opcode::Blt,
        0b101 => Opcode::Bge,
        0b110 => Opcode::Bltu,
        0b111 => Opcode::Bgeu,
        _ => return Decoded::illegal(bits, false),
    };
    simple(bits, opcode, 0, insn.rs1(), insn.rs2(), insn.b_imm(), 0)
}

fn decode_load(bits: u32, insn: Insn32) -> Decoded {
    let opcode = match insn.funct3() {
        0b000 => Opcode::Lb,
        0b001 => Opcode::Lh,
        0b010 => Opcode::Lw,
        0b011 => Opcode::Ld,
        0b100 => Opcode::Lbu,
        0b101 => Opcode::Lhu,
        0b110 => Opcode::Lwu,
        _ => return Decoded::illegal(bits, false),
    };
    let mut d = simple(bits, opcode, insn.rd(), insn.rs1(), 0, insn.i_imm(), 0);
    d.flags |= InsnFlags::LOAD;
    d
}

fn decode_store(bits: u32, insn: Insn32) -> Decoded {
    let opcode = match insn.funct3() {
        0b000 => Opcode::Sb,
        0b001 => Opcode::Sh,
        0b010 => Opcode::Sw,
        0b011 => Opcode::Sd,
        _ => return Decoded::illegal(bits, false),
    };
    simple(bits, opcode, 0, insn.rs1(), insn.rs2(), insn.s_imm(), 0)
}

fn decode_fence(bits: u32, insn: Insn32) -> Decoded {
    match insn.funct3() {
        0b000 => simple(bits, Opcode::Fence, 0, 0, 0, 0, 0),
        0b001 => simple(bits, Opcode::FenceI, 0, 0, 0, 0, 0),
        _ => Decoded::illegal(bits, false),
    }
}

fn decode_op_imm(bits: u32, insn: Insn32) -> Decoded {
    match insn.funct3() {
        0b000 => simple(bits, Opcode::Addi, insn.rd(), insn.rs1(), 0, insn.i_imm(), 0),
        0b010 => simple(bits, Opcode::Slti, insn.rd(), insn.rs1(), 0, insn.i_imm(), 0),
        0b011 => simple(bits, Opcode::Sltiu, insn.rd(), insn.rs1(), 0, insn.i_imm(), 0),
        0b100 => simple(bits, Opcode::Xori, insn.rd(), insn.rs1(), 0, insn.i_imm(), 0),
        0b110 => simple(bits, Opcode::Ori, insn.rd(), insn.rs1(), 0, insn.i_imm(), 0),
        0b111 => simple(bits, Opcode::Andi, insn.rd(), insn.rs1(), 0, insn.i_imm(), 0),
        0b001 => simple(
            bits,
            Opcode::Slli,
            insn.rd(),
            insn.rs1(),
            0,
            insn.shamt6() as i64,
            0,
        ),
        0b101 => {
            let opcode = if insn.funct7() & 0x20 != 0 {
                Opcode::Srai
            } else {
                Opcode::Srli
            };
            simple(bits, opcode, insn.rd(), insn.rs1(), 0, insn.shamt6() as i64, 0)
        }
        _ => Decoded::illegal(bits, false),
    }
}

fn decode_op_imm_32(bits: u32, insn: Insn32) -> Decoded {
    match insn.funct3() {
        0b000 => simple(bits, Opcode::Addiw, insn.rd(), insn.rs1(), 0, insn.i_imm(), 0),
        0b001 => simple(
            bits,
            Opcode::Slliw,
            insn.rd(),
            insn.rs1(),
            0,
            insn.shamt5() as i64,
            0,
        ),
        0b101 => {
            let opcode = if insn.funct7() & 0x20 != 0 {
                Opcode::Sraiw
            } else {
                Opcode::Srliw
            };
            simple(bits, opcode, insn.rd(), insn.rs1(), 0, insn.shamt5() as i64, 0)
        }
        _ => Decoded::illegal(bits, false),
    }
}

fn decode_op(bits: u32, insn: Insn32) -> Decoded {
    let opcode = match (insn.funct7(), insn.funct3()) {
        (0x00, 0b000) => Opcode::Add,
        (0x20, 0b000) => Opcode::Sub,
        (0x00, 0b001) => Opcode::Sll,
        (0x00, 0b010) => Opcode::Slt,
        (0x00, 0b011) => Opcode::Sltu,
        (0x00, 0b100) => Opcode::Xor,
        (0x00, 0b101) => Opcode::Srl,
        (0x20, 0b101) => Opcode::Sra,
        (0x00, 0b110) => Opcode::Or,
        (0x00, 0b111) => Opcode::And,
        (0x01, 0b000) => Opcode::Mul,
        (0x01, 0b001) => Opcode::Mulh,
        (0x01, 0b010) => Opcode::Mulhsu,
        (0x01, 0b011) => Opcode::Mulhu,
        (0x01, 0b100) => Opcode::Div,
        (0x01, 0b101) => Opcode::Divu,
        (0x01, 0b110) => Opcode::Rem,
        (0x01, 0b111) => Opcode::Remu,
        _ => return Decoded::illegal(bits, false),
    };
    simple(bits, opcode, insn.rd(), insn.rs1(), insn.rs2(), 0, 0)
}

fn decode_op_32(bits: u32, insn: Insn32) -> Decoded {
    let opcode = match (insn.funct7(), insn.funct3()) {
        (0x00, 0b000) => Opcode::Addw,
        (0x20, 0b000) => Opcode::Subw,
        (0x00, 0b001) => Opcode::Sllw,
        (0x00, 0b101) => Opcode::Srlw,
        (0x20, 0b101) => Opcode::Sraw,
        (0x01, 0b000) => Opcode::Mulw,
        (0x01, 0b100) => Opcode::Divw,
        (0x01, 0b101) => Opcode::Divuw,
        (0x01, 0b110) => Opcode::Remw,
        (0x01, 0b111) => Opcode::Remuw,
        _ => return Decoded::illegal(bits, false),
    };
    simple(bits, opcode, insn.rd(), insn.rs1(), insn.rs2(), 0, 0)
}

fn decode_amo(bits: u32, insn: Insn32) -> Decoded {
    let is_64 = match insn.funct3() {
        0b010 => false,
        0b011 => true,
        _ => return Decoded::illegal(bits, false),
    };
    let opcode = match (insn.funct5(), is_64) {
        (0b00010, false) => Opcode::LrW,
        (0b00010, true) => Opcode::LrD,
        (0b00011, false) => Opcode::ScW,
        (0b00011, true) => Opcode::ScD,
        (0b00001, false) => Opcode::AmoswapW,
        (0b00001, true) => Opcode::AmoswapD,
        (0b00000, false) => Opcode::AmoaddW,
        (0b00000, true) => Opcode::AmoaddD,
        (0b00100, false) => Opcode::AmoxorW,
        (0b00100, true) => Opcode::AmoxorD,
        (0b01100, false) => Opcode::AmoandW,
        (0b01100, true) => Opcode::AmoandD,
        (0b01000, false) => Opcode::AmoorW,
        (0b01000, true) => Opcode::AmoorD,
        (0b10000, false) => Opcode::AmominW,
        (0b10000, true) => Opcode::AmominD,
        (0b10100, false) => Opcode::AmomaxW,
        (0b10100, true) => Opcode::AmomaxD,
        (0b11000, false) => Opcode::AmominuW,
        (0b11000, true) => Opcode::AmominuD,
        (0b11100, false) => Opcode::AmomaxuW,
        (0b11100, true) => Opcode::AmomaxuD,
        _ => return Decoded::illegal(bits, false),
    };
    let mut d = simple(bits, opcode, insn.rd(), insn.rs1(), insn.rs2(), 0, 0);
    d.flags |= InsnFlags::CMO;
    d
}

fn decode_system(bits: u32, insn: Insn32) -> Decoded {
    if insn.funct3() == 0 {
        return match (insn.funct7(), insn.rs2(), insn.rd(), insn.rs1()) {
            (0x00, 0x00, 0, 0) => simple(bits, Opcode::Ecall, 0, 0, 0, 0, 0),
            (0x00, 0x01, 0, 0) => simple(bits, Opcode::Ebreak, 0, 0, 0, 0, 0),
            (0x18, 0x02, 0, 0) => simple(bits, Opcode::Mret, 0, 0, 0, 0, 0),
            (0x08, 0x02, 0, 0) => simple(bits, Opcode::Sret, 0, 0, 0, 0, 0),
            (0x08, 0x05, 0, 0) => {
                let mut d = simple(bits, Opcode::Wfi, 0, 0, 0, 0, 0);
                d.flags |= InsnFlags::WFI;
                d
            }
            (0x09, _, 0, _) => simple(bits, Opcode::SfenceVma, 0, insn.rs1(), insn.rs2(), 0, 0),
            _ => Decoded::illegal(bits, false),
        };
    }

    let addr = insn.csrimm();
    let id = CsrId::from_addr(addr);
    let mut flags = InsnFlags::empty();
    if let Some(id) = id {
        flags |= csr_flags::extra_flags(id);
    }
    let csr = Csr { addr, id };

    let (opcode, rs1, imm, read, write): (fn(Csr) -> Opcode, u32, i64, bool, bool) =
        match insn.funct3() {
            0b001 => (Opcode::Csrrw, insn.rs1(), 0, insn.rd() != 0, true),
            0b010 => (Opcode::Csrrs, insn.rs1(), 0, true, insn.rs1() != 0),
            0b011 => (Opcode::Csrrc, insn.rs1(), 0, true, insn.rs1() != 0),
            0b101 => (Opcode::Csrrwi, 0, insn.uimm5() as i64, insn.rd() != 0, true),
            0b110 => (Opcode::Csrrsi, 0, insn.uimm5() as i64, true, insn.uimm5() != 0),
            0b111 => (Opcode::Csrrci, 0, insn.uimm5() as i64, true, insn.uimm5() != 0),
            _ => return Decoded::illegal(bits, false),
        };
    if read {
        flags |= InsnFlags::CSR_READ;
    }
    if write {
        flags |= InsnFlags::CSR_WRITE;
    }
    Decoded {
        opcode: opcode(csr),
        flags,
        rd: insn.rd(),
        rs1,
        rs2: 0,
        rs3: 0,
        imm,
        rm: 0,
        is_compressed: false,
        bits,
    }
}

fn decode_op_fp(bits: u32, insn: Insn32) -> Decoded {
    let opcode = match insn.funct7() {
        0x00 => Opcode::FaddS,
        0x04 => Opcode::FsubS,
        0x08 => Opcode::FmulS,
        0x0c => Opcode::FdivS,
        0x2c => Opcode::FsqrtS,
        0x10 => match insn.funct3() {
            0b000 => Opcode::FsgnjS,
            0b001 => Opcode::FsgnjnS,
            0b010 => Opcode::FsgnjxS,
            _ => return Decoded::illegal(bits, false),
        },
        0x14 => match insn.funct3() {
            0b000 => Opcode::FminS,
            0b001 => Opcode::FmaxS,
            _ => return Decoded::illegal(bits, false),
        },
        0x60 => match insn.rs2() {
            0 => Opcode::FcvtWS,
            1 => Opcode::FcvtWuS,
            2 => Opcode::FcvtLS,
            3 => Opcode::FcvtLuS,
            _ => return Decoded::illegal(bits, false),
        },
        0x70 => match insn.funct3() {
            0b000 => Opcode::FmvXW,
            0b001 => Opcode::FclassS,
            _ => return Decoded::illegal(bits, false),
        },
        0x50 => match insn.funct3() {
            0b010 => Opcode::FeqS,
            0b001 => Opcode::FltS,
            0b000 => Opcode::FleS,
            _ => return Decoded::illegal(bits, false),
        },
        0x68 => match insn.rs2() {
            0 => Opcode::FcvtSW,
            1 => Opcode::FcvtSWu,
            2 => Opcode::FcvtSL,
            3 => Opcode::FcvtSLu,
            _ => return Decoded::illegal(bits, false),
        },
        0x78 => Opcode::FmvWX,
        _ => return Decoded::illegal(bits, false),
    };
    Decoded {
        opcode,
        flags: InsnFlags::empty(),
        rd: insn.rd(),
        rs1: insn.rs1(),
        rs2: insn.rs2(),
        rs3: 0,
        imm: 0,
        rm: insn.rm(),
        is_compressed: false,
        bits,
    }
}

/// Shared by `amo<op>{l,g}.{w,d}` decode once a custom-opcode scheme assigns
/// them a funct5 slot; kept here so the coherent/ordinary AMO tables read
/// the same operation enum.
pub fn amo_op_from_funct5(funct5: u32) -> Option<AmoOp> {
    Some(match funct5 {
        0b00000 => AmoOp::Add,
        0b00001 => AmoOp::Swap,
        0b00100 => AmoOp::Xor,
        0b01000 => AmoOp::Or,
        0b01100 => AmoOp::And,
        0b10000 => AmoOp::Min,
        0b10100 => AmoOp::Max,
        0b11000 => AmoOp::Minu,
        0b11100 => AmoOp::Maxu,
        _ => return None,
    })
}
