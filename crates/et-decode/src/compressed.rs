//! RV64C decode: expands a 16-bit compressed instruction directly to its
//! full-width `Opcode`/operand equivalent rather than re-synthesizing a
//! 32-bit word and re-running the 32-bit tables, mirroring the reference
//! model's per-compressed-opcode handlers (`insn_t::rvc_*`).

use crate::decoded::Decoded;
use crate::fields::Insn16;
use et_isa::opcode::Opcode;
use et_isa::InsnFlags;

fn simple(bits: u16, opcode: Opcode, rd: u32, rs1: u32, rs2: u32, imm: i64) -> Decoded {
    Decoded {
        opcode,
        flags: InsnFlags::empty(),
        rd,
        rs1,
        rs2,
        rs3: 0,
        imm,
        rm: 0,
        is_compressed: true,
        bits: bits as u32,
    }
}

pub fn decode_16(raw: u16) -> Decoded {
    let c = Insn16(raw);
    match (c.op(), c.funct3()) {
        (0b00, 0b000) => {
            if raw == 0 {
                return Decoded::illegal(raw as u32, true);
            }
            // c.addi4spn rd', x2, nzuimm
            simple(raw, Opcode::Addi, rvc_rdp(raw), 2, 0, c.nzuimm_addi4spn())
        }
        (0b00, 0b011) => {
            // c.ld rd', rs1', offset
            let mut d = simple(raw, Opcode::Ld, rvc_rdp(raw), rvc_rs1p(raw), 0, c.imm_lsd());
            d.flags |= InsnFlags::LOAD;
            d
        }
        (0b00, 0b010) => {
            // c.lw rd', rs1', offset
            let mut d = simple(raw, Opcode::Lw, rvc_rdp(raw), rvc_rs1p(raw), 0, c.imm_lsw());
            d.flags |= InsnFlags::LOAD;
            d
        }
        (0b00, 0b111) => simple(raw, Opcode::Sd, 0, rvc_rs1p(raw), rvc_rs2p(raw), c.imm_lsd()),
        (0b00, 0b110) => simple(raw, Opcode::Sw, 0, rvc_rs1p(raw), rvc_rs2p(raw), c.imm_lsw()),

        (0b01, 0b000) => simple(raw, Opcode::Addi, c.rs1(), c.rs1(), 0, c.imm6()),
        (0b01, 0b001) => {
            // c.addiw rd, rd, imm (rd != 0)
            simple(raw, Opcode::Addiw, c.rs1(), c.rs1(), 0, c.imm6())
        }
        (0b01, 0b010) => simple(raw, Opcode::Addi, c.rs1(), 0, 0, c.imm6()), // c.li
        (0b01, 0b011) => {
            if c.rs1() == 2 {
                simple(raw, Opcode::Addi, 2, 2, 0, c.nzimm_addi16sp())
            } else {
                simple(raw, Opcode::Lui, c.rs1(), 0, 0, c.nzimm_lui())
            }
        }
        (0b01, 0b100) => decode_c_misc_alu(raw, c),
        (0b01, 0b101) => simple(raw, Opcode::Jal, 0, 0, 0, c.j_imm()), // c.j, rd=x0
        (0b01, 0b110) => simple(raw, Opcode::Beq, 0, rvc_rs1p(raw), 0, c.b_imm()),
        (0b01, 0b111) => simple(raw, Opcode::Bne, 0, rvc_rs1p(raw), 0, c.b_imm()),

        (0b10, 0b000) => simple(raw, Opcode::Slli, c.rs1(), c.rs1(), 0, c.shamt() as i64),
        (0b10, 0b011) => {
            // c.ldsp rd, x2, offset (rd != 0)
            let mut d = simple(raw, Opcode::Ld, c.rs1(), 2, 0, c.imm_ldsp());
            d.flags |= InsnFlags::LOAD;
            d
        }
        (0b10, 0b010) => {
            // c.lwsp rd, x2, offset (rd != 0)
            let mut d = simple(raw, Opcode::Lw, c.rs1(), 2, 0, c.imm_lwsp());
            d.flags |= InsnFlags::LOAD;
            d
        }
        (0b10, 0b100) => decode_c_jr_mv(raw, c),
        (0b10, 0b111) => simple(raw, Opcode::Sd, 0, 2, c.rs2(), c.imm_sdsp()),
        (0b10, 0b110) => simple(raw, Opcode::Sw, 0, 2, c.rs2(), c.imm_swsp()),

        _ => Decoded::illegal(raw as u32, true),
    }
}

fn rvc_rdp(raw: u16) -> u32 {
    Insn16(raw).rs1p()
}
fn rvc_rs1p(raw: u16) -> u32 {
    Insn16(raw).rs1p()
}
fn rvc_rs2p(raw: u16) -> u32 {
    Insn16(raw).rs2p()
}

fn decode_c_misc_alu(raw: u16, c: Insn16) -> Decoded {
    let funct2_hi = (raw >> 10) & 0x3;
    let rdp = c.rs1p();
    match funct2_hi {
        0b00 => simple(raw, Opcode::Srli, rdp, rdp, 0, c.shamt() as i64),
        0b01 => simple(raw, Opcode::Srai, rdp, rdp, 0, c.shamt() as i64),
        0b10 => simple(raw, Opcode::Andi, rdp, rdp, 0, c.imm6()),
        0b11 => {
            let funct1 = (raw >> 12) & 1;
            let funct2_lo = (raw >> 5) & 0x3;
            let rs2p = c.rs2p();
            let opcode = match (funct1, funct2_lo) {
                (0, 0b00) => Opcode::Sub,
                (0, 0b01) => Opcode::Xor,
                (0, 0b10) => Opcode::Or,
                (0, 0b11) => Opcode::And,
                (1, 0b00) => Opcode::Subw,
                (1, 0b01) => Opcode::Addw,
                _ => return Decoded::illegal(raw as u32, true),
            };
            simple(raw, opcode, rdp, rdp, rs2p, 0)
        }
        _ => unreachable!(),
    }
}

fn decode_c_jr_mv(raw: u16, c: Insn16) -> Decoded {
    let funct1 = (raw >> 12) & 1;
    let rs1 = c.rs1();
    let rs2 = c.rs2();
    match (funct1, rs2) {
        (0, 0) => {
            if rs1 == 0 {
                Decoded::illegal(raw as u32, true)
            } else {
                simple(raw, Opcode::Jalr, 0, rs1, 0, 0) // c.jr, rd=x0
            }
        }
        (0, _) => simple(raw, Opcode::Add, rs1, 0, rs2, 0), // c.mv rd, rs2 -> add rd, x0, rs2
        (1, 0) => {
            if rs1 == 0 {
                simple(raw, Opcode::Ebreak, 0, 0, 0, 0)
            } else {
                simple(raw, Opcode::Jalr, 1, rs1, 0, 0) // c.jalr, rd=x1
            }
        }
        (1, _) => simple(raw, Opcode::Add, rs1, rs1, rs2, 0), // c.add rd, rd, rs2
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_nop_is_addi_x0_x0_0() {
        let d = decode_16(0x0001);
        assert!(matches!(d.opcode, Opcode::Addi));
        assert_eq!(d.rd, 0);
        assert_eq!(d.imm, 0);
    }

    #[test]
    fn all_zero_bits_is_illegal() {
        let d = decode_16(0x0000);
        assert!(matches!(d.opcode, Opcode::Illegal));
    }
}
