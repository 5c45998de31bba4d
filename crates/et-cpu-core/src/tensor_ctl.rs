//! Packs/unpacks the tensor-engine control CSRs into the parameter structs
//! `et-tensor`'s engines expect. The reference `decode.cpp` that assigns
//! these CSRs their exact bit layouts isn't in the retrieved sources, so the
//! layout below is this model's own (documented in DESIGN.md as an Open
//! Question decision): `TENSOR_CONV_SIZE` stages the next `TensorLoad`'s
//! shape, `TENSOR_MASK`/`TENSOR_COOP` stage masking/cooperation, and the
//! trigger CSRs (`TENSOR_LOAD`, `TENSOR_STORE`, ...) carry the virtual
//! address (load/store) or the whole operation's control word (FMA/quant/
//! reduce/wait, which never touch memory directly).

use et_tensor::fma::{FmaShape, Ima8Signs};
use et_tensor::load::LoadParams;
use et_tensor::load_l2::LoadL2Params;
use et_tensor::quant::QuantOp;
use et_tensor::reduce::{ReduceKind, ReduceOp};
use et_tensor::store::{StoreParams, StoreSource};
use et_tensor::wait::WaitTarget;

/// Config staged by `TENSOR_MASK`/`TENSOR_COOP`/`TENSOR_CONV_SIZE`/
/// `TENSOR_CONV_CTRL` writes, consumed by the next trigger write.
#[derive(Debug, Clone, Copy, Default)]
pub struct TensorStaging {
    pub tensor_mask: u8,
    pub use_coop: bool,
    pub coop_id: u8,
    pub minion_mask: u64,
    pub neigh_mask: u32,
    pub load_trans: u8,
    pub load_dst: u8,
    pub load_tenb: bool,
    pub load_rows: u8,
    pub load_stride: u64,
    pub load_id: u8,
    pub load_boffset: u32,
    pub store_vector: bool,
    pub store_cols: u8,
    pub store_coop: bool,
    pub store_src_index: u8,
    pub store_rows: u8,
    pub store_stride: u64,
}

impl TensorStaging {
    pub fn apply_mask_write(&mut self, value: u64) {
        self.tensor_mask = value as u8;
    }

    pub fn apply_coop_write(&mut self, value: u64) {
        self.use_coop = value & 1 != 0;
        self.coop_id = ((value >> 1) & 0xff) as u8;
        self.minion_mask = (value >> 9) & 0xffff_ffff;
        self.neigh_mask = ((value >> 41) & 0xff) as u32;
    }

    pub fn apply_conv_size_write(&mut self, value: u64) {
        self.load_dst = (value & 0x3f) as u8;
        self.load_tenb = (value >> 6) & 1 != 0;
        self.load_trans = ((value >> 7) & 0x7) as u8;
        self.load_rows = ((value >> 10) & 0xff) as u8;
        self.load_stride = ((value >> 18) & 0xff) * 8;
        self.load_id = ((value >> 26) & 1) as u8;
        self.load_boffset = ((value >> 27) & 0xffff) as u32;
    }

    pub fn apply_conv_ctrl_write(&mut self, value: u64) {
        self.store_vector = value & 1 != 0;
        self.store_cols = match (value >> 1) & 0x3 {
            0 => 1,
            1 => 2,
            _ => 4,
        };
        self.store_coop = (value >> 3) & 1 != 0;
        self.store_src_index = ((value >> 4) & 0x3f) as u8;
        self.store_rows = ((value >> 10) & 0xff) as u8;
        self.store_stride = ((value >> 18) & 0xff) * 8;
    }

    pub fn load_params(&self, addr: u64) -> LoadParams {
        LoadParams {
            tm: self.tensor_mask != 0,
            use_coop: self.use_coop,
            trans: self.load_trans,
            dst: self.load_dst,
            tenb: self.load_tenb,
            addr,
            boffset: self.load_boffset,
            rows: self.load_rows.max(1),
            stride: if self.load_stride == 0 { 64 } else { self.load_stride },
            id: self.load_id,
            tensor_mask: self.tensor_mask,
        }
    }

    pub fn load_l2_params(&self, addr: u64) -> LoadL2Params {
        LoadL2Params {
            tm: self.tensor_mask != 0,
            dst: self.load_dst as u16,
            rows: self.load_rows.max(1),
            addr,
            stride: if self.load_stride == 0 { 64 } else { self.load_stride },
            id: self.load_id,
            tensor_mask: self.tensor_mask,
        }
    }

    pub fn store_params(&self, addr: u64) -> StoreParams {
        StoreParams {
            source: if self.store_vector {
                StoreSource::VectorRegisters { cols: self.store_cols }
            } else {
                StoreSource::Scratchpad
            },
            coop: self.store_coop,
            src_index: self.store_src_index,
            rows: self.store_rows.max(1),
            addr,
            stride: if self.store_stride == 0 { 64 } else { self.store_stride },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmaKind {
    Fma32,
    Fma16A32,
    Ima8A32,
}

pub struct FmaControl {
    pub kind: FmaKind,
    pub shape: FmaShape,
    pub first_pass: bool,
    pub signs: Ima8Signs,
    pub tenb: bool,
    pub tenc2rf: bool,
}

pub fn decode_fma_word(value: u64) -> FmaControl {
    let shape = FmaShape {
        arows: ((value & 0x1f) as usize).max(1),
        acols: (((value >> 5) & 0x1f) as usize).max(1),
        bcols: (((value >> 10) & 0x1f) as usize).max(1),
    };
    let first_pass = (value >> 15) & 1 != 0;
    let kind = match (value >> 16) & 0x3 {
        0 => FmaKind::Fma32,
        1 => FmaKind::Fma16A32,
        _ => FmaKind::Ima8A32,
    };
    let tenb = (value >> 18) & 1 != 0;
    let signs = Ima8Signs {
        a_unsigned: (value >> 19) & 1 != 0,
        b_unsigned: (value >> 20) & 1 != 0,
    };
    let tenc2rf = (value >> 21) & 1 != 0;
    FmaControl { kind, shape, first_pass, signs, tenb, tenc2rf }
}

pub fn decode_quant_word(value: u64) -> (Vec<QuantOp>, u8, u8) {
    let mut ops = Vec::new();
    for i in 0..10u32 {
        let nibble = ((value >> (4 * i)) & 0xf) as u8;
        match quant_op_from_nibble(nibble) {
            Some(op) => ops.push(op),
            None => break,
        }
    }
    let nrows = (((value >> 40) & 0xf) as u8) + 1;
    let ncols = ((value >> 44) & 0x3f) as u8;
    (ops, nrows, ncols.max(1))
}

fn quant_op_from_nibble(n: u8) -> Option<QuantOp> {
    Some(match n {
        0 => QuantOp::Int32ToFp32,
        1 => QuantOp::Fp32ToInt32,
        2 => QuantOp::Int32Relu,
        3 => QuantOp::Int32AddRow,
        4 => QuantOp::Int32AddCol,
        5 => QuantOp::Fp32MulRow,
        6 => QuantOp::Fp32MulCol,
        7 => QuantOp::SatInt8,
        8 => QuantOp::SatUint8,
        9 => QuantOp::Pack128B,
        _ => return None,
    })
}

pub fn decode_reduce_word(value: u64) -> (ReduceKind, ReduceOp, usize) {
    let kind = match value & 0x3 {
        0 => ReduceKind::Send,
        1 => ReduceKind::Recv,
        2 => ReduceKind::Broadcast,
        _ => ReduceKind::Reduce,
    };
    let op = match (value >> 2) & 0x7 {
        0 => ReduceOp::FAdd,
        1 => ReduceOp::FMax,
        2 => ReduceOp::FMin,
        3 => ReduceOp::IAdd,
        4 => ReduceOp::IMax,
        5 => ReduceOp::IMin,
        _ => ReduceOp::FGet,
    };
    let reg_count = (((value >> 5) & 0x7f) as usize).max(1);
    (kind, op, reg_count)
}

pub fn decode_wait_word(value: u64) -> WaitTarget {
    let id = ((value >> 4) & 1) as u8;
    match value & 0xf {
        0 => WaitTarget::TensorLoad(id),
        1 => WaitTarget::TensorLoadL2(id),
        2 => WaitTarget::Prefetch(id),
        3 => WaitTarget::CacheOp,
        4 => WaitTarget::TensorFma,
        5 => WaitTarget::TensorStore,
        6 => WaitTarget::TensorReduce,
        _ => WaitTarget::TensorQuant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conv_size_round_trips_fields() {
        let mut staging = TensorStaging::default();
        let word = 5u64 | (1 << 6) | (2 << 7) | (4 << 10) | (8 << 18) | (1 << 26);
        staging.apply_conv_size_write(word);
        let p = staging.load_params(0x1000);
        assert_eq!(p.dst, 5);
        assert!(p.tenb);
        assert_eq!(p.trans, 2);
        assert_eq!(p.rows, 4);
        assert_eq!(p.stride, 64);
        assert_eq!(p.id, 1);
    }

    #[test]
    fn fma_word_decodes_shape_and_kind() {
        let word = 4u64 | (4 << 5) | (4 << 10) | (1 << 15) | (1 << 16);
        let ctl = decode_fma_word(word);
        assert_eq!(ctl.kind, FmaKind::Fma16A32);
        assert!(ctl.first_pass);
        assert_eq!(ctl.shape.arows, 4);
    }

    #[test]
    fn quant_word_stops_at_first_unrecognised_nibble() {
        let word = 0u64 | (1 << 4) | (0xf << 8);
        let (ops, _, _) = decode_quant_word(word);
        assert_eq!(ops, vec![QuantOp::Int32ToFp32, QuantOp::Fp32ToInt32]);
    }
}
