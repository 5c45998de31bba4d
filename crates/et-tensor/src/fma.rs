//! `TensorFMA`: the three tensor-multiply-accumulate shapes (spec
//! §4.6.4). B's operand source (scratchpad row vs. a paired "TenB" load)
//! and the `tensor_error.6` pairing-mismatch check live in
//! [`crate::coop`]; this module is pure arithmetic over already-gathered
//! A/B/C matrices.

use crate::error::TensorError;
use et_softfloat::RoundingMode;
use et_types::topology::{TFMA_MAX_ACOLS, TFMA_MAX_AROWS, TFMA_MAX_BCOLS};

#[derive(Debug, Clone, Copy)]
pub struct FmaShape {
    pub arows: usize,
    pub acols: usize,
    pub bcols: usize,
}

impl FmaShape {
    pub fn validate(self) -> Result<Self, TensorError> {
        if self.arows == 0
            || self.acols == 0
            || self.bcols == 0
            || self.arows > TFMA_MAX_AROWS as usize
            || self.acols > TFMA_MAX_ACOLS as usize
            || self.bcols > TFMA_MAX_BCOLS as usize
        {
            return Err(TensorError::BAD_TRANSFORM);
        }
        Ok(self)
    }
}

/// `FMA32`: `C[arows x bcols] = A[arows x acols] · B[acols x bcols]`, all
/// `f32`. `first_pass` overwrites `C` instead of accumulating into it;
/// rounding follows the caller-supplied `frm`.
pub fn fma32(shape: FmaShape, a: &[Vec<f32>], b: &[Vec<f32>], c: &mut [Vec<f32>], first_pass: bool, rm: RoundingMode) {
    et_softfloat::set_rounding_mode(rm);
    for i in 0..shape.arows {
        for j in 0..shape.bcols {
            let mut acc = if first_pass { 0.0 } else { c[i][j] };
            for k in 0..shape.acols {
                acc = et_softfloat::f32_mul_add(a[i][k], b[k][j], acc);
            }
            c[i][j] = acc;
        }
    }
}

/// `FMA16A32`: `A`/`B` are `f16`-encoded `u16`, `C` is `f32`. Each
/// accumulate step folds two K-lanes at once (`a1*b1 + a2*b2`), rounded
/// toward zero, then added into the running `f32` total.
/// `acols` must be even; an odd trailing lane is dropped (matches the
/// "two-lane dot" pairing, which has no single-lane remainder case in the
/// instruction encoding).
pub fn fma16a32(shape: FmaShape, a: &[Vec<u16>], b: &[Vec<u16>], c: &mut [Vec<f32>], first_pass: bool) {
    let pairs = shape.acols / 2;
    for i in 0..shape.arows {
        for j in 0..shape.bcols {
            let mut acc = if first_pass { 0.0 } else { c[i][j] };
            for p in 0..pairs {
                let k0 = p * 2;
                let k1 = k0 + 1;
                let a1 = et_softfloat::f16_to_f32(a[i][k0]);
                let a2 = et_softfloat::f16_to_f32(a[i][k1]);
                let b1 = et_softfloat::f16_to_f32(b[k0][j]);
                let b2 = et_softfloat::f16_to_f32(b[k1][j]);
                et_softfloat::set_rounding_mode(RoundingMode::TowardZero);
                let dot = et_softfloat::f32_add(
                    et_softfloat::f32_mul(a1, b1),
                    et_softfloat::f32_mul(a2, b2),
                );
                acc = et_softfloat::f32_add(acc, dot);
            }
            c[i][j] = acc;
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ima8Signs {
    pub a_unsigned: bool,
    pub b_unsigned: bool,
}

fn lane_to_i32(byte: u8, unsigned: bool) -> i32 {
    if unsigned {
        byte as i32
    } else {
        byte as i8 as i32
    }
}

/// `IMA8A32`: `A`/`B` are packed `i8`/`u8` per the independent sign bits in
/// `signs`, `C` is `i32`. Four K-lanes fold per accumulate step; integer
/// math is exact, no rounding mode involved.
pub fn ima8a32(shape: FmaShape, a: &[Vec<u8>], b: &[Vec<u8>], c: &mut [Vec<i32>], first_pass: bool, signs: Ima8Signs) {
    let groups = shape.acols / 4;
    for i in 0..shape.arows {
        for j in 0..shape.bcols {
            let mut acc: i32 = if first_pass { 0 } else { c[i][j] };
            for g in 0..groups {
                let mut dot: i32 = 0;
                for lane in 0..4 {
                    let k = g * 4 + lane;
                    let av = lane_to_i32(a[i][k], signs.a_unsigned);
                    let bv = lane_to_i32(b[k][j], signs.b_unsigned);
                    dot = dot.wrapping_add(av.wrapping_mul(bv));
                }
                acc = acc.wrapping_add(dot);
            }
            c[i][j] = acc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fma32_first_pass_overwrites() {
        let shape = FmaShape { arows: 1, acols: 2, bcols: 1 }.validate().unwrap();
        let a = vec![vec![1.0, 2.0]];
        let b = vec![vec![3.0], vec![4.0]];
        let mut c = vec![vec![99.0]];
        fma32(shape, &a, &b, &mut c, true, RoundingMode::NearestEven);
        assert_eq!(c[0][0], 1.0 * 3.0 + 2.0 * 4.0);
    }

    #[test]
    fn fma32_accumulates_when_not_first_pass() {
        let shape = FmaShape { arows: 1, acols: 1, bcols: 1 }.validate().unwrap();
        let a = vec![vec![2.0]];
        let b = vec![vec![3.0]];
        let mut c = vec![vec![1.0]];
        fma32(shape, &a, &b, &mut c, false, RoundingMode::NearestEven);
        assert_eq!(c[0][0], 7.0);
    }

    #[test]
    fn ima8a32_signed_unsigned_mix() {
        let shape = FmaShape { arows: 1, acols: 4, bcols: 1 }.validate().unwrap();
        let a = vec![vec![0xFFu8, 1, 1, 1]]; // -1 when signed
        let b = vec![vec![2u8], vec![2], vec![2], vec![2]];
        let mut c = vec![vec![0]];
        ima8a32(
            shape,
            &a,
            &b,
            &mut c,
            true,
            Ima8Signs { a_unsigned: false, b_unsigned: true },
        );
        assert_eq!(c[0][0], -2 + 2 + 2 + 2);
    }

    #[test]
    fn shape_validation_rejects_oversized_dims() {
        let shape = FmaShape { arows: 99, acols: 1, bcols: 1 };
        assert!(shape.validate().is_err());
    }
}
