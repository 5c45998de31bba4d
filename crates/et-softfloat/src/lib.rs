//! Binary32 (and narrower) floating point arithmetic for the RISC-V `F`
//! extension plus the Esperanto packed-single additions: reciprocal,
//! reciprocal square root, base-2 log/exp, a fractional-revolution sine, the
//! 10/11-bit packed mini-floats used by the tensor load/store transforms, and
//! the unsigned/signed fixed-point conversions used by the quantization
//! pipeline.
//!
//! The host `f32` is IEEE 754 binary32, so arithmetic is implemented directly
//! on top of it rather than re-deriving bit-level softfloat routines; what
//! this crate adds on top of `core::f32` is RISC-V-exact exception flag
//! accumulation, NaN-boxing-free canonical-NaN production, and the
//! non-IEEE Esperanto operations the host FPU has no instruction for.

mod classify;
mod cvt;
mod exceptions;
mod f16;
mod minifloat;
mod ops;
mod transcendental;

pub use classify::{classify, FpClass};
pub use cvt::{
    f32_to_i32, f32_to_i64, f32_to_ui32, f32_to_ui64, i32_to_f32, i64_to_f32, ui32_to_f32,
    ui64_to_f32,
};
pub use exceptions::ExceptionFlags;
pub use f16::{f16_to_f32, f32_to_f16};
pub use minifloat::{
    f10_to_f32, f11_to_f32, f32_to_f10, f32_to_f11, f32_to_fxp1714, f32_to_sn16, f32_to_sn8,
    f32_to_un10, f32_to_un16, f32_to_un2, f32_to_un24, f32_to_un8, fxp1516_to_f32,
    fxp1714_rcp_step, sn10_to_f32, sn16_to_f32, sn2_to_f32, sn8_to_f32, un10_to_f32, un16_to_f32,
    un2_to_f32, un24_to_f32, un8_to_f32,
};
pub use ops::{
    f32_add, f32_copy_sign, f32_copy_sign_not, f32_copy_sign_xor, f32_div, f32_eq, f32_frac,
    f32_le, f32_lt, f32_max_num, f32_maximum_number, f32_min_num, f32_minimum_number, f32_mul,
    f32_mul_add, f32_mul_sub, f32_round_to_int, f32_sqrt, f32_sub, f32_sub_mul_add, f32_sub_mul_sub,
};
pub use transcendental::{f32_exp2, f32_log2, f32_rcp, f32_rsqrt, f32_sin2pi};

/// The five IEEE 754 rounding-direction attributes used by `frm`/the
/// instruction `rm` field. `RoundingMode::Dynamic` is resolved to one of the
/// other four by the caller before operations here ever see it; this crate
/// always rounds with an already-resolved static mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingMode {
    #[default]
    NearestEven,
    TowardZero,
    TowardNegative,
    TowardPositive,
    NearestMaxMagnitude,
}

thread_local! {
    static ROUNDING_MODE: std::cell::Cell<RoundingMode> = std::cell::Cell::new(RoundingMode::NearestEven);
    static EXCEPTIONS: std::cell::Cell<ExceptionFlags> = std::cell::Cell::new(ExceptionFlags::empty());
}

/// Sets the rounding mode used by subsequently-called ops on this thread.
/// Each hart drives its own interpreter thread, so a thread-local mirrors the
/// per-hart `frm`/`fcsr` state without threading a context argument through
/// every arithmetic call, matching the reference model's global rounding
/// mode set once per instruction before dispatch.
pub fn set_rounding_mode(mode: RoundingMode) {
    ROUNDING_MODE.with(|c| c.set(mode));
}

pub fn rounding_mode() -> RoundingMode {
    ROUNDING_MODE.with(|c| c.get())
}

/// Accumulates exception flags raised by the most recent operation(s); the
/// caller reads and clears this after each instruction to update `fflags`.
pub(crate) fn raise_exceptions(flags: ExceptionFlags) {
    EXCEPTIONS.with(|c| c.set(c.get() | flags));
}

pub fn take_exceptions() -> ExceptionFlags {
    EXCEPTIONS.with(|c| {
        let v = c.get();
        c.set(ExceptionFlags::empty());
        v
    })
}
