use bitflags::bitflags;

bitflags! {
    /// `fflags`/`fcsr[4:0]` accrued-exception bits, in RISC-V bit order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExceptionFlags: u8 {
        const NX = 0b00001; // inexact
        const UF = 0b00010; // underflow
        const OF = 0b00100; // overflow
        const DZ = 0b01000; // divide by zero
        const NV = 0b10000; // invalid operation
    }
}
