//! The Validation1 UART: a single register that both emits
//! characters to stdout and, once switched into diagnostic mode, turns
//! subsequent reads into a live snapshot of `emu_cycle`. The reference
//! model instantiates this once per PU/SPIO UART pairing
//! (`pu_uart{0,1}`/`spio_uart{0,1}`); this type models one instance.

use std::io::Write;

/// Byte 0 of a write is the data byte; byte 1 selects control behavior.
/// The retrieved sources don't pin exact bit positions for the control
/// field, so this layout is this crate's own choice — see DESIGN.md.
const CONTROL_CHAR: u8 = 0;
const CONTROL_DIAG_CYCLE: u8 = 1;
const EOT: u8 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartEffect {
    /// Nothing the scheduler needs to act on.
    None,
    /// EOT was written: the simulation should terminate gracefully.
    GracefulEnd,
}

/// One Validation1 UART channel. `-pu_uart{0,1}_tx_file`/
/// `-spio_uart{0,1}_tx_file` redirect its character stream to a file
/// instead of stdout; [`Uart::new_to`] takes that writer directly.
pub struct Uart {
    out: Box<dyn Write + Send>,
    line: Vec<u8>,
    diag_mode: bool,
}

impl Uart {
    pub fn new() -> Self {
        Uart { out: Box::new(std::io::stdout()), line: Vec::new(), diag_mode: false }
    }

    pub fn new_to(writer: Box<dyn Write + Send>) -> Self {
        Uart { out: writer, line: Vec::new(), diag_mode: false }
    }

    /// Handles a write of `value`. A character write is buffered a line at
    /// a time and flushed on `\n`, matching "flushed at newline"; `0x04`
    /// (EOT) asks the caller to end the simulation instead of emitting
    /// anything.
    pub fn write(&mut self, value: u64) -> UartEffect {
        let data = value as u8;
        let control = (value >> 8) as u8;
        match control {
            CONTROL_DIAG_CYCLE => {
                self.diag_mode = true;
                UartEffect::None
            }
            CONTROL_CHAR => {
                if data == EOT {
                    return UartEffect::GracefulEnd;
                }
                self.line.push(data);
                if data == b'\n' {
                    let _ = self.out.write_all(&self.line);
                    let _ = self.out.flush();
                    self.line.clear();
                }
                UartEffect::None
            }
            _ => UartEffect::None,
        }
    }

    /// A read of the register: once a diagnostic-mode write has latched,
    /// reads return `emu_cycle` instead of any UART status bits.
    pub fn read(&self, emu_cycle: u64) -> u64 {
        if self.diag_mode {
            emu_cycle
        } else {
            0
        }
    }
}

impl Default for Uart {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn char_write_buffers_until_newline() {
        let shared = Arc::new(Mutex::new(Vec::new()));
        let mut uart = Uart::new_to(Box::new(SharedBuf(shared.clone())));
        uart.write(b'h' as u64);
        uart.write(b'i' as u64);
        assert!(shared.lock().unwrap().is_empty());
        uart.write(b'\n' as u64);
        assert_eq!(&*shared.lock().unwrap(), b"hi\n");
    }

    #[test]
    fn eot_requests_graceful_end() {
        let mut uart = Uart::new();
        assert_eq!(uart.write(EOT as u64), UartEffect::GracefulEnd);
    }

    #[test]
    fn diag_cycle_control_switches_reads_to_cycle_snapshot() {
        let mut uart = Uart::new();
        assert_eq!(uart.read(42), 0);
        uart.write((CONTROL_DIAG_CYCLE as u64) << 8);
        assert_eq!(uart.read(42), 42);
    }
}
