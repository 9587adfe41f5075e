use std::io::{ErrorKind, Read};
use std::thread;
use std::time::Duration;
use serialport::{ClearBuffer, SerialPort};
use crate::drivers::AcquisitionError;
/// Read timeout applied to the serial port; keeps the loop from stalling.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// The ESP32 resets when the port opens; give it time to boot.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);
/// A line longer than this without a newline is flushed as-is.
const MAX_LINE_BYTES: usize = 4096;
/// Newline-delimited text stream coming from the microcontroller.
pub trait LineTransport {
    /// Whether a read is worth attempting right now. Never blocks.
    fn bytes_available(&mut self) -> Result<bool, AcquisitionError>;
    /// Next complete line, decoded lossily. `Ok(None)` when only a partial
    /// line arrived within the read timeout.
    fn read_line(&mut self) -> Result<Option<String>, AcquisitionError>;
    /// Discard everything received so far.
    fn clear_input(&mut self) -> Result<(), AcquisitionError>;
    fn close(&mut self) -> Result<(), AcquisitionError>;
}
impl<T: LineTransport + ?Sized> LineTransport for Box<T> {
    fn bytes_available(&mut self) -> Result<bool, AcquisitionError> {
        (**self).bytes_available()
    }
    fn read_line(&mut self) -> Result<Option<String>, AcquisitionError> {
        (**self).read_line()
    }
    fn clear_input(&mut self) -> Result<(), AcquisitionError> {
        (**self).clear_input()
    }
    fn close(&mut self) -> Result<(), AcquisitionError> {
        (**self).close()
    }
}
/// Serial port transport (ESP32 over USB-UART).
pub struct SerialTransport {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
    pending: Vec<u8>,
}
impl SerialTransport {
    /// Opens `port_name` and waits [`SETTLE_DELAY`] for the board to boot.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, AcquisitionError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;
        thread::sleep(SETTLE_DELAY);
        log::info!("opened serial port {port_name} at {baud_rate} baud");
        Ok(Self {
            port_name: port_name.to_string(),
            port: Some(port),
            pending: Vec::with_capacity(256),
        })
    }
    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, AcquisitionError> {
        self.port.as_mut().ok_or(AcquisitionError::TransportClosed)
    }
    fn take_pending_line(&mut self) -> Option<String> {
        let end = match self.pending.iter().position(|b| *b == b'\n') {
            Some(pos) => pos + 1,
            None if self.pending.len() >= MAX_LINE_BYTES => self.pending.len(),
            None => return None,
        };
        let raw: Vec<u8> = self.pending.drain(..end).collect();
        Some(decode_line(&raw))
    }
}
impl LineTransport for SerialTransport {
    fn bytes_available(&mut self) -> Result<bool, AcquisitionError> {
        if self.pending.contains(&b'\n') {
            return Ok(true);
        }
        Ok(self.port_mut()?.bytes_to_read()? > 0)
    }
    fn read_line(&mut self) -> Result<Option<String>, AcquisitionError> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.take_pending_line() {
                return Ok(Some(line));
            }
            let read = self.port_mut()?.read(&mut chunk);
            match read {
                Ok(0) => return Ok(None),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
    fn clear_input(&mut self) -> Result<(), AcquisitionError> {
        self.pending.clear();
        self.port_mut()?.clear(ClearBuffer::Input)?;
        Ok(())
    }
    fn close(&mut self) -> Result<(), AcquisitionError> {
        if self.port.take().is_some() {
            log::info!("closed serial port {}", self.port_name);
        }
        self.pending.clear();
        Ok(())
    }
}
/// Lossy UTF-8 decode with line terminators stripped.
pub fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}
/// Owns an open transport and closes it on every exit path.
pub struct TransportGuard<T: LineTransport> {
    inner: Option<T>,
}
impl<T: LineTransport> TransportGuard<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Some(transport),
        }
    }
    /// `None` once the guard has been closed.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.inner.as_mut()
    }
    /// Closes now; failures are logged and otherwise ignored.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.inner.take() {
            if let Err(e) = transport.close() {
                log::debug!("ignoring transport close failure: {e}");
            }
        }
    }
}
impl<T: LineTransport> Drop for TransportGuard<T> {
    fn drop(&mut self) {
        self.close();
    }
}
#[cfg(test)]
pub use scripted::{ScriptedRead, ScriptedTransport};
