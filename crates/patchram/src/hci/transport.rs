//! The byte-level seam between the command engine and a controller

use crate::error::HciError;
use crate::hci::packet::CommandFrame;
use std::io;
use std::time::Duration;

/// A channel that carries HCI commands to a controller and events back
pub trait HciTransport {
    /// Write one complete command frame
    fn write_command(&mut self, frame: &CommandFrame) -> Result<(), HciError>;

    /// Wait until an event can be read, returning `false` on timeout
    ///
    /// A socket error or hangup is reported as `ReceiveError`.
    fn wait_readable(&mut self, timeout: Duration) -> Result<bool, HciError>;

    /// Read one event into `buf`, blocking until it arrives
    fn read_event(&mut self, buf: &mut [u8]) -> Result<usize, HciError>;

    /// Give the controller time to settle
    fn settle(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Repeat `op` while it fails with an interrupted or would-block error
///
/// Any other error is returned as-is.
pub fn retry_transient<T, F>(mut op: F) -> io::Result<T>
where
    F: FnMut() -> io::Result<T>,
{
    loop {
        match op() {
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                ) =>
            {
                continue
            }
            result => return result,
        }
    }
}
