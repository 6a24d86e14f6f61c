//! HCI Socket implementation for Bluetooth communication
//!
//! This module provides a wrapper around the raw HCI socket interface,
//! bound to one adapter and filtered down to event packets.

use crate::error::{Error, HciError};
use crate::hci::device::AdapterHandle;
use crate::hci::packet::CommandFrame;
use crate::hci::transport::{retry_transient, HciTransport};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;
use tracing::debug;

// Bluetooth socket constants
pub(crate) const AF_BLUETOOTH: i32 = 31;
pub(crate) const BTPROTO_HCI: i32 = 1;
const HCI_CHANNEL_RAW: i32 = 0;
const SOL_HCI: i32 = 0;
const HCI_FILTER: i32 = 2;
// Bit index of the event packet type in the filter's type mask
const HCI_FLT_EVENT_BIT: u32 = 4;

/// Represents an HCI socket
#[derive(Debug)]
pub struct HciSocket {
    fd: RawFd,
}

// Define the sockaddr_hci structure
#[repr(C)]
struct SockaddrHci {
    hci_family: libc::sa_family_t,
    hci_dev: u16,
    hci_channel: u16,
}

// Define the hci_filter structure
#[repr(C)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    /// Event packets only, every event code, any opcode
    fn all_events() -> Self {
        Self {
            type_mask: 1 << HCI_FLT_EVENT_BIT,
            event_mask: [u32::MAX, u32::MAX],
            opcode: 0,
        }
    }
}

impl HciSocket {
    /// Opens a new HCI socket
    ///
    /// # Arguments
    ///
    /// * `dev_id` - The device ID to open (0 for hci0)
    ///
    /// # Returns
    ///
    /// A new `HciSocket` that only receives event packets, or an error if the
    /// socket could not be opened, bound or filtered
    pub fn open(dev_id: u16) -> Result<Self, HciError> {
        // Open a raw HCI socket
        let fd = unsafe {
            libc::socket(
                AF_BLUETOOTH,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                BTPROTO_HCI,
            )
        };

        if fd < 0 {
            return Err(HciError::SocketError(io::Error::last_os_error()));
        }

        // Owned from here on so every early return closes the descriptor
        let socket = HciSocket { fd };

        // Bind to the specified device
        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as libc::sa_family_t,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_RAW as u16,
        };

        let result = unsafe {
            libc::bind(
                socket.fd,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrHci>() as libc::socklen_t,
            )
        };

        if result < 0 {
            return Err(HciError::BindError(io::Error::last_os_error()));
        }

        socket.install_filter(&HciFilter::all_events())?;
        debug!(dev_id, fd = socket.fd, "opened HCI socket");

        Ok(socket)
    }

    /// Opens a session on `adapter`, reporting failure as an unavailable device
    pub fn open_adapter(adapter: AdapterHandle) -> Result<Self, Error> {
        Self::open(adapter.id()).map_err(|source| Error::DeviceUnavailable { adapter, source })
    }

    /// Gets the raw file descriptor for the socket
    pub fn as_raw_fd(&self) -> RawFd {
        self.fd
    }

    fn install_filter(&self, filter: &HciFilter) -> Result<(), HciError> {
        let result = unsafe {
            libc::setsockopt(
                self.fd,
                SOL_HCI,
                HCI_FILTER,
                filter as *const _ as *const libc::c_void,
                std::mem::size_of::<HciFilter>() as libc::socklen_t,
            )
        };

        if result < 0 {
            return Err(HciError::FilterError(io::Error::last_os_error()));
        }
        Ok(())
    }
}

impl HciTransport for HciSocket {
    /// Sends the frame as one vectored write: type byte, command header, parameters
    fn write_command(&mut self, frame: &CommandFrame) -> Result<(), HciError> {
        let header = frame.header();
        let params = frame.parameters();
        let iov = [
            libc::iovec {
                iov_base: header.as_ptr() as *mut libc::c_void,
                iov_len: 1,
            },
            libc::iovec {
                iov_base: header[1..].as_ptr() as *mut libc::c_void,
                iov_len: header.len() - 1,
            },
            libc::iovec {
                iov_base: params.as_ptr() as *mut libc::c_void,
                iov_len: params.len(),
            },
        ];
        let count = if params.is_empty() { 2 } else { 3 };

        retry_transient(|| {
            match unsafe { libc::writev(self.fd, iov.as_ptr(), count) } {
                -1 => Err(io::Error::last_os_error()),
                n => Ok(n as usize),
            }
        })
        .map_err(HciError::SendError)?;

        Ok(())
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<bool, HciError> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;

        let ready = retry_transient(|| match unsafe { libc::poll(&mut pfd, 1, timeout_ms) } {
            -1 => Err(io::Error::last_os_error()),
            n => Ok(n),
        })
        .map_err(HciError::ReceiveError)?;

        if pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
            return Err(HciError::ReceiveError(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("HCI socket error or hangup (revents {:#x})", pfd.revents),
            )));
        }

        Ok(ready > 0 && pfd.revents & libc::POLLIN != 0)
    }

    fn read_event(&mut self, buf: &mut [u8]) -> Result<usize, HciError> {
        let bytes_read =
            unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };

        if bytes_read < 0 {
            return Err(HciError::ReceiveError(io::Error::last_os_error()));
        }

        Ok(bytes_read as usize)
    }
}

#[cfg(test)]
impl HciSocket {
    /// Takes ownership of an already connected descriptor
    pub(crate) fn from_raw_fd(fd: RawFd) -> Self {
        Self { fd }
    }
}

impl AsRawFd for HciSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for HciSocket {
    fn drop(&mut self) {
        debug!(fd = self.fd, "closing HCI socket");
        unsafe {
            libc::close(self.fd);
        }
    }
}
