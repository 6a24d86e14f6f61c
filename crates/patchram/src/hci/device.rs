//! HCI adapter discovery
//!
//! Adapters are listed through a short-lived control socket that is separate
//! from the session socket used to talk to the controller.

use crate::bdaddr::DeviceAddress;
use crate::error::{Criterion, Error, HciError};
use crate::hci::socket::{AF_BLUETOOTH, BTPROTO_HCI};
use bitflags::bitflags;
use std::fmt;
use std::io;
use std::os::unix::io::RawFd;
use tracing::debug;

const HCI_MAX_DEV: usize = 16;

// _IOR('H', 210, int) and _IOR('H', 211, int)
const HCIGETDEVLIST: libc::c_ulong = 0x8004_48d2;
const HCIGETDEVINFO: libc::c_ulong = 0x8004_48d3;

bitflags! {
    /// Per-device state bits reported by the kernel
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AdapterFlags: u32 {
        const UP = 1 << 0;
        const INIT = 1 << 1;
        const RUNNING = 1 << 2;
        const PSCAN = 1 << 3;
        const ISCAN = 1 << 4;
        const AUTH = 1 << 5;
        const ENCRYPT = 1 << 6;
        const INQUIRY = 1 << 7;
        const RAW = 1 << 8;
    }
}

/// Identifies one local controller (`hciN`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterHandle(u16);

impl AdapterHandle {
    pub fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u16 {
        self.0
    }

    /// Parse `hciN`
    pub fn from_name(name: &str) -> Option<Self> {
        name.strip_prefix("hci")
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
            .map(Self)
    }
}

impl fmt::Display for AdapterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hci{}", self.0)
    }
}

/// Which adapter the caller asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Pick the only adapter that is up
    Auto,
    /// `hciN` or the adapter's BD address
    Named(String),
}

impl DeviceSelector {
    pub fn resolve(&self) -> Result<AdapterHandle, Error> {
        match self {
            DeviceSelector::Auto => {
                let criterion = Criterion::State(AdapterFlags::UP);
                let adapters = enumerate(AdapterFlags::UP).map_err(lookup_failed(criterion))?;
                select_adapter(adapters, AdapterFlags::UP)
            }
            DeviceSelector::Named(name) => resolve(name),
        }
    }
}

impl From<Option<String>> for DeviceSelector {
    fn from(name: Option<String>) -> Self {
        name.map_or(DeviceSelector::Auto, DeviceSelector::Named)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct HciDevReq {
    dev_id: u16,
    dev_opt: u32,
}

#[repr(C)]
struct HciDevListReq {
    dev_num: u16,
    dev_req: [HciDevReq; HCI_MAX_DEV],
}

#[repr(C)]
#[derive(Default)]
#[allow(dead_code)]
struct HciDevStats {
    err_rx: u32,
    err_tx: u32,
    cmd_tx: u32,
    evt_rx: u32,
    acl_tx: u32,
    acl_rx: u32,
    sco_tx: u32,
    sco_rx: u32,
    byte_rx: u32,
    byte_tx: u32,
}

#[repr(C)]
#[derive(Default)]
#[allow(dead_code)]
struct HciDevInfo {
    dev_id: u16,
    name: [u8; 8],
    bdaddr: [u8; 6],
    flags: u32,
    dev_type: u8,
    features: [u8; 8],
    pkt_type: u32,
    link_policy: u32,
    link_mode: u32,
    acl_mtu: u16,
    acl_pkts: u16,
    sco_mtu: u16,
    sco_pkts: u16,
    stat: HciDevStats,
}

/// Socket used only for device-list ioctls
struct ControlSocket {
    fd: RawFd,
}

impl ControlSocket {
    fn open() -> Result<Self, HciError> {
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
        Ok(Self { fd })
    }

    fn device_list(&self) -> Result<Vec<HciDevReq>, HciError> {
        let mut req = HciDevListReq {
            dev_num: HCI_MAX_DEV as u16,
            dev_req: [HciDevReq::default(); HCI_MAX_DEV],
        };

        let result = unsafe {
            libc::ioctl(
                self.fd,
                HCIGETDEVLIST as _,
                &mut req as *mut HciDevListReq,
            )
        };
        if result < 0 {
            return Err(HciError::SocketError(io::Error::last_os_error()));
        }

        let count = (req.dev_num as usize).min(HCI_MAX_DEV);
        Ok(req.dev_req[..count].to_vec())
    }

    fn device_info(&self, dev_id: u16) -> Result<HciDevInfo, HciError> {
        let mut info = HciDevInfo {
            dev_id,
            ..Default::default()
        };

        let result = unsafe {
            libc::ioctl(
                self.fd,
                HCIGETDEVINFO as _,
                &mut info as *mut HciDevInfo,
            )
        };
        if result < 0 {
            return Err(HciError::SocketError(io::Error::last_os_error()));
        }
        Ok(info)
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

/// Adapters whose state contains a set of flags
///
/// Holds the control socket until dropped. The list is fetched once, so the
/// iterator cannot be restarted.
pub struct Adapters {
    _ctl: ControlSocket,
    devices: std::vec::IntoIter<HciDevReq>,
    filter: AdapterFlags,
}

impl Iterator for Adapters {
    type Item = AdapterHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.devices
            .find(|dev| AdapterFlags::from_bits_truncate(dev.dev_opt).contains(filter))
            .map(|dev| AdapterHandle(dev.dev_id))
    }
}

/// List the adapters whose current state contains `filter`
pub fn enumerate(filter: AdapterFlags) -> Result<Adapters, HciError> {
    let ctl = ControlSocket::open()?;
    let devices = ctl.device_list()?;
    debug!(count = devices.len(), ?filter, "enumerated HCI devices");

    Ok(Adapters {
        _ctl: ctl,
        devices: devices.into_iter(),
        filter,
    })
}

/// Pick the single adapter out of `candidates`
///
/// Zero candidates is `DeviceNotFound`, more than one is `AmbiguousDevice`
/// carrying every candidate.
pub fn select_adapter<I>(candidates: I, criterion: AdapterFlags) -> Result<AdapterHandle, Error>
where
    I: IntoIterator<Item = AdapterHandle>,
{
    let mut candidates = candidates.into_iter();
    let Some(first) = candidates.next() else {
        return Err(Error::DeviceNotFound(Criterion::State(criterion)));
    };

    let rest: Vec<AdapterHandle> = candidates.collect();
    if rest.is_empty() {
        return Ok(first);
    }

    let mut all = Vec::with_capacity(rest.len() + 1);
    all.push(first);
    all.extend(rest);
    Err(Error::AmbiguousDevice(all))
}

/// Resolve `hciN` or a BD address to an adapter
pub fn resolve(name: &str) -> Result<AdapterHandle, Error> {
    let ctl = ControlSocket::open().map_err(lookup_failed(Criterion::Name(name.to_string())))?;

    if let Some(handle) = AdapterHandle::from_name(name) {
        return match ctl.device_info(handle.id()) {
            Ok(_) => Ok(handle),
            Err(e) => {
                debug!(%handle, error = %e, "device info lookup failed");
                Err(Error::DeviceNotFound(Criterion::Name(name.to_string())))
            }
        };
    }

    let address: DeviceAddress = name
        .parse()
        .map_err(|_| Error::DeviceNotFound(Criterion::Name(name.to_string())))?;

    let devices = ctl
        .device_list()
        .map_err(lookup_failed(Criterion::Address(address)))?;

    for dev in devices {
        if !AdapterFlags::from_bits_truncate(dev.dev_opt).contains(AdapterFlags::UP) {
            continue;
        }
        let info = match ctl.device_info(dev.dev_id) {
            Ok(info) => info,
            Err(e) => {
                debug!(dev_id = dev.dev_id, error = %e, "skipping adapter without device info");
                continue;
            }
        };
        if matches_address(&info.bdaddr, &address) {
            return Ok(AdapterHandle(dev.dev_id));
        }
    }

    Err(Error::DeviceNotFound(Criterion::Address(address)))
}

/// A control socket failure means no adapter can match `criterion`
fn lookup_failed(criterion: Criterion) -> impl FnOnce(HciError) -> Error {
    move |e| {
        debug!(%criterion, error = %e, "adapter lookup failed");
        Error::DeviceNotFound(criterion)
    }
}

/// The kernel stores addresses least significant octet first
fn matches_address(kernel: &[u8; 6], address: &DeviceAddress) -> bool {
    kernel.iter().rev().eq(address.bytes().iter())
}
