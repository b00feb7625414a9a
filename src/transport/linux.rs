//! hidraw backend.
//!
//! Each `/sys/class/hidraw/hidrawN/device/uevent` carries lines like
//!
//! ```text
//! HID_ID=0003:00001038:00001612
//! HID_NAME=SteelSeries Apex 7
//! ```
//!
//! The USB interface number comes from `bInterfaceNumber` on the parent
//! interface directory. When that file is missing the number is recovered
//! from the resolved device path, whose interface directory is named
//! `<bus>-<port>:<config>.<interface>`.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use super::{DeviceId, DeviceInfo, HidBackend, TransportError};

pub struct SysfsBackend {
    class_dir: PathBuf,
    dev_dir: PathBuf,
}

impl Default for SysfsBackend {
    fn default() -> Self {
        Self::new("/sys/class/hidraw", "/dev")
    }
}

impl SysfsBackend {
    pub fn new(class_dir: impl Into<PathBuf>, dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            class_dir: class_dir.into(),
            dev_dir: dev_dir.into(),
        }
    }

    fn probe(&self, node: &Path) -> Option<DeviceInfo> {
        let device = node.join("device");
        let uevent = fs::read_to_string(device.join("uevent")).ok()?;
        let (vendor_id, product_id, name) = parse_uevent(&uevent)?;
        let interface = interface_number(&device)?;
        let file_name = node.file_name()?;
        Some(DeviceInfo {
            id: DeviceId {
                vendor_id,
                product_id,
                interface,
            },
            name,
            path: self.dev_dir.join(file_name),
        })
    }
}

/// Parses `HID_ID` and `HID_NAME` out of a uevent file.
fn parse_uevent(text: &str) -> Option<(u16, u16, String)> {
    let mut ids = None;
    let mut name = String::new();
    for line in text.lines() {
        if let Some(value) = line.strip_prefix("HID_ID=") {
            let mut parts = value.trim().split(':');
            let _bus = parts.next()?;
            let vendor = u32::from_str_radix(parts.next()?, 16).ok()?;
            let product = u32::from_str_radix(parts.next()?, 16).ok()?;
            ids = Some((u16::try_from(vendor).ok()?, u16::try_from(product).ok()?));
        } else if let Some(value) = line.strip_prefix("HID_NAME=") {
            name = value.trim().to_string();
        }
    }
    let (vendor, product) = ids?;
    Some((vendor, product, name))
}

fn interface_number(device: &Path) -> Option<u8> {
    let resolved = fs::canonicalize(device).ok()?;
    if let Some(parent) = resolved.parent() {
        if let Ok(text) = fs::read_to_string(parent.join("bInterfaceNumber")) {
            if let Ok(n) = u8::from_str_radix(text.trim(), 16) {
                return Some(n);
            }
        }
    }
    interface_from_path(&resolved.to_string_lossy())
}

/// Finds the first `<digits>-<digits>:<digits>.<digits>` in `path` and
/// returns the last number.
pub fn interface_from_path(path: &str) -> Option<u8> {
    let bytes = path.as_bytes();
    (0..bytes.len()).find_map(|start| match_interface(&bytes[start..]))
}

fn match_interface(s: &[u8]) -> Option<u8> {
    fn digits(s: &[u8]) -> usize {
        s.iter().take_while(|b| b.is_ascii_digit()).count()
    }
    let mut i = 0;
    for sep in [b'-', b':', b'.'] {
        let n = digits(&s[i..]);
        if n == 0 || s.get(i + n) != Some(&sep) {
            return None;
        }
        i += n + 1;
    }
    let n = digits(&s[i..]);
    if n == 0 {
        return None;
    }
    std::str::from_utf8(&s[i..i + n]).ok()?.parse().ok()
}

impl HidBackend for SysfsBackend {
    type Handle = File;

    fn enumerate(&self) -> Result<Vec<DeviceInfo>, TransportError> {
        let entries = fs::read_dir(&self.class_dir).map_err(TransportError::Enumerate)?;
        let mut nodes: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        nodes.sort();
        let devices: Vec<DeviceInfo> = nodes.iter().filter_map(|node| self.probe(node)).collect();
        log::debug!("Found {} hidraw interface(s)", devices.len());
        Ok(devices)
    }

    fn open(&self, device: &DeviceInfo) -> Result<File, TransportError> {
        OpenOptions::new()
            .write(true)
            .open(&device.path)
            .map_err(|source| TransportError::Open {
                path: device.path.display().to_string(),
                source,
            })
    }
}
