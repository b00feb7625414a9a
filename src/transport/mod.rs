//! # HID Transport
//!
//! Locates the keyboard's OLED interface, wraps packed payloads in the
//! vendor report and writes them to the device.
//!
//! ## Report Layout
//! Two framings exist in the wild and are chosen per device family in
//! configuration, never negotiated:
//!
//! ```text
//! padded:   00 61 [16 x 00] [payload]
//! trailing: 00 61 [payload] 00
//! ```
//!
//! `00` is the report id, which the host HID layer strips; the device sees
//! the stream from the `0x61` command byte onwards. The payload is exactly
//! `width * height / 8` bytes: longer input is truncated and shorter input
//! is zero-padded.
//!
//! ## Recovery
//! A failed write is a per-frame error; the caller simply tries again on the
//! next frame. After `reopen_after_failures` consecutive failures the handle
//! is dropped and the device reopened. Once `max_reopen_attempts` reopens in
//! a row have failed, [`TransportError::Fatal`] is returned and the process
//! should exit.
//!
//! ## Backends
//! [`HidBackend`] abstracts enumeration and opening. The Linux backend scans
//! sysfs for hidraw nodes, Windows goes through hidapi, and everything else
//! gets a backend that reports "not supported". [`PlatformBackend`] names
//! the one compiled for the current target.

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(target_os = "linux")]
pub mod linux;
pub mod preview;
#[cfg(not(any(target_os = "linux", windows)))]
pub mod unsupported;
#[cfg(windows)]
pub mod windows;

#[cfg(target_os = "linux")]
pub use linux::SysfsBackend as PlatformBackend;
#[cfg(not(any(target_os = "linux", windows)))]
pub use unsupported::UnsupportedBackend as PlatformBackend;
#[cfg(windows)]
pub use windows::HidApiBackend as PlatformBackend;

/// HID report id, stripped by the host before the device sees the report.
pub const REPORT_ID: u8 = 0x00;
/// "Draw image" command.
pub const DRAW_COMMAND: u8 = 0x61;
/// Zero bytes between the command and the payload in the padded framing.
pub const PADDING_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no matching HID device found (tried {0})")]
    NotFound(String),

    #[error("cannot enumerate HID devices: {0}")]
    Enumerate(#[source] io::Error),

    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("device lost after {attempts} failed reopen attempts")]
    Fatal { attempts: u32 },

    #[error("HID access is not supported on this platform")]
    Unsupported,
}

impl TransportError {
    /// Whether the frame loop has to stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::Fatal { .. } | TransportError::Unsupported)
    }
}

/// A (vendor, product, interface) triple identifying the OLED interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct DeviceId {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Zero-based USB interface number
    pub interface: u8,
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} if{}",
            self.vendor_id, self.product_id, self.interface
        )
    }
}

/// An enumerated HID interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    /// OS path used to open the interface
    pub path: PathBuf,
}

/// Report framing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketFormat {
    /// `00 61 [16 x 00] [payload]`
    #[default]
    Padded,
    /// `00 61 [payload] 00`
    Trailing,
}

/// Wraps `payload` for a `width` x `height` display.
pub fn frame_packet(payload: &[u8], width: u32, height: u32, format: PacketFormat) -> Vec<u8> {
    let size = (width as usize * height as usize) / 8;
    let header = match format {
        PacketFormat::Padded => 2 + PADDING_LEN,
        PacketFormat::Trailing => 2,
    };
    let trailer = usize::from(format == PacketFormat::Trailing);

    let mut packet = Vec::with_capacity(header + size + trailer);
    packet.push(REPORT_ID);
    packet.push(DRAW_COMMAND);
    packet.resize(header, 0);
    let take = payload.len().min(size);
    packet.extend_from_slice(&payload[..take]);
    packet.resize(header + size + trailer, 0);
    packet
}

/// The backend for the current target.
pub fn platform_backend() -> Result<PlatformBackend, TransportError> {
    #[cfg(target_os = "linux")]
    return Ok(PlatformBackend::default());
    #[cfg(not(target_os = "linux"))]
    return PlatformBackend::new();
}

/// Picks the first candidate, in configured order, that is present.
pub fn select_device<'a>(found: &'a [DeviceInfo], candidates: &[DeviceId]) -> Option<&'a DeviceInfo> {
    candidates
        .iter()
        .find_map(|want| found.iter().find(|info| info.id == *want))
}

/// Destination for packed frames.
pub trait FrameSink {
    /// Sends one packed payload.
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Releases the device. A later `send` may reacquire it: [`HidTransport`]
    /// reopens the device transparently, while [`preview::PreviewSink`] keeps
    /// printing.
    fn close(&mut self) {}
}

/// Writes complete HID reports.
pub trait ReportWriter {
    fn write_report(&mut self, report: &[u8]) -> io::Result<usize>;
}

impl ReportWriter for std::fs::File {
    fn write_report(&mut self, report: &[u8]) -> io::Result<usize> {
        io::Write::write(self, report)
    }
}

/// Enumerates and opens HID interfaces on the host.
pub trait HidBackend {
    type Handle: ReportWriter;

    fn enumerate(&self) -> Result<Vec<DeviceInfo>, TransportError>;

    fn open(&self, device: &DeviceInfo) -> Result<Self::Handle, TransportError>;
}

/// Reopen policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recovery {
    pub reopen_after_failures: u32,
    pub max_reopen_attempts: u32,
}

impl Default for Recovery {
    fn default() -> Self {
        Self {
            reopen_after_failures: 3,
            max_reopen_attempts: 5,
        }
    }
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub reports_sent: u64,
    pub failed_writes: u64,
    pub reopens: u64,
}

/// A HID device opened for writing frames.
pub struct HidTransport<B: HidBackend> {
    backend: B,
    candidates: Vec<DeviceId>,
    format: PacketFormat,
    width: u32,
    height: u32,
    recovery: Recovery,
    device: DeviceInfo,
    handle: Option<B::Handle>,
    consecutive_failures: u32,
    failed_reopens: u32,
    stats: TransportStats,
}

impl<B: HidBackend> HidTransport<B> {
    /// Finds the first configured device and opens it.
    pub fn open(
        backend: B,
        candidates: &[DeviceId],
        format: PacketFormat,
        (width, height): (u32, u32),
        recovery: Recovery,
    ) -> Result<Self, TransportError> {
        let device = locate(&backend, candidates)?;
        let handle = backend.open(&device)?;
        log::info!(
            "Opened {} ({}) at {}",
            device.id,
            device.name,
            device.path.display()
        );
        Ok(Self {
            backend,
            candidates: candidates.to_vec(),
            format,
            width,
            height,
            recovery,
            device,
            handle: Some(handle),
            consecutive_failures: 0,
            failed_reopens: 0,
            stats: TransportStats::default(),
        })
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    fn write(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(TransportError::Write(io::Error::new(
                io::ErrorKind::NotConnected,
                "device handle closed",
            )));
        };
        match handle.write_report(packet) {
            Ok(n) if n == packet.len() => Ok(()),
            Ok(written) => Err(TransportError::ShortWrite {
                written,
                expected: packet.len(),
            }),
            Err(e) => Err(TransportError::Write(e)),
        }
    }

    fn reopen(&mut self) -> Result<(), TransportError> {
        self.handle = None;
        let attempt = locate(&self.backend, &self.candidates)
            .and_then(|device| self.backend.open(&device).map(|h| (device, h)));
        match attempt {
            Ok((device, handle)) => {
                log::info!("Reopened {} at {}", device.id, device.path.display());
                self.device = device;
                self.handle = Some(handle);
                self.failed_reopens = 0;
                self.consecutive_failures = 0;
                self.stats.reopens += 1;
                Ok(())
            }
            Err(e) => {
                self.failed_reopens += 1;
                log::warn!(
                    "Reopen attempt {}/{} failed: {}",
                    self.failed_reopens,
                    self.recovery.max_reopen_attempts,
                    e
                );
                if self.failed_reopens >= self.recovery.max_reopen_attempts {
                    return Err(TransportError::Fatal {
                        attempts: self.failed_reopens,
                    });
                }
                Err(e)
            }
        }
    }
}

fn locate<B: HidBackend>(backend: &B, candidates: &[DeviceId]) -> Result<DeviceInfo, TransportError> {
    let found = backend.enumerate()?;
    select_device(&found, candidates).cloned().ok_or_else(|| {
        let tried: Vec<String> = candidates.iter().map(ToString::to_string).collect();
        TransportError::NotFound(tried.join(", "))
    })
}

impl<B: HidBackend> FrameSink for HidTransport<B> {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if self.handle.is_none() {
            self.reopen()?;
        }
        let packet = frame_packet(payload, self.width, self.height, self.format);
        match self.write(&packet) {
            Ok(()) => {
                self.consecutive_failures = 0;
                self.stats.reports_sent += 1;
                Ok(())
            }
            Err(e) => {
                self.consecutive_failures += 1;
                self.stats.failed_writes += 1;
                if self.consecutive_failures >= self.recovery.reopen_after_failures {
                    log::warn!(
                        "{} consecutive failed writes to {}, reopening",
                        self.consecutive_failures,
                        self.device.id
                    );
                    self.reopen()?;
                }
                Err(e)
            }
        }
    }

    fn close(&mut self) {
        if self.handle.take().is_some() {
            log::info!("Closed {}", self.device.id);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{keyboard, FakeBus};
    use super::*;

    #[test]
    fn padded_blank_frame_is_658_bytes() {
        let packet = frame_packet(&[0u8; 640], 128, 40, PacketFormat::Padded);
        assert_eq!(packet.len(), 658);
        assert_eq!(packet[0], 0x00);
        assert_eq!(packet[1], 0x61);
        assert!(packet[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn trailing_frame_layout() {
        let packet = frame_packet(&[0xAB; 640], 128, 40, PacketFormat::Trailing);
        assert_eq!(packet.len(), 643);
        assert_eq!(&packet[..3], &[0x00, 0x61, 0xAB]);
        assert_eq!(packet[641], 0xAB);
        assert_eq!(packet[642], 0x00);
    }

    #[test]
    fn payload_is_truncated_or_padded() {
        let long = frame_packet(&[0xFF; 700], 128, 40, PacketFormat::Padded);
        assert_eq!(long.len(), 658);
        let short = frame_packet(&[0xFF; 10], 128, 40, PacketFormat::Padded);
        assert_eq!(short.len(), 658);
        assert_eq!(short[18 + 9], 0xFF);
        assert_eq!(short[18 + 10], 0x00);
    }

    #[test]
    fn selection_follows_candidate_order() {
        let make = |product_id, interface| DeviceInfo {
            id: DeviceId {
                vendor_id: 0x1038,
                product_id,
                interface,
            },
            name: String::new(),
            path: PathBuf::from(format!("/dev/hidraw{product_id}{interface}")),
        };
        let found = vec![make(1, 0), make(1, 1), make(2, 1)];
        let want = [found[2].id, found[1].id];
        assert_eq!(select_device(&found, &want), Some(&found[2]));
        assert_eq!(select_device(&found, &[]), None);
    }

    #[test]
    fn missing_device_is_not_found() {
        let bus = FakeBus::default();
        let err = HidTransport::open(bus, &[keyboard()], PacketFormat::Padded, (128, 40), Recovery::default())
            .err()
            .unwrap();
        assert!(matches!(err, TransportError::NotFound(_)));
    }

    #[test]
    fn reopens_after_consecutive_failures() {
        let bus = FakeBus::new();
        let recovery = Recovery {
            reopen_after_failures: 2,
            max_reopen_attempts: 3,
        };
        let mut hid = HidTransport::open(bus.clone(), &[keyboard()], PacketFormat::Padded, (128, 40), recovery).unwrap();
        assert!(hid.send(&[0; 640]).is_ok());

        *bus.fail_writes.lock() = true;
        assert!(hid.send(&[0; 640]).is_err());
        assert_eq!(*bus.opens.lock(), 1);
        assert!(hid.send(&[0; 640]).is_err());
        assert_eq!(*bus.opens.lock(), 2);
        assert_eq!(hid.stats().reopens, 1);

        *bus.fail_writes.lock() = false;
        assert!(hid.send(&[0; 640]).is_ok());
        assert_eq!(bus.written.lock().len(), 2);
        assert_eq!(hid.stats().failed_writes, 2);
    }

    #[test]
    fn gives_up_after_failed_reopens() {
        let bus = FakeBus::new();
        let recovery = Recovery {
            reopen_after_failures: 1,
            max_reopen_attempts: 2,
        };
        let mut hid = HidTransport::open(bus.clone(), &[keyboard()], PacketFormat::Padded, (128, 40), recovery).unwrap();
        *bus.fail_writes.lock() = true;
        *bus.present.lock() = false;

        let first = hid.send(&[0; 640]).unwrap_err();
        assert!(!first.is_fatal());
        let second = hid.send(&[0; 640]).unwrap_err();
        assert!(matches!(second, TransportError::Fatal { attempts: 2 }));
        assert!(second.is_fatal());
    }

    #[test]
    fn close_drops_the_handle() {
        let bus = FakeBus::new();
        let mut hid = HidTransport::open(bus.clone(), &[keyboard()], PacketFormat::Trailing, (128, 40), Recovery::default()).unwrap();
        hid.close();
        // The next send reopens transparently.
        assert!(hid.send(&[0; 640]).is_ok());
        assert_eq!(*bus.opens.lock(), 2);
    }
}
