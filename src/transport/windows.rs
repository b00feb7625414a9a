//! hidapi backend for Windows.

use std::ffi::CString;
use std::io;
use std::path::PathBuf;

use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;

use super::{DeviceId, DeviceInfo, HidBackend, ReportWriter, TransportError};

pub struct HidApiBackend {
    api: Mutex<HidApi>,
}

impl HidApiBackend {
    pub fn new() -> Result<Self, TransportError> {
        let api = HidApi::new().map_err(|e| TransportError::Enumerate(io::Error::other(e)))?;
        Ok(Self {
            api: Mutex::new(api),
        })
    }
}

impl ReportWriter for HidDevice {
    fn write_report(&mut self, report: &[u8]) -> io::Result<usize> {
        self.write(report).map_err(io::Error::other)
    }
}

impl HidBackend for HidApiBackend {
    type Handle = HidDevice;

    fn enumerate(&self) -> Result<Vec<DeviceInfo>, TransportError> {
        let mut api = self.api.lock();
        api.refresh_devices()
            .map_err(|e| TransportError::Enumerate(io::Error::other(e)))?;
        let devices = api
            .device_list()
            .filter_map(|d| {
                let interface = u8::try_from(d.interface_number()).ok()?;
                Some(DeviceInfo {
                    id: DeviceId {
                        vendor_id: d.vendor_id(),
                        product_id: d.product_id(),
                        interface,
                    },
                    name: d.product_string().unwrap_or_default().to_string(),
                    path: PathBuf::from(d.path().to_string_lossy().into_owned()),
                })
            })
            .collect();
        Ok(devices)
    }

    fn open(&self, device: &DeviceInfo) -> Result<HidDevice, TransportError> {
        let display = device.path.display().to_string();
        let path = CString::new(display.clone()).map_err(|e| TransportError::Open {
            path: display.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, e),
        })?;
        self.api
            .lock()
            .open_path(&path)
            .map_err(|e| TransportError::Open {
                path: display,
                source: io::Error::other(e),
            })
    }
}
