//! Backend for platforms without raw HID support.

use std::io;

use super::{DeviceInfo, HidBackend, ReportWriter, TransportError};

#[derive(Default)]
pub struct UnsupportedBackend;

impl UnsupportedBackend {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self)
    }
}

pub enum NoHandle {}

impl ReportWriter for NoHandle {
    fn write_report(&mut self, _report: &[u8]) -> io::Result<usize> {
        match *self {}
    }
}

impl HidBackend for UnsupportedBackend {
    type Handle = NoHandle;

    fn enumerate(&self) -> Result<Vec<DeviceInfo>, TransportError> {
        Err(TransportError::Unsupported)
    }

    fn open(&self, _device: &DeviceInfo) -> Result<NoHandle, TransportError> {
        Err(TransportError::Unsupported)
    }
}
