//! Autostart for targets without an implementation.

use super::{Autostart, AutostartError};

#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl Unsupported {
    pub fn for_current_exe(_app: &str) -> Result<Self, AutostartError> {
        Ok(Self)
    }
}

impl Autostart for Unsupported {
    fn is_enabled(&self) -> Result<bool, AutostartError> {
        Err(AutostartError::NotSupported)
    }

    fn enable(&self) -> Result<(), AutostartError> {
        Err(AutostartError::NotSupported)
    }

    fn disable(&self) -> Result<(), AutostartError> {
        Err(AutostartError::NotSupported)
    }
}
