//! # Autostart
//!
//! Registers the binary to start with the user session.
//!
//! | Target | Artefact |
//! |---|---|
//! | Linux | `~/.config/autostart/<app>.desktop` |
//! | Windows | value under `HKCU\Software\Microsoft\Windows\CurrentVersion\Run` |
//! | other | none, every operation fails with [`AutostartError::NotSupported`] |
//!
//! [`PlatformAutostart`] names the implementation compiled for the current
//! target.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(not(any(target_os = "linux", windows)))]
pub mod unsupported;
#[cfg(windows)]
pub mod windows;

#[cfg(target_os = "linux")]
pub use linux::DesktopEntry as PlatformAutostart;
#[cfg(not(any(target_os = "linux", windows)))]
pub use unsupported::Unsupported as PlatformAutostart;
#[cfg(windows)]
pub use windows::RunKey as PlatformAutostart;

/// Name used for the desktop entry or registry value.
pub const APP_NAME: &str = "oled-clock";

#[derive(Error, Debug)]
pub enum AutostartError {
    #[error("autostart is not supported on this platform")]
    NotSupported,

    #[error("cannot resolve the executable path: {0}")]
    Executable(#[source] io::Error),

    #[error("no home directory to place the autostart entry in")]
    NoHome,

    #[error("cannot update {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub trait Autostart {
    fn is_enabled(&self) -> Result<bool, AutostartError>;

    fn enable(&self) -> Result<(), AutostartError>;

    fn disable(&self) -> Result<(), AutostartError>;

    /// Flips the current state and returns the new one.
    fn toggle(&self) -> Result<bool, AutostartError> {
        if self.is_enabled()? {
            self.disable()?;
            Ok(false)
        } else {
            self.enable()?;
            Ok(true)
        }
    }
}

/// Autostart for the running executable under [`APP_NAME`].
pub fn platform_autostart() -> Result<PlatformAutostart, AutostartError> {
    PlatformAutostart::for_current_exe(APP_NAME)
}
