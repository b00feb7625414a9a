//! Per-user `Run` registry value.

use std::env;
use std::io;
use std::path::PathBuf;

use winreg::enums::HKEY_CURRENT_USER;
use winreg::RegKey;

use super::{Autostart, AutostartError};

const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

#[derive(Debug, Clone)]
pub struct RunKey {
    value_name: String,
    exe: PathBuf,
}

impl RunKey {
    pub fn new(value_name: &str, exe: impl Into<PathBuf>) -> Self {
        Self {
            value_name: value_name.to_string(),
            exe: exe.into(),
        }
    }

    pub fn for_current_exe(app: &str) -> Result<Self, AutostartError> {
        let exe = env::current_exe().map_err(AutostartError::Executable)?;
        Ok(Self::new(app, exe))
    }

    fn key(&self) -> Result<RegKey, AutostartError> {
        RegKey::predef(HKEY_CURRENT_USER)
            .create_subkey(RUN_KEY)
            .map(|(key, _)| key)
            .map_err(|source| AutostartError::Io {
                path: PathBuf::from(RUN_KEY),
                source,
            })
    }

    fn command(&self) -> String {
        format!("\"{}\"", self.exe.display())
    }
}

impl Autostart for RunKey {
    /// Enabled only when the value points at this executable.
    fn is_enabled(&self) -> Result<bool, AutostartError> {
        match self.key()?.get_value::<String, _>(&self.value_name) {
            Ok(value) => Ok(value == self.command()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(AutostartError::Io {
                path: PathBuf::from(RUN_KEY),
                source,
            }),
        }
    }

    fn enable(&self) -> Result<(), AutostartError> {
        self.key()?
            .set_value(&self.value_name, &self.command())
            .map_err(|source| AutostartError::Io {
                path: PathBuf::from(RUN_KEY),
                source,
            })?;
        log::info!("Autostart enabled for {}", self.exe.display());
        Ok(())
    }

    fn disable(&self) -> Result<(), AutostartError> {
        match self.key()?.delete_value(&self.value_name) {
            Ok(()) => {
                log::info!("Autostart disabled");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AutostartError::Io {
                path: PathBuf::from(RUN_KEY),
                source,
            }),
        }
    }
}
