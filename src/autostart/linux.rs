//! XDG autostart desktop entry.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Autostart, AutostartError};

#[derive(Debug, Clone)]
pub struct DesktopEntry {
    dir: PathBuf,
    app: String,
    exe: PathBuf,
}

impl DesktopEntry {
    pub fn new(dir: impl Into<PathBuf>, app: &str, exe: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            app: app.to_string(),
            exe: exe.into(),
        }
    }

    /// Entry for the running executable in the user's autostart directory,
    /// honouring `XDG_CONFIG_HOME`.
    pub fn for_current_exe(app: &str) -> Result<Self, AutostartError> {
        let exe = env::current_exe().map_err(AutostartError::Executable)?;
        let config = match env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .ok_or(AutostartError::NoHome)?,
        };
        Ok(Self::new(config.join("autostart"), app, exe))
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.desktop", self.app))
    }

    fn contents(&self) -> String {
        let workdir = self.exe.parent().unwrap_or(Path::new("/"));
        format!(
            "[Desktop Entry]\nType=Application\nName={}\nExec={}\nPath={}\nX-GNOME-Autostart-enabled=true\n",
            self.app,
            self.exe.display(),
            workdir.display()
        )
    }
}

impl Autostart for DesktopEntry {
    fn is_enabled(&self) -> Result<bool, AutostartError> {
        Ok(self.path().is_file())
    }

    fn enable(&self) -> Result<(), AutostartError> {
        fs::create_dir_all(&self.dir).map_err(|source| AutostartError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path();
        if let Err(source) = fs::write(&path, self.contents()) {
            return Err(AutostartError::Io { path, source });
        }
        log::info!("Autostart enabled via {}", path.display());
        Ok(())
    }

    fn disable(&self) -> Result<(), AutostartError> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("Autostart disabled");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AutostartError::Io { path, source }),
        }
    }
}
