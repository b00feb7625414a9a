//! # Configuration Management
//!
//! Loads the display, device and widget layout from `oled-clock.toml`.
//!
//! A missing file is not an error: the built-in default shows a clock on a
//! 128×40 SteelSeries-style keyboard. A file that exists but cannot be parsed
//! or fails [`Config::validate`] is fatal, since emitting frames for a layout
//! the user did not ask for is worse than not starting.
//!
//! ```toml
//! [display]
//! width = 128
//! height = 40
//!
//! [device]
//! packet_format = "padded"
//! devices = [{ vendor_id = 0x1038, product_id = 0x1612, interface = 1 }]
//!
//! [[widgets]]
//! type = "clock"
//! id = "clock"
//! width = 128
//! height = 40
//! options = { format = "%H:%M", segments = true }
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoder::DitherMode;
use crate::transport::{DeviceId, PacketFormat, Recovery};
use crate::widget::Style;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "oled-clock.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialise config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration loaded from `oled-clock.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Canvas geometry and frame cadence
    pub display: DisplayConfig,
    /// Which keyboard to talk to and how to frame packets
    pub device: DeviceConfig,
    /// Widget layout, drawn in z-order
    pub widgets: Vec<WidgetConfig>,
}

/// Device canvas and frame cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// OLED width in pixels
    pub width: u32,
    /// OLED height in pixels
    pub height: u32,
    /// Canvas fill before widgets are composited
    pub background: u8,
    /// Frames per second while nothing animates
    pub frame_rate_hz: f64,
    /// Frames per second while any widget animates
    pub fast_frame_rate_hz: f64,
    /// Grayscale to on/off reduction
    pub dither: DitherMode,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 40,
            background: 0,
            frame_rate_hz: 10.0,
            fast_frame_rate_hz: 30.0,
            dither: DitherMode::default(),
        }
    }
}

/// Frame rates accepted by [`Config::validate`].
pub const FRAME_RATE_RANGE_HZ: RangeInclusive<f64> = 0.01..=1000.0;

impl DisplayConfig {
    pub fn frame_period(&self) -> Duration {
        period_for(self.frame_rate_hz)
    }

    pub fn fast_frame_period(&self) -> Duration {
        period_for(self.fast_frame_rate_hz)
    }
}

/// Period of `rate_hz`, with the rate clamped into [`FRAME_RATE_RANGE_HZ`]
/// for configurations that skipped validation. NaN falls back to 10 Hz.
fn period_for(rate_hz: f64) -> Duration {
    const FALLBACK: Duration = Duration::from_millis(100);
    if rate_hz.is_nan() {
        return FALLBACK;
    }
    let rate = rate_hz.clamp(*FRAME_RATE_RANGE_HZ.start(), *FRAME_RATE_RANGE_HZ.end());
    Duration::try_from_secs_f64(1.0 / rate).unwrap_or(FALLBACK)
}

/// HID device selection and recovery policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub packet_format: PacketFormat,
    /// Consecutive failed sends before the handle is reopened
    pub reopen_after_failures: u32,
    /// Failed reopen attempts before the transport gives up
    pub max_reopen_attempts: u32,
    /// Candidate interfaces, tried in order
    pub devices: Vec<DeviceId>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        const STEELSERIES: u16 = 0x1038;
        let devices = [0x1612, 0x1618, 0x161c, 0x1622, 0x1640]
            .into_iter()
            .map(|product_id| DeviceId {
                vendor_id: STEELSERIES,
                product_id,
                interface: 1,
            })
            .collect();
        Self {
            packet_format: PacketFormat::default(),
            reopen_after_failures: 3,
            max_reopen_attempts: 5,
            devices,
        }
    }
}

impl DeviceConfig {
    pub fn recovery(&self) -> Recovery {
        Recovery {
            reopen_after_failures: self.reopen_after_failures,
            max_reopen_attempts: self.max_reopen_attempts,
        }
    }
}

/// One configured widget instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WidgetConfig {
    /// Registry key selecting the widget factory
    #[serde(rename = "type")]
    pub kind: String,
    /// Unique identifier, used in logs and for ordering ties
    pub id: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub z_order: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds between data refreshes
    #[serde(default = "default_update_interval")]
    pub update_interval: f64,
    #[serde(default)]
    pub style: Style,
    /// Widget-specific settings
    #[serde(default)]
    pub options: toml::Table,
}

fn default_enabled() -> bool {
    true
}

fn default_update_interval() -> f64 {
    1.0
}

impl WidgetConfig {
    /// Minimal record for a widget of `kind` covering `width` x `height`.
    pub fn new(kind: &str, id: &str, width: u32, height: u32) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
            x: 0,
            y: 0,
            width,
            height,
            z_order: 0,
            enabled: true,
            update_interval: default_update_interval(),
            style: Style::default(),
            options: toml::Table::new(),
        }
    }

    pub fn update_period(&self) -> Duration {
        Duration::try_from_secs_f64(self.update_interval).unwrap_or(Duration::ZERO)
    }

    /// Deserialises the `options` table into a widget's own options type.
    pub fn options_as<T: DeserializeOwned>(&self) -> Result<T, toml::de::Error> {
        toml::Value::Table(self.options.clone()).try_into()
    }
}

impl Config {
    /// Load configuration from `oled-clock.toml` in the working directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load and validate configuration from `path`.
    ///
    /// A missing file yields [`Config::default`].
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No config file at {}, using the default layout", path.display());
                return Ok(Self::default_layout());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::info!(
            "Loaded {} with {} widget(s) for a {}x{} display",
            path.display(),
            config.widgets.len(),
            config.display.width,
            config.display.height
        );
        Ok(config)
    }

    /// Default config plus a full-screen clock.
    pub fn default_layout() -> Self {
        let mut config = Self::default();
        let mut clock = WidgetConfig::new("clock", "clock", config.display.width, config.display.height);
        clock.options.insert("segments".into(), toml::Value::Boolean(true));
        config.widgets.push(clock);
        config
    }

    /// Checks the values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        let d = &self.display;
        if d.width == 0 || d.height == 0 {
            return invalid(format!("display size {}x{} is empty", d.width, d.height));
        }
        for (name, rate) in [("frame_rate_hz", d.frame_rate_hz), ("fast_frame_rate_hz", d.fast_frame_rate_hz)] {
            if !FRAME_RATE_RANGE_HZ.contains(&rate) {
                return invalid(format!(
                    "{name} must be within {}..={} Hz, got {rate}",
                    FRAME_RATE_RANGE_HZ.start(),
                    FRAME_RATE_RANGE_HZ.end()
                ));
            }
        }
        if self.device.reopen_after_failures == 0 {
            return invalid("reopen_after_failures must be at least 1".into());
        }
        if self.device.devices.is_empty() {
            return invalid("no HID devices configured".into());
        }

        let mut seen = HashSet::new();
        for w in &self.widgets {
            if !seen.insert(w.id.as_str()) {
                return invalid(format!("duplicate widget id {:?}", w.id));
            }
            if w.width == 0 || w.height == 0 {
                return invalid(format!("widget {:?} has an empty size", w.id));
            }
            if !(w.update_interval.is_finite() && w.update_interval >= 0.0) {
                return invalid(format!(
                    "widget {:?} has update_interval {}",
                    w.id, w.update_interval
                ));
            }
        }
        Ok(())
    }

    /// Save the configuration to `oled-clock.toml`.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(DEFAULT_CONFIG_PATH)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Configuration saved to {}", path.display());
        Ok(())
    }
}
