//! # Widget Runtime
//!
//! A widget is a rectangle of the device canvas that knows how to refresh
//! its own data ([`Widget::update`]) and how to draw itself
//! ([`Widget::render`]). The scheduler owns every widget as a
//! `Box<dyn Widget>` and drives both calls from the frame loop.
//!
//! ## Contract
//! - `update()` may do I/O but must return well within one frame period.
//!   Anything slower belongs in a [`worker::BackgroundWorker`], leaving
//!   `update()` to read the latest snapshot.
//! - `render()` returns a raster exactly [`Widget::dimensions`] in size, or
//!   `None` when the widget sits this frame out.
//! - Errors are values. The widget decides whether a data-source failure is
//!   [`WidgetError::Transient`] (keep showing stale data) or
//!   [`WidgetError::Fatal`] (show the error marker until the next good
//!   update).
//!
//! Common geometry, style and identity live in [`base::BaseWidget`]; concrete
//! widgets embed one and expose it through [`Widget::base`], which supplies
//! default implementations for most of the trait.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::raster::{shapes, GrayImage, Rect};

pub mod base;
pub mod builtin;
pub mod error_marker;
pub mod registry;
pub mod worker;

pub use base::BaseWidget;
pub use registry::{Registry, WidgetContext};

/// Failure reported by a widget's data source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP status {0}")]
    Http(u16),

    #[error("request timed out")]
    Timeout,

    #[error("network unreachable")]
    Offline,

    #[error("malformed data: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// Whether retrying later is likely to succeed. Client errors and
    /// malformed data will not fix themselves.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(status) => *status >= 500 || *status == 429,
            SourceError::Timeout | SourceError::Offline | SourceError::Io(_) => true,
            SourceError::Parse(_) | SourceError::Other(_) => false,
        }
    }
}

/// Errors surfaced by [`Widget::update`] and [`Widget::render`].
#[derive(Error, Debug)]
pub enum WidgetError {
    /// The source hiccuped; the widget keeps its last known state.
    #[error("transient source error: {0}")]
    Transient(#[source] SourceError),

    /// The source is unusable until further notice.
    #[error("source failed: {0}")]
    Fatal(#[source] SourceError),

    #[error("render failed: {0}")]
    Render(String),

    #[error("unknown widget type {0:?}")]
    UnknownType(String),

    #[error("invalid options for {id}: {reason}")]
    Options { id: String, reason: String },
}

impl WidgetError {
    /// Wraps a source error with its default severity.
    pub fn from_source(err: SourceError) -> Self {
        if err.is_transient() {
            WidgetError::Transient(err)
        } else {
            WidgetError::Fatal(err)
        }
    }

    pub fn options(id: &str, reason: impl fmt::Display) -> Self {
        WidgetError::Options {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Border setting as written in configuration.
///
/// Older configs use a plain flag (`border = true` means a white border);
/// newer ones give the luminance directly, with a negative value meaning
/// no border.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BorderSetting {
    Flag(bool),
    Luminance(i32),
}

impl Default for BorderSetting {
    fn default() -> Self {
        BorderSetting::Flag(false)
    }
}

impl BorderSetting {
    /// Border luminance, or `None` when disabled.
    pub fn luminance(&self) -> Option<u8> {
        match *self {
            BorderSetting::Flag(true) => Some(255),
            BorderSetting::Flag(false) => None,
            BorderSetting::Luminance(v) if v < 0 => None,
            BorderSetting::Luminance(v) => Some(v.min(255) as u8),
        }
    }
}

/// Per-widget appearance.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Style {
    /// Background luminance of the widget raster.
    pub background: u8,
    /// When set, background-coloured pixels let the canvas show through.
    pub transparent: bool,
    pub border: BorderSetting,
    pub border_thickness: u32,
    pub padding: u32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            background: 0,
            transparent: false,
            border: BorderSetting::default(),
            border_thickness: 1,
            padding: 0,
        }
    }
}

impl Style {
    pub fn border_luminance(&self) -> Option<u8> {
        self.border.luminance()
    }

    /// Inset from the widget edge to its content area.
    pub fn inset(&self) -> u32 {
        let border = if self.border_luminance().is_some() {
            self.border_thickness
        } else {
            0
        };
        self.padding.saturating_add(border)
    }

    /// Draws the border, if enabled, just inside `rect` on `canvas`.
    pub fn draw_border(&self, canvas: &mut GrayImage, rect: Rect) {
        let Some(color) = self.border_luminance() else {
            return;
        };
        for k in 0..self.border_thickness.clamp(1, i32::MAX as u32) as i32 {
            let r = rect.inset(k);
            if r.is_empty() {
                break;
            }
            shapes::rect_outline(canvas, r.x, r.y, r.width, r.height, color);
        }
    }

    /// Foreground luminance that contrasts with the background.
    pub fn foreground(&self) -> u8 {
        if self.background >= 128 {
            0
        } else {
            255
        }
    }
}

/// The capability set every widget provides.
pub trait Widget: Send {
    fn base(&self) -> &BaseWidget;

    /// Stable identifier, used in logs and for matching state across frames.
    fn id(&self) -> &str {
        self.base().id()
    }

    fn dimensions(&self) -> (u32, u32) {
        self.base().dimensions()
    }

    fn position(&self) -> (i32, i32) {
        self.base().position()
    }

    fn z_order(&self) -> i32 {
        self.base().z_order()
    }

    fn is_enabled(&self) -> bool {
        self.base().is_enabled()
    }

    fn style(&self) -> &Style {
        self.base().style()
    }

    fn update_interval(&self) -> Duration {
        self.base().update_interval()
    }

    /// Runtime self-suppression, e.g. a feed with nothing to show.
    fn should_hide(&self) -> bool {
        self.base().auto_hidden()
    }

    /// True while the widget is animating and wants frames at the fast rate.
    fn needs_fast_refresh(&self) -> bool {
        false
    }

    fn update(&mut self, now: DateTime<Utc>) -> Result<(), WidgetError>;

    fn render(&mut self, now: DateTime<Utc>) -> Result<Option<GrayImage>, WidgetError>;

    /// Asks background tasks to stop. Called once at shutdown.
    fn stop(&mut self) {}

    /// Waits up to `timeout` for background tasks to finish; returns whether
    /// they did.
    fn join(&mut self, _timeout: Duration) -> bool {
        true
    }
}
