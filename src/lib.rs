//! # OLED Clock Core Library
//!
//! Everything needed to drive the small monochrome OLED built into some
//! gaming keyboards: a widget runtime that draws grayscale rasters, a
//! compositor that flattens them onto the device canvas, a 1-bit encoder
//! and a raw-HID transport that ships the result to the keyboard.
//!
//! ## Frame Pipeline
//!
//! ```text
//! widgets ──update/render──▶ compositor ──▶ encoder ──▶ transport ──▶ keyboard
//!    ▲
//!    └──────────── scheduler (10 Hz, 30 Hz while animating) ────────────
//! ```
//!
//! 1. **Update**: each widget whose interval has elapsed refreshes its data.
//!    Slow sources are polled by a background worker; `update()` only reads
//!    the latest snapshot.
//! 2. **Render**: each visible widget draws an 8-bit raster of its own size.
//! 3. **Composite**: rasters are blitted in z-order onto a 128x40 canvas.
//! 4. **Encode**: the canvas is dithered to 1 bit and packed MSB-first.
//! 5. **Send**: the payload is wrapped in the vendor report and written.
//!
//! ## Design Notes
//!
//! - **Errors are values.** Each subsystem has its own `thiserror` enum; a
//!   failing widget degrades to stale data or an error marker and never
//!   stops the loop. Only configuration errors and a transport that cannot
//!   be reopened are fatal.
//! - **Platform code is compiled in, not detected.** HID discovery and
//!   autostart each have a Linux, a Windows and an "unsupported" backend
//!   selected with `cfg`.
//! - **Time is injected.** The scheduler reads time from a
//!   [`scheduler::Clock`], so cadence tests run instantly.

pub mod autostart;
pub mod compositor;
pub mod config;
pub mod encoder;
pub mod raster;
pub mod ring_buffer;
pub mod scheduler;
pub mod transition;
pub mod transport;
pub mod widget;

pub use config::Config;
pub use raster::GrayImage;
pub use scheduler::Scheduler;
pub use widget::{Registry, Widget, WidgetContext};
