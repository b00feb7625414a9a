//! # Frame Scheduler
//!
//! The single-threaded frame loop. Each tick runs strictly
//! update → render → composite → encode → send, then waits for the next
//! frame boundary.
//!
//! ## Cadence
//! Frames land on multiples of the frame period, so the loop does not drift
//! when a tick runs long. The period switches to the fast rate while any
//! visible widget reports [`Widget::needs_fast_refresh`].
//!
//! ## Failure handling
//! - A widget whose `update()` fails transiently keeps its stale state.
//! - A fatal source error replaces the widget with the error marker until its
//!   next successful update.
//! - A failing `render()` reuses the widget's last good raster, or hides the
//!   widget when it has none.
//! - Failed sends are counted and retried next frame. Only a fatal transport
//!   error stops the loop.
//!
//! Time comes from a [`Clock`], so tests drive the loop with a
//! [`ManualClock`] and never sleep.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::Mutex;
use thiserror::Error;

use crate::compositor::{self, Layer};
use crate::config::DisplayConfig;
use crate::encoder::{self, DitherMode, EncodeError};
use crate::raster::{resize, GrayImage};
use crate::transport::{FrameSink, TransportError};
use crate::widget::error_marker;
use crate::widget::{Widget, WidgetError};

const STATS_LOG_INTERVAL: u64 = 600;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

/// Source of wall-clock time and of waiting.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Blocks until `deadline` or until `shutdown` fires or disconnects.
    /// Returns `true` on shutdown.
    fn wait_until(&self, deadline: DateTime<Utc>, shutdown: &Receiver<()>) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn wait_until(&self, deadline: DateTime<Utc>, shutdown: &Receiver<()>) -> bool {
        let timeout = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        !matches!(shutdown.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }
}

/// Clock that only moves when waited on or advanced by hand.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    fn wait_until(&self, deadline: DateTime<Utc>, shutdown: &Receiver<()>) -> bool {
        {
            let mut now = self.now.lock();
            if deadline > *now {
                *now = deadline;
            }
        }
        !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
    }
}

/// Counters exposed by [`Scheduler::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub frames: u64,
    pub frames_sent: u64,
    pub failed_sends: u64,
    pub unchanged_frames: u64,
}

struct Slot {
    widget: Box<dyn Widget>,
    last_update: Option<DateTime<Utc>>,
    cached: Option<GrayImage>,
    fault: Option<String>,
    visible: bool,
}

impl Slot {
    fn new(widget: Box<dyn Widget>) -> Self {
        Self {
            widget,
            last_update: None,
            cached: None,
            fault: None,
            visible: false,
        }
    }

    fn update_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_update {
            None => true,
            Some(last) => (now - last).to_std().is_ok_and(|held| held >= self.widget.update_interval()),
        }
    }

    fn update(&mut self, now: DateTime<Utc>) {
        if !self.update_due(now) {
            return;
        }
        self.last_update = Some(now);
        match self.widget.update(now) {
            Ok(()) => {
                if self.fault.take().is_some() {
                    log::info!("Widget {} recovered", self.widget.id());
                }
            }
            Err(WidgetError::Fatal(e)) => {
                log::warn!("Widget {} source failed: {}", self.widget.id(), e);
                self.fault = Some(error_marker::abbreviate(&e));
            }
            Err(e) => log::warn!("Widget {} update failed: {}", self.widget.id(), e),
        }
    }

    fn render(&mut self, now: DateTime<Utc>) {
        if !self.widget.is_enabled() || self.widget.should_hide() {
            self.visible = false;
            return;
        }
        if let Some(token) = &self.fault {
            let base = self.widget.base();
            let mut raster = base.create_canvas();
            let area = base.content_area();
            error_marker::render_marker(&mut raster, area, token, base.style().foreground());
            self.cached = Some(raster);
            self.visible = true;
            return;
        }
        match self.widget.render(now) {
            Ok(Some(raster)) => {
                let (w, h) = self.widget.dimensions();
                let raster = if raster.dimensions() == (w, h) {
                    raster
                } else {
                    log::warn!(
                        "Widget {} rendered {:?}, expected {:?}",
                        self.widget.id(),
                        raster.dimensions(),
                        (w, h)
                    );
                    resize::nearest(&raster, w, h)
                };
                self.cached = Some(raster);
                self.visible = true;
            }
            Ok(None) => self.visible = false,
            Err(e) => {
                log::warn!("Widget {} render failed: {}", self.widget.id(), e);
                self.visible = self.cached.is_some();
            }
        }
    }
}

pub struct Scheduler<S: FrameSink, C: Clock = SystemClock> {
    slots: Vec<Slot>,
    sink: S,
    clock: C,
    width: u32,
    height: u32,
    background: u8,
    dither: DitherMode,
    period: Duration,
    fast_period: Duration,
    shutdown: Receiver<()>,
    frame_limit: Option<u64>,
    join_timeout: Duration,
    canvas: GrayImage,
    last_canvas: Option<GrayImage>,
    payload: Vec<u8>,
    last_now: Option<DateTime<Utc>>,
    stats: SchedulerStats,
}

impl<S: FrameSink, C: Clock> Scheduler<S, C> {
    pub fn new(widgets: Vec<Box<dyn Widget>>, sink: S, clock: C, display: &DisplayConfig) -> Self {
        log::info!(
            "Scheduling {} widgets on a {}x{} canvas at {} Hz ({} Hz fast)",
            widgets.len(),
            display.width,
            display.height,
            display.frame_rate_hz,
            display.fast_frame_rate_hz
        );
        Self {
            slots: widgets.into_iter().map(Slot::new).collect(),
            sink,
            clock,
            width: display.width,
            height: display.height,
            background: display.background,
            dither: display.dither,
            period: display.frame_period(),
            fast_period: display.fast_frame_period(),
            shutdown: crossbeam_channel::never(),
            frame_limit: None,
            join_timeout: Duration::from_secs(2),
            canvas: GrayImage::new(display.width, display.height, display.background),
            last_canvas: None,
            payload: Vec::new(),
            last_now: None,
            stats: SchedulerStats::default(),
        }
    }

    /// Stops the loop when `shutdown` receives or disconnects.
    pub fn with_shutdown(mut self, shutdown: Receiver<()>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Stops the loop after `frames` ticks.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The canvas composited by the last tick.
    pub fn canvas(&self) -> &GrayImage {
        &self.canvas
    }

    /// Period for the next frame given current widget state.
    pub fn current_period(&self) -> Duration {
        let fast = self
            .slots
            .iter()
            .any(|s| s.visible && s.widget.is_enabled() && s.widget.needs_fast_refresh());
        if fast {
            self.fast_period
        } else {
            self.period
        }
    }

    /// Runs one frame and returns the boundary the next one is due at.
    pub fn tick(&mut self) -> Result<DateTime<Utc>, SchedulerError> {
        let now = match self.last_now {
            Some(last) => self.clock.now().max(last),
            None => self.clock.now(),
        };
        self.last_now = Some(now);

        for slot in self.slots.iter_mut().filter(|s| s.widget.is_enabled()) {
            slot.update(now);
        }
        for slot in &mut self.slots {
            slot.render(now);
        }

        let layers: Vec<Layer<'_>> = self
            .slots
            .iter()
            .filter(|s| s.visible)
            .filter_map(|s| s.cached.as_ref().map(|r| Layer::new(s.widget.as_ref(), r)))
            .collect();
        compositor::composite(&mut self.canvas, self.background, layers);

        if self.last_canvas.as_ref() == Some(&self.canvas) && !self.payload.is_empty() {
            self.stats.unchanged_frames += 1;
        } else {
            self.payload = encoder::encode_with(&self.canvas, self.width, self.height, self.dither)?;
            self.last_canvas = Some(self.canvas.clone());
        }

        self.stats.frames += 1;
        match self.sink.send(&self.payload) {
            Ok(()) => self.stats.frames_sent += 1,
            Err(e) if e.is_fatal() => {
                log::error!("Transport gave up: {e}");
                return Err(e.into());
            }
            Err(e) => {
                self.stats.failed_sends += 1;
                log::warn!("Frame {} not sent: {}", self.stats.frames, e);
            }
        }
        if self.stats.frames % STATS_LOG_INTERVAL == 0 {
            log::debug!("Frame stats: {:?}", self.stats);
        }

        Ok(next_boundary(now, self.current_period()))
    }

    /// Runs frames until shutdown, the frame limit, or a fatal transport
    /// error, then stops every widget and closes the sink.
    pub fn run(&mut self) -> Result<SchedulerStats, SchedulerError> {
        let result = self.frame_loop();
        self.shutdown_widgets();
        self.sink.close();
        log::info!(
            "Stopped after {} frames ({} sent, {} failed)",
            self.stats.frames,
            self.stats.frames_sent,
            self.stats.failed_sends
        );
        result.map(|()| self.stats)
    }

    fn frame_loop(&mut self) -> Result<(), SchedulerError> {
        loop {
            if !matches!(self.shutdown.try_recv(), Err(TryRecvError::Empty)) {
                log::info!("Shutdown requested");
                return Ok(());
            }
            let deadline = self.tick()?;
            if self.frame_limit.is_some_and(|limit| self.stats.frames >= limit) {
                return Ok(());
            }
            if self.clock.wait_until(deadline, &self.shutdown) {
                log::info!("Shutdown requested");
                return Ok(());
            }
        }
    }

    fn shutdown_widgets(&mut self) {
        for slot in &mut self.slots {
            slot.widget.stop();
        }
        for slot in &mut self.slots {
            if !slot.widget.join(self.join_timeout) {
                log::warn!("Widget {} did not stop in time", slot.widget.id());
            }
        }
    }
}

/// First multiple of `period` strictly after `now`.
pub fn next_boundary(now: DateTime<Utc>, period: Duration) -> DateTime<Utc> {
    let step = period.as_micros().max(1) as i64;
    let t = now.timestamp_micros();
    let next = t.div_euclid(step) * step + step;
    DateTime::from_timestamp_micros(next).unwrap_or(now + chrono::Duration::microseconds(step))
}
