//! # Message Feed Widget
//!
//! Cycles through a list of lines, holding each for `dwell` seconds and
//! switching with a [`Transition`]. The list lives in a [`MessageFeed`] that
//! other threads may push to; the widget hides itself while it is empty.
//!
//! ## Options
//! ```toml
//! [widgets.options]
//! lines = ["Build passed", "3 unread"]
//! dwell = 5.0
//! transition = "push-up"   # any transition name, or "random"
//! transition_ms = 400
//! glyphs = "small"
//! align = "left"
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;

use crate::config::WidgetConfig;
use crate::raster::text::{GlyphSet, HAlign, TextFont, VAlign};
use crate::raster::GrayImage;
use crate::transition::{Transition, TransitionKind};
use crate::widget::registry::WidgetContext;
use crate::widget::{BaseWidget, Widget, WidgetError};

use super::parse_options;

/// Shared list of lines to display.
#[derive(Clone, Default, Debug)]
pub struct MessageFeed {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MessageFeed {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines: Arc::new(Mutex::new(lines)),
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        self.lines.lock().push(line.into());
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Line at `index` modulo the feed length.
    fn line(&self, index: usize) -> Option<(usize, String)> {
        let lines = self.lines.lock();
        if lines.is_empty() {
            return None;
        }
        let index = index % lines.len();
        Some((index, lines[index].clone()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessageOptions {
    pub lines: Vec<String>,
    pub dwell: f64,
    pub transition: TransitionKind,
    pub transition_ms: u64,
    pub font: Option<PathBuf>,
    pub font_size: f32,
    pub glyphs: GlyphSet,
    pub align: HAlign,
}

impl Default for MessageOptions {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            dwell: 5.0,
            transition: TransitionKind::default(),
            transition_ms: 400,
            font: None,
            font_size: 12.0,
            glyphs: GlyphSet::Small,
            align: HAlign::Left,
        }
    }
}

pub struct MessagesWidget {
    base: BaseWidget,
    feed: MessageFeed,
    font: TextFont,
    align: HAlign,
    dwell: Duration,
    kind: TransitionKind,
    transition_time: Duration,
    index: usize,
    current: Option<String>,
    shown_since: Option<DateTime<Utc>>,
    last_frame: Option<GrayImage>,
    transition: Option<Transition>,
}

impl MessagesWidget {
    pub fn new(mut base: BaseWidget, options: MessageOptions) -> Self {
        let feed = MessageFeed::new(options.lines);
        let probe = feed.clone();
        base.set_auto_hide(Arc::new(move || probe.is_empty()));
        Self {
            base,
            feed,
            font: TextFont::resolve(options.font.as_deref(), options.font_size, options.glyphs),
            align: options.align,
            dwell: Duration::try_from_secs_f64(options.dwell).unwrap_or(Duration::ZERO),
            kind: options.transition,
            transition_time: Duration::from_millis(options.transition_ms),
            index: 0,
            current: None,
            shown_since: None,
            last_frame: None,
            transition: None,
        }
    }

    /// Handle for producers that add or clear lines.
    pub fn feed(&self) -> MessageFeed {
        self.feed.clone()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn show(&mut self, index: usize, text: String, now: DateTime<Utc>) {
        if self.current.as_deref() != Some(text.as_str()) {
            if let Some(old) = self.last_frame.take() {
                let background = self.base.style().background;
                self.transition = Some(Transition::start(self.kind, self.transition_time, old, background, now));
            }
            log::debug!("Widget {} shows message {}", self.base.id(), index);
        }
        self.index = index;
        self.current = Some(text);
        self.shown_since = Some(now);
    }

    fn plain(&self, text: &str) -> GrayImage {
        let mut canvas = self.base.create_canvas();
        let area = self.base.content_area();
        let color = self.base.style().foreground();
        self.font.draw(&mut canvas, text, area, self.align, VAlign::Center, color);
        canvas
    }
}

impl Widget for MessagesWidget {
    fn base(&self) -> &BaseWidget {
        &self.base
    }

    fn needs_fast_refresh(&self) -> bool {
        self.transition.is_some()
    }

    fn update(&mut self, now: DateTime<Utc>) -> Result<(), WidgetError> {
        let due = match self.shown_since {
            None => true,
            Some(since) => (now - since).to_std().is_ok_and(|held| held >= self.dwell),
        };
        let next = if self.current.is_none() { self.index } else { self.index + 1 };
        match self.feed.line(if due { next } else { self.index }) {
            None => {
                self.current = None;
                self.shown_since = None;
                self.last_frame = None;
                self.transition = None;
            }
            Some((index, text)) if due || self.current.as_deref() != Some(text.as_str()) => {
                self.show(index, text, now)
            }
            Some(_) => {}
        }
        Ok(())
    }

    fn render(&mut self, now: DateTime<Utc>) -> Result<Option<GrayImage>, WidgetError> {
        let Some(text) = self.current.as_deref() else {
            return Ok(None);
        };
        let plain = self.plain(text);
        let frame = match &self.transition {
            Some(tr) if !tr.is_done(now) => tr.compose(&plain, now),
            _ => {
                self.transition = None;
                plain
            }
        };
        self.last_frame = Some(frame.clone());
        Ok(Some(frame))
    }
}

pub fn build(config: &WidgetConfig, _ctx: &WidgetContext) -> Result<Box<dyn Widget>, WidgetError> {
    let options: MessageOptions = parse_options(config)?;
    Ok(Box::new(MessagesWidget::new(BaseWidget::from_config(config), options)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::Direction;
    use chrono::TimeZone;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::milliseconds(ms)
    }

    fn widget(lines: &[&str]) -> MessagesWidget {
        let options = MessageOptions {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            dwell: 5.0,
            transition: TransitionKind::Push(Direction::Up),
            transition_ms: 400,
            ..MessageOptions::default()
        };
        MessagesWidget::new(BaseWidget::new("feed", 0, 0, 64, 12), options)
    }

    #[test]
    fn empty_feed_hides() {
        let mut w = widget(&[]);
        assert!(w.should_hide());
        w.update(t(0)).unwrap();
        assert!(w.render(t(0)).unwrap().is_none());

        w.feed().push("HELLO");
        assert!(!w.should_hide());
        w.update(t(100)).unwrap();
        assert_eq!(w.current(), Some("HELLO"));
        assert!(w.render(t(100)).unwrap().is_some());
    }

    #[test]
    fn rotates_after_dwell_with_transition() {
        let mut w = widget(&["ONE", "TWO"]);
        w.update(t(0)).unwrap();
        let one = w.render(t(0)).unwrap().unwrap();
        assert!(!w.needs_fast_refresh());

        w.update(t(4_000)).unwrap();
        assert_eq!(w.current(), Some("ONE"));

        w.update(t(5_000)).unwrap();
        assert_eq!(w.current(), Some("TWO"));
        assert!(w.needs_fast_refresh());
        let mid = w.render(t(5_200)).unwrap().unwrap();
        assert_ne!(mid, one);

        let done = w.render(t(5_400)).unwrap().unwrap();
        assert!(!w.needs_fast_refresh());
        assert_eq!(done, w.plain("TWO"));
        assert_ne!(mid, done);
    }

    #[test]
    fn single_line_never_transitions() {
        let mut w = widget(&["ONLY"]);
        w.update(t(0)).unwrap();
        w.render(t(0)).unwrap();
        w.update(t(6_000)).unwrap();
        assert!(!w.needs_fast_refresh());
        assert_eq!(w.current(), Some("ONLY"));
    }

    #[test]
    fn clearing_the_feed_hides_again() {
        let mut w = widget(&["A", "B"]);
        w.update(t(0)).unwrap();
        w.feed().clear();
        w.update(t(10)).unwrap();
        assert!(w.should_hide());
        assert!(w.render(t(10)).unwrap().is_none());
    }
}
