//! Static label that scrolls as a marquee when it does not fit.
//!
//! Options: `text`, `font`, `font_size`, `glyphs`, `align`, `valign`,
//! `scroll_speed` (pixels per second) and `gap` (pixels between repeats).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::WidgetConfig;
use crate::raster::text::{GlyphSet, HAlign, TextFont, VAlign};
use crate::raster::{GrayImage, Rect};
use crate::widget::registry::WidgetContext;
use crate::widget::{BaseWidget, Widget, WidgetError};

use super::parse_options;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    pub text: String,
    pub font: Option<PathBuf>,
    pub font_size: f32,
    pub glyphs: GlyphSet,
    pub align: HAlign,
    pub valign: VAlign,
    pub scroll_speed: f32,
    pub gap: i32,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: None,
            font_size: 12.0,
            glyphs: GlyphSet::Small,
            align: HAlign::Center,
            valign: VAlign::Center,
            scroll_speed: 20.0,
            gap: 16,
        }
    }
}

pub struct TextWidget {
    base: BaseWidget,
    options: TextOptions,
    font: TextFont,
    text_width: i32,
    scroll_origin: Option<DateTime<Utc>>,
}

impl TextWidget {
    pub fn new(base: BaseWidget, options: TextOptions) -> Self {
        let font = TextFont::resolve(options.font.as_deref(), options.font_size, options.glyphs);
        let text_width = font.measure(&options.text).0;
        Self {
            base,
            options,
            font,
            text_width,
            scroll_origin: None,
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.options.text = text.into();
        self.text_width = self.font.measure(&self.options.text).0;
        self.scroll_origin = None;
    }

    fn scrolls(&self) -> bool {
        self.options.scroll_speed > 0.0 && self.text_width > self.base.content_area().width
    }

    /// Horizontal scroll offset at `now`, in `[0, text_width + gap)`.
    fn offset(&self, now: DateTime<Utc>) -> i32 {
        let origin = self.scroll_origin.unwrap_or(now);
        let elapsed = (now - origin).num_milliseconds().max(0) as f64 / 1000.0;
        let period = (self.text_width + self.options.gap.max(0)) as i64;
        if period <= 0 {
            return 0;
        }
        ((elapsed * self.options.scroll_speed as f64) as i64 % period) as i32
    }
}

impl Widget for TextWidget {
    fn base(&self) -> &BaseWidget {
        &self.base
    }

    fn needs_fast_refresh(&self) -> bool {
        self.scrolls()
    }

    fn update(&mut self, _now: DateTime<Utc>) -> Result<(), WidgetError> {
        Ok(())
    }

    fn render(&mut self, now: DateTime<Utc>) -> Result<Option<GrayImage>, WidgetError> {
        let mut canvas = self.base.create_canvas();
        let area = self.base.content_area();
        let color = self.base.style().foreground();
        if area.is_empty() {
            return Ok(Some(canvas));
        }

        if !self.scrolls() {
            self.scroll_origin = None;
            self.font
                .draw(&mut canvas, &self.options.text, area, self.options.align, self.options.valign, color);
            return Ok(Some(canvas));
        }

        if self.scroll_origin.is_none() {
            self.scroll_origin = Some(now);
        }
        // Drawn into a content-sized strip so the run never spills into the padding.
        let mut strip = GrayImage::new(area.width as u32, area.height as u32, self.base.style().background);
        let offset = self.offset(now);
        let period = self.text_width + self.options.gap.max(0);
        for start in [-offset, period - offset] {
            let run = Rect::new(start, 0, self.text_width, area.height);
            self.font
                .draw(&mut strip, &self.options.text, run, HAlign::Left, self.options.valign, color);
        }
        canvas.blit(&strip, area.x, area.y, None);
        Ok(Some(canvas))
    }
}

pub fn build(config: &WidgetConfig, _ctx: &WidgetContext) -> Result<Box<dyn Widget>, WidgetError> {
    let options: TextOptions = parse_options(config)?;
    Ok(Box::new(TextWidget::new(BaseWidget::from_config(config), options)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Style;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn label(text: &str, width: u32) -> TextWidget {
        let options = TextOptions {
            text: text.into(),
            ..TextOptions::default()
        };
        TextWidget::new(BaseWidget::new("label", 0, 0, width, 10), options)
    }

    #[test]
    fn short_text_is_static() {
        let mut widget = label("HI", 60);
        assert!(!widget.needs_fast_refresh());
        let a = widget.render(t0()).unwrap().unwrap();
        let b = widget.render(t0() + Duration::seconds(3)).unwrap().unwrap();
        assert_eq!(a, b);
        assert!(a.count(255) > 0);
    }

    #[test]
    fn long_text_scrolls() {
        let mut widget = label("A MUCH LONGER LABEL THAN FITS", 40);
        assert!(widget.needs_fast_refresh());
        let a = widget.render(t0()).unwrap().unwrap();
        let b = widget.render(t0() + Duration::milliseconds(500)).unwrap().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn marquee_respects_padding() {
        let options = TextOptions {
            text: "SCROLLING TEXT THAT OVERFLOWS".into(),
            ..TextOptions::default()
        };
        let style = Style {
            padding: 2,
            ..Style::default()
        };
        let mut widget = TextWidget::new(BaseWidget::new("m", 0, 0, 30, 12).with_style(style), options);
        for ms in [0, 250, 900] {
            let img = widget.render(t0() + Duration::milliseconds(ms)).unwrap().unwrap();
            for y in 0..12 {
                for x in [0, 1, 28, 29] {
                    assert_eq!(img.get(x, y), Some(0), "padding lit at ({x},{y})");
                }
            }
        }
    }

    #[test]
    fn set_text_restarts_scroll() {
        let mut widget = label("SHORT", 60);
        widget.set_text("NOW THIS IS FAR TOO LONG TO FIT");
        assert!(widget.needs_fast_refresh());
        widget.set_text("OK");
        assert!(!widget.needs_fast_refresh());
    }
}
