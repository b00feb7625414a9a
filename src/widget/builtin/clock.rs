//! # Clock Widget
//!
//! Formats the current time with a `strftime`-style pattern and draws it
//! either as text (bitmap glyphs or a TrueType face) or as seven-segment
//! digits.
//!
//! ## Options
//! ```toml
//! [widgets.options]
//! format = "%H:%M"      # chrono format string
//! segments = true       # seven-segment digits instead of text
//! blink = true          # colon visible on even seconds only
//! utc = false           # local time unless set
//! font = "fonts/Inter.ttf"
//! font_size = 18.0
//! glyphs = "medium"     # bitmap fallback: tiny | small | medium
//! thickness = 3         # segment stroke, derived from height when absent
//! ends = "hexagon"      # rectangle | hexagon | rounded
//! colon = "dots"        # dots | bar | none
//! align = "center"
//! ```

use std::path::PathBuf;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Timelike, Utc};
use serde::Deserialize;

use crate::config::WidgetConfig;
use crate::raster::segment::{self, ColonStyle, SegmentEnds};
use crate::raster::text::{GlyphSet, HAlign, TextFont, VAlign};
use crate::raster::{GrayImage, Rect};
use crate::widget::registry::WidgetContext;
use crate::widget::{BaseWidget, Widget, WidgetError};

use super::parse_options;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClockOptions {
    pub format: String,
    pub segments: bool,
    pub blink: bool,
    pub utc: bool,
    pub font: Option<PathBuf>,
    pub font_size: f32,
    pub glyphs: GlyphSet,
    pub thickness: Option<i32>,
    pub ends: SegmentEnds,
    pub colon: ColonStyle,
    pub align: HAlign,
}

impl Default for ClockOptions {
    fn default() -> Self {
        Self {
            format: "%H:%M".to_string(),
            segments: false,
            blink: true,
            utc: false,
            font: None,
            font_size: 16.0,
            glyphs: GlyphSet::Medium,
            thickness: None,
            ends: SegmentEnds::default(),
            colon: ColonStyle::default(),
            align: HAlign::Center,
        }
    }
}

/// Rejects format strings chrono cannot render.
fn validate_format(format: &str) -> Result<(), String> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(format!("invalid time format {format:?}"));
    }
    Ok(())
}

pub struct ClockWidget {
    base: BaseWidget,
    options: ClockOptions,
    font: TextFont,
    text: String,
    colon_visible: bool,
}

impl ClockWidget {
    pub fn new(base: BaseWidget, options: ClockOptions) -> Result<Self, WidgetError> {
        validate_format(&options.format).map_err(|reason| WidgetError::options(base.id(), reason))?;
        let font = TextFont::resolve(options.font.as_deref(), options.font_size, options.glyphs);
        Ok(Self {
            base,
            options,
            font,
            text: String::new(),
            colon_visible: true,
        })
    }

    /// The time string produced by the last update.
    pub fn text(&self) -> &str {
        &self.text
    }

    fn format(&self, now: DateTime<Utc>) -> String {
        if self.options.utc {
            now.format(&self.options.format).to_string()
        } else {
            now.with_timezone(&Local).format(&self.options.format).to_string()
        }
    }

    fn draw_segments(&self, img: &mut GrayImage, area: Rect, color: u8) {
        let digits = self.text.chars().filter(char::is_ascii_digit).count() as i32;
        let colons = self.text.chars().filter(|&c| c == ':').count() as i32;
        if digits == 0 || area.is_empty() {
            return;
        }

        let height = area.height;
        let thickness = self.options.thickness.unwrap_or((height / 8).max(1)).max(1);
        let gap = thickness;
        let colon_width = 3 * thickness;
        let glyphs = digits + colons;
        let fixed = colons * colon_width + (glyphs - 1) * gap;
        let digit_width = (height * 11 / 20).min((area.width - fixed) / digits);
        if digit_width <= 0 {
            return;
        }

        let total = digits * digit_width + fixed;
        let mut x = match self.options.align {
            HAlign::Left => area.x,
            HAlign::Center => area.x + (area.width - total) / 2,
            HAlign::Right => area.right() - total,
        };
        for ch in self.text.chars() {
            if let Some(d) = ch.to_digit(10) {
                segment::seven_segment_digit(
                    img,
                    d as u8,
                    x,
                    area.y,
                    digit_width,
                    height,
                    thickness,
                    self.options.ends,
                    color,
                );
                x += digit_width + gap;
            } else if ch == ':' {
                segment::seven_segment_colon(
                    img,
                    x,
                    area.y,
                    colon_width,
                    height,
                    thickness,
                    self.options.colon,
                    self.colon_visible,
                    color,
                );
                x += colon_width + gap;
            }
        }
    }
}

impl Widget for ClockWidget {
    fn base(&self) -> &BaseWidget {
        &self.base
    }

    fn update(&mut self, now: DateTime<Utc>) -> Result<(), WidgetError> {
        self.text = self.format(now);
        self.colon_visible = !self.options.blink || now.second() % 2 == 0;
        Ok(())
    }

    fn render(&mut self, _now: DateTime<Utc>) -> Result<Option<GrayImage>, WidgetError> {
        let mut canvas = self.base.create_canvas();
        let area = self.base.content_area();
        let color = self.base.style().foreground();
        if self.options.segments {
            self.draw_segments(&mut canvas, area, color);
        } else {
            let shown = if self.colon_visible {
                self.text.clone()
            } else {
                self.text.replace(':', " ")
            };
            self.font
                .draw(&mut canvas, &shown, area, self.options.align, VAlign::Center, color);
        }
        Ok(Some(canvas))
    }
}

pub fn build(config: &WidgetConfig, _ctx: &WidgetContext) -> Result<Box<dyn Widget>, WidgetError> {
    let options: ClockOptions = parse_options(config)?;
    Ok(Box::new(ClockWidget::new(BaseWidget::from_config(config), options)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    fn clock(options: ClockOptions) -> ClockWidget {
        ClockWidget::new(BaseWidget::new("clock", 0, 0, 128, 40), options).unwrap()
    }

    #[test]
    fn formats_in_utc() {
        let mut widget = clock(ClockOptions {
            utc: true,
            ..ClockOptions::default()
        });
        widget.update(at(9, 5, 0)).unwrap();
        assert_eq!(widget.text(), "09:05");
    }

    #[test]
    fn invalid_format_is_rejected() {
        let options = ClockOptions {
            format: "%Q".into(),
            ..ClockOptions::default()
        };
        let err = ClockWidget::new(BaseWidget::new("c", 0, 0, 10, 10), options).err().unwrap();
        assert!(matches!(err, WidgetError::Options { id, .. } if id == "c"));
    }

    #[test]
    fn renders_at_widget_size() {
        let mut widget = clock(ClockOptions {
            utc: true,
            ..ClockOptions::default()
        });
        widget.update(at(12, 34, 0)).unwrap();
        let img = widget.render(at(12, 34, 0)).unwrap().unwrap();
        assert_eq!(img.dimensions(), (128, 40));
        assert!(img.count(255) > 0);
    }

    #[test]
    fn segment_colon_blinks() {
        let mut widget = clock(ClockOptions {
            utc: true,
            segments: true,
            ..ClockOptions::default()
        });
        widget.update(at(10, 10, 0)).unwrap();
        let lit = widget.render(at(10, 10, 0)).unwrap().unwrap().count(255);
        widget.update(at(10, 10, 1)).unwrap();
        let dark = widget.render(at(10, 10, 1)).unwrap().unwrap().count(255);
        assert!(lit > dark, "colon should be hidden on odd seconds");
        assert!(dark > 0);
    }

    #[test]
    fn no_blink_keeps_colon() {
        let mut widget = clock(ClockOptions {
            utc: true,
            segments: true,
            blink: false,
            ..ClockOptions::default()
        });
        widget.update(at(10, 10, 0)).unwrap();
        let even = widget.render(at(10, 10, 0)).unwrap().unwrap();
        widget.update(at(10, 10, 1)).unwrap();
        let odd = widget.render(at(10, 10, 1)).unwrap().unwrap();
        assert_eq!(even, odd);
    }

    #[test]
    fn build_reads_options() {
        let mut config = WidgetConfig::new("clock", "clock", 64, 20);
        config.options.insert("format".into(), "%H".into());
        config.options.insert("utc".into(), true.into());
        let mut widget = build(&config, &WidgetContext::default()).unwrap();
        widget.update(at(7, 0, 0)).unwrap();
        assert!(widget.render(at(7, 0, 0)).unwrap().is_some());
    }
}
