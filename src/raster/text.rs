//! # Text Rendering
//!
//! Two families of fonts are available to widgets:
//!
//! - **Bitmap glyph sets** ([`GlyphSet`]): a hand-drawn 3×5 set for tiny
//!   labels (error markers, gauge captions) plus the 5×7 and 7×13 fonts that
//!   ship with embedded-graphics.
//! - **Scalable faces** ([`FontFace`]): TrueType/OpenType files loaded through
//!   the font cache.
//!
//! [`TextFont`] picks between the two. A scalable face that cannot be loaded
//! degrades to a bitmap set with a warning rather than failing the widget.
//!
//! Every draw is clipped: text that overflows its area is cut, never wrapped.

use std::path::Path;

use embedded_graphics::{
    mono_font::{
        ascii::{FONT_5X7, FONT_7X13},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::Gray8,
    prelude::{DrawTargetExt, Point, Size},
    primitives::Rectangle,
    text::{Baseline, Text},
    Drawable,
};
use serde::{Deserialize, Serialize};

use super::font::{load_face, FontFace};
use super::{GrayImage, Rect};

/// Horizontal placement of a text run within its area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical placement of a text run within its area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Fixed-size bitmap fonts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GlyphSet {
    /// 3×5 capitals, digits and a little punctuation.
    Tiny,
    /// embedded-graphics `FONT_5X7`.
    #[default]
    Small,
    /// embedded-graphics `FONT_7X13`.
    Medium,
}

impl GlyphSet {
    fn mono(self) -> Option<&'static MonoFont<'static>> {
        match self {
            GlyphSet::Tiny => None,
            GlyphSet::Small => Some(&FONT_5X7),
            GlyphSet::Medium => Some(&FONT_7X13),
        }
    }

    /// Height of one line of text.
    pub fn line_height(self) -> i32 {
        match self.mono() {
            Some(font) => font.character_size.height as i32,
            None => TINY_HEIGHT,
        }
    }

    /// Horizontal distance between the starts of consecutive glyphs.
    pub fn advance(self) -> i32 {
        match self.mono() {
            Some(font) => (font.character_size.width + font.character_spacing) as i32,
            None => TINY_WIDTH + 1,
        }
    }

    fn spacing(self) -> i32 {
        match self.mono() {
            Some(font) => font.character_spacing as i32,
            None => 1,
        }
    }
}

const TINY_WIDTH: i32 = 3;
const TINY_HEIGHT: i32 = 5;

/// Rows of a 3×5 glyph, top to bottom; bit 2 is the leftmost column.
/// Lowercase letters share the uppercase shapes; anything unknown is `?`.
fn tiny_glyph(ch: char) -> [u8; 5] {
    match ch.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        ' ' => [0; 5],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '\'' => [0b010, 0b010, 0b000, 0b000, 0b000],
        _ => [0b110, 0b001, 0b010, 0b000, 0b010],
    }
}

/// Width in pixels of `text` set in `set`. Empty text measures 0.
pub fn measure(text: &str, set: GlyphSet) -> i32 {
    let n = text.chars().count() as i32;
    if n == 0 {
        return 0;
    }
    n * set.advance() - set.spacing()
}

/// Draws `text` with its top-left corner at `(x, y)`, clipped to the raster.
pub fn draw(img: &mut GrayImage, text: &str, x: i32, y: i32, set: GlyphSet, color: u8) {
    let bounds = img.bounds();
    draw_clipped(img, text, x, y, set, color, bounds);
}

/// Draws `text` with its top-left corner at `(x, y)`, touching only pixels
/// inside `clip`.
pub fn draw_clipped(
    img: &mut GrayImage,
    text: &str,
    x: i32,
    y: i32,
    set: GlyphSet,
    color: u8,
    clip: Rect,
) {
    let clip = clip.intersect(&img.bounds());
    if clip.is_empty() || text.is_empty() {
        return;
    }
    match set.mono() {
        Some(font) => {
            let area = Rectangle::new(
                Point::new(clip.x, clip.y),
                Size::new(clip.width as u32, clip.height as u32),
            );
            let style = MonoTextStyle::new(font, Gray8::new(color));
            // GrayImage's DrawTarget is infallible.
            let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
                .draw(&mut img.clipped(&area));
        }
        None => {
            let mut pen = x;
            for ch in text.chars() {
                for (row, bits) in tiny_glyph(ch).iter().enumerate() {
                    for col in 0..TINY_WIDTH {
                        if bits & (0b100 >> col) != 0 {
                            let (px, py) = (pen + col, y + row as i32);
                            if clip.contains(px, py) {
                                img.set(px, py, color);
                            }
                        }
                    }
                }
                pen += set.advance();
            }
        }
    }
}

/// Draws `text` aligned inside `area` and clipped to it.
pub fn draw_aligned(
    img: &mut GrayImage,
    text: &str,
    set: GlyphSet,
    area: Rect,
    halign: HAlign,
    valign: VAlign,
    color: u8,
) {
    let (x, y) = align(area, measure(text, set), set.line_height(), halign, valign);
    draw_clipped(img, text, x, y, set, color, area);
}

/// Top-left corner of a `width` x `height` box placed inside `area`.
pub fn align(area: Rect, width: i32, height: i32, halign: HAlign, valign: VAlign) -> (i32, i32) {
    let x = match halign {
        HAlign::Left => area.x,
        HAlign::Center => area.x + (area.width - width) / 2,
        HAlign::Right => area.right() - width,
    };
    let y = match valign {
        VAlign::Top => area.y,
        VAlign::Center => area.y + (area.height - height) / 2,
        VAlign::Bottom => area.bottom() - height,
    };
    (x, y)
}

/// Either a bitmap glyph set or a loaded scalable face.
#[derive(Clone, Debug)]
pub enum TextFont {
    Bitmap(GlyphSet),
    Scalable(FontFace),
}

impl Default for TextFont {
    fn default() -> Self {
        TextFont::Bitmap(GlyphSet::default())
    }
}

impl TextFont {
    /// Loads the face at `path` when one is configured, otherwise (or when
    /// loading fails) uses `fallback`.
    pub fn resolve(path: Option<&Path>, px: f32, fallback: GlyphSet) -> Self {
        let Some(path) = path else {
            return TextFont::Bitmap(fallback);
        };
        match load_face(path, px) {
            Ok(face) => TextFont::Scalable(face),
            Err(e) => {
                log::warn!("{e}; falling back to the {fallback:?} bitmap font");
                TextFont::Bitmap(fallback)
            }
        }
    }

    /// `(width, height)` of `text` in this font.
    pub fn measure(&self, text: &str) -> (i32, i32) {
        match self {
            TextFont::Bitmap(set) => (measure(text, *set), set.line_height()),
            TextFont::Scalable(face) => {
                let m = face.measure(text);
                (m.width, m.height())
            }
        }
    }

    /// Draws `text` aligned inside `area`, whichever kind of font this is.
    pub fn draw(
        &self,
        img: &mut GrayImage,
        text: &str,
        area: Rect,
        halign: HAlign,
        valign: VAlign,
        color: u8,
    ) {
        match self {
            TextFont::Bitmap(set) => draw_aligned(img, text, *set, area, halign, valign, color),
            TextFont::Scalable(face) => face.draw_aligned(img, text, area, halign, valign, color),
        }
    }
}
