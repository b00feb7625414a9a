//! Compact in-canvas error display.
//!
//! A widget whose data source has failed is drawn as a warning triangle, a
//! cross and a short token such as `HTTP 401` or `NO NET`, small enough to
//! fit a 40-pixel-high widget.

use std::io::ErrorKind;

use crate::raster::text::{self, GlyphSet, HAlign, VAlign};
use crate::raster::{shapes, GrayImage, Rect};

use super::SourceError;

/// Short upper-case token for `err`.
pub fn abbreviate(err: &SourceError) -> String {
    match err {
        SourceError::Http(status) => format!("HTTP {status}"),
        SourceError::Timeout => "TIMEOUT".into(),
        SourceError::Offline => "NO NET".into(),
        SourceError::Parse(_) => "BAD DATA".into(),
        SourceError::Io(e) => match e.kind() {
            ErrorKind::TimedOut => "TIMEOUT".into(),
            ErrorKind::NotFound => "NOT FOUND".into(),
            ErrorKind::PermissionDenied => "DENIED".into(),
            ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                "NO NET".into()
            }
            _ => "IO ERROR".into(),
        },
        SourceError::Other(_) => "ERROR".into(),
    }
}

/// Draws the marker centred in `area`: glyph pair on top, token below.
/// When `area` is too short for both, only the token is drawn.
pub fn render_marker(img: &mut GrayImage, area: Rect, token: &str, color: u8) {
    let glyph = (area.height - 7).min(area.width / 2 - 1).min(12);
    if glyph < 5 {
        text::draw_aligned(img, token, GlyphSet::Tiny, area, HAlign::Center, VAlign::Center, color);
        return;
    }

    let block = glyph + 2 + GlyphSet::Tiny.line_height();
    let top = area.y + (area.height - block) / 2;
    let pair = 2 * glyph + 2;
    let left = area.x + (area.width - pair) / 2;
    shapes::warning_triangle(img, left, top, glyph, color);
    shapes::cross(img, left + glyph + 2, top, glyph, color);

    let label = Rect::new(area.x, top + glyph + 2, area.width, GlyphSet::Tiny.line_height());
    text::draw_aligned(img, token, GlyphSet::Tiny, label, HAlign::Center, VAlign::Top, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn tokens() {
        assert_eq!(abbreviate(&SourceError::Http(401)), "HTTP 401");
        assert_eq!(abbreviate(&SourceError::Timeout), "TIMEOUT");
        assert_eq!(abbreviate(&SourceError::Offline), "NO NET");
        assert_eq!(abbreviate(&SourceError::Parse("x".into())), "BAD DATA");
        assert_eq!(abbreviate(&SourceError::Other("boom".into())), "ERROR");
        let io = SourceError::Io(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert_eq!(abbreviate(&io), "TIMEOUT");
    }

    #[test]
    fn marker_stays_inside_area() {
        let mut img = GrayImage::new(64, 40, 0);
        let area = Rect::new(8, 4, 48, 32);
        render_marker(&mut img, area, "HTTP 401", 255);
        assert!(img.count(255) > 0);
        for y in 0..40 {
            for x in 0..64 {
                if !area.contains(x, y) {
                    assert_eq!(img.get(x, y), Some(0), "({x},{y}) outside the area");
                }
            }
        }
    }

    #[test]
    fn short_area_draws_token_only() {
        let mut img = GrayImage::new(40, 7, 0);
        let area = img.bounds();
        render_marker(&mut img, area, "NO NET", 255);
        assert!(img.count(255) > 0);
    }
}
