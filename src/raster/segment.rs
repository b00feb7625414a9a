//! Seven-segment digits and colon separators for clock faces.
//!
//! Segment layout, bit 0 first:
//!
//! ```text
//!  aaa
//! f   b
//!  ggg
//! e   c
//!  ddd
//! ```

use super::shapes::fill_rect;
use super::{GrayImage, Rect};

/// Segment masks for the digits 0 through 9 (bit 0 = a ... bit 6 = g).
pub const DIGIT_SEGMENTS: [u8; 10] = [
    0b011_1111, // 0
    0b000_0110, // 1
    0b101_1011, // 2
    0b100_1111, // 3
    0b110_0110, // 4
    0b110_1101, // 5
    0b111_1101, // 6
    0b000_0111, // 7
    0b111_1111, // 8
    0b110_1111, // 9
];

/// Shape of segment ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentEnds {
    #[default]
    Rectangle,
    Hexagon,
    Rounded,
}

/// Colon separator style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColonStyle {
    #[default]
    Dots,
    Bar,
    None,
}

/// Segment mask for `digit`, or `None` outside 0..=9.
pub fn segment_mask(digit: u8) -> Option<u8> {
    DIGIT_SEGMENTS.get(digit as usize).copied()
}

fn draw_segment(img: &mut GrayImage, area: Rect, horizontal: bool, ends: SegmentEnds, color: u8) {
    if area.is_empty() {
        return;
    }
    match ends {
        SegmentEnds::Rectangle => fill_rect(img, area.x, area.y, area.width, area.height, color),
        SegmentEnds::Hexagon => {
            // Each line across the stroke is shortened by its distance from the
            // stroke's centre line, giving pointed ends.
            let thickness = if horizontal { area.height } else { area.width };
            let centre2 = thickness - 1;
            for k in 0..thickness {
                let inset = (2 * k - centre2).abs() / 2;
                if horizontal {
                    fill_rect(img, area.x + inset, area.y + k, area.width - 2 * inset, 1, color);
                } else {
                    fill_rect(img, area.x + k, area.y + inset, 1, area.height - 2 * inset, color);
                }
            }
        }
        SegmentEnds::Rounded => {
            if area.width < 3 || area.height < 3 {
                return fill_rect(img, area.x, area.y, area.width, area.height, color);
            }
            // Corners are left unpainted.
            fill_rect(img, area.x + 1, area.y, area.width - 2, area.height, color);
            fill_rect(img, area.x, area.y + 1, 1, area.height - 2, color);
            fill_rect(img, area.right() - 1, area.y + 1, 1, area.height - 2, color);
        }
    }
}

/// Draws `digit` into the `w` x `h` box at `(x, y)` with strokes `thickness`
/// pixels wide. Values outside 0..=9 draw nothing.
#[allow(clippy::too_many_arguments)]
pub fn seven_segment_digit(
    img: &mut GrayImage,
    digit: u8,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    thickness: i32,
    ends: SegmentEnds,
    color: u8,
) {
    let Some(mask) = segment_mask(digit) else {
        return;
    };
    let t = thickness.max(1);
    if w < 2 * t + 1 || h < 3 * t + 2 {
        return;
    }

    let mid = y + (h - t) / 2;
    let upper_len = mid - (y + t);
    let lower_len = (y + h - t) - (mid + t);
    let span = w - 2 * t;

    let segments = [
        (Rect::new(x + t, y, span, t), true),                      // a
        (Rect::new(x + w - t, y + t, t, upper_len), false),        // b
        (Rect::new(x + w - t, mid + t, t, lower_len), false),      // c
        (Rect::new(x + t, y + h - t, span, t), true),              // d
        (Rect::new(x, mid + t, t, lower_len), false),              // e
        (Rect::new(x, y + t, t, upper_len), false),                // f
        (Rect::new(x + t, mid, span, t), true),                    // g
    ];

    for (bit, (area, horizontal)) in segments.iter().enumerate() {
        if mask & (1 << bit) != 0 {
            draw_segment(img, *area, *horizontal, ends, color);
        }
    }
}

/// Colon separator in the `w` x `h` box at `(x, y)`.
///
/// `visible = false` draws nothing, which is how the colon blinks.
#[allow(clippy::too_many_arguments)]
pub fn seven_segment_colon(
    img: &mut GrayImage,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    thickness: i32,
    style: ColonStyle,
    visible: bool,
    color: u8,
) {
    if !visible || w <= 0 || h <= 0 {
        return;
    }
    let t = thickness.max(1).min(w);
    let cx = x + (w - t) / 2;
    match style {
        ColonStyle::Dots => {
            fill_rect(img, cx, y + h / 3 - t / 2, t, t, color);
            fill_rect(img, cx, y + 2 * h / 3 - t / 2, t, t, color);
        }
        ColonStyle::Bar => fill_rect(img, cx, y + h / 4, t, h / 2, color),
        ColonStyle::None => {}
    }
}
