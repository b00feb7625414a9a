//! Percentage-driven chart primitives: bars, history graphs and gauges.
//!
//! Percentages are floats in `0..=100`; anything outside is clamped when
//! drawn (NaN counts as zero). Gauge angles are in degrees, measured
//! counter-clockwise from the positive x axis, with screen y pointing down.

use super::shapes::{fill_rect, hline, line, rect_outline, vline};
use super::{GrayImage, Rect};

/// Clamp a percentage into `0.0..=100.0`.
pub fn clamp_pct(pct: f32) -> f32 {
    if pct.is_nan() {
        0.0
    } else {
        pct.clamp(0.0, 100.0)
    }
}

fn scaled(extent: i32, pct: f32) -> i32 {
    ((extent.max(0) as f32) * clamp_pct(pct) / 100.0).round() as i32
}

/// Bar growing left to right.
///
/// With `border` set the outline takes the outer ring of pixels and the fill
/// runs inside it.
#[allow(clippy::too_many_arguments)]
pub fn horizontal_bar(
    img: &mut GrayImage,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    pct: f32,
    color: u8,
    border: bool,
) {
    if w <= 0 || h <= 0 {
        return;
    }
    let area = if border {
        rect_outline(img, x, y, w, h, color);
        Rect::new(x, y, w, h).inset(1)
    } else {
        Rect::new(x, y, w, h)
    };
    if area.is_empty() {
        return;
    }
    fill_rect(img, area.x, area.y, scaled(area.width, pct), area.height, color);
}

/// Bar growing bottom to top.
#[allow(clippy::too_many_arguments)]
pub fn vertical_bar(
    img: &mut GrayImage,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    pct: f32,
    color: u8,
    border: bool,
) {
    if w <= 0 || h <= 0 {
        return;
    }
    let area = if border {
        rect_outline(img, x, y, w, h, color);
        Rect::new(x, y, w, h).inset(1)
    } else {
        Rect::new(x, y, w, h)
    };
    if area.is_empty() {
        return;
    }
    let filled = scaled(area.height, pct);
    fill_rect(img, area.x, area.bottom().saturating_sub(filled), area.width, filled, color);
}

/// Orientation of a [`dual_bars`] pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarOrientation {
    /// Two vertical bars next to each other, filling bottom-up.
    Vertical,
    /// Two horizontal bars stacked, filling left-to-right.
    Horizontal,
}

/// One half of a dual bar; a `None` color leaves the bar undrawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarValue {
    pub pct: f32,
    pub color: Option<u8>,
}

/// Two bars sharing one rectangle with a one-pixel gap between them.
pub fn dual_bars(
    img: &mut GrayImage,
    area: Rect,
    orientation: BarOrientation,
    bars: [BarValue; 2],
    border: bool,
) {
    if area.is_empty() {
        return;
    }
    let halves = match orientation {
        BarOrientation::Vertical => {
            let first = (area.width - 1) / 2;
            [
                Rect::new(area.x, area.y, first, area.height),
                Rect::new(area.x.saturating_add(first + 1), area.y, area.width - first - 1, area.height),
            ]
        }
        BarOrientation::Horizontal => {
            let first = (area.height - 1) / 2;
            [
                Rect::new(area.x, area.y, area.width, first),
                Rect::new(area.x, area.y.saturating_add(first + 1), area.width, area.height - first - 1),
            ]
        }
    };
    for (half, bar) in halves.iter().zip(bars.iter()) {
        let Some(color) = bar.color else {
            continue;
        };
        match orientation {
            BarOrientation::Vertical => vertical_bar(
                img, half.x, half.y, half.width, half.height, bar.pct, color, border,
            ),
            BarOrientation::Horizontal => horizontal_bar(
                img, half.x, half.y, half.width, half.height, bar.pct, color, border,
            ),
        }
    }
}

/// Filled-area history graph.
///
/// `values` are percentages, oldest first. The x spacing is derived from
/// `capacity`, so a history that has not filled up yet hugs the right edge
/// and grows leftwards as samples arrive. Only the newest `capacity` values
/// are drawn. `fill = None` draws the polyline only.
pub fn area_graph<I>(
    img: &mut GrayImage,
    area: Rect,
    values: I,
    capacity: usize,
    line_color: u8,
    fill: Option<u8>,
) where
    I: IntoIterator<Item = f32>,
{
    if area.is_empty() || capacity == 0 {
        return;
    }
    let mut points: Vec<f32> = values.into_iter().collect();
    if points.len() > capacity {
        points.drain(..points.len() - capacity);
    }
    if points.is_empty() {
        return;
    }

    let bottom = area.bottom().saturating_sub(1);
    let span_x = (area.width - 1) as i64;
    let span_y = (area.height - 1) as f32;
    let offset = capacity - points.len();
    let column = |i: usize| -> i32 {
        if capacity == 1 {
            return area.right().saturating_sub(1);
        }
        area.x.saturating_add(((offset + i) as i64 * span_x / (capacity as i64 - 1)) as i32)
    };
    let row = |pct: f32| -> i32 { bottom.saturating_sub((clamp_pct(pct) / 100.0 * span_y).round() as i32) };

    let coords: Vec<(i32, i32)> = points
        .iter()
        .enumerate()
        .map(|(i, &pct)| (column(i), row(pct)))
        .collect();

    if let Some(fill_color) = fill {
        let max_x = img.width() as i32 - 1;
        if coords.len() == 1 {
            let (x, y) = coords[0];
            vline(img, x, y, bottom, fill_color);
        }
        for pair in coords.windows(2) {
            let ((xa, ya), (xb, yb)) = (pair[0], pair[1]);
            // Only the columns that land on the raster.
            for x in xa.max(0)..=xb.min(max_x) {
                let t = if xb == xa {
                    0.0
                } else {
                    (x as f32 - xa as f32) / (xb as f32 - xa as f32)
                };
                let y = (ya as f32 + (yb as f32 - ya as f32) * t).round() as i32;
                vline(img, x, y, bottom, fill_color);
            }
        }
    }

    if coords.len() == 1 {
        let (x, y) = coords[0];
        img.set(x, y, line_color);
    }
    for pair in coords.windows(2) {
        line(img, pair[0].0, pair[0].1, pair[1].0, pair[1].1, line_color);
    }
}

/// Options for [`gauge`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaugeOptions {
    /// Angle at 0%, in degrees.
    pub start_angle: f32,
    /// Angle at 100%, in degrees.
    pub end_angle: f32,
    /// Needle length as a fraction of the radius.
    pub needle_length: f32,
    /// Value for the concentric inner gauge, if any.
    pub inner: Option<f32>,
    /// Peak-hold value drawn as a separate tick.
    pub peak: Option<f32>,
    pub color: u8,
}

impl Default for GaugeOptions {
    fn default() -> Self {
        Self {
            start_angle: 180.0,
            end_angle: 0.0,
            needle_length: 0.85,
            inner: None,
            peak: None,
            color: 255,
        }
    }
}

impl GaugeOptions {
    fn angle_for(&self, pct: f32) -> f32 {
        self.start_angle + (self.end_angle - self.start_angle) * clamp_pct(pct) / 100.0
    }
}

fn polar(cx: i32, cy: i32, radius: f32, degrees: f32) -> (i32, i32) {
    let rad = degrees.to_radians();
    (
        cx.saturating_add((radius * rad.cos()).round() as i32),
        cy.saturating_sub((radius * rad.sin()).round() as i32),
    )
}

const MAX_ARC_STEPS: i32 = 4096;

fn arc(img: &mut GrayImage, cx: i32, cy: i32, radius: f32, from: f32, to: f32, color: u8) {
    if radius <= 0.0 {
        return;
    }
    // Two steps per pixel of arc length keep the outline gap-free; arcs far
    // larger than any raster are capped and drawn as chords.
    let sweep = (to - from).abs();
    let steps = ((sweep.to_radians() * radius).ceil() as i32).clamp(1, MAX_ARC_STEPS / 2) * 2;
    let mut prev = polar(cx, cy, radius, from);
    for i in 1..=steps {
        let angle = from + (to - from) * i as f32 / steps as f32;
        let next = polar(cx, cy, radius, angle);
        line(img, prev.0, prev.1, next.0, next.1, color);
        prev = next;
    }
}

fn tick(img: &mut GrayImage, cx: i32, cy: i32, r_outer: f32, r_inner: f32, degrees: f32, color: u8) {
    let (x0, y0) = polar(cx, cy, r_outer, degrees);
    let (x1, y1) = polar(cx, cy, r_inner, degrees);
    line(img, x0, y0, x1, y1, color);
}

/// Radial gauge centred on `(cx, cy)`.
///
/// Draws the arc, a tick every 10% (longer at 0, 50 and 100%), the needle,
/// an optional inner gauge at 55% of the radius and an optional peak tick.
pub fn gauge(img: &mut GrayImage, cx: i32, cy: i32, radius: i32, value: f32, opts: &GaugeOptions) {
    if radius <= 0 {
        return;
    }
    let r = radius as f32;
    arc(img, cx, cy, r, opts.start_angle, opts.end_angle, opts.color);

    for step in 0..=10 {
        let pct = step as f32 * 10.0;
        let long = step % 5 == 0;
        let depth = if long { (r * 0.25).max(3.0) } else { (r * 0.12).max(1.0) };
        tick(img, cx, cy, r, r - depth, opts.angle_for(pct), opts.color);
    }

    if let Some(peak) = opts.peak {
        tick(img, cx, cy, r + 2.0, r * 0.7, opts.angle_for(peak), opts.color);
    }

    let (nx, ny) = polar(cx, cy, r * opts.needle_length, opts.angle_for(value));
    line(img, cx, cy, nx, ny, opts.color);

    if let Some(inner) = opts.inner {
        let ri = r * 0.55;
        arc(img, cx, cy, ri, opts.start_angle, opts.end_angle, opts.color);
        let (ix, iy) = polar(cx, cy, ri * opts.needle_length, opts.angle_for(inner));
        line(img, cx, cy, ix, iy, opts.color);
    }

    hline(img, cx.saturating_sub(1), cx.saturating_add(1), cy, opts.color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn half_filled_horizontal_bar_covers_left_half() {
        let mut img = GrayImage::new(20, 5, 0);
        horizontal_bar(&mut img, 0, 0, 20, 5, 50.0, 255, false);
        assert_eq!(img.count(255), 50);
        for y in 0..5 {
            for x in 0..20 {
                let expected = if x < 10 { 255 } else { 0 };
                assert_eq!(img.get(x, y), Some(expected));
            }
        }
    }

    #[test]
    fn full_vertical_bar_reaches_top_from_bottom() {
        let mut img = GrayImage::new(5, 20, 0);
        vertical_bar(&mut img, 0, 0, 5, 20, 100.0, 255, false);
        assert_eq!(img.get(0, 19), Some(255));
        assert_eq!(img.get(0, 0), Some(255));
    }

    #[test]
    fn partial_vertical_bar_is_bottom_anchored() {
        let mut img = GrayImage::new(4, 10, 0);
        vertical_bar(&mut img, 0, 0, 4, 10, 30.0, 255, false);
        assert_eq!(img.get(0, 9), Some(255));
        assert_eq!(img.get(0, 7), Some(255));
        assert_eq!(img.get(0, 6), Some(0));
    }

    #[test]
    fn percentages_are_clamped() {
        let mut over = GrayImage::new(10, 2, 0);
        horizontal_bar(&mut over, 0, 0, 10, 2, 250.0, 255, false);
        assert_eq!(over.count(255), 20);

        let mut under = GrayImage::new(10, 2, 0);
        horizontal_bar(&mut under, 0, 0, 10, 2, -40.0, 255, false);
        horizontal_bar(&mut under, 0, 0, 10, 2, f32::NAN, 255, false);
        assert_eq!(under.count(255), 0);
    }

    #[test]
    fn bordered_bar_fills_inside_outline() {
        let mut img = GrayImage::new(12, 5, 0);
        horizontal_bar(&mut img, 0, 0, 12, 5, 0.0, 255, true);
        assert_eq!(img.get(0, 0), Some(255));
        assert_eq!(img.get(11, 4), Some(255));
        assert_eq!(img.get(1, 2), Some(0));
    }

    #[test]
    fn dual_bars_skip_transparent_half() {
        let mut img = GrayImage::new(9, 10, 0);
        dual_bars(
            &mut img,
            Rect::new(0, 0, 9, 10),
            BarOrientation::Vertical,
            [
                BarValue {
                    pct: 100.0,
                    color: Some(200),
                },
                BarValue {
                    pct: 100.0,
                    color: None,
                },
            ],
            false,
        );
        assert_eq!(img.count(200), 4 * 10);
        assert_eq!(img.get(4, 5), Some(0));
        assert_eq!(img.get(8, 5), Some(0));
    }

    #[test]
    fn partial_history_aligns_right() {
        let mut img = GrayImage::new(11, 11, 0);
        let bounds = img.bounds();
        area_graph(&mut img, bounds, [100.0, 100.0], 11, 255, None);
        assert_eq!(img.get(10, 0), Some(255));
        assert_eq!(img.get(9, 0), Some(255));
        assert_eq!(img.get(0, 0), Some(0));
    }

    #[test]
    fn area_graph_fills_below_line() {
        let mut img = GrayImage::new(10, 10, 0);
        let bounds = img.bounds();
        area_graph(&mut img, bounds, vec![50.0; 10], 10, 255, Some(100));
        assert_eq!(img.get(3, 9), Some(100));
        assert_eq!(img.get(3, 0), Some(0));
        let line_row = (0..10).find(|&y| img.get(3, y) == Some(255));
        assert!(line_row.is_some());
    }

    #[test]
    fn gauge_needle_points_at_value() {
        let mut empty = GrayImage::new(41, 22, 0);
        gauge(&mut empty, 20, 21, 20, 0.0, &GaugeOptions::default());
        let mut full = GrayImage::new(41, 22, 0);
        gauge(&mut full, 20, 21, 20, 100.0, &GaugeOptions::default());
        // Needle along the left half of the baseline at 0%, right half at 100%.
        assert_eq!(empty.get(8, 21), Some(255));
        assert_eq!(full.get(32, 21), Some(255));
    }

    #[test]
    fn gauge_with_inner_and_peak_stays_in_bounds() {
        let mut img = GrayImage::new(20, 12, 0);
        let opts = GaugeOptions {
            inner: Some(40.0),
            peak: Some(90.0),
            ..GaugeOptions::default()
        };
        gauge(&mut img, 10, 11, 30, 70.0, &opts);
        assert!(img.count(255) > 0);
    }

    #[test]
    fn bordered_bars_at_the_coordinate_limit() {
        let mut img = GrayImage::new(10, 10, 0);
        horizontal_bar(&mut img, i32::MAX, 0, 5, 5, 50.0, 255, true);
        vertical_bar(&mut img, 0, i32::MIN, 5, 5, 50.0, 255, true);
        assert_eq!(img.count(255), 0);
    }

    proptest! {
        #[test]
        fn charts_never_touch_outside(
            x in any::<i32>(), y in any::<i32>(),
            w in any::<i32>(), h in any::<i32>(),
            pct in -50.0f32..150.0,
            border in any::<bool>(),
        ) {
            let mut img = GrayImage::new(40, 30, 0);
            horizontal_bar(&mut img, x, y, w, h, pct, 255, border);
            vertical_bar(&mut img, x, y, w, h, pct, 255, border);
            let area = Rect::new(x, y, w, h);
            let bar = BarValue { pct, color: Some(200) };
            dual_bars(&mut img, area, BarOrientation::Vertical, [bar, bar], border);
            area_graph(&mut img, area, [pct, 100.0 - pct, pct], 8, 255, Some(100));
            let opts = GaugeOptions { inner: Some(pct), peak: Some(pct), ..GaugeOptions::default() };
            gauge(&mut img, x, y, w, pct, &opts);
            prop_assert_eq!(img.as_raw().len(), 40 * 30);
        }
    }
}
