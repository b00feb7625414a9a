//! Geometric primitives: lines, rectangles, circles and small symbols.
//!
//! Coordinates are signed and extents may be zero or negative; everything
//! is clipped against the target raster.

use super::{GrayImage, Rect};

/// Horizontal run from `x1` to `x2` inclusive, in either order.
pub fn hline(img: &mut GrayImage, x1: i32, x2: i32, y: i32, color: u8) {
    if y < 0 || y >= img.height() as i32 {
        return;
    }
    let (a, b) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
    let a = a.max(0);
    let b = b.min(img.width() as i32 - 1);
    for x in a..=b {
        img.set(x, y, color);
    }
}

/// Vertical run from `y1` to `y2` inclusive, in either order.
pub fn vline(img: &mut GrayImage, x: i32, y1: i32, y2: i32, color: u8) {
    if x < 0 || x >= img.width() as i32 {
        return;
    }
    let (a, b) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
    let a = a.max(0);
    let b = b.min(img.height() as i32 - 1);
    for y in a..=b {
        img.set(x, y, color);
    }
}

/// Integer Bresenham line between two points, both endpoints included.
///
/// The segment is clipped to the raster first, so the walk never takes more
/// steps than the raster is wide or tall.
pub fn line(img: &mut GrayImage, x0: i32, y0: i32, x1: i32, y1: i32, color: u8) {
    if y0 == y1 {
        return hline(img, x0, x1, y0, color);
    }
    if x0 == x1 {
        return vline(img, x0, y0, y1, color);
    }
    let Some((mut x, mut y, x1, y1)) = clip_segment(img, x0, y0, x1, y1) else {
        return;
    };

    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        plot(img, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Liang–Barsky clip of a segment against the raster, in i64 pixel space.
/// Endpoints already on the raster come back unchanged.
fn clip_segment(img: &GrayImage, x0: i32, y0: i32, x1: i32, y1: i32) -> Option<(i64, i64, i64, i64)> {
    if img.is_empty() {
        return None;
    }
    let (max_x, max_y) = (img.width() as f64 - 1.0, img.height() as f64 - 1.0);
    let (fx, fy) = (x0 as f64, y0 as f64);
    let (dx, dy) = (x1 as f64 - fx, y1 as f64 - fy);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [(-dx, fx), (dx, max_x - fx), (-dy, fy), (dy, max_y - fy)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    let at = |t: f64| ((fx + t * dx).round() as i64, (fy + t * dy).round() as i64);
    let (ax, ay) = if t0 > 0.0 { at(t0) } else { (x0 as i64, y0 as i64) };
    let (bx, by) = if t1 < 1.0 { at(t1) } else { (x1 as i64, y1 as i64) };
    Some((ax, ay, bx, by))
}

/// Sets a pixel given wide coordinates; anything off the i32 range is dropped.
fn plot(img: &mut GrayImage, x: i64, y: i64, color: u8) {
    if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
        img.set(x, y, color);
    }
}

/// Inclusive range of raster indices along one axis covered by `center ± radius`.
fn visible_span(center: i64, radius: i64, extent: u32) -> Option<(i64, i64)> {
    let lo = (center - radius).max(0);
    let hi = (center + radius).min(extent as i64 - 1);
    (lo <= hi).then_some((lo, hi))
}

/// Half-width of a circle of `radius` at distance `d` from its centre.
fn half_chord(radius: i64, d: i64) -> i64 {
    let r = radius as f64;
    let d = d as f64;
    (r * r - d * d).max(0.0).sqrt().round() as i64
}

/// Solid rectangle.
pub fn fill_rect(img: &mut GrayImage, x: i32, y: i32, w: i32, h: i32, color: u8) {
    img.fill_rect(Rect::new(x, y, w, h), color);
}

/// One-pixel rectangle outline.
pub fn rect_outline(img: &mut GrayImage, x: i32, y: i32, w: i32, h: i32, color: u8) {
    if w <= 0 || h <= 0 {
        return;
    }
    let right = x.saturating_add(w - 1);
    let bottom = y.saturating_add(h - 1);
    hline(img, x, right, y, color);
    hline(img, x, right, bottom, color);
    vline(img, x, y, bottom, color);
    vline(img, right, y, bottom, color);
}

/// Outline of the whole raster, `thickness` pixels deep.
pub fn draw_border(img: &mut GrayImage, color: u8, thickness: u32) {
    let (w, h) = (img.width() as i32, img.height() as i32);
    for t in 0..thickness.min(i32::MAX as u32) as i32 {
        if 2 * t >= w || 2 * t >= h {
            break;
        }
        rect_outline(img, t, t, w - 2 * t, h - 2 * t, color);
    }
}

/// Circle outline.
///
/// Each visible row contributes its two edge pixels and each visible column
/// its top and bottom pixels, which together give a gap-free outline. Work is
/// bounded by the raster size, not by the radius.
pub fn circle(img: &mut GrayImage, cx: i32, cy: i32, radius: i32, color: u8) {
    if radius < 0 {
        return;
    }
    let (cx, cy, r) = (cx as i64, cy as i64, radius as i64);
    let (Some(rows), Some(cols)) = (
        visible_span(cy, r, img.height()),
        visible_span(cx, r, img.width()),
    ) else {
        return;
    };
    for y in rows.0..=rows.1 {
        let half = half_chord(r, y - cy);
        plot(img, cx - half, y, color);
        plot(img, cx + half, y, color);
    }
    for x in cols.0..=cols.1 {
        let half = half_chord(r, x - cx);
        plot(img, x, cy - half, color);
        plot(img, x, cy + half, color);
    }
}

/// Filled disc, one horizontal span per visible row.
pub fn fill_circle(img: &mut GrayImage, cx: i32, cy: i32, radius: i32, color: u8) {
    if radius < 0 {
        return;
    }
    let (cx, cy, r) = (cx as i64, cy as i64, radius as i64);
    let Some(rows) = visible_span(cy, r, img.height()) else {
        return;
    };
    let max_x = img.width() as i64 - 1;
    for y in rows.0..=rows.1 {
        let half = half_chord(r, y - cy);
        let (a, b) = ((cx - half).max(0), (cx + half).min(max_x));
        if a <= b {
            // Both ends now lie on the raster, so the casts are lossless.
            hline(img, a as i32, b as i32, y as i32, color);
        }
    }
}

/// True when a `size` x `size` box at `(x, y)` overlaps the raster.
fn box_visible(img: &GrayImage, x: i32, y: i32, size: i32) -> bool {
    let (x, y, size) = (x as i64, y as i64, size as i64);
    x < img.width() as i64 && y < img.height() as i64 && x + size > 0 && y + size > 0
}

/// Warning triangle with an exclamation mark, fitted in a `size` x `size` box.
pub fn warning_triangle(img: &mut GrayImage, x: i32, y: i32, size: i32, color: u8) {
    if size < 3 || !box_visible(img, x, y, size) {
        return;
    }
    let apex = x.saturating_add((size - 1) / 2);
    let right = x.saturating_add(size - 1);
    let base = y.saturating_add(size - 1);
    line(img, apex, y, x, base, color);
    line(img, apex, y, right, base, color);
    hline(img, x, right, base, color);

    if size >= 7 {
        let mark_top = y.saturating_add(size / 3);
        let mark_bottom = base.saturating_sub(3);
        vline(img, apex, mark_top, mark_bottom, color);
        img.set(apex, base.saturating_sub(1), color);
    }
}

/// Diagonal cross filling a `size` x `size` box.
pub fn cross(img: &mut GrayImage, x: i32, y: i32, size: i32, color: u8) {
    if size <= 0 || !box_visible(img, x, y, size) {
        return;
    }
    let right = x.saturating_add(size - 1);
    let bottom = y.saturating_add(size - 1);
    line(img, x, y, right, bottom, color);
    line(img, right, y, x, bottom, color);
}

/// Checkerboard-style cross-hatch used as a placeholder pattern.
pub fn cross_pattern(img: &mut GrayImage, area: Rect, spacing: i32, color: u8) {
    if spacing <= 0 {
        return;
    }
    let clip = area.intersect(&img.bounds());
    for y in clip.y..clip.bottom() {
        for x in clip.x..clip.right() {
            let (u, v) = (x - area.x, y - area.y);
            if (u + v).rem_euclid(spacing) == 0 || (u - v).rem_euclid(spacing) == 0 {
                img.set(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn border_marks_corners_only() {
        let mut img = GrayImage::new(10, 10, 0);
        draw_border(&mut img, 255, 1);
        for (x, y) in [(0, 0), (9, 0), (0, 9), (9, 9)] {
            assert_eq!(img.get(x, y), Some(255));
        }
        assert_eq!(img.get(5, 5), Some(0));
        assert_eq!(img.count(255), 36);
    }

    #[test]
    fn lines_accept_reversed_endpoints() {
        let mut a = GrayImage::new(8, 8, 0);
        let mut b = GrayImage::new(8, 8, 0);
        hline(&mut a, 1, 6, 2, 255);
        hline(&mut b, 6, 1, 2, 255);
        assert_eq!(a, b);

        let mut c = GrayImage::new(8, 8, 0);
        let mut d = GrayImage::new(8, 8, 0);
        line(&mut c, 0, 0, 7, 3, 255);
        line(&mut d, 7, 3, 0, 0, 255);
        assert_eq!(c.count(255), d.count(255));
        assert_eq!(c.get(0, 0), Some(255));
        assert_eq!(c.get(7, 3), Some(255));
    }

    #[test]
    fn diagonal_line_touches_each_column_once() {
        let mut img = GrayImage::new(5, 5, 0);
        line(&mut img, 0, 0, 4, 4, 255);
        assert_eq!(img.count(255), 5);
        for i in 0..5 {
            assert_eq!(img.get(i, i), Some(255));
        }
    }

    #[test]
    fn circle_is_symmetric() {
        let mut img = GrayImage::new(21, 21, 0);
        circle(&mut img, 10, 10, 8, 255);
        for (x, y) in [(18, 10), (2, 10), (10, 2), (10, 18)] {
            assert_eq!(img.get(x, y), Some(255));
        }
        assert_eq!(img.get(10, 10), Some(0));

        let mut disc = GrayImage::new(21, 21, 0);
        fill_circle(&mut disc, 10, 10, 8, 255);
        assert_eq!(disc.get(10, 10), Some(255));
        assert!(disc.count(255) > img.count(255));
    }

    #[test]
    fn degenerate_extents_draw_nothing() {
        let mut img = GrayImage::new(6, 6, 0);
        rect_outline(&mut img, 1, 1, 0, 4, 255);
        rect_outline(&mut img, 1, 1, -3, 4, 255);
        fill_rect(&mut img, 1, 1, 4, -1, 255);
        circle(&mut img, 3, 3, -1, 255);
        assert_eq!(img.count(255), 0);
    }

    #[test]
    fn warning_triangle_and_cross_stay_inside_box() {
        let mut img = GrayImage::new(12, 12, 0);
        warning_triangle(&mut img, 2, 2, 8, 255);
        cross(&mut img, 2, 2, 8, 255);
        for y in 0..12 {
            for x in 0..12 {
                if !(2..10).contains(&x) || !(2..10).contains(&y) {
                    assert_eq!(img.get(x, y), Some(0), "pixel ({x},{y}) escaped");
                }
            }
        }
    }

    #[test]
    fn extreme_coordinates_are_clipped() {
        let mut img = GrayImage::new(10, 10, 0);
        circle(&mut img, i32::MAX, 0, 5, 255);
        fill_circle(&mut img, i32::MIN, i32::MAX, 5, 255);
        cross(&mut img, i32::MAX - 2, 0, 8, 255);
        warning_triangle(&mut img, i32::MAX - 2, i32::MAX - 2, 8, 255);
        assert_eq!(img.count(255), 0);

        cross(&mut img, 5, 5, i32::MAX, 255);
        warning_triangle(&mut img, -4, -4, i32::MAX, 255);
        assert!(img.count(255) > 0);
    }

    #[test]
    fn long_lines_are_clipped_to_the_raster() {
        let mut img = GrayImage::new(10, 10, 0);
        line(&mut img, 0, 0, i32::MAX, -5, 255);
        assert_eq!(img.get(0, 0), Some(255));

        let mut diag = GrayImage::new(10, 10, 0);
        line(&mut diag, i32::MIN, i32::MIN, i32::MAX, i32::MAX, 255);
        for i in 0..10 {
            assert_eq!(diag.get(i, i), Some(255));
        }
    }

    #[test]
    fn huge_radius_touches_only_visible_rows() {
        let mut img = GrayImage::new(10, 10, 0);
        fill_circle(&mut img, 5, 5, i32::MAX, 255);
        assert_eq!(img.count(255), 100);

        let mut ring = GrayImage::new(10, 10, 0);
        circle(&mut ring, 0, 0, i32::MAX, 255);
        assert_eq!(ring.count(255), 0);
        // The top of a huge circle below the raster grazes its first row.
        circle(&mut ring, 0, i32::MAX, i32::MAX, 255);
        assert_eq!(ring.count(255), 10);
        assert_eq!(ring.get(9, 0), Some(255));
    }

    proptest! {
        #[test]
        fn primitives_never_touch_outside(
            x0 in any::<i32>(), y0 in any::<i32>(),
            x1 in any::<i32>(), y1 in any::<i32>(),
            r in any::<i32>(),
        ) {
            // Writes outside the buffer would panic on the slice index.
            let mut img = GrayImage::new(40, 30, 0);
            line(&mut img, x0, y0, x1, y1, 255);
            fill_rect(&mut img, x0, y0, x1, y1, 255);
            rect_outline(&mut img, x0, y0, x1, y1, 255);
            circle(&mut img, x0, y0, r, 255);
            fill_circle(&mut img, x1, y1, r, 255);
            cross(&mut img, x0, y1, r, 255);
            warning_triangle(&mut img, x1, y0, r, 255);
            prop_assert_eq!(img.as_raw().len(), 40 * 30);

            let mut empty = GrayImage::new(0, 0, 0);
            line(&mut empty, x0, y0, x1, y1, 255);
            fill_circle(&mut empty, x0, y0, r, 255);
            prop_assert!(empty.is_empty());
        }

        #[test]
        fn line_endpoints_inside_are_drawn(
            x0 in 0i32..40, y0 in 0i32..30, x1 in 0i32..40, y1 in 0i32..30,
        ) {
            let mut img = GrayImage::new(40, 30, 0);
            line(&mut img, x0, y0, x1, y1, 255);
            prop_assert_eq!(img.get(x0, y0), Some(255));
            prop_assert_eq!(img.get(x1, y1), Some(255));
        }
    }
}
