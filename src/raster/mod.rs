//! # Grayscale Raster Primitives
//!
//! Every pixel that ends up on the keyboard starts life in a [`GrayImage`]:
//! an owned buffer of 8-bit luminance values (0 = black, 255 = white),
//! addressed `(x, y)` from the top-left corner.
//!
//! ## Clipping Discipline
//! All drawing routines in the submodules accept signed coordinates and
//! signed extents. Anything that falls outside the raster is silently
//! dropped, so no routine can ever write out of bounds, whatever the input.
//! A zero-sized raster is legal and turns every draw into a no-op.
//!
//! ## Submodules
//! - [`shapes`]: lines, rectangles, circles, borders, small glyph shapes
//! - [`charts`]: percentage bars, history graphs, radial gauges
//! - [`segment`]: seven-segment digits and colon separators
//! - [`text`]: bitmap glyph sets and the "smart" text dispatch
//! - [`font`]: scalable font faces behind the process-wide font lock
//! - [`dither`]: Floyd–Steinberg and ordered (Bayer) monochrome reduction
//! - [`resize`]: nearest-neighbour and Catmull-Rom resampling
//!
//! [`GrayImage`] also implements embedded-graphics' `DrawTarget`, so the
//! bitmap fonts shipped with embedded-graphics draw straight into it.

use core::convert::Infallible;
use embedded_graphics::{
    pixelcolor::{Gray8, GrayColor},
    prelude::{DrawTarget, OriginDimensions, Pixel, Size},
};
use thiserror::Error;

pub mod charts;
pub mod dither;
pub mod font;
pub mod resize;
pub mod segment;
pub mod shapes;
pub mod text;

/// Luminance of a fully lit pixel.
pub const WHITE: u8 = 255;
/// Luminance of a dark pixel.
pub const BLACK: u8 = 0;

/// Errors raised when building rasters from external buffers.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RasterError {
    /// The supplied buffer does not hold `width * height` pixels.
    #[error("buffer holds {actual} pixels, expected {expected} for {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// A signed rectangle used for clip regions and content areas.
///
/// Width and height are signed so that callers can pass computed extents
/// without pre-validating them; a non-positive extent is simply empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Overlap of two rectangles; empty (zero-sized) when they are disjoint.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return Rect::new(x0, y0, 0, 0);
        }
        Rect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    /// Shrinks the rectangle by `amount` on every side. Saturates instead of
    /// wrapping at the ends of the coordinate range.
    pub fn inset(&self, amount: i32) -> Rect {
        let both = amount.saturating_mul(2);
        Rect::new(
            self.x.saturating_add(amount),
            self.y.saturating_add(amount),
            self.width.saturating_sub(both),
            self.height.saturating_sub(both),
        )
    }
}

/// An owned 8-bit grayscale raster.
///
/// Created at a fixed size and never resized; the backing storage is
/// row-major with no padding between rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl GrayImage {
    /// Creates a `width` x `height` raster with every pixel set to `fill`.
    pub fn new(width: u32, height: u32, fill: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    /// Wraps an existing row-major buffer.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(RasterError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True when the raster has no pixels (zero width or height).
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Whole-raster rectangle, handy as a clip region.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Reads a pixel; `None` outside the raster.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Writes a pixel; out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, value: u8) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = value;
        }
    }

    pub fn fill(&mut self, value: u8) {
        self.pixels.fill(value);
    }

    /// Fills the part of `rect` that lies inside the raster.
    pub fn fill_rect(&mut self, rect: Rect, value: u8) {
        let clip = rect.intersect(&self.bounds());
        if clip.is_empty() {
            return;
        }
        let stride = self.width as usize;
        for y in clip.y..clip.bottom() {
            let start = y as usize * stride + clip.x as usize;
            self.pixels[start..start + clip.width as usize].fill(value);
        }
    }

    /// Copies `src` with its top-left corner at `(x, y)`, clipped to this raster.
    ///
    /// With `key = Some(k)`, source pixels equal to `k` are skipped, which is
    /// how transparent widget backgrounds are composited.
    pub fn blit(&mut self, src: &GrayImage, x: i32, y: i32, key: Option<u8>) {
        let dst_area = Rect::new(x, y, src.width as i32, src.height as i32).intersect(&self.bounds());
        if dst_area.is_empty() {
            return;
        }
        for dy in dst_area.y..dst_area.bottom() {
            for dx in dst_area.x..dst_area.right() {
                let value = src.pixels[(dy - y) as usize * src.width as usize + (dx - x) as usize];
                if key == Some(value) {
                    continue;
                }
                let i = dy as usize * self.width as usize + dx as usize;
                self.pixels[i] = value;
            }
        }
    }

    /// Copies a sub-rectangle out into a fresh raster; areas outside become `fill`.
    pub fn crop(&self, rect: Rect, fill: u8) -> GrayImage {
        let width = rect.width.max(0) as u32;
        let height = rect.height.max(0) as u32;
        let mut out = GrayImage::new(width, height, fill);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                if let Some(v) = self.get(rect.x.saturating_add(x), rect.y.saturating_add(y)) {
                    out.set(x, y, v);
                }
            }
        }
        out
    }

    /// Number of pixels whose value equals `value`.
    pub fn count(&self, value: u8) -> usize {
        self.pixels.iter().filter(|&&p| p == value).count()
    }
}

impl OriginDimensions for GrayImage {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for GrayImage {
    type Color = Gray8;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set(point.x, point.y, color.luma());
        }
        Ok(())
    }
}
