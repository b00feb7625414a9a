//! Resampling.
//!
//! The on-wire path only ever needs nearest-neighbour: once a frame is
//! reduced to on/off pixels, smoother filters buy nothing. Catmull-Rom is
//! kept for RGB intermediates (screen captures) that are scaled down before
//! they are converted to grayscale.

use super::{GrayImage, RasterError};

/// Nearest-neighbour resize; source x = `floor(x * src_w / dst_w)`, same for y.
pub fn nearest(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    let mut out = GrayImage::new(width, height, 0);
    if src.is_empty() {
        return out;
    }
    let (sw, sh) = (src.width() as u64, src.height() as u64);
    let stride = src.width() as usize;
    let raw = src.as_raw();
    for (i, pixel) in out.as_raw_mut().iter_mut().enumerate() {
        let x = (i % width as usize) as u64;
        let y = (i / width as usize) as u64;
        let sx = (x * sw / width as u64) as usize;
        let sy = (y * sh / height as u64) as usize;
        *pixel = raw[sy * stride + sx];
    }
    out
}

/// Packed 8-bit RGB raster, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

impl RgbImage {
    pub fn new(width: u32, height: u32, fill: [u8; 3]) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn from_raw(width: u32, height: u32, pixels: Vec<[u8; 3]>) -> Result<Self, RasterError> {
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

    /// Pixel with coordinates clamped to the edges.
    fn clamped(&self, x: i64, y: i64) -> [u8; 3] {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.pixels[y * self.width as usize + x]
    }

    /// Rec. 601 luma conversion.
    pub fn to_gray(&self) -> GrayImage {
        let luma = self
            .pixels
            .iter()
            .map(|[r, g, b]| ((299 * *r as u32 + 587 * *g as u32 + 114 * *b as u32) / 1000) as u8)
            .collect();
        // Length is width * height by construction.
        GrayImage::from_raw(self.width, self.height, luma).unwrap_or_else(|_| GrayImage::new(0, 0, 0))
    }
}

fn catmull_rom_weight(t: f32) -> f32 {
    let t = t.abs();
    if t < 1.0 {
        1.5 * t * t * t - 2.5 * t * t + 1.0
    } else if t < 2.0 {
        -0.5 * t * t * t + 2.5 * t * t - 4.0 * t + 2.0
    } else {
        0.0
    }
}

/// Separable Catmull-Rom (bicubic, a = -0.5) resize.
pub fn catmull_rom(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    let mut out = RgbImage::new(width, height, [0; 3]);
    if src.pixels.is_empty() || width == 0 || height == 0 {
        return out;
    }
    let scale_x = src.width as f32 / width as f32;
    let scale_y = src.height as f32 / height as f32;

    for y in 0..height {
        let fy = (y as f32 + 0.5) * scale_y - 0.5;
        let iy = fy.floor() as i64;
        for x in 0..width {
            let fx = (x as f32 + 0.5) * scale_x - 0.5;
            let ix = fx.floor() as i64;

            let mut acc = [0.0f32; 3];
            let mut total = 0.0f32;
            for m in -1..=2 {
                let wy = catmull_rom_weight(fy - (iy + m) as f32);
                for n in -1..=2 {
                    let weight = wy * catmull_rom_weight(fx - (ix + n) as f32);
                    let p = src.clamped(ix + n, iy + m);
                    for c in 0..3 {
                        acc[c] += p[c] as f32 * weight;
                    }
                    total += weight;
                }
            }
            let px = &mut out.pixels[(y * width + x) as usize];
            for c in 0..3 {
                px[c] = (acc[c] / total).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_downscale_picks_floor_source() {
        let src = GrayImage::from_raw(4, 1, vec![10, 20, 30, 40]).unwrap();
        let out = nearest(&src, 2, 1);
        assert_eq!(out.as_raw(), &[10, 30]);
    }

    #[test]
    fn nearest_upscale_repeats_pixels() {
        let src = GrayImage::from_raw(2, 2, vec![1, 2, 3, 4]).unwrap();
        let out = nearest(&src, 4, 4);
        assert_eq!(out.get(1, 1), Some(1));
        assert_eq!(out.get(2, 0), Some(2));
        assert_eq!(out.get(3, 3), Some(4));
    }

    #[test]
    fn nearest_same_size_is_identity() {
        let src = GrayImage::from_raw(3, 1, vec![5, 6, 7]).unwrap();
        assert_eq!(nearest(&src, 3, 1), src);
    }

    #[test]
    fn catmull_rom_preserves_flat_colour() {
        let src = RgbImage::new(16, 9, [90, 120, 200]);
        let out = catmull_rom(&src, 7, 4);
        assert!(out.pixels.iter().all(|p| *p == [90, 120, 200]));
    }

    #[test]
    fn luma_conversion() {
        let img = RgbImage::from_raw(2, 1, vec![[255, 255, 255], [0, 0, 0]]).unwrap();
        assert_eq!(img.to_gray().as_raw(), &[255, 0]);
    }
}
