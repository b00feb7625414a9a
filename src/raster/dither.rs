//! # Monochrome Reduction
//!
//! The OLED can only switch a pixel on or off, so every composed frame is
//! reduced from 8-bit grayscale to `{0, 255}` before packing.
//!
//! ## Floyd–Steinberg
//! Error diffusion, scanning top-to-bottom and left-to-right with a
//! threshold of 128. The quantisation error is pushed to unvisited
//! neighbours with the classic weights:
//!
//! ```text
//!         *   7/16
//!  3/16  5/16 1/16
//! ```
//!
//! Neighbours are clamped to `[0, 255]` after each diffusion step. Input
//! that is already black/white carries no error, so the filter is
//! idempotent.
//!
//! ## Ordered
//! A normalised 4×4 Bayer matrix gives a stable, texture-like pattern that
//! does not shimmer between frames; used for the dither-dissolve transition
//! and available as an alternative output filter.

use super::GrayImage;

/// Threshold separating black from white.
pub const THRESHOLD: u8 = 128;

/// 4×4 Bayer index matrix (values 0..16).
pub const BAYER_4X4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Normalised Bayer threshold for `(x, y)`, in `(0.0, 1.0)`.
pub fn bayer_threshold(x: u32, y: u32) -> f32 {
    (BAYER_4X4[(y % 4) as usize][(x % 4) as usize] as f32 + 0.5) / 16.0
}

/// Returns a Floyd–Steinberg dithered copy of `img`.
pub fn floyd_steinberg(img: &GrayImage) -> GrayImage {
    let mut out = img.clone();
    floyd_steinberg_in_place(&mut out);
    out
}

/// Floyd–Steinberg dithering over `img`; afterwards every pixel is 0 or 255.
pub fn floyd_steinberg_in_place(img: &mut GrayImage) {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w == 0 || h == 0 {
        return;
    }
    let mut work: Vec<i32> = img.as_raw().iter().map(|&p| p as i32).collect();

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let old = work[i].clamp(0, 255);
            let new = if old >= THRESHOLD as i32 { 255 } else { 0 };
            work[i] = new;
            let err = old - new;
            if err == 0 {
                continue;
            }
            let xi = x as isize;
            diffuse(&mut work, (w, h), (xi + 1, y), err, 7);
            diffuse(&mut work, (w, h), (xi - 1, y + 1), err, 3);
            diffuse(&mut work, (w, h), (xi, y + 1), err, 5);
            diffuse(&mut work, (w, h), (xi + 1, y + 1), err, 1);
        }
    }

    for (dst, src) in img.as_raw_mut().iter_mut().zip(work) {
        *dst = src as u8;
    }
}

fn diffuse(work: &mut [i32], (w, h): (usize, usize), (x, y): (isize, usize), err: i32, weight: i32) {
    if x < 0 || x as usize >= w || y >= h {
        return;
    }
    let i = y * w + x as usize;
    work[i] = (work[i] + err * weight / 16).clamp(0, 255);
}

/// Ordered dithering against the 4×4 Bayer matrix.
pub fn ordered(img: &GrayImage) -> GrayImage {
    let mut out = img.clone();
    let w = img.width();
    for (i, pixel) in out.as_raw_mut().iter_mut().enumerate() {
        let (x, y) = (i as u32 % w, i as u32 / w);
        let level = *pixel as f32 / 255.0;
        *pixel = if level > bayer_threshold(x, y) { 255 } else { 0 };
    }
    out
}

/// Plain threshold at [`THRESHOLD`], no error diffusion.
pub fn threshold(img: &GrayImage) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.as_raw_mut() {
        *pixel = if *pixel >= THRESHOLD { 255 } else { 0 };
    }
    out
}
