//! # Monochrome Encoder
//!
//! Turns a composed grayscale canvas into the packed payload the keyboard
//! expects:
//!
//! 1. nearest-neighbour resize when the canvas is not already device sized
//! 2. reduction to on/off pixels (Floyd–Steinberg unless told otherwise)
//! 3. row-major bit packing, MSB first, white = 1, black = 0
//! 4. zero padding of the final byte
//!
//! Rows are not byte-aligned: the bit stream runs straight on from the end of
//! one row into the next, so the payload is exactly `ceil(w * h / 8)` bytes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::raster::{dither, resize, GrayImage};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodeError {
    #[error("packed payload is {actual} bytes, expected {expected} for {width}x{height}")]
    PayloadSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// How grayscale is reduced to on/off before packing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DitherMode {
    #[default]
    FloydSteinberg,
    Ordered,
    Threshold,
}

/// Payload length for a `width` x `height` image.
pub fn payload_len(width: u32, height: u32) -> usize {
    (width as usize * height as usize).div_ceil(8)
}

/// Encodes with Floyd–Steinberg dithering.
pub fn encode(img: &GrayImage, width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    encode_with(img, width, height, DitherMode::FloydSteinberg)
}

/// Encodes `img` into a packed payload for a `width` x `height` display.
pub fn encode_with(
    img: &GrayImage,
    width: u32,
    height: u32,
    mode: DitherMode,
) -> Result<Vec<u8>, EncodeError> {
    let sized = resize::nearest(img, width, height);
    let mono = match mode {
        DitherMode::FloydSteinberg => dither::floyd_steinberg(&sized),
        DitherMode::Ordered => dither::ordered(&sized),
        DitherMode::Threshold => dither::threshold(&sized),
    };
    let packed = pack(&mono);

    let expected = payload_len(width, height);
    if packed.len() != expected {
        return Err(EncodeError::PayloadSize {
            width,
            height,
            expected,
            actual: packed.len(),
        });
    }
    Ok(packed)
}

/// Packs an already monochrome raster; any non-zero pixel counts as lit.
pub fn pack(mono: &GrayImage) -> Vec<u8> {
    let mut out = vec![0u8; payload_len(mono.width(), mono.height())];
    for (i, &p) in mono.as_raw().iter().enumerate() {
        if p != 0 {
            out[i / 8] |= 0x80 >> (i % 8);
        }
    }
    out
}

/// Unpacks a payload into a `width` x `height` raster of 0/255.
///
/// Missing trailing bytes read as black; surplus bytes are ignored.
pub fn decode(payload: &[u8], width: u32, height: u32) -> GrayImage {
    let mut img = GrayImage::new(width, height, 0);
    for (i, pixel) in img.as_raw_mut().iter_mut().enumerate() {
        let lit = payload
            .get(i / 8)
            .is_some_and(|byte| byte & (0x80 >> (i % 8)) != 0);
        if lit {
            *pixel = 255;
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn alternating_row_packs_to_0xaa() {
        let img = GrayImage::from_raw(8, 1, vec![255, 0, 255, 0, 255, 0, 255, 0]).unwrap();
        assert_eq!(encode(&img, 8, 1).unwrap(), vec![170]);
    }

    #[test]
    fn blank_device_frame() {
        let img = GrayImage::new(128, 40, 0);
        let payload = encode(&img, 128, 40).unwrap();
        assert_eq!(payload.len(), 640);
        assert!(payload.iter().all(|&b| b == 0));
    }

    #[test]
    fn rows_are_not_byte_aligned() {
        // 3x3 with only the centre lit: bit index 4 -> 0b0000_1000.
        let mut img = GrayImage::new(3, 3, 0);
        img.set(1, 1, 255);
        assert_eq!(encode(&img, 3, 3).unwrap(), vec![0b0000_1000, 0]);
    }

    #[test]
    fn canvas_is_resized_to_target() {
        let img = GrayImage::new(256, 80, 255);
        let payload = encode(&img, 128, 40).unwrap();
        assert_eq!(payload.len(), 640);
        assert!(payload.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn threshold_mode_skips_diffusion() {
        let img = GrayImage::new(8, 1, 127);
        assert_eq!(encode_with(&img, 8, 1, DitherMode::Threshold).unwrap(), vec![0]);
    }

    #[test]
    fn decode_short_payload_reads_black() {
        let img = decode(&[0xFF], 4, 4);
        assert_eq!(img.count(255), 8);
        assert_eq!(img.get(0, 2), Some(0));
    }

    proptest! {
        #[test]
        fn payload_length_is_ceiling(w in 0u32..40, h in 0u32..40, fill in any::<u8>()) {
            let img = GrayImage::new(w, h, fill);
            let payload = encode(&img, w, h).unwrap();
            prop_assert_eq!(payload.len(), ((w * h) as usize + 7) / 8);
        }

        #[test]
        fn encode_decode_round_trip(w in 1u32..24, h in 1u32..12, seed in proptest::collection::vec(any::<u8>(), 72)) {
            let len = payload_len(w, h);
            let mut payload: Vec<u8> = seed.into_iter().cycle().take(len).collect();
            // Bits past w*h are padding and always zero.
            let used = (w * h) as usize % 8;
            if used != 0 {
                if let Some(last) = payload.last_mut() {
                    *last &= 0xFFu8 << (8 - used);
                }
            }
            let img = decode(&payload, w, h);
            prop_assert_eq!(encode(&img, w, h).unwrap(), payload);
        }
    }
}
