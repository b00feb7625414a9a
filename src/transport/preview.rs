//! # Terminal Preview
//!
//! Development sink used by `--stdout`: frames are decoded from the packed
//! payload, exactly as the device would light them, and drawn as text.
//!
//! Two pixel rows share one character cell using half blocks, so a 128×40
//! display fits in a 130×22 terminal including the frame:
//!
//! ```text
//! ┌────┐
//! │▀▄█ │
//! └────┘
//! ```

use std::io::{self, Write};

use crate::encoder::decode;
use crate::raster::GrayImage;

use super::{FrameSink, TransportError};

pub struct PreviewSink<W: Write> {
    out: W,
    width: u32,
    height: u32,
    /// Redraw in place instead of scrolling
    redraw: bool,
    frames: u64,
}

impl PreviewSink<io::Stdout> {
    pub fn stdout(width: u32, height: u32) -> Self {
        Self::new(io::stdout(), width, height, true)
    }
}

impl<W: Write> PreviewSink<W> {
    pub fn new(out: W, width: u32, height: u32, redraw: bool) -> Self {
        Self {
            out,
            width,
            height,
            redraw,
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Renders a monochrome raster as half-block text, framed.
pub fn draw_ascii(img: &GrayImage) -> String {
    let width = img.width() as usize;
    let lit = |x: usize, y: u32| img.get(x as i32, y as i32).is_some_and(|p| p != 0);

    let mut grid = String::new();
    grid.push('┌');
    grid.extend(std::iter::repeat('─').take(width));
    grid.push_str("┐\n");
    for y in (0..img.height()).step_by(2) {
        grid.push('│');
        for x in 0..width {
            grid.push(match (lit(x, y), lit(x, y + 1)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        grid.push_str("│\n");
    }
    grid.push('└');
    grid.extend(std::iter::repeat('─').take(width));
    grid.push_str("┘\n");
    grid
}

impl<W: Write> FrameSink for PreviewSink<W> {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let frame = draw_ascii(&decode(payload, self.width, self.height));
        if self.redraw {
            // Cursor home, so successive frames overwrite each other.
            write!(self.out, "\x1b[H").map_err(TransportError::Write)?;
        }
        self.out
            .write_all(frame.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(TransportError::Write)?;
        self.frames += 1;
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.out.flush();
        log::debug!("Preview closed after {} frame(s)", self.frames);
    }
}
