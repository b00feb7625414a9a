//! # Scalable Fonts
//!
//! TrueType/OpenType faces rasterised with `fontdue`.
//!
//! ## Shared State
//! - **Font cache**: `path -> parsed font`, behind a reader/writer lock.
//!   Lookups take the read lock; the write lock is only taken the first
//!   time a path is seen.
//! - **Face lock**: one process-wide mutex held for the whole of every
//!   `measure`/`draw` call. Face operations are treated as
//!   non-thread-safe, so widgets rendering on different threads (or a
//!   worker pre-measuring text) are serialised here.
//!
//! A face that cannot be loaded is never fatal: callers fall back to a
//! bitmap glyph set (see [`crate::raster::text::TextFont::resolve`]).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use fontdue::{Font, FontSettings};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use super::text::{HAlign, VAlign};
use super::{GrayImage, Rect};

static FONT_CACHE: LazyLock<RwLock<HashMap<PathBuf, Arc<Font>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

static FACE_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Errors loading a font face.
#[derive(Error, Debug)]
pub enum FontError {
    #[error("cannot read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse font {path}: {reason}")]
    Parse { path: PathBuf, reason: &'static str },

    #[error("font size must be positive, got {0}")]
    InvalidSize(f32),
}

/// Vertical and horizontal extent of a run of text, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TextMetrics {
    pub width: i32,
    /// Distance from the baseline up to the top of the tallest glyph.
    pub ascent: i32,
    /// Distance from the baseline down to the lowest descender (positive).
    pub descent: i32,
}

impl TextMetrics {
    pub fn height(&self) -> i32 {
        self.ascent + self.descent
    }
}

/// A parsed font at a fixed pixel size.
#[derive(Clone)]
pub struct FontFace {
    font: Arc<Font>,
    px: f32,
    path: PathBuf,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("path", &self.path)
            .field("px", &self.px)
            .finish()
    }
}

/// Loads (or fetches from cache) the font at `path` and binds it to `px`.
pub fn load_face(path: &Path, px: f32) -> Result<FontFace, FontError> {
    if !(px > 0.0) {
        return Err(FontError::InvalidSize(px));
    }
    if let Some(font) = FONT_CACHE.read().get(path) {
        return Ok(FontFace {
            font: Arc::clone(font),
            px,
            path: path.to_path_buf(),
        });
    }

    let bytes = std::fs::read(path).map_err(|source| FontError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let font = {
        let _face = FACE_LOCK.lock();
        Font::from_bytes(bytes, FontSettings::default()).map_err(|reason| FontError::Parse {
            path: path.to_path_buf(),
            reason,
        })?
    };

    let font = Arc::new(font);
    let font = Arc::clone(
        FONT_CACHE
            .write()
            .entry(path.to_path_buf())
            .or_insert(font),
    );
    log::debug!("Loaded font {} at {}px", path.display(), px);
    Ok(FontFace {
        font,
        px,
        path: path.to_path_buf(),
    })
}

/// Number of parsed fonts currently cached.
pub fn cached_fonts() -> usize {
    FONT_CACHE.read().len()
}

impl FontFace {
    pub fn size(&self) -> f32 {
        self.px
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn line_extent(&self) -> (i32, i32) {
        match self.font.horizontal_line_metrics(self.px) {
            Some(m) => (m.ascent.ceil() as i32, (-m.descent).ceil() as i32),
            None => (self.px.ceil() as i32, 0),
        }
    }

    fn measure_locked(&self, text: &str) -> TextMetrics {
        let width: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, self.px).advance_width)
            .sum();
        let (ascent, descent) = self.line_extent();
        TextMetrics {
            width: width.ceil() as i32,
            ascent,
            descent,
        }
    }

    /// Measures `text` under the face lock.
    pub fn measure(&self, text: &str) -> TextMetrics {
        let _face = FACE_LOCK.lock();
        self.measure_locked(text)
    }

    /// Draws `text` aligned inside `area`, clipped to `area`.
    ///
    /// Coverage is blended towards `color`, so the output is grayscale; the
    /// dither stage decides which pixels finally light up.
    pub fn draw_aligned(
        &self,
        img: &mut GrayImage,
        text: &str,
        area: Rect,
        halign: HAlign,
        valign: VAlign,
        color: u8,
    ) {
        let clip = area.intersect(&img.bounds());
        if clip.is_empty() || text.is_empty() {
            return;
        }
        let _face = FACE_LOCK.lock();
        let metrics = self.measure_locked(text);

        let start_x = match halign {
            HAlign::Left => area.x,
            HAlign::Center => area.x + (area.width - metrics.width) / 2,
            HAlign::Right => area.right() - metrics.width,
        };
        let baseline = match valign {
            VAlign::Top => area.y + metrics.ascent,
            VAlign::Center => area.y + (area.height - metrics.height()) / 2 + metrics.ascent,
            VAlign::Bottom => area.bottom() - metrics.descent,
        };

        let mut pen = start_x as f32;
        for ch in text.chars() {
            let (glyph, coverage) = self.font.rasterize(ch, self.px);
            let gx = pen.round() as i32 + glyph.xmin;
            let gy = baseline - (glyph.height as i32 + glyph.ymin);
            for row in 0..glyph.height {
                for col in 0..glyph.width {
                    let c = coverage[row * glyph.width + col] as i32;
                    if c == 0 {
                        continue;
                    }
                    let (x, y) = (gx + col as i32, gy + row as i32);
                    if !clip.contains(x, y) {
                        continue;
                    }
                    let old = img.get(x, y).unwrap_or(0) as i32;
                    let blended = old + (color as i32 - old) * c / 255;
                    img.set(x, y, blended as u8);
                }
            }
            pen += glyph.advance_width;
        }
    }
}
