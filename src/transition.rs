//! # Transitions
//!
//! Time-parameterised blends between a widget's previous raster and its
//! new one. A [`Transition`] captures the old raster when it starts; every
//! frame after that, [`Transition::compose`] mixes it with the freshly
//! rendered raster according to linear progress over the duration.
//!
//! Composition is a pure function of `(old, new, progress)`. The only
//! randomness, the pixel order of [`TransitionKind::DissolvePixel`] and the
//! choice behind [`TransitionKind::Random`], is fixed once at start.
//!
//! | Kind | Effect |
//! |---|---|
//! | `slide-*` | old slides out during the first half, new slides in during the second |
//! | `push-*` | old and new move together |
//! | `fade` | per-pixel linear blend |
//! | `pixel` | pixels switch in a shuffled order |
//! | `dither` | pixels switch as progress passes their Bayer threshold |
//! | `box-in` / `box-out` | square wipe closing on / opening from the centre |
//! | `clock` | clockwise sweep from twelve o'clock |
//! | `random` | one of the above, picked at start |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::raster::{dither::bayer_threshold, resize, GrayImage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    fn unit(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransitionKind {
    Slide(Direction),
    Push(Direction),
    DissolveFade,
    DissolvePixel,
    DissolveDither,
    BoxIn,
    BoxOut,
    ClockWipe,
    Random,
}

impl Default for TransitionKind {
    fn default() -> Self {
        TransitionKind::Slide(Direction::Left)
    }
}

impl TransitionKind {
    /// Every concrete kind, the pool `Random` draws from.
    pub const CONCRETE: [TransitionKind; 14] = [
        TransitionKind::Slide(Direction::Left),
        TransitionKind::Slide(Direction::Right),
        TransitionKind::Slide(Direction::Up),
        TransitionKind::Slide(Direction::Down),
        TransitionKind::Push(Direction::Left),
        TransitionKind::Push(Direction::Right),
        TransitionKind::Push(Direction::Up),
        TransitionKind::Push(Direction::Down),
        TransitionKind::DissolveFade,
        TransitionKind::DissolvePixel,
        TransitionKind::DissolveDither,
        TransitionKind::BoxIn,
        TransitionKind::BoxOut,
        TransitionKind::ClockWipe,
    ];

    /// Replaces `Random` with a concrete kind.
    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> TransitionKind {
        match self {
            TransitionKind::Random => *Self::CONCRETE.choose(rng).unwrap_or(&TransitionKind::DissolveFade),
            kind => kind,
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionKind::Slide(d) => write!(f, "slide-{}", d.name()),
            TransitionKind::Push(d) => write!(f, "push-{}", d.name()),
            TransitionKind::DissolveFade => f.write_str("fade"),
            TransitionKind::DissolvePixel => f.write_str("pixel"),
            TransitionKind::DissolveDither => f.write_str("dither"),
            TransitionKind::BoxIn => f.write_str("box-in"),
            TransitionKind::BoxOut => f.write_str("box-out"),
            TransitionKind::ClockWipe => f.write_str("clock"),
            TransitionKind::Random => f.write_str("random"),
        }
    }
}

impl FromStr for TransitionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let direction = |d: &str| match d {
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        };
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "fade" => TransitionKind::DissolveFade,
            "pixel" => TransitionKind::DissolvePixel,
            "dither" => TransitionKind::DissolveDither,
            "box-in" => TransitionKind::BoxIn,
            "box-out" => TransitionKind::BoxOut,
            "clock" => TransitionKind::ClockWipe,
            "random" => TransitionKind::Random,
            other => {
                let parsed = if let Some(d) = other.strip_prefix("slide-") {
                    direction(d).map(TransitionKind::Slide)
                } else if let Some(d) = other.strip_prefix("push-") {
                    direction(d).map(TransitionKind::Push)
                } else {
                    None
                };
                parsed.ok_or_else(|| format!("unknown transition {s:?}"))?
            }
        };
        Ok(kind)
    }
}

impl TryFrom<String> for TransitionKind {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TransitionKind> for String {
    fn from(kind: TransitionKind) -> Self {
        kind.to_string()
    }
}

/// An in-flight transition.
#[derive(Clone, Debug)]
pub struct Transition {
    kind: TransitionKind,
    duration: Duration,
    started: DateTime<Utc>,
    old: GrayImage,
    background: u8,
    /// `rank[i]`: when pixel `i` switches, for the pixel dissolve
    rank: Vec<u32>,
}

impl Transition {
    /// Starts a transition away from `old`, using the thread RNG.
    pub fn start(kind: TransitionKind, duration: Duration, old: GrayImage, background: u8, now: DateTime<Utc>) -> Self {
        Self::with_rng(kind, duration, old, background, now, &mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(
        kind: TransitionKind,
        duration: Duration,
        old: GrayImage,
        background: u8,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        let kind = kind.resolve(rng);
        let rank = if kind == TransitionKind::DissolvePixel {
            let mut order: Vec<u32> = (0..old.as_raw().len() as u32).collect();
            order.shuffle(rng);
            let mut rank = vec![0u32; order.len()];
            for (position, &pixel) in order.iter().enumerate() {
                rank[pixel as usize] = position as u32;
            }
            rank
        } else {
            Vec::new()
        };
        log::trace!("Transition {kind} for {duration:?}");
        Self {
            kind,
            duration,
            started: now,
            old,
            background,
            rank,
        }
    }

    /// The concrete kind; never `Random`.
    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Linear progress in `[0, 1]`.
    pub fn progress(&self, now: DateTime<Utc>) -> f32 {
        let total = self.duration.as_micros() as f64;
        if total <= 0.0 {
            return 1.0;
        }
        let elapsed = (now - self.started).num_microseconds().unwrap_or(i64::MAX) as f64;
        (elapsed / total).clamp(0.0, 1.0) as f32
    }

    pub fn is_done(&self, now: DateTime<Utc>) -> bool {
        self.progress(now) >= 1.0
    }

    /// Intermediate frame at `now`.
    pub fn compose(&self, new: &GrayImage, now: DateTime<Utc>) -> GrayImage {
        self.frame(new, self.progress(now))
    }

    /// Intermediate frame at progress `p`.
    pub fn frame(&self, new: &GrayImage, p: f32) -> GrayImage {
        let (w, h) = new.dimensions();
        let old = resize::nearest(&self.old, w, h);
        if p <= 0.0 {
            return old;
        }
        if p >= 1.0 {
            return new.clone();
        }

        match self.kind {
            TransitionKind::Slide(dir) => {
                let (ux, uy) = dir.unit();
                let extent = (if ux != 0 { w } else { h }) as f32;
                let mut out = GrayImage::new(w, h, self.background);
                if p < 0.5 {
                    let d = (2.0 * p * extent).round() as i32;
                    out.blit(&old, ux * d, uy * d, None);
                } else {
                    let d = ((2.0 - 2.0 * p) * extent).round() as i32;
                    out.blit(new, -ux * d, -uy * d, None);
                }
                out
            }
            TransitionKind::Push(dir) => {
                let (ux, uy) = dir.unit();
                let extent = (if ux != 0 { w } else { h }) as i32;
                let d = (p * extent as f32).round() as i32;
                let mut out = GrayImage::new(w, h, self.background);
                out.blit(&old, ux * d, uy * d, None);
                out.blit(new, ux * (d - extent), uy * (d - extent), None);
                out
            }
            TransitionKind::DissolveFade => mix(&old, new, |_, _, _| None, Some(p)),
            TransitionKind::DissolvePixel => {
                let cutoff = (p * self.rank.len() as f32) as u32;
                let rank = &self.rank;
                mix(&old, new, |i, _, _| Some(rank.get(i).is_some_and(|&r| r < cutoff)), None)
            }
            TransitionKind::DissolveDither => mix(&old, new, |_, x, y| Some(p > bayer_threshold(x, y)), None),
            TransitionKind::BoxIn | TransitionKind::BoxOut => {
                let (cx, cy) = ((w as f32 - 1.0) / 2.0, (h as f32 - 1.0) / 2.0);
                let (hw, hh) = ((w as f32 / 2.0).max(0.5), (h as f32 / 2.0).max(0.5));
                let opening = self.kind == TransitionKind::BoxOut;
                mix(
                    &old,
                    new,
                    |_, x, y| {
                        let d = ((x as f32 - cx).abs() / hw).max((y as f32 - cy).abs() / hh);
                        Some(if opening { d <= p } else { d >= 1.0 - p })
                    },
                    None,
                )
            }
            TransitionKind::ClockWipe => {
                let (cx, cy) = ((w as f32 - 1.0) / 2.0, (h as f32 - 1.0) / 2.0);
                mix(
                    &old,
                    new,
                    |_, x, y| {
                        let angle = (x as f32 - cx).atan2(cy - y as f32);
                        let turn = angle.rem_euclid(std::f32::consts::TAU) / std::f32::consts::TAU;
                        Some(turn < p)
                    },
                    None,
                )
            }
            // Resolved at construction.
            TransitionKind::Random => new.clone(),
        }
    }
}

/// Per-pixel combination of `old` and `new` (same size). `pick(i, x, y)`
/// returning `Some(true)` takes the new pixel; with `blend` set, pixels are
/// linearly interpolated instead.
fn mix<F>(old: &GrayImage, new: &GrayImage, pick: F, blend: Option<f32>) -> GrayImage
where
    F: Fn(usize, u32, u32) -> Option<bool>,
{
    let w = new.width().max(1);
    let mut out = new.clone();
    for (i, (dst, &before)) in out.as_raw_mut().iter_mut().zip(old.as_raw()).enumerate() {
        let after = *dst;
        *dst = match blend {
            Some(t) => (before as f32 + (after as f32 - before as f32) * t).round() as u8,
            None => {
                let (x, y) = (i as u32 % w, i as u32 / w);
                if pick(i, x, y).unwrap_or(true) {
                    after
                } else {
                    before
                }
            }
        };
    }
    out
}
