use crate::foundation::error::{GapError, GapResult};

/// Inclusive frame number range `[from, to]`.
///
/// Traversal runs ascending when `from <= to` and descending otherwise, so `10..=1` visits
/// `10, 9, ..., 1`. A range always holds at least one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// First frame number visited.
    pub from: u32,
    /// Last frame number visited.
    pub to: u32,
}

impl FrameRange {
    /// Create a range; any ordering of the bounds is accepted.
    pub fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }

    /// Number of frames visited (`|to - from| + 1`).
    pub fn len(self) -> u64 {
        u64::from(self.from.abs_diff(self.to)) + 1
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(self) -> bool {
        false
    }

    /// Return `true` when traversal runs from high to low frame numbers.
    pub fn is_reversed(self) -> bool {
        self.from > self.to
    }

    /// Traversal step, `+1` or `-1`.
    pub fn step(self) -> i64 {
        if self.is_reversed() { -1 } else { 1 }
    }

    /// Return `true` when `nr` lies between the bounds.
    pub fn contains(self, nr: u32) -> bool {
        let (lo, hi) = self.bounds();
        lo <= nr && nr <= hi
    }

    /// 0-based loop position of `nr` in traversal order.
    pub fn position_of(self, nr: u32) -> Option<u64> {
        if !self.contains(nr) {
            return None;
        }
        Some(u64::from(self.from.abs_diff(nr)))
    }

    /// Iterate frame numbers in traversal order.
    pub fn iter(self) -> FrameRangeIter {
        FrameRangeIter {
            next: Some(self.from),
            range: self,
        }
    }

    fn bounds(self) -> (u32, u32) {
        (self.from.min(self.to), self.from.max(self.to))
    }
}

impl IntoIterator for FrameRange {
    type Item = u32;
    type IntoIter = FrameRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`FrameRange`] in traversal order.
#[derive(Clone, Debug)]
pub struct FrameRangeIter {
    range: FrameRange,
    next: Option<u32>,
}

impl Iterator for FrameRangeIter {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let cur = self.next?;
        self.next = if cur == self.range.to {
            None
        } else if self.range.is_reversed() {
            Some(cur - 1)
        } else {
            Some(cur + 1)
        };
        Some(cur)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = match self.next {
            Some(cur) => cur.abs_diff(self.range.to) as usize + 1,
            None => 0,
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for FrameRangeIter {}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> GapResult<Self> {
        if den == 0 {
            return Err(GapError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(GapError::validation("Fps num must be > 0"));
        }
        let g = gcd(num, den);
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    /// Convert a floating-point framerate to a rational with millisecond precision.
    pub fn from_f64(fps: f64) -> GapResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(GapError::validation(format!(
                "framerate must be a positive number, got {fps}"
            )));
        }
        let num = (fps * 1000.0).round();
        if num < 1.0 || num > f64::from(u32::MAX) {
            return Err(GapError::validation(format!(
                "framerate {fps} is out of range"
            )));
        }
        Self::new(num as u32, 1000)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in whole microseconds (AVI main header field).
    pub fn micros_per_frame(self) -> u32 {
        let us = u64::from(self.den) * 1_000_000 / u64::from(self.num);
        us.min(u64::from(u32::MAX)) as u32
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

/// Target video dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VideoSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl VideoSize {
    /// Create a validated, non-zero size.
    pub fn new(width: u32, height: u32) -> GapResult<Self> {
        if width == 0 || height == 0 {
            return Err(GapError::validation("video width/height must be non-zero"));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels per frame.
    pub fn pixels(self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
