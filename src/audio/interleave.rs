use crate::foundation::core::Fps;
use crate::foundation::error::{GapError, GapResult};

/// Default audio chunk size in bytes.
pub const AUDIO_MARGIN: usize = 8192;

/// Fixed-point bookkeeping of how much audio each video frame owes the container.
///
/// Amounts are kept in units of `1 / fps.num` bytes, so byte rates that do not divide evenly by
/// the framerate never accumulate rounding drift. The owed amount is always below one margin
/// after [`AudioInterleaver::on_video_frame`] returns.
#[derive(Clone, Debug)]
pub struct AudioInterleaver {
    per_frame: u128,
    unit: u128,
    filled: u128,
    margin: usize,
    block_align: u16,
}

impl AudioInterleaver {
    /// Create the accounting for a stream of `bytes_per_second` at framerate `fps`.
    ///
    /// `margin` is rounded down to a whole number of sample frames.
    pub fn new(bytes_per_second: u64, block_align: u16, fps: Fps, margin: usize) -> GapResult<Self> {
        if block_align == 0 {
            return Err(GapError::validation("audio block align must be > 0"));
        }
        let block = usize::from(block_align);
        let margin = margin - margin % block;
        if margin == 0 {
            return Err(GapError::validation(format!(
                "audio margin must hold at least one sample frame ({block} bytes)"
            )));
        }

        Ok(Self {
            per_frame: u128::from(bytes_per_second) * u128::from(fps.den),
            unit: u128::from(fps.num),
            filled: 0,
            margin,
            block_align,
        })
    }

    /// Audio owed per video frame, in hundredths of a byte (truncated).
    pub fn audio_per_frame_x100(&self) -> u64 {
        (self.per_frame * 100 / self.unit) as u64
    }

    /// Effective chunk size in bytes.
    pub fn margin(&self) -> usize {
        self.margin
    }

    /// Currently owed audio, in hundredths of a byte (truncated).
    pub fn owed_x100(&self) -> u64 {
        (self.filled * 100 / self.unit) as u64
    }

    /// Account for one more video frame and return how many margin-sized chunks are now due.
    pub fn on_video_frame(&mut self) -> usize {
        self.filled += self.per_frame;
        let margin = self.margin as u128 * self.unit;
        let due = self.filled / margin;
        self.filled -= due * margin;
        due as usize
    }

    /// Owed bytes that do not fill a whole margin, rounded down to whole sample frames.
    pub fn residual_bytes(&self) -> usize {
        let bytes = (self.filled / self.unit) as usize;
        bytes - bytes % usize::from(self.block_align)
    }

    /// Return [`residual_bytes`](Self::residual_bytes) and mark them as written.
    pub fn take_residual(&mut self) -> usize {
        let bytes = self.residual_bytes();
        self.filled -= bytes as u128 * self.unit;
        bytes
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/interleave.rs"]
mod tests;
