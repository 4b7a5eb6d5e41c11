use std::fmt;
use std::str::FromStr;

use crate::audio::interleave::AUDIO_MARGIN;
use crate::encode::jpeg::{JpegParams, encode_jpeg};
use crate::encode::png::encode_png;
use crate::encode::raw::{RgbFrame, to_bgr, to_rgb};
use crate::encode::xvid::{XvidEncoder, XvidParams};
use crate::foundation::core::{Fps, VideoSize};
use crate::foundation::error::{GapError, GapResult};

/// Video codecs the AVI encoder can produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VideoCodec {
    /// Baseline JPEG per frame, `JPEG` tag.
    #[default]
    Jpeg,
    /// Motion JPEG, `MJPG` tag (same bitstream as `Jpeg`).
    Mjpg,
    /// Uncompressed bottom-up BGR (DIB layout).
    Raw,
    /// Uncompressed packed RGB in source row order.
    Rgb,
    /// PNG per frame.
    Png,
    /// MPEG-4 ASP via ffmpeg.
    Xvid,
}

impl VideoCodec {
    /// Every supported codec.
    pub const ALL: [VideoCodec; 6] = [
        VideoCodec::Jpeg,
        VideoCodec::Mjpg,
        VideoCodec::Raw,
        VideoCodec::Rgb,
        VideoCodec::Png,
        VideoCodec::Xvid,
    ];

    /// Name used on the command line and in parameter files.
    pub fn name(self) -> &'static str {
        match self {
            VideoCodec::Jpeg => "JPEG",
            VideoCodec::Mjpg => "MJPG",
            VideoCodec::Raw => "RAW",
            VideoCodec::Rgb => "RGB",
            VideoCodec::Png => "PNG",
            VideoCodec::Xvid => "XVID",
        }
    }

    /// Stream handler / compression FourCC.
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            VideoCodec::Jpeg => *b"JPEG",
            VideoCodec::Mjpg => *b"MJPG",
            VideoCodec::Raw | VideoCodec::Rgb => *b"RGB ",
            VideoCodec::Png => *b"MPNG",
            VideoCodec::Xvid => *b"XVID",
        }
    }

    /// `biCompression` of the stream format; uncompressed codecs use `BI_RGB` (0).
    pub fn bmp_compression(self) -> [u8; 4] {
        match self {
            VideoCodec::Raw | VideoCodec::Rgb => [0; 4],
            other => other.fourcc(),
        }
    }

    /// Bits per pixel advertised in the stream format.
    pub fn bit_count(self) -> u16 {
        24
    }

    /// Return `true` for codecs whose chunks are complete JPEG images.
    pub fn is_jpeg(self) -> bool {
        matches!(self, VideoCodec::Jpeg | VideoCodec::Mjpg)
    }

    /// Return `true` when already-encoded source files may be copied without re-encoding.
    pub fn allows_passthrough(self) -> bool {
        self.is_jpeg() || self == VideoCodec::Png
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VideoCodec {
    type Err = GapError;

    fn from_str(s: &str) -> GapResult<Self> {
        let wanted = s.trim();
        VideoCodec::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                GapError::validation(format!(
                    "unsupported codec '{s}' (expected one of JPEG, MJPG, RAW, RGB, PNG, XVID)"
                ))
            })
    }
}

/// All AVI encoder settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AviEncodeParams {
    /// Selected video codec.
    pub codec: VideoCodec,
    /// JPEG / MJPG settings.
    pub jpeg: JpegParams,
    /// PNG compression effort 0..=9.
    pub png_compression: u8,
    /// XVID settings.
    pub xvid: XvidParams,
    /// Store raw frames bottom-up, as DIB readers expect.
    pub raw_vflip: bool,
    /// Audio chunk size in bytes.
    pub audio_margin: usize,
    /// Copy already-encoded source frames when format and size match.
    pub allow_passthrough: bool,
}

impl Default for AviEncodeParams {
    fn default() -> Self {
        Self {
            codec: VideoCodec::Jpeg,
            jpeg: JpegParams::default(),
            png_compression: 6,
            xvid: XvidParams::default(),
            raw_vflip: true,
            audio_margin: AUDIO_MARGIN,
            allow_passthrough: true,
        }
    }
}

impl AviEncodeParams {
    /// Load parameters from a JSON file; missing fields keep their defaults.
    pub fn from_json_path(path: &std::path::Path) -> GapResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GapError::io(format!("read params '{}': {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| GapError::format(format!("params '{}': {e}", path.display())))
    }

    /// Check codec-specific settings.
    pub fn validate(&self) -> GapResult<()> {
        if !(1..=100).contains(&self.jpeg.quality) {
            return Err(GapError::validation("jpeg quality must be within 1..=100"));
        }
        if self.png_compression > 9 {
            return Err(GapError::validation("png compression must be within 0..=9"));
        }
        if self.audio_margin == 0 {
            return Err(GapError::validation("audio margin must be > 0"));
        }
        if self.codec == VideoCodec::Xvid {
            self.xvid.validate()?;
        }
        Ok(())
    }
}

/// One encoded video chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedChunk {
    /// Chunk payload as stored in the container.
    pub data: Vec<u8>,
    /// Whether the chunk decodes without reference to other chunks.
    pub keyframe: bool,
}

impl EncodedChunk {
    /// An intra-coded chunk.
    pub fn key(data: Vec<u8>) -> Self {
        Self {
            data,
            keyframe: true,
        }
    }
}

/// Codec interface used by the encode session.
///
/// `encode` may return zero chunks for encoders with output delay; every remaining chunk is
/// returned by `finish`, which is called exactly once after the last frame.
pub trait FrameEncoder {
    /// Encode one frame.
    fn encode(&mut self, frame: &RgbFrame) -> GapResult<Vec<EncodedChunk>>;
    /// Flush delayed output.
    fn finish(&mut self) -> GapResult<Vec<EncodedChunk>>;
}

struct JpegFrameEncoder {
    params: JpegParams,
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&mut self, frame: &RgbFrame) -> GapResult<Vec<EncodedChunk>> {
        Ok(vec![EncodedChunk::key(encode_jpeg(frame, &self.params)?)])
    }

    fn finish(&mut self) -> GapResult<Vec<EncodedChunk>> {
        Ok(Vec::new())
    }
}

struct PngFrameEncoder {
    compression: u8,
}

impl FrameEncoder for PngFrameEncoder {
    fn encode(&mut self, frame: &RgbFrame) -> GapResult<Vec<EncodedChunk>> {
        Ok(vec![EncodedChunk::key(encode_png(frame, self.compression)?)])
    }

    fn finish(&mut self) -> GapResult<Vec<EncodedChunk>> {
        Ok(Vec::new())
    }
}

struct RawFrameEncoder {
    bgr: bool,
    flip: bool,
}

impl FrameEncoder for RawFrameEncoder {
    fn encode(&mut self, frame: &RgbFrame) -> GapResult<Vec<EncodedChunk>> {
        let data = if self.bgr {
            to_bgr(frame, self.flip, &[])
        } else {
            to_rgb(frame, self.flip, &[])
        };
        Ok(vec![EncodedChunk::key(data)])
    }

    fn finish(&mut self) -> GapResult<Vec<EncodedChunk>> {
        Ok(Vec::new())
    }
}

/// Create the encoder for `params.codec`.
pub fn build_encoder(
    params: &AviEncodeParams,
    size: VideoSize,
    fps: Fps,
) -> GapResult<Box<dyn FrameEncoder>> {
    params.validate()?;
    Ok(match params.codec {
        VideoCodec::Jpeg | VideoCodec::Mjpg => Box::new(JpegFrameEncoder {
            params: params.jpeg,
        }),
        VideoCodec::Png => Box::new(PngFrameEncoder {
            compression: params.png_compression,
        }),
        VideoCodec::Raw => Box::new(RawFrameEncoder {
            bgr: true,
            flip: params.raw_vflip,
        }),
        VideoCodec::Rgb => Box::new(RawFrameEncoder {
            bgr: false,
            flip: false,
        }),
        VideoCodec::Xvid => Box::new(XvidEncoder::new(size, fps, &params.xvid)?),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/codec.rs"]
mod tests;
