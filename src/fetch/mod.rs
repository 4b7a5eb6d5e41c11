use std::io::Cursor;
use std::path::PathBuf;

use anyhow::Context;
use image::ImageFormat;
use image::imageops::FilterType;

use crate::encode::codec::{AviEncodeParams, VideoCodec};
use crate::encode::raw::RgbFrame;
use crate::foundation::core::VideoSize;
use crate::foundation::error::{GapError, GapResult};
use crate::util::file::{FRAME_NR_DIGITS, FrameName, read_file};

/// What the encoder can accept for the next frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    /// Target frame size.
    pub size: VideoSize,
    /// Reusable chunks must have exactly `size`.
    pub check_size: bool,
    /// Already-encoded JPEG data may be handed back unchanged.
    pub check_jpeg: bool,
    /// Already-encoded PNG data may be handed back unchanged.
    pub check_png: bool,
}

impl FetchRequest {
    /// Request that never allows reuse.
    pub fn decoded(size: VideoSize) -> Self {
        Self {
            size,
            check_size: true,
            check_jpeg: false,
            check_png: false,
        }
    }

    /// Request matching the reuse rules of `params`.
    ///
    /// Interlaced JPEG output is never reused since source files hold full frames.
    pub fn for_params(params: &AviEncodeParams, size: VideoSize) -> Self {
        let allow = params.allow_passthrough && params.codec.allows_passthrough();
        Self {
            size,
            check_size: true,
            check_jpeg: allow && params.codec.is_jpeg() && !params.jpeg.interlaced,
            check_png: allow && params.codec == VideoCodec::Png,
        }
    }

    /// Return `true` when any reuse is possible.
    pub fn allows_reuse(&self) -> bool {
        self.check_jpeg || self.check_png
    }
}

/// One fetched frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetched {
    /// Already-encoded data; the video chunk is `data[header_len..]`.
    Chunk {
        /// Raw bytes, possibly with a leading header.
        data: Vec<u8>,
        /// Bytes to skip before the chunk payload.
        header_len: usize,
    },
    /// Decoded pixels at the requested size.
    Frame(RgbFrame),
}

/// Produces frames by number.
pub trait FrameSource {
    /// Fetch frame `frame_nr`.
    fn fetch(&mut self, frame_nr: u32, req: &FetchRequest) -> GapResult<Fetched>;
}

/// Numbered image files: `<basename><nr:06><ext>`.
#[derive(Clone, Debug)]
pub struct ImageSequenceSource {
    name: FrameName,
}

impl ImageSequenceSource {
    /// Frames named `basename` + 6-digit number + `ext` (`ext` with leading dot).
    pub fn new(basename: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            name: FrameName {
                basename: basename.into(),
                nr: 0,
                digits: FRAME_NR_DIGITS,
                ext: ext.into(),
            },
        }
    }

    /// Source for the sequence that `name` belongs to, keeping its digit count.
    pub fn from_frame_name(name: &FrameName) -> Self {
        Self { name: name.clone() }
    }

    /// Path of frame `nr`.
    pub fn path_of(&self, nr: u32) -> PathBuf {
        self.name.with_nr(nr)
    }
}

impl FrameSource for ImageSequenceSource {
    fn fetch(&mut self, frame_nr: u32, req: &FetchRequest) -> GapResult<Fetched> {
        let path = self.path_of(frame_nr);
        let bytes = read_file(&path)?;

        if req.allows_reuse() && reusable(&bytes, req)? {
            tracing::debug!(frame = frame_nr, path = %path.display(), "reusing encoded frame");
            return Ok(Fetched::Chunk {
                data: bytes,
                header_len: 0,
            });
        }

        let img = image::load_from_memory(&bytes)
            .with_context(|| format!("decode frame '{}'", path.display()))?;
        Ok(Fetched::Frame(fit_to_size(&img, req.size)))
    }
}

fn reusable(bytes: &[u8], req: &FetchRequest) -> GapResult<bool> {
    let format_ok = match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => req.check_jpeg,
        Ok(ImageFormat::Png) => req.check_png,
        _ => false,
    };
    if !format_ok {
        return Ok(false);
    }
    if !req.check_size {
        return Ok(true);
    }
    let (w, h) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| GapError::io(format!("probe image: {e}")))?
        .into_dimensions()
        .context("read image dimensions")?;
    Ok(w == req.size.width && h == req.size.height)
}

/// Convert to RGB and scale to `size` (triangle filter) when the dimensions differ.
pub fn fit_to_size(img: &image::DynamicImage, size: VideoSize) -> RgbFrame {
    if (img.width(), img.height()) == (size.width, size.height) {
        return RgbFrame::from_dynamic(img);
    }
    RgbFrame::from_rgb_image(image::imageops::resize(
        &img.to_rgb8(),
        size.width,
        size.height,
        FilterType::Triangle,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/fetch/mod.rs"]
mod tests;
