use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

use crate::encode::raw::RgbFrame;
use crate::foundation::error::{GapError, GapResult};

/// Payload length of the AVI1 APP0 marker.
pub const AVI1_PAYLOAD_LEN: usize = 14;

/// JPEG / MJPG encoder settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct JpegParams {
    /// Quality 1..=100.
    pub quality: u8,
    /// Encode the two fields as separate images, concatenated.
    pub interlaced: bool,
    /// Emit the top field (rows 0, 2, 4, ...) first when interlaced.
    pub top_field_first: bool,
    /// Insert the AVI1 APP0 marker that carries field polarity and size.
    pub app0_marker: bool,
}

impl Default for JpegParams {
    fn default() -> Self {
        Self {
            quality: 84,
            interlaced: false,
            top_field_first: true,
            app0_marker: true,
        }
    }
}

/// Encode `frame` as one JPEG, or as two concatenated field JPEGs when interlaced.
pub fn encode_jpeg(frame: &RgbFrame, params: &JpegParams) -> GapResult<Vec<u8>> {
    if !(1..=100).contains(&params.quality) {
        return Err(GapError::validation(format!(
            "jpeg quality must be within 1..=100, got {}",
            params.quality
        )));
    }

    if !params.interlaced {
        let mut jpeg = encode_plain(frame, params.quality)?;
        if params.app0_marker {
            insert_avi1_marker(&mut jpeg, 0)?;
        }
        return Ok(jpeg);
    }

    let (first, second) = if params.top_field_first {
        (field(frame, 0), field(frame, 1))
    } else {
        (field(frame, 1), field(frame, 0))
    };

    let mut out = Vec::new();
    for (polarity, f) in [(1u8, first), (2u8, second)] {
        let Some(f) = f else { continue };
        let mut jpeg = encode_plain(&f, params.quality)?;
        if params.app0_marker {
            insert_avi1_marker(&mut jpeg, polarity)?;
        }
        out.append(&mut jpeg);
    }
    Ok(out)
}

fn encode_plain(frame: &RgbFrame, quality: u8) -> GapResult<Vec<u8>> {
    let mut out = Vec::with_capacity(frame.data.len() / 8);
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(&frame.data, frame.width, frame.height, ExtendedColorType::Rgb8)
        .map_err(|e| GapError::codec(format!("jpeg encode failed: {e}")))?;
    if out.is_empty() {
        return Err(GapError::codec("jpeg encoder produced no data"));
    }
    Ok(out)
}

// Rows with the given parity; `None` for the odd field of a single-row frame.
fn field(frame: &RgbFrame, parity: usize) -> Option<RgbFrame> {
    let stride = frame.width as usize * 3;
    let mut data = Vec::with_capacity(frame.data.len() / 2 + stride);
    let mut rows = 0u32;
    for row in frame.data.chunks_exact(stride).skip(parity).step_by(2) {
        data.extend_from_slice(row);
        rows += 1;
    }
    (rows > 0).then_some(RgbFrame {
        width: frame.width,
        height: rows,
        data,
    })
}

/// Insert an AVI1 APP0 segment after SOI (and after a leading JFIF APP0, if any).
///
/// Layout: `FF E0`, length 16, `AVI1`, polarity (0 progressive, 1 first field, 2 second field),
/// reserved, big-endian field size, big-endian field size less padding. Both sizes cover the
/// whole JPEG including this segment.
pub fn insert_avi1_marker(jpeg: &mut Vec<u8>, polarity: u8) -> GapResult<()> {
    if jpeg.len() < 4 || jpeg[0] != 0xFF || jpeg[1] != 0xD8 {
        return Err(GapError::codec("jpeg data does not start with SOI"));
    }

    let mut pos = 2usize;
    if jpeg[2] == 0xFF && jpeg[3] == 0xE0 && jpeg.len() >= 6 {
        let len = usize::from(u16::from_be_bytes([jpeg[4], jpeg[5]]));
        if jpeg.get(6..11) == Some(b"JFIF\0".as_slice()) && 4 + len <= jpeg.len() {
            pos = 4 + len;
        }
    }

    let mut seg = Vec::with_capacity(4 + AVI1_PAYLOAD_LEN);
    seg.extend_from_slice(&[0xFF, 0xE0]);
    seg.extend_from_slice(&((AVI1_PAYLOAD_LEN + 2) as u16).to_be_bytes());
    seg.extend_from_slice(b"AVI1");
    seg.push(polarity);
    seg.push(0);
    let field_size = u32::try_from(jpeg.len() + seg.len() + 8)
        .map_err(|_| GapError::codec("jpeg field exceeds 4 GiB"))?;
    seg.extend_from_slice(&field_size.to_be_bytes());
    seg.extend_from_slice(&field_size.to_be_bytes());

    jpeg.splice(pos..pos, seg);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/jpeg.rs"]
mod tests;
