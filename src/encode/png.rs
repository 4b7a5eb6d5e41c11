use image::ImageEncoder as _;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};

use crate::encode::raw::RgbFrame;
use crate::foundation::error::{GapError, GapResult};

/// PNG compression effort, 0 (fastest) ..= 9 (smallest).
///
/// The encoder exposes three effort levels; 0..=2 maps to fast, 3..=6 to default and 7..=9 to
/// best.
pub fn compression_type(level: u8) -> CompressionType {
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Encode `frame` as a PNG held in memory.
pub fn encode_png(frame: &RgbFrame, compression: u8) -> GapResult<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, compression_type(compression), FilterType::Adaptive)
        .write_image(
            &frame.data,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| GapError::codec(format!("png encode failed: {e}")))?;
    if out.is_empty() {
        return Err(GapError::codec("png encoder produced no data"));
    }
    Ok(out)
}
