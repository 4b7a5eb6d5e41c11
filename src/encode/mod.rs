//! Per-frame video codecs.
//!
//! Frames arrive as packed RGB ([`raw::RgbFrame`]) and leave as [`codec::EncodedChunk`]s ready to
//! be stored in a container. [`codec::build_encoder`] picks the implementation for a
//! [`codec::VideoCodec`].

/// Codec selection, parameters and the encoder trait.
pub mod codec;
/// JPEG frames, optionally as two interlaced fields.
pub mod jpeg;
/// In-memory PNG frames.
pub mod png;
/// Packed RGB frames and raw pixel layouts.
pub mod raw;
/// MPEG-4 ASP through an external `ffmpeg` process.
pub mod xvid;
