//! gapenc assembles numbered animation frames into AVI files.
//!
//! The pipeline is frame-range oriented:
//!
//! - A [`FrameSource`] hands out either a reusable, already-encoded chunk or decoded pixels
//! - A [`FrameEncoder`] turns pixels into JPEG / MJPG / PNG / raw BGR / XVID chunks
//! - [`encode_avi`] writes video chunks and interleaved WAV audio into an [`AviWriter`]
//!
//! Supporting pieces carried over from the animation package: WAV header I/O, filter macro files,
//! a persistent settings store, acceleration curves and a timing registry.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Acceleration characteristic curves.
pub mod accel;
/// WAV file access and audio/video interleave accounting.
pub mod audio;
/// AVI (RIFF) container writer and summary reader.
pub mod container;
/// Pixel buffer conversion and codec wrappers.
pub mod encode;
/// Frame sources feeding the encoder.
pub mod fetch;
/// Filter macro script files.
pub mod filtermacro;
/// Frame-range encode sessions.
pub mod session;
/// Persistent named settings blobs.
pub mod settings;
/// Runtime timing instrumentation.
pub mod timm;
/// Filesystem and frame naming helpers.
pub mod util;

pub use crate::foundation::core::{Fps, FrameRange, VideoSize};
pub use crate::foundation::error::{GapError, GapResult};

pub use crate::audio::interleave::{AUDIO_MARGIN, AudioInterleaver};
pub use crate::audio::wav::{WavDataCursor, WavInfo, read_wav_info, write_wav_file};
pub use crate::container::avi::{AviSummary, AviWriter, read_avi_summary};
pub use crate::encode::codec::{
    AviEncodeParams, EncodedChunk, FrameEncoder, VideoCodec, build_encoder,
};
pub use crate::encode::raw::RgbFrame;
pub use crate::fetch::{FetchRequest, Fetched, FrameSource, ImageSequenceSource};
pub use crate::filtermacro::FilterMacro;
pub use crate::session::avi_encode::{
    AviEncodeJob, EncodeProgress, EncodeStats, NoProgress, encode_avi,
};
pub use crate::session::encoder_info::{EncoderQuery, query_avi_encoder};
pub use crate::settings::SettingsStore;
pub use crate::timm::TimingRegistry;
