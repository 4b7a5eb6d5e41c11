use std::io::{Seek, Write};
use std::path::PathBuf;

use crate::audio::interleave::AudioInterleaver;
use crate::audio::wav::{FORMAT_PCM, WavDataCursor};
use crate::container::avi::{AviAudioFormat, AviWriter};
use crate::encode::codec::{AviEncodeParams, EncodedChunk, FrameEncoder, build_encoder};
use crate::fetch::{FetchRequest, Fetched, FrameSource};
use crate::foundation::core::{Fps, FrameRange, VideoSize};
use crate::foundation::error::{GapError, GapResult};

/// Everything one AVI encode run needs besides the frame source.
#[derive(Clone, Debug, PartialEq)]
pub struct AviEncodeJob {
    /// Frames to encode, in traversal order.
    pub range: FrameRange,
    /// Output frame size.
    pub size: VideoSize,
    /// Output framerate.
    pub fps: Fps,
    /// Codec settings.
    pub params: AviEncodeParams,
    /// Optional 16-bit PCM WAV to interleave.
    pub audio: Option<PathBuf>,
    /// Output AVI path.
    pub output: PathBuf,
}

/// Progress sink polled once per frame.
pub trait EncodeProgress {
    /// Frame `frame_nr` is done; `fraction` runs from `1/len` to `1.0`.
    fn report(&mut self, frame_nr: u32, fraction: f64) {
        let _ = (frame_nr, fraction);
    }

    /// Return `true` to stop after the current frame.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Progress sink that ignores reports and never cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl EncodeProgress for NoProgress {}

/// Counters of one encode run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeStats {
    /// Frames visited.
    pub frames_total: u64,
    /// Frames copied from already-encoded source data.
    pub frames_reused: u64,
    /// Frames passed through the codec.
    pub frames_encoded: u64,
    /// Video chunks written.
    pub video_chunks: u64,
    /// Audio chunks written.
    pub audio_chunks: u64,
    /// Audio payload bytes written.
    pub audio_bytes: u64,
    /// The run stopped early on request.
    pub cancelled: bool,
}

/// Encode `job.range` from `source` into the AVI at `job.output`.
///
/// The output file is finished (index written, header patched) on every path once it has been
/// created, including failures, so a partial run leaves a playable file holding the frames
/// written so far.
#[tracing::instrument(
    skip_all,
    fields(
        output = %job.output.display(),
        codec = %job.params.codec,
        from = job.range.from,
        to = job.range.to
    )
)]
pub fn encode_avi(
    source: &mut dyn FrameSource,
    job: &AviEncodeJob,
    progress: &mut dyn EncodeProgress,
) -> GapResult<EncodeStats> {
    job.params.validate()?;
    let codec = job.params.codec;
    let mut avi = AviWriter::create(
        &job.output,
        job.size,
        job.fps,
        codec.fourcc(),
        codec.bmp_compression(),
        codec.bit_count(),
    )?;

    let result = encode_into(&mut avi, source, job, progress);
    let finished = avi.finish();
    let stats = result?;
    finished?;

    tracing::info!(
        frames = stats.frames_total,
        reused = stats.frames_reused,
        encoded = stats.frames_encoded,
        audio_bytes = stats.audio_bytes,
        cancelled = stats.cancelled,
        "avi encode done"
    );
    Ok(stats)
}

/// Run the frame loop against an already-created writer. The caller finishes `avi`.
pub fn encode_into<W: Write + Seek>(
    avi: &mut AviWriter<W>,
    source: &mut dyn FrameSource,
    job: &AviEncodeJob,
    progress: &mut dyn EncodeProgress,
) -> GapResult<EncodeStats> {
    let mut stats = EncodeStats::default();
    let mut audio = match &job.audio {
        Some(path) => Some(AudioFeed::open(path, job, avi)?),
        None => None,
    };
    let mut encoder = build_encoder(&job.params, job.size, job.fps)?;
    let req = FetchRequest::for_params(&job.params, job.size);
    let len = job.range.len();

    for (pos, nr) in job.range.iter().enumerate() {
        let fetched = source
            .fetch(nr, &req)
            .map_err(|e| GapError::encode(format!("frame {nr}: fetch failed: {e}")))?;
        match fetched {
            Fetched::Chunk { data, header_len } => {
                let payload = data.get(header_len..).unwrap_or_default();
                if payload.is_empty() {
                    return Err(GapError::encode(format!(
                        "frame {nr}: reusable chunk is empty after its {header_len} byte header"
                    )));
                }
                avi.write_video(payload, true)?;
                stats.video_chunks += 1;
                stats.frames_reused += 1;
            }
            Fetched::Frame(frame) => {
                if frame.width != job.size.width || frame.height != job.size.height {
                    return Err(GapError::encode(format!(
                        "frame {nr}: got {}x{}, expected {}x{}",
                        frame.width, frame.height, job.size.width, job.size.height
                    )));
                }
                if frame.data.len() != job.size.pixels() * 3 {
                    return Err(GapError::encode(format!(
                        "frame {nr}: pixel buffer holds {} bytes, expected {}",
                        frame.data.len(),
                        job.size.pixels() * 3
                    )));
                }
                let chunks = encoder
                    .encode(&frame)
                    .map_err(|e| GapError::encode(format!("frame {nr}: {e}")))?;
                write_video_chunks(avi, chunks, &mut stats)?;
                stats.frames_encoded += 1;
            }
        }
        stats.frames_total += 1;

        if let Some(feed) = audio.as_mut() {
            feed.on_video_frame(avi, &mut stats)?;
        }

        progress.report(nr, (pos as u64 + 1) as f64 / len as f64);
        if progress.is_cancelled() {
            tracing::warn!(frame = nr, "encode cancelled");
            stats.cancelled = true;
            break;
        }
    }

    finish_encoder(encoder.as_mut(), avi, &mut stats)?;
    if let Some(feed) = audio.as_mut() {
        if stats.cancelled {
            feed.write_residual(avi, &mut stats)?;
        } else {
            feed.drain(avi, &mut stats)?;
        }
    }
    Ok(stats)
}

fn finish_encoder<W: Write + Seek>(
    encoder: &mut dyn FrameEncoder,
    avi: &mut AviWriter<W>,
    stats: &mut EncodeStats,
) -> GapResult<()> {
    let tail = encoder
        .finish()
        .map_err(|e| GapError::encode(format!("flushing encoder: {e}")))?;
    write_video_chunks(avi, tail, stats)
}

fn write_video_chunks<W: Write + Seek>(
    avi: &mut AviWriter<W>,
    chunks: Vec<EncodedChunk>,
    stats: &mut EncodeStats,
) -> GapResult<()> {
    for chunk in chunks {
        if chunk.data.is_empty() {
            return Err(GapError::codec("encoder produced an empty chunk"));
        }
        avi.write_video(&chunk.data, chunk.keyframe)?;
        stats.video_chunks += 1;
    }
    Ok(())
}

struct AudioFeed {
    cursor: WavDataCursor,
    interleaver: AudioInterleaver,
}

impl AudioFeed {
    fn open<W: Write + Seek>(
        path: &std::path::Path,
        job: &AviEncodeJob,
        avi: &mut AviWriter<W>,
    ) -> GapResult<Self> {
        let cursor = WavDataCursor::open(path)?;
        let info = *cursor.info();
        info.require_pcm16()?;
        avi.set_audio(AviAudioFormat {
            format_tag: FORMAT_PCM,
            channels: info.channels,
            sample_rate: info.sample_rate,
            bits_per_sample: info.bits_per_sample,
        })?;
        let interleaver = AudioInterleaver::new(
            info.bytes_per_second(),
            info.bytes_per_sample,
            job.fps,
            job.params.audio_margin,
        )?;
        tracing::debug!(
            path = %path.display(),
            rate = info.sample_rate,
            channels = info.channels,
            data_len = info.data_len,
            per_frame_x100 = interleaver.audio_per_frame_x100(),
            "audio track attached"
        );
        Ok(Self {
            cursor,
            interleaver,
        })
    }

    fn on_video_frame<W: Write + Seek>(
        &mut self,
        avi: &mut AviWriter<W>,
        stats: &mut EncodeStats,
    ) -> GapResult<()> {
        let margin = self.interleaver.margin();
        for _ in 0..self.interleaver.on_video_frame() {
            self.write(avi, margin, stats)?;
        }
        Ok(())
    }

    fn write_residual<W: Write + Seek>(
        &mut self,
        avi: &mut AviWriter<W>,
        stats: &mut EncodeStats,
    ) -> GapResult<()> {
        let n = self.interleaver.take_residual();
        if n > 0 {
            self.write(avi, n, stats)?;
        }
        Ok(())
    }

    // Append the rest of the WAV data in margin-sized chunks, the last one possibly shorter.
    fn drain<W: Write + Seek>(
        &mut self,
        avi: &mut AviWriter<W>,
        stats: &mut EncodeStats,
    ) -> GapResult<()> {
        let margin = self.interleaver.margin();
        while self.write(avi, margin, stats)? > 0 {}
        Ok(())
    }

    // Past the end of the WAV data nothing is written.
    fn write<W: Write + Seek>(
        &mut self,
        avi: &mut AviWriter<W>,
        n: usize,
        stats: &mut EncodeStats,
    ) -> GapResult<usize> {
        let data = self.cursor.read_chunk(n)?;
        if data.is_empty() {
            return Ok(0);
        }
        avi.write_audio(&data)?;
        stats.audio_chunks += 1;
        stats.audio_bytes += data.len() as u64;
        Ok(data.len())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/avi_encode.rs"]
mod tests;
