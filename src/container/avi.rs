use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::foundation::core::{Fps, VideoSize};
use crate::foundation::error::{GapError, GapResult};
use crate::util::file::ensure_parent_dir;

const AVIF_HASINDEX: u32 = 0x10;
const AVIF_ISINTERLEAVED: u32 = 0x100;
const AVIIF_KEYFRAME: u32 = 0x10;

const VIDEO_CHUNK_ID: [u8; 4] = *b"00dc";
const AUDIO_CHUNK_ID: [u8; 4] = *b"01wb";

// movi starts on this boundary; the gap is filled with a JUNK chunk.
const HEADER_ALIGN: u64 = 2048;

/// Audio stream declared in an AVI file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AviAudioFormat {
    /// WAVE format tag (1 = PCM).
    pub format_tag: u16,
    /// Channel count.
    pub channels: u16,
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bits_per_sample: u16,
}

impl AviAudioFormat {
    /// Bytes per sample frame across all channels.
    pub fn block_align(&self) -> GapResult<u16> {
        self.channels
            .checked_mul(self.bits_per_sample.div_ceil(8))
            .ok_or_else(|| {
                GapError::validation(format!(
                    "audio block size overflows: {} channels of {} bits",
                    self.channels, self.bits_per_sample
                ))
            })
    }

    /// Average byte rate.
    pub fn bytes_per_second(&self) -> GapResult<u32> {
        let align = self.block_align()?;
        self.sample_rate
            .checked_mul(u32::from(align))
            .ok_or_else(|| {
                GapError::validation(format!(
                    "audio byte rate overflows: {} Hz with {align} byte blocks",
                    self.sample_rate
                ))
            })
    }
}

#[derive(Clone, Copy, Debug)]
struct AudioStream {
    format: AviAudioFormat,
    block_align: u16,
    byte_rate: u32,
}

#[derive(Clone, Copy, Debug, Default)]
struct PatchPoints {
    total_frames: u64,
    avih_buffer: u64,
    video_length: u64,
    video_buffer: u64,
    audio_length: Option<u64>,
    audio_buffer: Option<u64>,
    movi: u64,
}

#[derive(Clone, Copy, Debug)]
struct IndexEntry {
    id: [u8; 4],
    flags: u32,
    offset: u32,
    size: u32,
}

/// Streaming AVI 1.0 writer: one video stream, at most one PCM audio stream, `idx1` index.
///
/// The header is written with the first chunk; sizes, frame counts and stream lengths are
/// patched in by [`AviWriter::finish`].
pub struct AviWriter<W: Write + Seek> {
    out: W,
    size: VideoSize,
    fps: Fps,
    fourcc: [u8; 4],
    compression: [u8; 4],
    bit_count: u16,
    audio: Option<AudioStream>,
    base: u64,
    patch: Option<PatchPoints>,
    index: Vec<IndexEntry>,
    video_frames: u32,
    audio_chunks: u32,
    audio_bytes: u64,
    max_video_chunk: u32,
    max_audio_chunk: u32,
    finished: bool,
}

impl AviWriter<BufWriter<File>> {
    /// Create (truncate) `path` and write into it.
    pub fn create(
        path: &Path,
        size: VideoSize,
        fps: Fps,
        fourcc: [u8; 4],
        compression: [u8; 4],
        bit_count: u16,
    ) -> GapResult<Self> {
        ensure_parent_dir(path)?;
        let file = File::create(path)
            .map_err(|e| GapError::io(format!("create '{}': {e}", path.display())))?;
        Self::new(BufWriter::new(file), size, fps, fourcc, compression, bit_count)
    }
}

impl<W: Write + Seek> AviWriter<W> {
    /// Start an AVI at the current position of `out`.
    pub fn new(
        mut out: W,
        size: VideoSize,
        fps: Fps,
        fourcc: [u8; 4],
        compression: [u8; 4],
        bit_count: u16,
    ) -> GapResult<Self> {
        let base = out.stream_position().map_err(io_err)?;
        Ok(Self {
            out,
            size,
            fps,
            fourcc,
            compression,
            bit_count,
            audio: None,
            base,
            patch: None,
            index: Vec::new(),
            video_frames: 0,
            audio_chunks: 0,
            audio_bytes: 0,
            max_video_chunk: 0,
            max_audio_chunk: 0,
            finished: false,
        })
    }

    /// Declare the audio stream. Must happen before the first chunk is written.
    pub fn set_audio(&mut self, format: AviAudioFormat) -> GapResult<()> {
        if self.patch.is_some() {
            return Err(GapError::validation(
                "audio stream must be declared before the first chunk",
            ));
        }
        if format.channels == 0 || format.sample_rate == 0 || format.bits_per_sample == 0 {
            return Err(GapError::validation(
                "audio channels, rate and bits must be non-zero",
            ));
        }
        self.audio = Some(AudioStream {
            format,
            block_align: format.block_align()?,
            byte_rate: format.bytes_per_second()?,
        });
        Ok(())
    }

    /// Append one video chunk.
    pub fn write_video(&mut self, data: &[u8], keyframe: bool) -> GapResult<()> {
        let len = self.write_chunk(VIDEO_CHUNK_ID, data, keyframe)?;
        self.video_frames += 1;
        self.max_video_chunk = self.max_video_chunk.max(len);
        Ok(())
    }

    /// Append one audio chunk.
    pub fn write_audio(&mut self, data: &[u8]) -> GapResult<()> {
        if self.audio.is_none() {
            return Err(GapError::validation("no audio stream declared"));
        }
        let len = self.write_chunk(AUDIO_CHUNK_ID, data, true)?;
        self.audio_chunks += 1;
        self.audio_bytes += u64::from(len);
        self.max_audio_chunk = self.max_audio_chunk.max(len);
        Ok(())
    }

    /// Video chunks written so far.
    pub fn video_frames(&self) -> u32 {
        self.video_frames
    }

    /// Audio chunks written so far.
    pub fn audio_chunks(&self) -> u32 {
        self.audio_chunks
    }

    /// Audio payload bytes written so far.
    pub fn audio_bytes(&self) -> u64 {
        self.audio_bytes
    }

    /// Return `true` once [`AviWriter::finish`] has completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Write the index and patch every deferred header field. Calling it twice is a no-op.
    pub fn finish(&mut self) -> GapResult<()> {
        if self.finished {
            return Ok(());
        }
        let patch = self.ensure_header()?;

        let movi_end = self.out.stream_position().map_err(io_err)?;
        self.put_u32_at(patch.movi + 4, size_u32(movi_end - patch.movi - 8)?)?;
        self.out.seek(SeekFrom::Start(movi_end)).map_err(io_err)?;

        let mut idx = Vec::with_capacity(8 + self.index.len() * 16);
        idx.extend_from_slice(b"idx1");
        put_u32(&mut idx, size_u32(self.index.len() as u64 * 16)?);
        for e in &self.index {
            idx.extend_from_slice(&e.id);
            put_u32(&mut idx, e.flags);
            put_u32(&mut idx, e.offset);
            put_u32(&mut idx, e.size);
        }
        self.out.write_all(&idx).map_err(io_err)?;

        let end = self.out.stream_position().map_err(io_err)?;
        self.put_u32_at(self.base + 4, size_u32(end - self.base - 8)?)?;
        self.put_u32_at(patch.total_frames, self.video_frames)?;
        self.put_u32_at(
            patch.avih_buffer,
            self.max_video_chunk.max(self.max_audio_chunk),
        )?;
        self.put_u32_at(patch.video_length, self.video_frames)?;
        self.put_u32_at(patch.video_buffer, self.max_video_chunk)?;
        if let (Some(len_at), Some(buf_at), Some(audio)) =
            (patch.audio_length, patch.audio_buffer, self.audio)
        {
            let blocks = self.audio_bytes / u64::from(audio.block_align.max(1));
            self.put_u32_at(len_at, size_u32(blocks)?)?;
            self.put_u32_at(buf_at, self.max_audio_chunk)?;
        }
        self.out.seek(SeekFrom::Start(end)).map_err(io_err)?;
        self.out.flush().map_err(io_err)?;

        self.finished = true;
        tracing::debug!(
            video_frames = self.video_frames,
            audio_chunks = self.audio_chunks,
            bytes = end - self.base,
            "avi finished"
        );
        Ok(())
    }

    /// Finish (if needed) and hand back the underlying writer.
    pub fn into_inner(mut self) -> GapResult<W> {
        self.finish()?;
        Ok(self.out)
    }

    fn write_chunk(&mut self, id: [u8; 4], data: &[u8], keyframe: bool) -> GapResult<u32> {
        if self.finished {
            return Err(GapError::encode("avi file is already finished"));
        }
        let patch = self.ensure_header()?;
        let len = size_u32(data.len() as u64)?;
        let pos = self.out.stream_position().map_err(io_err)?;

        self.out.write_all(&id).map_err(io_err)?;
        self.out.write_all(&len.to_le_bytes()).map_err(io_err)?;
        self.out.write_all(data).map_err(io_err)?;
        if data.len() % 2 == 1 {
            self.out.write_all(&[0]).map_err(io_err)?;
        }

        self.index.push(IndexEntry {
            id,
            flags: if keyframe { AVIIF_KEYFRAME } else { 0 },
            offset: size_u32(pos - patch.movi - 8)?,
            size: len,
        });
        Ok(len)
    }

    fn ensure_header(&mut self) -> GapResult<PatchPoints> {
        if let Some(p) = self.patch {
            return Ok(p);
        }
        let (bytes, mut p) = self.build_header();
        self.out.write_all(&bytes).map_err(io_err)?;
        p.total_frames += self.base;
        p.avih_buffer += self.base;
        p.video_length += self.base;
        p.video_buffer += self.base;
        p.audio_length = p.audio_length.map(|o| o + self.base);
        p.audio_buffer = p.audio_buffer.map(|o| o + self.base);
        p.movi += self.base;
        self.patch = Some(p);
        Ok(p)
    }

    // Header bytes up to and including the `movi` list header, with offsets relative to the
    // start of the RIFF.
    fn build_header(&self) -> (Vec<u8>, PatchPoints) {
        let mut p = PatchPoints::default();
        let mut b = Vec::with_capacity(HEADER_ALIGN as usize);
        let streams = if self.audio.is_some() { 2 } else { 1 };
        let w = self.size.width;
        let h = self.size.height;

        b.extend_from_slice(b"RIFF");
        put_u32(&mut b, 0);
        b.extend_from_slice(b"AVI ");

        let hdrl = open_list(&mut b, b"hdrl");

        b.extend_from_slice(b"avih");
        put_u32(&mut b, 56);
        put_u32(&mut b, self.fps.micros_per_frame());
        let audio_rate = self.audio.map_or(0, |a| a.byte_rate);
        let frame_bytes = w.saturating_mul(h).saturating_mul(3);
        put_u32(
            &mut b,
            frame_bytes
                .saturating_mul(self.fps.num.div_ceil(self.fps.den))
                .saturating_add(audio_rate),
        );
        put_u32(&mut b, 0);
        put_u32(&mut b, AVIF_HASINDEX | AVIF_ISINTERLEAVED);
        p.total_frames = b.len() as u64;
        put_u32(&mut b, 0);
        put_u32(&mut b, 0);
        put_u32(&mut b, streams);
        p.avih_buffer = b.len() as u64;
        put_u32(&mut b, 0);
        put_u32(&mut b, w);
        put_u32(&mut b, h);
        b.extend_from_slice(&[0; 16]);

        let strl = open_list(&mut b, b"strl");
        b.extend_from_slice(b"strh");
        put_u32(&mut b, 56);
        b.extend_from_slice(b"vids");
        b.extend_from_slice(&self.fourcc);
        put_u32(&mut b, 0);
        put_u16(&mut b, 0);
        put_u16(&mut b, 0);
        put_u32(&mut b, 0);
        put_u32(&mut b, self.fps.den);
        put_u32(&mut b, self.fps.num);
        put_u32(&mut b, 0);
        p.video_length = b.len() as u64;
        put_u32(&mut b, 0);
        p.video_buffer = b.len() as u64;
        put_u32(&mut b, 0);
        put_u32(&mut b, u32::MAX);
        put_u32(&mut b, 0);
        put_u16(&mut b, 0);
        put_u16(&mut b, 0);
        put_u16(&mut b, w.min(u32::from(u16::MAX)) as u16);
        put_u16(&mut b, h.min(u32::from(u16::MAX)) as u16);

        b.extend_from_slice(b"strf");
        put_u32(&mut b, 40);
        put_u32(&mut b, 40);
        put_u32(&mut b, w);
        put_u32(&mut b, h);
        put_u16(&mut b, 1);
        put_u16(&mut b, self.bit_count);
        b.extend_from_slice(&self.compression);
        put_u32(&mut b, frame_bytes);
        put_u32(&mut b, 0);
        put_u32(&mut b, 0);
        put_u32(&mut b, 0);
        put_u32(&mut b, 0);
        close_list(&mut b, strl);

        if let Some(a) = self.audio {
            let strl = open_list(&mut b, b"strl");
            b.extend_from_slice(b"strh");
            put_u32(&mut b, 56);
            b.extend_from_slice(b"auds");
            b.extend_from_slice(&[0; 4]);
            put_u32(&mut b, 0);
            put_u16(&mut b, 0);
            put_u16(&mut b, 0);
            put_u32(&mut b, 0);
            put_u32(&mut b, u32::from(a.block_align));
            put_u32(&mut b, a.byte_rate);
            put_u32(&mut b, 0);
            p.audio_length = Some(b.len() as u64);
            put_u32(&mut b, 0);
            p.audio_buffer = Some(b.len() as u64);
            put_u32(&mut b, 0);
            put_u32(&mut b, u32::MAX);
            put_u32(&mut b, u32::from(a.block_align));
            b.extend_from_slice(&[0; 8]);

            b.extend_from_slice(b"strf");
            put_u32(&mut b, 16);
            put_u16(&mut b, a.format.format_tag);
            put_u16(&mut b, a.format.channels);
            put_u32(&mut b, a.format.sample_rate);
            put_u32(&mut b, a.byte_rate);
            put_u16(&mut b, a.block_align);
            put_u16(&mut b, a.format.bits_per_sample);
            close_list(&mut b, strl);
        }
        close_list(&mut b, hdrl);

        let used = b.len() as u64 + 8;
        let target = used.div_ceil(HEADER_ALIGN) * HEADER_ALIGN;
        b.extend_from_slice(b"JUNK");
        put_u32(&mut b, (target - used) as u32);
        b.resize(target as usize, 0);

        p.movi = b.len() as u64;
        b.extend_from_slice(b"LIST");
        put_u32(&mut b, 0);
        b.extend_from_slice(b"movi");
        (b, p)
    }

    fn put_u32_at(&mut self, at: u64, value: u32) -> GapResult<()> {
        self.out.seek(SeekFrom::Start(at)).map_err(io_err)?;
        self.out.write_all(&value.to_le_bytes()).map_err(io_err)
    }
}

fn io_err(e: std::io::Error) -> GapError {
    GapError::io(format!("avi write failed: {e}"))
}

fn size_u32(v: u64) -> GapResult<u32> {
    u32::try_from(v).map_err(|_| GapError::encode("avi file exceeds the 4 GiB RIFF limit"))
}

fn put_u32(b: &mut Vec<u8>, v: u32) {
    b.extend_from_slice(&v.to_le_bytes());
}

fn put_u16(b: &mut Vec<u8>, v: u16) {
    b.extend_from_slice(&v.to_le_bytes());
}

fn open_list(b: &mut Vec<u8>, kind: &[u8; 4]) -> usize {
    let start = b.len();
    b.extend_from_slice(b"LIST");
    put_u32(b, 0);
    b.extend_from_slice(kind);
    start
}

fn close_list(b: &mut Vec<u8>, start: usize) {
    let size = (b.len() - start - 8) as u32;
    b[start + 4..start + 8].copy_from_slice(&size.to_le_bytes());
}

/// What [`read_avi_summary`] finds in an AVI file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AviSummary {
    /// Frame duration from the main header.
    pub micros_per_frame: u32,
    /// Total frames from the main header.
    pub total_frames: u32,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Video stream handler FourCC.
    pub video_fourcc: [u8; 4],
    /// Video stream rate / scale.
    pub video_rate: (u32, u32),
    /// Declared audio stream, if any.
    pub audio: Option<AviAudioFormat>,
    /// Payload size of each video chunk, in file order.
    pub video_chunks: Vec<u32>,
    /// Payload size of each audio chunk, in file order.
    pub audio_chunks: Vec<u32>,
    /// Keyframe flag of each video chunk from `idx1` (empty without an index).
    pub keyframes: Vec<bool>,
}

impl AviSummary {
    /// Sum of audio chunk payloads.
    pub fn audio_bytes(&self) -> u64 {
        self.audio_chunks.iter().map(|&n| u64::from(n)).sum()
    }

    /// Video handler as text.
    pub fn video_fourcc_str(&self) -> String {
        String::from_utf8_lossy(&self.video_fourcc).into_owned()
    }
}

/// Walk the RIFF structure of an AVI file held in memory.
pub fn read_avi_summary(bytes: &[u8]) -> GapResult<AviSummary> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"AVI " {
        return Err(GapError::format("not a RIFF AVI file"));
    }
    let riff_len = le_u32(bytes, 4)? as usize;
    let body = bytes
        .get(12..(8 + riff_len).min(bytes.len()))
        .ok_or_else(|| GapError::format("truncated RIFF header"))?;

    let mut summary = AviSummary::default();
    for chunk in Chunks::new(body) {
        let (id, data) = chunk?;
        match (&id, list_kind(&id, data)) {
            (b"LIST", Some(b"hdrl")) => read_hdrl(&data[4..], &mut summary)?,
            (b"LIST", Some(b"movi")) => read_movi(&data[4..], &mut summary)?,
            (b"idx1", _) => {
                summary.keyframes = data
                    .chunks_exact(16)
                    .filter(|e| e[0..4] == VIDEO_CHUNK_ID)
                    .map(|e| le_u32(e, 4).map(|f| f & AVIIF_KEYFRAME != 0))
                    .collect::<GapResult<_>>()?;
            }
            _ => {}
        }
    }
    Ok(summary)
}

fn read_hdrl(data: &[u8], s: &mut AviSummary) -> GapResult<()> {
    for chunk in Chunks::new(data) {
        let (id, body) = chunk?;
        match (&id, list_kind(&id, body)) {
            (b"avih", _) => {
                s.micros_per_frame = le_u32(body, 0)?;
                s.total_frames = le_u32(body, 16)?;
                s.width = le_u32(body, 32)?;
                s.height = le_u32(body, 36)?;
            }
            (b"LIST", Some(b"strl")) => read_strl(&body[4..], s)?,
            _ => {}
        }
    }
    Ok(())
}

fn read_strl(data: &[u8], s: &mut AviSummary) -> GapResult<()> {
    let mut kind = [0u8; 4];
    for chunk in Chunks::new(data) {
        let (id, body) = chunk?;
        match &id {
            b"strh" => {
                kind = fourcc_at(body, 0)?;
                if &kind == b"vids" {
                    s.video_fourcc = fourcc_at(body, 4)?;
                    s.video_rate = (le_u32(body, 24)?, le_u32(body, 20)?);
                }
            }
            b"strf" if &kind == b"auds" => {
                s.audio = Some(AviAudioFormat {
                    format_tag: le_u16(body, 0)?,
                    channels: le_u16(body, 2)?,
                    sample_rate: le_u32(body, 4)?,
                    bits_per_sample: le_u16(body, 14)?,
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn read_movi(data: &[u8], s: &mut AviSummary) -> GapResult<()> {
    for chunk in Chunks::new(data) {
        let (id, body) = chunk?;
        if &id == b"LIST" {
            // `rec ` groups
            if body.len() >= 4 {
                read_movi(&body[4..], s)?;
            }
            continue;
        }
        let len = size_u32(body.len() as u64)?;
        match &id[2..4] {
            b"dc" | b"db" => s.video_chunks.push(len),
            b"wb" => s.audio_chunks.push(len),
            _ => {}
        }
    }
    Ok(())
}

fn list_kind<'a>(id: &[u8; 4], data: &'a [u8]) -> Option<&'a [u8; 4]> {
    if id != b"LIST" {
        return None;
    }
    data.get(0..4).and_then(|k| k.try_into().ok())
}

struct Chunks<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Chunks<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = GapResult<([u8; 4], &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos + 8 > self.data.len() {
            return None;
        }
        match chunk_at(self.data, self.pos) {
            Ok((id, body, next)) => {
                self.pos = next;
                Some(Ok((id, body)))
            }
            Err(e) => {
                self.pos = self.data.len();
                Some(Err(e))
            }
        }
    }
}

// Returns id, body and the offset of the following chunk (bodies are padded to even size).
fn chunk_at(data: &[u8], pos: usize) -> GapResult<([u8; 4], &[u8], usize)> {
    let id = fourcc_at(data, pos)?;
    let len = le_u32(data, pos + 4)? as usize;
    let start = pos + 8;
    let body = data.get(start..start + len).ok_or_else(|| {
        GapError::format(format!(
            "chunk '{}' at offset {pos} overruns its parent",
            String::from_utf8_lossy(&id)
        ))
    })?;
    Ok((id, body, start + len + (len & 1)))
}

fn fourcc_at(b: &[u8], at: usize) -> GapResult<[u8; 4]> {
    b.get(at..at + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| GapError::format("truncated avi chunk"))
}

fn le_u32(b: &[u8], at: usize) -> GapResult<u32> {
    fourcc_at(b, at).map(u32::from_le_bytes)
}

fn le_u16(b: &[u8], at: usize) -> GapResult<u16> {
    b.get(at..at + 2)
        .map(|s| u16::from_le_bytes([s[0], s[1]]))
        .ok_or_else(|| GapError::format("truncated avi chunk"))
}

#[cfg(test)]
#[path = "../../tests/unit/container/avi.rs"]
mod tests;
