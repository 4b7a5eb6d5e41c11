use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::foundation::error::{GapError, GapResult};
use crate::util::file::ensure_parent_dir;

/// Smallest file accepted as a WAV: canonical 44-byte header plus one data word.
pub const WAV_MIN_FILE_SIZE: u64 = 48;

/// Size of the canonical header written by [`write_wav_header`].
pub const WAV_HEADER_SIZE: usize = 44;

/// `WAVE_FORMAT_PCM`.
pub const FORMAT_PCM: u16 = 1;
/// `WAVE_FORMAT_EXTENSIBLE`.
pub const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Header facts of a RIFF WAVE file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavInfo {
    /// Format tag from the `fmt ` chunk.
    pub format_tag: u16,
    /// Channel count.
    pub channels: u16,
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Bytes per sample frame (all channels), a.k.a. block align.
    pub bytes_per_sample: u16,
    /// Bits per single-channel sample.
    pub bits_per_sample: u16,
    /// Absolute file offset of the first data byte.
    pub data_offset: u64,
    /// Data bytes actually available in the file.
    pub data_len: u64,
    /// Total file length.
    pub file_len: u64,
}

impl WavInfo {
    /// Number of sample frames in the data segment.
    pub fn sample_count(&self) -> u64 {
        if self.bytes_per_sample == 0 {
            return 0;
        }
        self.data_len / u64::from(self.bytes_per_sample)
    }

    /// Audio byte rate.
    pub fn bytes_per_second(&self) -> u64 {
        u64::from(self.sample_rate) * u64::from(self.bytes_per_sample)
    }

    /// Playback duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count() as f64 / f64::from(self.sample_rate)
    }

    /// Fail unless this is 16-bit integer PCM.
    pub fn require_pcm16(&self) -> GapResult<()> {
        let pcm = matches!(self.format_tag, FORMAT_PCM | FORMAT_EXTENSIBLE);
        if !pcm || self.bits_per_sample != 16 {
            return Err(GapError::validation(format!(
                "audio must be 16-bit PCM (format tag {}, {} bits)",
                self.format_tag, self.bits_per_sample
            )));
        }
        if self.channels == 0 || self.sample_rate == 0 {
            return Err(GapError::validation(
                "audio must have at least one channel and a non-zero sample rate",
            ));
        }
        if self.channels.checked_mul(2) != Some(self.bytes_per_sample) {
            return Err(GapError::validation(format!(
                "audio block align {} does not match {} channels of 16 bits",
                self.bytes_per_sample, self.channels
            )));
        }
        if self
            .sample_rate
            .checked_mul(u32::from(self.bytes_per_sample))
            .is_none()
        {
            return Err(GapError::validation(format!(
                "audio byte rate of {} Hz x {} bytes does not fit 32 bits",
                self.sample_rate, self.bytes_per_sample
            )));
        }
        Ok(())
    }
}

/// Read and validate the header of the WAV file at `path`.
///
/// Files shorter than [`WAV_MIN_FILE_SIZE`] are rejected before any header or sample data is
/// read.
pub fn read_wav_info(path: &Path) -> GapResult<WavInfo> {
    let file = File::open(path)
        .map_err(|e| GapError::io(format!("open wav '{}': {e}", path.display())))?;
    let file_len = file
        .metadata()
        .map_err(|e| GapError::io(format!("stat wav '{}': {e}", path.display())))?
        .len();
    if file_len < WAV_MIN_FILE_SIZE {
        return Err(GapError::format(format!(
            "'{}' is too short for a wav file ({file_len} bytes)",
            path.display()
        )));
    }
    parse_wav_header(&mut BufReader::new(file), file_len)
        .map_err(|e| annotate(e, path))
}

fn annotate(err: GapError, path: &Path) -> GapError {
    match err {
        GapError::Format(msg) => GapError::format(format!("'{}': {msg}", path.display())),
        GapError::Io(msg) => GapError::io(format!("'{}': {msg}", path.display())),
        other => other,
    }
}

/// Parse a RIFF WAVE header from `r`, which must be positioned at the start of the file.
///
/// Chunks other than `fmt ` and `data` are skipped; on success the reader is left positioned at
/// the first data byte.
pub fn parse_wav_header<R: Read + Seek>(r: &mut R, file_len: u64) -> GapResult<WavInfo> {
    if file_len < WAV_MIN_FILE_SIZE {
        return Err(GapError::format(format!(
            "too short for a wav file ({file_len} bytes)"
        )));
    }

    let mut riff = [0u8; 12];
    read_exact(r, &mut riff)?;
    if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
        return Err(GapError::format("missing RIFF/WAVE signature"));
    }

    let mut fmt: Option<[u8; 16]> = None;
    let mut pos = 12u64;
    loop {
        if pos + 8 > file_len {
            return Err(GapError::format("no data chunk found"));
        }
        let mut hdr = [0u8; 8];
        read_exact(r, &mut hdr)?;
        pos += 8;
        let id = [hdr[0], hdr[1], hdr[2], hdr[3]];
        let size = u64::from(le_u32(&hdr[4..8]));

        match &id {
            b"fmt " => {
                if size < 16 {
                    return Err(GapError::format(format!("fmt chunk too small ({size} bytes)")));
                }
                let mut body = [0u8; 16];
                read_exact(r, &mut body)?;
                fmt = Some(body);
                let rest = padded(size) - 16;
                skip(r, rest)?;
                pos += padded(size);
            }
            b"data" => {
                let body = fmt.ok_or_else(|| GapError::format("data chunk precedes fmt chunk"))?;
                let available = file_len.saturating_sub(pos);
                let data_len = size.min(available);
                return Ok(WavInfo {
                    format_tag: le_u16(&body[0..2]),
                    channels: le_u16(&body[2..4]),
                    sample_rate: le_u32(&body[4..8]),
                    bytes_per_sample: le_u16(&body[12..14]),
                    bits_per_sample: le_u16(&body[14..16]),
                    data_offset: pos,
                    data_len,
                    file_len,
                });
            }
            _ => {
                skip(r, padded(size))?;
                pos += padded(size);
            }
        }
    }
}

/// Write the canonical 44-byte PCM header.
pub fn write_wav_header<W: Write>(
    w: &mut W,
    sample_rate: u32,
    channels: u16,
    bytes_per_sample: u16,
    bits_per_sample: u16,
    data_len: u32,
) -> GapResult<()> {
    let mut hdr = Vec::<u8>::with_capacity(WAV_HEADER_SIZE);
    hdr.extend_from_slice(b"RIFF");
    hdr.extend_from_slice(&data_len.saturating_add(36).to_le_bytes());
    hdr.extend_from_slice(b"WAVEfmt ");
    hdr.extend_from_slice(&16u32.to_le_bytes());
    hdr.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    hdr.extend_from_slice(&channels.to_le_bytes());
    hdr.extend_from_slice(&sample_rate.to_le_bytes());
    let byte_rate = sample_rate.saturating_mul(u32::from(bytes_per_sample));
    hdr.extend_from_slice(&byte_rate.to_le_bytes());
    hdr.extend_from_slice(&bytes_per_sample.to_le_bytes());
    hdr.extend_from_slice(&bits_per_sample.to_le_bytes());
    hdr.extend_from_slice(b"data");
    hdr.extend_from_slice(&data_len.to_le_bytes());

    w.write_all(&hdr)
        .map_err(|e| GapError::io(format!("failed to write wav header: {e}")))
}

/// Write a complete PCM WAV file (header followed by `pcm`).
pub fn write_wav_file(
    path: &Path,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    pcm: &[u8],
) -> GapResult<()> {
    if channels == 0 || bits_per_sample == 0 || !bits_per_sample.is_multiple_of(8) {
        return Err(GapError::validation(
            "wav channels must be > 0 and bits a non-zero multiple of 8",
        ));
    }
    let data_len = u32::try_from(pcm.len())
        .map_err(|_| GapError::validation("wav data exceeds 4 GiB"))?;
    let bytes_per_sample = channels * (bits_per_sample / 8);

    ensure_parent_dir(path)?;
    let file = File::create(path)
        .map_err(|e| GapError::io(format!("create wav '{}': {e}", path.display())))?;
    let mut w = BufWriter::new(file);
    write_wav_header(
        &mut w,
        sample_rate,
        channels,
        bytes_per_sample,
        bits_per_sample,
        data_len,
    )?;
    w.write_all(pcm)
        .and_then(|_| w.flush())
        .map_err(|e| GapError::io(format!("write wav '{}': {e}", path.display())))
}

/// Sequential byte cursor over the data segment of a WAV file.
pub struct WavDataCursor {
    info: WavInfo,
    reader: BufReader<File>,
    remaining: u64,
}

impl WavDataCursor {
    /// Open `path`, parse its header and position at the first data byte.
    pub fn open(path: &Path) -> GapResult<Self> {
        let info = read_wav_info(path)?;
        let file = File::open(path)
            .map_err(|e| GapError::io(format!("open wav '{}': {e}", path.display())))?;
        let mut reader = BufReader::new(file);
        reader
            .seek(SeekFrom::Start(info.data_offset))
            .map_err(|e| GapError::io(format!("seek wav '{}': {e}", path.display())))?;
        Ok(Self {
            info,
            reader,
            remaining: info.data_len,
        })
    }

    /// Header facts of the underlying file.
    pub fn info(&self) -> &WavInfo {
        &self.info
    }

    /// Data bytes not yet consumed.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Read up to `max` bytes; the result is shorter only at the end of the data.
    pub fn read_chunk(&mut self, max: usize) -> GapResult<Vec<u8>> {
        let n = (max as u64).min(self.remaining) as usize;
        let mut buf = vec![0u8; n];
        self.reader
            .read_exact(&mut buf)
            .map_err(|e| GapError::io(format!("failed to read wav data: {e}")))?;
        self.remaining -= n as u64;
        Ok(buf)
    }
}

fn padded(size: u64) -> u64 {
    size + (size & 1)
}

fn skip<R: Seek>(r: &mut R, n: u64) -> GapResult<()> {
    if n == 0 {
        return Ok(());
    }
    let n = i64::try_from(n).map_err(|_| GapError::format("chunk size out of range"))?;
    r.seek(SeekFrom::Current(n))
        .map(|_| ())
        .map_err(|e| GapError::io(format!("failed to skip wav chunk: {e}")))
}

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> GapResult<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => GapError::format("truncated wav header"),
        _ => GapError::io(format!("failed to read wav header: {e}")),
    })
}

fn le_u16(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[cfg(test)]
#[path = "../../tests/unit/audio/wav.rs"]
mod tests;
