use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;

use crate::encode::codec::{EncodedChunk, FrameEncoder};
use crate::encode::raw::{RgbFrame, to_yuv420};
use crate::foundation::core::{Fps, VideoSize};
use crate::foundation::error::{GapError, GapResult};

/// MPEG-4 ASP (XVID) encoder settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct XvidParams {
    /// Target bitrate in kbit/s; 0 selects constant quantizer `min_quantizer`.
    pub bitrate_kbps: u32,
    /// Lowest quantizer (best quality), 1..=31.
    pub min_quantizer: u8,
    /// Highest quantizer, 1..=31.
    pub max_quantizer: u8,
    /// Maximum distance between keyframes.
    pub keyframe_interval: u32,
}

impl Default for XvidParams {
    fn default() -> Self {
        Self {
            bitrate_kbps: 900,
            min_quantizer: 2,
            max_quantizer: 31,
            keyframe_interval: 300,
        }
    }
}

impl XvidParams {
    /// Check quantizer bounds and keyframe interval.
    pub fn validate(&self) -> GapResult<()> {
        let q = 1..=31;
        if !q.contains(&self.min_quantizer) || !q.contains(&self.max_quantizer) {
            return Err(GapError::validation("xvid quantizers must be within 1..=31"));
        }
        if self.min_quantizer > self.max_quantizer {
            return Err(GapError::validation(
                "xvid min_quantizer must be <= max_quantizer",
            ));
        }
        if self.keyframe_interval == 0 {
            return Err(GapError::validation("xvid keyframe_interval must be > 0"));
        }
        Ok(())
    }
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// XVID encoder backed by the system `ffmpeg` (`mpeg4` encoder, `XVID` tag).
///
/// Frames go in on stdin as YUV 4:2:0; a reader thread splits the elementary stream on stdout
/// into per-picture chunks. Output lags input, so [`FrameEncoder::encode`] returns whatever
/// pictures are ready and [`FrameEncoder::finish`] returns the rest.
pub struct XvidEncoder {
    size: VideoSize,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    chunks: mpsc::Receiver<EncodedChunk>,
    stdout_split: Option<std::thread::JoinHandle<std::io::Result<()>>>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl XvidEncoder {
    /// Spawn the encoder process.
    pub fn new(size: VideoSize, fps: Fps, params: &XvidParams) -> GapResult<Self> {
        params.validate()?;
        if !size.width.is_multiple_of(2) || !size.height.is_multiple_of(2) {
            return Err(GapError::validation(
                "xvid width/height must be even (yuv420 input)",
            ));
        }
        if !is_ffmpeg_on_path() {
            return Err(GapError::codec(
                "ffmpeg is required for XVID encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "yuv420p",
            "-s",
            &format!("{}x{}", size.width, size.height),
            "-r",
            &format!("{}/{}", fps.num, fps.den),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "mpeg4",
            "-vtag",
            "XVID",
            "-bf",
            "0",
            "-g",
            &params.keyframe_interval.to_string(),
            "-qmin",
            &params.min_quantizer.to_string(),
            "-qmax",
            &params.max_quantizer.to_string(),
        ]);
        if params.bitrate_kbps == 0 {
            cmd.args(["-q:v", &params.min_quantizer.to_string()]);
        } else {
            cmd.args(["-b:v", &format!("{}k", params.bitrate_kbps)]);
        }
        cmd.args(["-flush_packets", "1", "-f", "m4v", "pipe:1"]);

        let mut child = cmd
            .spawn()
            .map_err(|e| GapError::codec(format!("failed to spawn ffmpeg: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GapError::codec("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| GapError::codec("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| GapError::codec("failed to open ffmpeg stderr (unexpected)"))?;

        let (tx, rx) = mpsc::channel();
        let stdout_split = std::thread::spawn(move || -> std::io::Result<()> {
            let mut splitter = VopSplitter::default();
            let mut buf = vec![0u8; 64 * 1024];
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                for chunk in splitter.push(&buf[..n]) {
                    // receiver gone means the encoder was dropped; keep draining the pipe
                    let _ = tx.send(chunk);
                }
            }
            if let Some(chunk) = splitter.finish() {
                let _ = tx.send(chunk);
            }
            Ok(())
        });
        let stderr_drain = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
            let mut out = Vec::new();
            stderr.read_to_end(&mut out)?;
            Ok(out)
        });

        tracing::debug!(
            width = size.width,
            height = size.height,
            bitrate_kbps = params.bitrate_kbps,
            "xvid encoder started"
        );

        Ok(Self {
            size,
            child: Some(child),
            stdin: Some(stdin),
            chunks: rx,
            stdout_split: Some(stdout_split),
            stderr_drain: Some(stderr_drain),
        })
    }

    fn ready_chunks(&self) -> Vec<EncodedChunk> {
        self.chunks.try_iter().collect()
    }
}

impl FrameEncoder for XvidEncoder {
    fn encode(&mut self, frame: &RgbFrame) -> GapResult<Vec<EncodedChunk>> {
        if frame.width != self.size.width || frame.height != self.size.height {
            return Err(GapError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.size.width, self.size.height
            )));
        }
        let yuv = to_yuv420(frame, false, &[])?;
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(GapError::codec("xvid encoder is already finished"));
        };
        stdin
            .write_all(&yuv)
            .map_err(|e| GapError::codec(format!("failed to write frame to ffmpeg stdin: {e}")))?;
        Ok(self.ready_chunks())
    }

    fn finish(&mut self) -> GapResult<Vec<EncodedChunk>> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| GapError::codec("xvid encoder is already finished"))?;

        let status = child
            .wait()
            .map_err(|e| GapError::codec(format!("failed to wait for ffmpeg to finish: {e}")))?;
        if let Some(handle) = self.stdout_split.take() {
            handle
                .join()
                .map_err(|_| GapError::codec("ffmpeg stdout reader thread panicked"))?
                .map_err(|e| GapError::codec(format!("ffmpeg stdout read failed: {e}")))?;
        }
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| GapError::codec("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| GapError::codec(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(GapError::codec(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(self.ready_chunks())
    }
}

impl Drop for XvidEncoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

const VOP_START: u8 = 0xB6;

/// Splits an MPEG-4 part 2 elementary stream into one chunk per coded picture.
///
/// Header start codes (VOS, VO, VOL, GOV) are kept with the picture that follows them. A picture
/// is a keyframe when its `vop_coding_type` is I.
#[derive(Debug, Default)]
pub struct VopSplitter {
    buf: Vec<u8>,
    scan: usize,
    unit_has_vop: bool,
    unit_keyframe: bool,
}

impl VopSplitter {
    /// Feed more stream bytes, returning every picture completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<EncodedChunk> {
        self.buf.extend_from_slice(bytes);
        let mut out = Vec::new();
        let mut unit_start = 0usize;

        while self.scan + 4 < self.buf.len() {
            let p = self.scan;
            if self.buf[p] != 0 || self.buf[p + 1] != 0 || self.buf[p + 2] != 1 {
                self.scan += 1;
                continue;
            }
            if self.unit_has_vop {
                out.push(EncodedChunk {
                    data: self.buf[unit_start..p].to_vec(),
                    keyframe: self.unit_keyframe,
                });
                unit_start = p;
                self.unit_has_vop = false;
            }
            if self.buf[p + 3] == VOP_START {
                self.unit_has_vop = true;
                self.unit_keyframe = self.buf[p + 4] >> 6 == 0;
            }
            self.scan += 4;
        }

        if unit_start > 0 {
            self.buf.drain(..unit_start);
            self.scan -= unit_start;
        }
        out
    }

    /// Flush the last picture at end of stream.
    pub fn finish(&mut self) -> Option<EncodedChunk> {
        if !self.unit_has_vop || self.buf.is_empty() {
            return None;
        }
        self.unit_has_vop = false;
        self.scan = 0;
        Some(EncodedChunk {
            data: std::mem::take(&mut self.buf),
            keyframe: self.unit_keyframe,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/xvid.rs"]
mod tests;
