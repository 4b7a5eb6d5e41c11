use rayon::prelude::*;

use crate::foundation::error::{GapError, GapResult};

/// Packed RGB8 pixels, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 3` bytes.
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// Wrap packed RGB8 bytes, checking the buffer length.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> GapResult<Self> {
        if width == 0 || height == 0 {
            return Err(GapError::validation("frame width/height must be non-zero"));
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(GapError::validation(format!(
                "frame buffer is {} bytes, expected {expected} for {width}x{height} rgb",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let n = width as usize * height as usize;
        let mut data = Vec::with_capacity(n * 3);
        for _ in 0..n {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Take the pixels of an `image` RGB buffer.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }

    /// Convert any decoded image (alpha is dropped).
    pub fn from_dynamic(img: &image::DynamicImage) -> Self {
        Self::from_rgb_image(img.to_rgb8())
    }

    /// Borrow as an `image` buffer view.
    pub fn to_rgb_image(&self) -> GapResult<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| GapError::validation("frame buffer does not match its dimensions"))
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * 3
    }

    fn src_row(&self, y: usize, flip: bool) -> &[u8] {
        let row = if flip {
            self.height as usize - 1 - y
        } else {
            y
        };
        let stride = self.row_bytes();
        &self.data[row * stride..(row + 1) * stride]
    }
}

/// Packed RGB, optionally flipped bottom-up, after `header`.
pub fn to_rgb(frame: &RgbFrame, flip: bool, header: &[u8]) -> Vec<u8> {
    packed(frame, flip, header, false)
}

/// Packed BGR (DIB pixel order), optionally flipped bottom-up, after `header`.
pub fn to_bgr(frame: &RgbFrame, flip: bool, header: &[u8]) -> Vec<u8> {
    packed(frame, flip, header, true)
}

fn packed(frame: &RgbFrame, flip: bool, header: &[u8], swap: bool) -> Vec<u8> {
    let stride = frame.row_bytes();
    let mut out = vec![0u8; header.len() + stride * frame.height as usize];
    out[..header.len()].copy_from_slice(header);

    out[header.len()..]
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, dst)| {
            let src = frame.src_row(y, flip);
            if swap {
                for (d, s) in dst.chunks_exact_mut(3).zip(src.chunks_exact(3)) {
                    d[0] = s[2];
                    d[1] = s[1];
                    d[2] = s[0];
                }
            } else {
                dst.copy_from_slice(src);
            }
        });
    out
}

const SCALEBITS: u32 = 16;
const ONE_HALF: i32 = 1 << (SCALEBITS - 1);

const fn fix(x: f64) -> i32 {
    (x * (1u32 << SCALEBITS) as f64 + 0.5) as i32
}

// BT.601 studio swing: Y in 16..=235, Cb/Cr in 16..=240.
const Y_R: i32 = fix(0.29900 * 219.0 / 255.0);
const Y_G: i32 = fix(0.58700 * 219.0 / 255.0);
const Y_B: i32 = fix(0.11400 * 219.0 / 255.0);
const U_R: i32 = fix(0.16874 * 224.0 / 255.0);
const U_G: i32 = fix(0.33126 * 224.0 / 255.0);
const UV_HALF: i32 = fix(0.50000 * 224.0 / 255.0);
const V_G: i32 = fix(0.41869 * 224.0 / 255.0);
const V_B: i32 = fix(0.08131 * 224.0 / 255.0);

fn rgb_to_y(r: i32, g: i32, b: i32) -> u8 {
    ((Y_R * r + Y_G * g + Y_B * b + (ONE_HALF + (16 << SCALEBITS))) >> SCALEBITS) as u8
}

// `shift` is log2 of the number of pixels summed into r/g/b.
fn rgb_to_u(r: i32, g: i32, b: i32, shift: u32) -> u8 {
    ((((-U_R * r - U_G * g + UV_HALF * b) + (ONE_HALF << shift) - 1) >> (SCALEBITS + shift)) + 128)
        as u8
}

fn rgb_to_v(r: i32, g: i32, b: i32, shift: u32) -> u8 {
    ((((UV_HALF * r - V_G * g - V_B * b) + (ONE_HALF << shift) - 1) >> (SCALEBITS + shift)) + 128)
        as u8
}

/// Planar YUV 4:4:4 (Y plane, U plane, V plane) after `header`.
pub fn to_yuv444(frame: &RgbFrame, flip: bool, header: &[u8]) -> Vec<u8> {
    let w = frame.width as usize;
    let plane = w * frame.height as usize;
    let mut out = vec![0u8; header.len() + plane * 3];
    out[..header.len()].copy_from_slice(header);

    let (y_plane, rest) = out[header.len()..].split_at_mut(plane);
    let (u_plane, v_plane) = rest.split_at_mut(plane);

    y_plane
        .par_chunks_mut(w)
        .zip(u_plane.par_chunks_mut(w))
        .zip(v_plane.par_chunks_mut(w))
        .enumerate()
        .for_each(|(y, ((yr, ur), vr))| {
            let src = frame.src_row(y, flip);
            for (x, px) in src.chunks_exact(3).enumerate() {
                let (r, g, b) = (i32::from(px[0]), i32::from(px[1]), i32::from(px[2]));
                yr[x] = rgb_to_y(r, g, b);
                ur[x] = rgb_to_u(r, g, b, 0);
                vr[x] = rgb_to_v(r, g, b, 0);
            }
        });
    out
}

/// Planar YUV 4:2:0 after `header`: full-size Y plane, then quarter-size U and V planes.
///
/// Each chroma sample is the average over one 2x2 pixel block, so width and height must be even.
pub fn to_yuv420(frame: &RgbFrame, flip: bool, header: &[u8]) -> GapResult<Vec<u8>> {
    if !frame.width.is_multiple_of(2) || !frame.height.is_multiple_of(2) {
        return Err(GapError::validation(format!(
            "yuv420 needs even width and height, got {}x{}",
            frame.width, frame.height
        )));
    }

    let w = frame.width as usize;
    let h = frame.height as usize;
    let plane = w * h;
    let cw = w / 2;
    let mut out = vec![0u8; header.len() + plane + plane / 2];
    out[..header.len()].copy_from_slice(header);

    let (y_plane, chroma) = out[header.len()..].split_at_mut(plane);
    let (u_plane, v_plane) = chroma.split_at_mut(plane / 4);

    y_plane.par_chunks_mut(w).enumerate().for_each(|(y, yr)| {
        let src = frame.src_row(y, flip);
        for (x, px) in src.chunks_exact(3).enumerate() {
            yr[x] = rgb_to_y(i32::from(px[0]), i32::from(px[1]), i32::from(px[2]));
        }
    });

    u_plane
        .par_chunks_mut(cw)
        .zip(v_plane.par_chunks_mut(cw))
        .enumerate()
        .for_each(|(cy, (ur, vr))| {
            let top = frame.src_row(cy * 2, flip);
            let bottom = frame.src_row(cy * 2 + 1, flip);
            for cx in 0..cw {
                let mut sum = [0i32; 3];
                for row in [top, bottom] {
                    for px in row[cx * 6..cx * 6 + 6].chunks_exact(3) {
                        sum[0] += i32::from(px[0]);
                        sum[1] += i32::from(px[1]);
                        sum[2] += i32::from(px[2]);
                    }
                }
                ur[cx] = rgb_to_u(sum[0], sum[1], sum[2], 2);
                vr[cx] = rgb_to_v(sum[0], sum[1], sum[2], 2);
            }
        });

    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/raw.rs"]
mod tests;
