use super::*;
use crate::encode::jpeg::{JpegParams, encode_jpeg};
use crate::encode::png::encode_png;
use crate::util::file::{frame_filename, split_frame_filename};

fn size(w: u32, h: u32) -> VideoSize {
    VideoSize::new(w, h).unwrap()
}

fn params(codec: VideoCodec) -> AviEncodeParams {
    AviEncodeParams {
        codec,
        ..Default::default()
    }
}

#[test]
fn request_follows_codec() {
    let s = size(8, 8);
    let jpeg = FetchRequest::for_params(&params(VideoCodec::Mjpg), s);
    assert!(jpeg.check_jpeg && !jpeg.check_png);
    let png = FetchRequest::for_params(&params(VideoCodec::Png), s);
    assert!(png.check_png && !png.check_jpeg);
    assert!(!FetchRequest::for_params(&params(VideoCodec::Raw), s).allows_reuse());

    let mut interlaced = params(VideoCodec::Jpeg);
    interlaced.jpeg.interlaced = true;
    assert!(!FetchRequest::for_params(&interlaced, s).allows_reuse());

    let mut off = params(VideoCodec::Jpeg);
    off.allow_passthrough = false;
    assert!(!FetchRequest::for_params(&off, s).allows_reuse());
}

#[test]
fn matching_jpeg_is_reused_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("anim_").to_string_lossy().into_owned();
    let jpeg = encode_jpeg(&RgbFrame::solid(8, 8, [10, 200, 30]), &JpegParams::default()).unwrap();
    std::fs::write(frame_filename(&base, 1, ".jpg"), &jpeg).unwrap();

    let mut src = ImageSequenceSource::new(base, ".jpg");
    let req = FetchRequest::for_params(&params(VideoCodec::Jpeg), size(8, 8));
    assert_eq!(
        src.fetch(1, &req).unwrap(),
        Fetched::Chunk {
            data: jpeg,
            header_len: 0
        }
    );
}

#[test]
fn size_mismatch_forces_decode_and_resize() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("f").to_string_lossy().into_owned();
    let png = encode_png(&RgbFrame::solid(4, 4, [50, 60, 70]), 6).unwrap();
    std::fs::write(frame_filename(&base, 7, ".png"), png).unwrap();

    let mut src = ImageSequenceSource::new(base, ".png");
    let req = FetchRequest::for_params(&params(VideoCodec::Png), size(8, 6));
    match src.fetch(7, &req).unwrap() {
        Fetched::Frame(f) => {
            assert_eq!((f.width, f.height), (8, 6));
            assert_eq!(&f.data[..3], &[50, 60, 70]);
        }
        other => panic!("expected decoded frame, got {other:?}"),
    }
}

#[test]
fn png_is_decoded_for_jpeg_output() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("f").to_string_lossy().into_owned();
    let frame = RgbFrame::solid(4, 4, [1, 2, 3]);
    std::fs::write(frame_filename(&base, 2, ".png"), encode_png(&frame, 1).unwrap()).unwrap();

    let mut src = ImageSequenceSource::new(base, ".png");
    let req = FetchRequest::for_params(&params(VideoCodec::Jpeg), size(4, 4));
    assert_eq!(src.fetch(2, &req).unwrap(), Fetched::Frame(frame));
}

#[test]
fn missing_frame_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("none_").to_string_lossy().into_owned();
    let mut src = ImageSequenceSource::new(base, ".png");
    let err = src.fetch(1, &FetchRequest::decoded(size(2, 2))).unwrap_err();
    assert!(matches!(err, GapError::Io(_)));
}

#[test]
fn sequence_from_frame_name_keeps_digit_count() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("shot_0009.png").to_string_lossy().into_owned();
    std::fs::write(&first, encode_png(&RgbFrame::solid(2, 2, [1, 2, 3]), 6).unwrap()).unwrap();

    let name = split_frame_filename(&first).unwrap();
    assert_eq!((name.nr, name.digits), (9, 4));
    let mut src = ImageSequenceSource::from_frame_name(&name);
    assert_eq!(src.path_of(12), dir.path().join("shot_0012.png"));

    let req = FetchRequest::decoded(size(2, 2));
    assert_eq!(
        src.fetch(9, &req).unwrap(),
        Fetched::Frame(RgbFrame::solid(2, 2, [1, 2, 3]))
    );
}

#[test]
fn alpha_is_dropped_at_target_size() {
    let rgba = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        3,
        2,
        image::Rgba([9, 8, 7, 0]),
    ));
    let frame = fit_to_size(&rgba, size(3, 2));
    assert_eq!(frame, RgbFrame::solid(3, 2, [9, 8, 7]));
}
