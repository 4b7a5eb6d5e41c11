use super::*;

fn two_row_frame() -> RgbFrame {
    // 2x2: top row red, green; bottom row blue, white
    RgbFrame::new(
        2,
        2,
        vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255],
    )
    .unwrap()
}

#[test]
fn new_checks_buffer_length() {
    assert!(RgbFrame::new(2, 2, vec![0; 11]).is_err());
    assert!(RgbFrame::new(0, 2, vec![]).is_err());
}

#[test]
fn bgr_swaps_channels_and_keeps_header() {
    let out = to_bgr(&two_row_frame(), false, b"HDR");
    assert_eq!(&out[..3], b"HDR");
    assert_eq!(&out[3..9], &[0, 0, 255, 0, 255, 0]);
    assert_eq!(out.len(), 3 + 12);
}

#[test]
fn flip_reverses_row_order() {
    let out = to_rgb(&two_row_frame(), true, &[]);
    assert_eq!(&out[..6], &[0, 0, 255, 255, 255, 255]);
    assert_eq!(&out[6..], &[255, 0, 0, 0, 255, 0]);
}

#[test]
fn yuv444_black_and_white_hit_studio_range() {
    let black = to_yuv444(&RgbFrame::solid(2, 1, [0, 0, 0]), false, &[]);
    assert_eq!(black, vec![16, 16, 128, 128, 128, 128]);

    let white = to_yuv444(&RgbFrame::solid(2, 1, [255, 255, 255]), false, &[]);
    assert_eq!(&white[..2], &[235, 235]);
    assert_eq!(&white[2..], &[128, 128, 128, 128]);
}

#[test]
fn yuv444_red_matches_bt601() {
    let red = to_yuv444(&RgbFrame::solid(1, 1, [255, 0, 0]), false, &[]);
    assert!((80..=83).contains(&red[0]), "y={}", red[0]);
    assert!((89..=91).contains(&red[1]), "u={}", red[1]);
    assert!((239..=240).contains(&red[2]), "v={}", red[2]);
}

#[test]
fn yuv420_sizes_and_averaging() {
    let frame = RgbFrame::solid(4, 2, [255, 0, 0]);
    let out = to_yuv420(&frame, false, &[0xAA]).unwrap();
    assert_eq!(out.len(), 1 + 8 + 2 + 2);
    assert_eq!(out[0], 0xAA);

    let single = to_yuv444(&RgbFrame::solid(1, 1, [255, 0, 0]), false, &[]);
    // a uniform 2x2 block averages to the single-pixel chroma value
    assert_eq!(out[9], single[1]);
    assert_eq!(out[11], single[2]);
}

#[test]
fn yuv420_rejects_odd_sizes() {
    assert!(to_yuv420(&RgbFrame::solid(3, 2, [0, 0, 0]), false, &[]).is_err());
    assert!(to_yuv420(&RgbFrame::solid(2, 3, [0, 0, 0]), false, &[]).is_err());
}

#[test]
fn image_round_trip_keeps_pixels() {
    let frame = two_row_frame();
    let img = frame.to_rgb_image().unwrap();
    assert_eq!(RgbFrame::from_rgb_image(img), frame);
}
