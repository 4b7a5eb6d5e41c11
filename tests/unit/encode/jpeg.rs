use super::*;

fn gradient(w: u32, h: u32) -> RgbFrame {
    let mut data = Vec::new();
    for y in 0..h {
        for x in 0..w {
            data.extend_from_slice(&[(x * 8) as u8, (y * 8) as u8, 128]);
        }
    }
    RgbFrame::new(w, h, data).unwrap()
}

fn find(hay: &[u8], needle: &[u8]) -> Vec<usize> {
    hay.windows(needle.len())
        .enumerate()
        .filter(|(_, w)| *w == needle)
        .map(|(i, _)| i)
        .collect()
}

#[test]
fn progressive_frame_is_one_decodable_jpeg() {
    let params = JpegParams {
        app0_marker: false,
        ..Default::default()
    };
    let jpeg = encode_jpeg(&gradient(16, 8), &params).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    let img = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((img.width(), img.height()), (16, 8));
    assert!(find(&jpeg, b"AVI1").is_empty());
}

#[test]
fn avi1_marker_records_total_size() {
    let jpeg = encode_jpeg(&gradient(8, 8), &JpegParams::default()).unwrap();
    let at = find(&jpeg, b"AVI1");
    assert_eq!(at.len(), 1);
    let p = at[0];
    assert_eq!(&jpeg[p - 4..p], &[0xFF, 0xE0, 0x00, 0x10]);
    assert_eq!(jpeg[p + 4], 0);
    let size = u32::from_be_bytes([jpeg[p + 6], jpeg[p + 7], jpeg[p + 8], jpeg[p + 9]]);
    assert_eq!(size as usize, jpeg.len());
    // still a valid jpeg for decoders
    assert!(image::load_from_memory(&jpeg).is_ok());
}

#[test]
fn interlaced_frame_holds_two_fields() {
    let params = JpegParams {
        interlaced: true,
        ..Default::default()
    };
    let jpeg = encode_jpeg(&gradient(16, 16), &params).unwrap();
    let soi = find(&jpeg, &[0xFF, 0xD8, 0xFF]);
    assert_eq!(soi.len(), 2);
    let markers = find(&jpeg, b"AVI1");
    assert_eq!(markers.len(), 2);
    assert_eq!(jpeg[markers[0] + 4], 1);
    assert_eq!(jpeg[markers[1] + 4], 2);

    let first = image::load_from_memory(&jpeg[..soi[1]]).unwrap();
    assert_eq!((first.width(), first.height()), (16, 8));
}

#[test]
fn rejects_out_of_range_quality() {
    let params = JpegParams {
        quality: 0,
        ..Default::default()
    };
    assert!(encode_jpeg(&gradient(4, 4), &params).is_err());
}

#[test]
fn marker_insertion_requires_soi() {
    let mut not_jpeg = vec![0u8; 16];
    assert!(insert_avi1_marker(&mut not_jpeg, 0).is_err());

    let mut bare = vec![0xFF, 0xD8, 0xFF, 0xD9];
    insert_avi1_marker(&mut bare, 0).unwrap();
    assert_eq!(bare.len(), 4 + 18);
    assert_eq!(&bare[2..4], &[0xFF, 0xE0]);
}
