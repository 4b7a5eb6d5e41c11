use super::*;

fn stream() -> Vec<u8> {
    let mut s = Vec::new();
    s.extend_from_slice(&[0, 0, 1, 0xB0, 0x01]); // VOS
    s.extend_from_slice(&[0, 0, 1, 0x20, 0x08, 0x09]); // VOL
    s.extend_from_slice(&[0, 0, 1, 0xB6, 0x00, 0xAA, 0xBB]); // I
    s.extend_from_slice(&[0, 0, 1, 0xB6, 0x40, 0xCC]); // P
    s.extend_from_slice(&[0, 0, 1, 0xB3, 0x05]); // GOV
    s.extend_from_slice(&[0, 0, 1, 0xB6, 0x10, 0xDD, 0xEE]); // I
    s
}

fn split_all(pieces: &[&[u8]]) -> Vec<EncodedChunk> {
    let mut sp = VopSplitter::default();
    let mut out = Vec::new();
    for p in pieces {
        out.extend(sp.push(p));
    }
    out.extend(sp.finish());
    out
}

#[test]
fn headers_travel_with_the_following_picture() {
    let s = stream();
    let chunks = split_all(&[&s]);
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].data.len(), 5 + 6 + 7);
    assert!(chunks[0].keyframe);
    assert_eq!(chunks[1].data, vec![0, 0, 1, 0xB6, 0x40, 0xCC]);
    assert!(!chunks[1].keyframe);
    assert_eq!(&chunks[2].data[..4], &[0, 0, 1, 0xB3]);
    assert!(chunks[2].keyframe);

    let total: usize = chunks.iter().map(|c| c.data.len()).sum();
    assert_eq!(total, s.len());
}

#[test]
fn byte_by_byte_feeding_matches_bulk() {
    let s = stream();
    let pieces: Vec<&[u8]> = s.chunks(1).collect();
    let a = split_all(&pieces);
    let b = split_all(&[&s]);
    assert_eq!(a, b);
}

#[test]
fn no_picture_means_no_chunk() {
    let mut sp = VopSplitter::default();
    assert!(sp.push(&[0, 0, 1, 0xB0, 0x01, 0x02]).is_empty());
    assert!(sp.finish().is_none());
}

#[test]
fn params_validation() {
    assert!(XvidParams::default().validate().is_ok());
    let bad = XvidParams {
        min_quantizer: 10,
        max_quantizer: 5,
        ..Default::default()
    };
    assert!(bad.validate().is_err());
    let zero_q = XvidParams {
        min_quantizer: 0,
        ..Default::default()
    };
    assert!(zero_q.validate().is_err());
}

#[test]
fn ffmpeg_encoder_emits_one_chunk_per_frame() {
    if !is_ffmpeg_on_path() {
        return;
    }
    let size = VideoSize::new(16, 16).unwrap();
    let mut enc = XvidEncoder::new(size, Fps::new(25, 1).unwrap(), &XvidParams::default()).unwrap();
    let mut chunks = Vec::new();
    for shade in [0u8, 60, 120, 180, 240] {
        chunks.extend(enc.encode(&RgbFrame::solid(16, 16, [shade, 30, 200])).unwrap());
    }
    chunks.extend(enc.finish().unwrap());

    assert_eq!(chunks.len(), 5);
    assert!(chunks[0].keyframe);
    assert!(chunks.iter().all(|c| !c.data.is_empty()));
    // VOS/VOL headers precede the first picture
    assert_eq!(&chunks[0].data[..3], &[0, 0, 1]);
}

#[test]
fn odd_frame_size_is_rejected_before_spawning() {
    let size = VideoSize::new(15, 16).unwrap();
    assert!(matches!(
        XvidEncoder::new(size, Fps::new(25, 1).unwrap(), &XvidParams::default()),
        Err(GapError::Validation(_))
    ));
}
