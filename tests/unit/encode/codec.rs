use super::*;

fn size() -> VideoSize {
    VideoSize::new(4, 2).unwrap()
}

fn fps() -> Fps {
    Fps::new(25, 1).unwrap()
}

#[test]
fn codec_names_parse_case_insensitively() {
    assert_eq!("jpeg".parse::<VideoCodec>().unwrap(), VideoCodec::Jpeg);
    assert_eq!("MJPG".parse::<VideoCodec>().unwrap(), VideoCodec::Mjpg);
    assert_eq!(" raw ".parse::<VideoCodec>().unwrap(), VideoCodec::Raw);
    assert_eq!("Xvid".parse::<VideoCodec>().unwrap(), VideoCodec::Xvid);
    for c in VideoCodec::ALL {
        assert_eq!(c.to_string().parse::<VideoCodec>().unwrap(), c);
    }
}

#[test]
fn unknown_codec_is_rejected() {
    let err = "DIVX".parse::<VideoCodec>().unwrap_err();
    assert!(matches!(err, GapError::Validation(_)));
}

#[test]
fn fourcc_and_compression() {
    assert_eq!(&VideoCodec::Mjpg.fourcc(), b"MJPG");
    assert_eq!(VideoCodec::Raw.bmp_compression(), [0; 4]);
    assert_eq!(&VideoCodec::Png.bmp_compression(), b"MPNG");
    assert!(VideoCodec::Jpeg.allows_passthrough());
    assert!(!VideoCodec::Raw.allows_passthrough());
}

#[test]
fn params_json_fills_defaults() {
    let p: AviEncodeParams =
        serde_json::from_str(r#"{"codec":"PNG","jpeg":{"quality":50}}"#).unwrap();
    assert_eq!(p.codec, VideoCodec::Png);
    assert_eq!(p.jpeg.quality, 50);
    assert!(p.jpeg.app0_marker);
    assert_eq!(p.audio_margin, AUDIO_MARGIN);
}

#[test]
fn raw_encoder_emits_one_bottom_up_bgr_keyframe() {
    let params = AviEncodeParams {
        codec: VideoCodec::Raw,
        ..Default::default()
    };
    let mut enc = build_encoder(&params, size(), fps()).unwrap();
    let mut data = vec![0u8; 4 * 3];
    data.extend_from_slice(&[10, 20, 30].repeat(4));
    let frame = RgbFrame::new(4, 2, data).unwrap();

    let chunks = enc.encode(&frame).unwrap();
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].keyframe);
    assert_eq!(chunks[0].data.len(), 4 * 2 * 3);
    // bottom row first, channels swapped
    assert_eq!(&chunks[0].data[..3], &[30, 20, 10]);
    assert!(enc.finish().unwrap().is_empty());
}

#[test]
fn jpeg_and_png_encoders_emit_keyframes() {
    let frame = RgbFrame::solid(4, 2, [200, 100, 50]);
    for codec in [VideoCodec::Jpeg, VideoCodec::Mjpg, VideoCodec::Png] {
        let params = AviEncodeParams {
            codec,
            ..Default::default()
        };
        let mut enc = build_encoder(&params, size(), fps()).unwrap();
        let chunks = enc.encode(&frame).unwrap();
        assert_eq!(chunks.len(), 1, "{codec}");
        assert!(chunks[0].keyframe);
        assert!(image::load_from_memory(&chunks[0].data).is_ok(), "{codec}");
    }
}

#[test]
fn invalid_params_fail_before_encoding() {
    let params = AviEncodeParams {
        png_compression: 12,
        ..Default::default()
    };
    assert!(build_encoder(&params, size(), fps()).is_err());
}
