use std::io::Cursor;

use super::*;

fn writer() -> AviWriter<Cursor<Vec<u8>>> {
    AviWriter::new(
        Cursor::new(Vec::new()),
        VideoSize::new(4, 2).unwrap(),
        Fps::new(25, 1).unwrap(),
        *b"MJPG",
        *b"MJPG",
        24,
    )
    .unwrap()
}

fn pcm16_stereo() -> AviAudioFormat {
    AviAudioFormat {
        format_tag: 1,
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 16,
    }
}

fn u32_at(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(b[at..at + 4].try_into().unwrap())
}

#[test]
fn video_only_file_round_trips_through_summary() {
    let mut w = writer();
    w.write_video(&[1, 2, 3, 4], true).unwrap();
    w.write_video(&[5, 6, 7], false).unwrap();
    w.write_video(&[8; 10], true).unwrap();
    assert_eq!(w.video_frames(), 3);
    let bytes = w.into_inner().unwrap().into_inner();

    assert_eq!(u32_at(&bytes, 4) as usize, bytes.len() - 8);
    let s = read_avi_summary(&bytes).unwrap();
    assert_eq!(s.total_frames, 3);
    assert_eq!((s.width, s.height), (4, 2));
    assert_eq!(s.micros_per_frame, 40_000);
    assert_eq!(s.video_fourcc_str(), "MJPG");
    assert_eq!(s.video_rate, (25, 1));
    assert_eq!(s.video_chunks, vec![4, 3, 10]);
    assert_eq!(s.keyframes, vec![true, false, true]);
    assert!(s.audio.is_none());
    assert!(s.audio_chunks.is_empty());
}

#[test]
fn movi_starts_on_header_boundary() {
    let mut w = writer();
    w.write_video(&[0; 6], true).unwrap();
    let bytes = w.into_inner().unwrap().into_inner();
    let movi = HEADER_ALIGN as usize;
    assert_eq!(&bytes[movi..movi + 4], b"LIST");
    assert_eq!(&bytes[movi + 8..movi + 12], b"movi");
    assert_eq!(&bytes[movi + 12..movi + 16], b"00dc");
}

#[test]
fn index_offsets_point_at_chunk_headers() {
    let mut w = writer();
    w.set_audio(pcm16_stereo()).unwrap();
    w.write_video(&[9; 5], true).unwrap();
    w.write_audio(&[0; 8]).unwrap();
    w.write_video(&[7; 2], false).unwrap();
    let bytes = w.into_inner().unwrap().into_inner();

    let movi_fourcc = HEADER_ALIGN as usize + 8;
    let idx = bytes.windows(4).rposition(|win| win == b"idx1").unwrap();
    let n = u32_at(&bytes, idx + 4) as usize / 16;
    assert_eq!(n, 3);
    for i in 0..n {
        let e = idx + 8 + i * 16;
        let off = u32_at(&bytes, e + 8) as usize;
        let size = u32_at(&bytes, e + 12);
        assert_eq!(&bytes[movi_fourcc + off..movi_fourcc + off + 4], &bytes[e..e + 4]);
        assert_eq!(u32_at(&bytes, movi_fourcc + off + 4), size);
    }
}

#[test]
fn odd_chunks_are_padded() {
    let mut w = writer();
    w.write_video(&[1, 2, 3], true).unwrap();
    w.write_video(&[4, 5], true).unwrap();
    let bytes = w.into_inner().unwrap().into_inner();
    let first = HEADER_ALIGN as usize + 12;
    // 8 byte header + 3 bytes + 1 pad byte
    assert_eq!(&bytes[first + 12..first + 16], b"00dc");
    assert_eq!(bytes.len() % 2, 0);
}

#[test]
fn audio_stream_is_declared_and_counted() {
    let mut w = writer();
    w.set_audio(pcm16_stereo()).unwrap();
    w.write_video(&[0; 4], true).unwrap();
    w.write_audio(&[0; 8192]).unwrap();
    w.write_audio(&[0; 100]).unwrap();
    assert_eq!(w.audio_chunks(), 2);
    assert_eq!(w.audio_bytes(), 8292);
    let bytes = w.into_inner().unwrap().into_inner();

    let s = read_avi_summary(&bytes).unwrap();
    assert_eq!(s.audio, Some(pcm16_stereo()));
    assert_eq!(s.audio_chunks, vec![8192, 100]);
    assert_eq!(s.audio_bytes(), 8292);
    assert_eq!(s.keyframes, vec![true]);
}

#[test]
fn audio_must_be_declared_up_front() {
    let mut w = writer();
    assert!(w.write_audio(&[0; 4]).is_err());
    w.write_video(&[0; 4], true).unwrap();
    assert!(matches!(
        w.set_audio(pcm16_stereo()),
        Err(GapError::Validation(_))
    ));
}

#[test]
fn finish_is_idempotent_and_closes_the_file() {
    let mut w = writer();
    w.write_video(&[0; 4], true).unwrap();
    w.finish().unwrap();
    assert!(w.is_finished());
    w.finish().unwrap();
    assert!(w.write_video(&[0; 4], true).is_err());
}

#[test]
fn empty_file_is_still_valid() {
    let bytes = writer().into_inner().unwrap().into_inner();
    let s = read_avi_summary(&bytes).unwrap();
    assert_eq!(s.total_frames, 0);
    assert!(s.video_chunks.is_empty());
}

#[test]
fn summary_rejects_non_avi_and_truncated_chunks() {
    assert!(read_avi_summary(b"RIFF\0\0\0\0WAVEfmt ").is_err());
    let mut w = writer();
    w.write_video(&[0; 64], true).unwrap();
    let mut bytes = w.into_inner().unwrap().into_inner();
    let chunk = HEADER_ALIGN as usize + 12;
    bytes[chunk + 4..chunk + 8].copy_from_slice(&0x7fff_ffffu32.to_le_bytes());
    assert!(matches!(read_avi_summary(&bytes), Err(GapError::Format(_))));
}

#[test]
fn audio_rates_overflow_is_an_error() {
    let wide = AviAudioFormat {
        channels: 40_000,
        ..pcm16_stereo()
    };
    assert!(matches!(wide.block_align(), Err(GapError::Validation(_))));
    assert!(writer().set_audio(wide).is_err());

    let fast = AviAudioFormat {
        sample_rate: u32::MAX,
        ..pcm16_stereo()
    };
    assert_eq!(fast.block_align().unwrap(), 4);
    assert!(matches!(fast.bytes_per_second(), Err(GapError::Validation(_))));

    let mut w = writer();
    assert!(w.set_audio(fast).is_err());
    w.write_video(&[0; 4], true).unwrap();
    let s = read_avi_summary(&w.into_inner().unwrap().into_inner()).unwrap();
    assert_eq!(s.audio, None);
}

#[test]
fn audio_header_carries_block_align_and_rate() {
    assert_eq!(pcm16_stereo().block_align().unwrap(), 4);
    assert_eq!(pcm16_stereo().bytes_per_second().unwrap(), 176_400);
}
