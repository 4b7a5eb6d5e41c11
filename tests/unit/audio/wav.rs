use super::*;
use std::io::Cursor;

fn header_bytes(rate: u32, channels: u16, bits: u16, data_len: u32) -> Vec<u8> {
    let mut out = Vec::new();
    let bps = channels * (bits / 8);
    write_wav_header(&mut out, rate, channels, bps, bits, data_len).unwrap();
    out
}

#[test]
fn header_is_canonical_44_bytes() {
    let h = header_bytes(44_100, 2, 16, 1000);
    assert_eq!(h.len(), WAV_HEADER_SIZE);
    assert_eq!(&h[0..4], b"RIFF");
    assert_eq!(u32::from_le_bytes([h[4], h[5], h[6], h[7]]), 1036);
    assert_eq!(&h[8..16], b"WAVEfmt ");
    assert_eq!(u32::from_le_bytes([h[28], h[29], h[30], h[31]]), 44_100 * 4);
    assert_eq!(&h[36..40], b"data");
}

#[test]
fn parse_canonical_header() {
    let mut bytes = header_bytes(22_050, 1, 16, 8);
    bytes.extend_from_slice(&[0u8; 8]);
    let len = bytes.len() as u64;
    let info = parse_wav_header(&mut Cursor::new(bytes), len).unwrap();
    assert_eq!(info.sample_rate, 22_050);
    assert_eq!(info.channels, 1);
    assert_eq!(info.bytes_per_sample, 2);
    assert_eq!(info.bits_per_sample, 16);
    assert_eq!(info.data_offset, 44);
    assert_eq!(info.data_len, 8);
    assert_eq!(info.sample_count(), 4);
    info.require_pcm16().unwrap();
}

#[test]
fn parse_skips_extra_chunks_before_data() {
    let canonical = header_bytes(8_000, 1, 16, 6);
    let mut bytes = canonical[..36].to_vec();
    // odd-sized LIST chunk, padded to an even boundary
    bytes.extend_from_slice(b"LIST");
    bytes.extend_from_slice(&3u32.to_le_bytes());
    bytes.extend_from_slice(&[1, 2, 3, 0]);
    bytes.extend_from_slice(&canonical[36..]);
    bytes.extend_from_slice(&[9u8; 6]);

    let len = bytes.len() as u64;
    let mut cur = Cursor::new(bytes);
    let info = parse_wav_header(&mut cur, len).unwrap();
    assert_eq!(info.data_offset, 36 + 12 + 8);
    assert_eq!(info.data_len, 6);
    assert_eq!(cur.position(), info.data_offset);
}

#[test]
fn data_len_is_clamped_to_file() {
    let mut bytes = header_bytes(8_000, 1, 16, 1_000);
    bytes.extend_from_slice(&[0u8; 10]);
    let len = bytes.len() as u64;
    let info = parse_wav_header(&mut Cursor::new(bytes), len).unwrap();
    assert_eq!(info.data_len, 10);
}

#[test]
fn rejects_short_and_foreign_files() {
    let short = vec![0u8; 47];
    assert!(matches!(
        parse_wav_header(&mut Cursor::new(short), 47),
        Err(GapError::Format(_))
    ));

    let mut not_wav = header_bytes(8_000, 1, 16, 4);
    not_wav[8..12].copy_from_slice(b"AVI ");
    not_wav.extend_from_slice(&[0u8; 4]);
    let len = not_wav.len() as u64;
    assert!(parse_wav_header(&mut Cursor::new(not_wav), len).is_err());
}

#[test]
fn short_file_on_disk_fails_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.wav");
    std::fs::write(&path, header_bytes(8_000, 1, 16, 0)).unwrap();
    let err = read_wav_info(&path).unwrap_err();
    assert!(err.to_string().contains("too short"));
}

#[test]
fn write_file_then_stream_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let pcm: Vec<u8> = (0..200u32).map(|v| v as u8).collect();
    write_wav_file(&path, 11_025, 2, 16, &pcm).unwrap();

    let mut cursor = WavDataCursor::open(&path).unwrap();
    assert_eq!(cursor.info().bytes_per_sample, 4);
    assert_eq!(cursor.remaining(), 200);
    let a = cursor.read_chunk(128).unwrap();
    let b = cursor.read_chunk(128).unwrap();
    assert_eq!(a.len(), 128);
    assert_eq!(b.len(), 72);
    assert!(cursor.read_chunk(128).unwrap().is_empty());
    assert_eq!([a, b].concat(), pcm);
}

#[test]
fn require_pcm16_rejects_8_bit() {
    let mut bytes = header_bytes(8_000, 1, 8, 4);
    bytes.extend_from_slice(&[0u8; 4]);
    let len = bytes.len() as u64;
    let info = parse_wav_header(&mut Cursor::new(bytes), len).unwrap();
    assert!(info.require_pcm16().is_err());
}

fn parsed(rate: u32, channels: u16, block_align: u16) -> WavInfo {
    let mut bytes = Vec::new();
    write_wav_header(&mut bytes, rate, channels, block_align, 16, 4).unwrap();
    bytes.extend_from_slice(&[0u8; 4]);
    let len = bytes.len() as u64;
    parse_wav_header(&mut Cursor::new(bytes), len).unwrap()
}

#[test]
fn require_pcm16_checks_block_align() {
    assert!(parsed(44_100, 2, 4).require_pcm16().is_ok());
    assert!(matches!(
        parsed(44_100, 2, 6).require_pcm16(),
        Err(GapError::Validation(_))
    ));
    // 40000 * 2 does not fit the 16-bit block align field
    assert!(parsed(44_100, 40_000, 14_464).require_pcm16().is_err());
}

#[test]
fn require_pcm16_rejects_byte_rate_overflow() {
    assert!(matches!(
        parsed(u32::MAX, 1, 2).require_pcm16(),
        Err(GapError::Validation(_))
    ));
    assert!(parsed(u32::MAX / 4, 2, 4).require_pcm16().is_ok());
}
