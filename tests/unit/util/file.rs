use super::*;

#[test]
fn frame_filename_pads_to_six_digits() {
    assert_eq!(
        frame_filename("anim_", 3, ".png"),
        PathBuf::from("anim_000003.png")
    );
    assert_eq!(
        frame_filename("dir/x", 1234567, ".jpg"),
        PathBuf::from("dir/x1234567.jpg")
    );
}

#[test]
fn split_frame_filename_parses_parts() {
    let n = split_frame_filename("frames/anim_000042.xcf").unwrap();
    assert_eq!(n.basename, "frames/anim_");
    assert_eq!(n.nr, 42);
    assert_eq!(n.digits, 6);
    assert_eq!(n.ext, ".xcf");
    assert_eq!(n.with_nr(7), PathBuf::from("frames/anim_000007.xcf"));
}

#[test]
fn split_frame_filename_without_extension() {
    let n = split_frame_filename("clip0009").unwrap();
    assert_eq!(n.basename, "clip");
    assert_eq!(n.nr, 9);
    assert_eq!(n.ext, "");
}

#[test]
fn split_frame_filename_ignores_dots_in_directories() {
    let n = split_frame_filename("my.dir/frame_01").unwrap();
    assert_eq!(n.basename, "my.dir/frame_");
    assert_eq!(n.nr, 1);
    assert_eq!(n.ext, "");
}

#[test]
fn split_frame_filename_requires_digits() {
    assert!(split_frame_filename("cover.png").is_none());
}

#[test]
fn write_then_read_file_creates_parent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/out.bin");
    write_file(&path, b"abc").unwrap();
    assert_eq!(read_file(&path).unwrap(), b"abc");
    assert_eq!(file_size(&path).unwrap(), 3);
}

#[test]
fn missing_file_is_io_error() {
    let err = file_size(Path::new("/definitely/not/here.bin")).unwrap_err();
    assert!(matches!(err, GapError::Io(_)));
}
