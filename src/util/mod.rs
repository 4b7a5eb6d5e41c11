/// File access and numbered frame filenames.
pub mod file;
/// Hex text encoding of binary blobs.
pub mod hex;

pub use file::{FrameName, file_size, frame_filename, read_file, split_frame_filename, write_file};
pub use hex::{decode_hex, encode_hex};
