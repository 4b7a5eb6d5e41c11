//! RIFF containers written by the encoder.

/// AVI 1.0 writer and summary reader.
pub mod avi;
