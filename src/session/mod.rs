//! Encode sessions: one run over a frame range into one output file.

/// Frame range to AVI encode loop.
pub mod avi_encode;
/// Encoder introspection queries.
pub mod encoder_info;
