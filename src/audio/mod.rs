//! Audio input for the AVI encoder.
//!
//! WAV files are read as a flat byte stream; [`interleave`] decides how much of it goes into the
//! container after each video frame.

/// Audio/video interleave accounting.
pub mod interleave;
/// RIFF WAVE header reading and writing.
pub mod wav;
