//! Encoding sinks.
//!
//! Sinks consume rendered frames in timeline order and are driven by `Session::run_to_sink`.

/// `ffmpeg`-based sinks (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// PNG output, single frames and numbered sequences.
pub mod png;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
