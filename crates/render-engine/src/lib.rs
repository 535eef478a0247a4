//! Collage Render Engine
//!
//! Drives the external media executor: turns a compiled collage plan into
//! an ffmpeg invocation, runs it, reports progress, and cleans up.
//!
//! # Pipeline
//!
//! ```text
//! video1 ──┐
//!          ├── compile_spec ── FilterGraph ──┐
//! edit ────┘                                 ├── ffmpeg -filter_complex ── collage.mp4
//! video2 ────────────────────────────────────┘
//! ```
//!
//! Inputs handed over as temporary files are removed once the run ends,
//! whatever the outcome. A failed run never leaves a partial output behind.

pub mod cleanup;
pub mod export;
pub mod ffmpeg;

pub use export::*;
pub use ffmpeg::FfmpegBackend;
