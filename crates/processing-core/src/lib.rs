//! Collage Processing Core
//!
//! Turns a two-clip edit specification into an ffmpeg filter graph:
//! - **Geometry:** canvas size and per-clip placement, even integers only
//! - **Graph:** labelled filter nodes with a wiring self-check and serializer
//! - **Compiler:** per-clip audio/video chains, mixing, and compositing
//!
//! This crate is pure computation. It does no I/O and manages no processes.
//! All inputs are data; all outputs are data.

pub mod compiler;
pub mod geometry;
pub mod graph;
pub mod numeric;

pub use compiler::{compile, compile_spec, CollagePlan};
pub use geometry::{resolve, FrameRect, Layout};
pub use graph::{FilterGraph, FilterNode, Label, StreamKind};
