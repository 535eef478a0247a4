//! Collage Edit Model
//!
//! Defines the data contracts a collage request carries:
//! - **Aspect ratios:** bounds-checked `W:H` parsing
//! - **Clip edits:** trim window, gain, target ratio, equalizer bands
//! - **Edit spec:** the two clips plus the overall layout mode
//!
//! Everything here is immutable once validated; downstream crates only read it.

pub mod edit;
pub mod ratio;

pub use edit::*;
pub use ratio::*;
