//! Canvas geometry for the two-clip collage.
//!
//! The canvas edge perpendicular to the stacking direction is fixed at
//! [`CANVAS_PRIMARY_DIM`]. Both frames share that edge minus padding; along
//! the stacking direction each frame takes whatever its own aspect ratio
//! demands, so the two frames may differ in length.
//!
//! ```text
//! row:                                  column:
//! +-----------------------------+       +-----------+
//! | pad                         |       | pad       |
//! |   +--------+   +----+       |       |  +-----+  |
//! |   | clip 1 |pad|clip|  pad  |       |  |clip1|  |
//! |   |        |   | 2  |       |       |  +-----+  |
//! |   +--------+   +----+       |       |   pad     |
//! | pad                         |       |  +-----+  |
//! +-----------------------------+       |  |clip2|  |
//!                                       |  +-----+  |
//!                                       | pad       |
//!                                       +-----------+
//! ```

use collage_common::error::{CollageError, CollageResult};
use collage_edit_model::edit::{ClipIndex, LayoutMode};
use collage_edit_model::ratio::AspectRatio;
use serde::{Deserialize, Serialize};

use crate::numeric::even_dimension;

/// Canvas edge length perpendicular to the stacking direction.
pub const CANVAS_PRIMARY_DIM: u32 = 1080;

/// Gap around and between the frames. Must stay even.
pub const PADDING: u32 = 20;

/// A clip's placement on the canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRect {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl FrameRect {
    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn overlaps(&self, other: &FrameRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Resolved canvas and frame placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub mode: LayoutMode,
    pub canvas_width: u32,
    pub canvas_height: u32,
    frames: [FrameRect; 2],
}

impl Layout {
    /// Placement of the given clip.
    pub fn frame(&self, clip: ClipIndex) -> &FrameRect {
        &self.frames[clip.input_index()]
    }

    /// Whether `frame` lies fully inside the canvas.
    pub fn contains(&self, frame: &FrameRect) -> bool {
        frame.right() <= self.canvas_width && frame.bottom() <= self.canvas_height
    }
}

/// Resolve the layout for two target aspect ratios.
///
/// Beyond the ratio checks in [`resolve_values`], this also fails with
/// `InvalidArgument` when any frame or canvas edge would exceed
/// [`MAX_DIMENSION`](crate::numeric::MAX_DIMENSION) pixels, e.g. `33:1`
/// beside `1:1` in a row.
pub fn resolve(
    ratio1: &AspectRatio,
    ratio2: &AspectRatio,
    mode: LayoutMode,
) -> CollageResult<Layout> {
    resolve_values(ratio1.as_f64(), ratio2.as_f64(), mode)
}

/// Resolve the layout for two width/height ratios given as plain numbers.
///
/// Fails with `InvalidArgument` when a ratio is non-positive or non-finite,
/// or when the result would not fit the maximum canvas size.
pub fn resolve_values(ratio1: f64, ratio2: f64, mode: LayoutMode) -> CollageResult<Layout> {
    for (clip, ratio) in [(ClipIndex::First, ratio1), (ClipIndex::Second, ratio2)] {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(CollageError::invalid_argument(format!(
                "{clip}: aspect ratio must be a positive finite number, got {ratio}"
            )));
        }
    }

    let shared = even_dimension(CANVAS_PRIMARY_DIM as f64 - 2.0 * PADDING as f64)?;
    let extent = |ratio: f64| match mode {
        LayoutMode::Row => shared as f64 * ratio,
        LayoutMode::Column => shared as f64 / ratio,
    };
    let along1 = even_dimension(extent(ratio1))?;
    let along2 = even_dimension(extent(ratio2))?;

    // Already even when every term is; rounded again so the codec constraint
    // never depends on that reasoning.
    let stacked = even_dimension((3 * PADDING + along1 + along2) as f64)?;
    let second_offset = PADDING + along1 + PADDING;

    let layout = match mode {
        LayoutMode::Row => Layout {
            mode,
            canvas_width: stacked,
            canvas_height: CANVAS_PRIMARY_DIM,
            frames: [
                FrameRect {
                    width: along1,
                    height: shared,
                    x: PADDING,
                    y: PADDING,
                },
                FrameRect {
                    width: along2,
                    height: shared,
                    x: second_offset,
                    y: PADDING,
                },
            ],
        },
        LayoutMode::Column => Layout {
            mode,
            canvas_width: CANVAS_PRIMARY_DIM,
            canvas_height: stacked,
            frames: [
                FrameRect {
                    width: shared,
                    height: along1,
                    x: PADDING,
                    y: PADDING,
                },
                FrameRect {
                    width: shared,
                    height: along2,
                    x: PADDING,
                    y: second_offset,
                },
            ],
        },
    };

    tracing::debug!(
        mode = %mode,
        canvas_width = layout.canvas_width,
        canvas_height = layout.canvas_height,
        frame1 = ?layout.frames[0],
        frame2 = ?layout.frames[1],
        "Layout resolved"
    );

    Ok(layout)
}
