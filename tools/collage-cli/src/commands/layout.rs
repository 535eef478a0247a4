//! Show canvas geometry for two aspect ratios.

use collage_edit_model::edit::{ClipIndex, LayoutMode};
use collage_edit_model::ratio::AspectRatio;
use collage_processing_core::geometry::resolve;

pub fn run(ratio1: &str, ratio2: &str, mode: LayoutMode) -> anyhow::Result<()> {
    let r1: AspectRatio = ratio1.parse()?;
    let r2: AspectRatio = ratio2.parse()?;
    let layout = resolve(&r1, &r2, mode)?;

    println!("Layout: {mode} ({r1} + {r2})");
    println!("  Canvas: {}x{}", layout.canvas_width, layout.canvas_height);
    for clip in ClipIndex::ALL {
        let frame = layout.frame(clip);
        println!(
            "  {clip}: {}x{} at ({}, {})",
            frame.width, frame.height, frame.x, frame.y
        );
    }

    Ok(())
}
