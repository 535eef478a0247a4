//! Print the compiled filter graph for an edit specification.

use std::path::PathBuf;

use collage_edit_model::edit::{ClipIndex, EditSpec};
use collage_processing_core::compiler::compile_spec;

pub fn run(edit: PathBuf, json: bool) -> anyhow::Result<()> {
    let spec = EditSpec::load(&edit)
        .map_err(|e| anyhow::anyhow!("Failed to load edit specification: {e}"))?;
    let plan = compile_spec(&spec)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let layout = &plan.layout;
    println!(
        "Canvas: {}x{} ({})",
        layout.canvas_width, layout.canvas_height, layout.mode
    );
    for clip in ClipIndex::ALL {
        let frame = layout.frame(clip);
        println!(
            "  {clip}: {}x{} at ({}, {})",
            frame.width, frame.height, frame.x, frame.y
        );
    }
    println!("Duration: {:.3}s", plan.duration_secs);
    println!(
        "Nodes: {} audio, {} video",
        plan.graph.audio_chain().len(),
        plan.graph.video_chain().len()
    );
    println!();
    for node in plan.graph.nodes() {
        println!("  {}", node.to_filter_string());
    }
    println!();
    println!("Outputs: video [{}], audio [{}]", plan.graph.video_out(), plan.graph.audio_out());

    Ok(())
}
