//! Render a collage of two clips.

use std::io::Write;
use std::path::PathBuf;

use collage_common::config::AppConfig;
use collage_edit_model::edit::EditSpec;
use collage_render_engine::export::{
    default_output_path, locate_input, render_collage, CollageJob, InputOwnership,
    ProgressCallback, RenderStage,
};

pub async fn run(
    config: &AppConfig,
    video1: PathBuf,
    video2: PathBuf,
    edit: PathBuf,
    output: Option<PathBuf>,
    temporary_inputs: bool,
) -> anyhow::Result<()> {
    let spec = EditSpec::load(&edit)
        .map_err(|e| anyhow::anyhow!("Failed to load edit specification: {e}"))?;

    let video1 = locate_input(&video1, &config.work_dirs.uploads_dir);
    let video2 = locate_input(&video2, &config.work_dirs.uploads_dir);

    let output_path =
        output.unwrap_or_else(|| default_output_path(&config.work_dirs.processed_dir));
    let ownership = if temporary_inputs {
        InputOwnership::Temporary
    } else {
        InputOwnership::Borrowed
    };

    println!("Rendering collage");
    println!("  Clip 1: {}", video1.display());
    println!("  Clip 2: {}", video2.display());
    println!("  Layout: {}", spec.layout);
    println!("  Output: {}", output_path.display());

    let job = CollageJob::new(video1, video2, spec, output_path)
        .with_ownership(ownership)
        .with_encoder(config.encoder.clone());

    let progress_cb: ProgressCallback = Box::new(|p| {
        if p.stage == RenderStage::Rendering || p.stage == RenderStage::Finalizing {
            print!(
                "\r  Progress: {:.1}% ({:.1}s, ETA: {:.0}s)  ",
                p.progress * 100.0,
                p.out_time_secs,
                p.eta_secs,
            );
            let _ = std::io::stdout().flush();
        }
    });

    match render_collage(job, Some(progress_cb)).await {
        Ok(path) => {
            println!("\nCollage complete: {}", path.display());
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::anyhow!("Render failed: {e}"))
        }
    }
}
