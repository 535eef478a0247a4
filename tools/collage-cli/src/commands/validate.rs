//! Validate an edit specification.

use std::path::PathBuf;

use collage_edit_model::edit::{ClipIndex, EditSpec};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating edit specification at: {}", path.display());

    let spec = EditSpec::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load edit specification: {e}"))?;

    println!("  Layout: {}", spec.layout);
    for index in ClipIndex::ALL {
        let clip = spec.clip(index);
        println!(
            "  {index}: {:.3}s-{:.3}s, volume {}, ratio {}, {} of {} band(s) active",
            clip.start_time,
            clip.end_time,
            clip.volume,
            clip.aspect_ratio,
            clip.active_bands().count(),
            clip.equalizer.len()
        );
    }

    match spec.validate() {
        Ok(()) => {
            println!("\nEdit specification is valid.");
            Ok(())
        }
        Err(e) => {
            println!("\nValidation failed:");
            println!("  - {e}");
            Err(anyhow::anyhow!("invalid edit specification"))
        }
    }
}
