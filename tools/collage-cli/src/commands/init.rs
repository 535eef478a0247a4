//! Write a template edit specification.

use std::path::PathBuf;

use collage_edit_model::edit::EditSpec;

pub fn run(path: PathBuf, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        return Err(anyhow::anyhow!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let template = EditSpec::template();
    std::fs::write(&path, template.to_json_pretty()?)?;

    println!("Template written to {}", path.display());
    println!("  Layout: {}", template.layout);
    println!("  Clips: 0s-10s, unity volume, 16:9, flat 5-band equalizer");
    println!();
    println!("Edit trimmer1/trimmer2, then run:");
    println!("  collage render <video1> <video2> --edit {}", path.display());

    Ok(())
}
