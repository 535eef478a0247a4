//! Check that ffmpeg is usable and show the effective configuration.

use std::path::Path;

use collage_common::config::{config_file_path, AppConfig};
use collage_render_engine::export::RenderBackend;
use collage_render_engine::ffmpeg::{ffmpeg_version, FfmpegBackend};

pub fn run(config: &AppConfig, config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("Collage System Check");
    println!("{}", "=".repeat(50));

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);
    if path.exists() {
        println!("[OK] Config: {}", path.display());
    } else {
        println!("[INFO] Config: {} (not found, using defaults)", path.display());
    }

    let backend = FfmpegBackend::new(&config.encoder.ffmpeg_binary);
    let available = backend.is_available();
    match ffmpeg_version(backend.binary()) {
        Some(version) if available => println!("[OK] {version}"),
        _ => println!("[FAIL] ffmpeg not runnable: {}", backend.binary()),
    }

    println!(
        "     Encoder: {} ({}), {}, {}",
        config.encoder.video_codec,
        config.encoder.preset,
        config.encoder.pixel_format,
        config.encoder.audio_codec
    );
    println!("     Uploads: {}", config.work_dirs.uploads_dir.display());
    println!("     Output:  {}", config.work_dirs.processed_dir.display());

    println!();
    if available {
        println!("ffmpeg is available. Collage is ready to render.");
    } else {
        println!("Install ffmpeg or set encoder.ffmpeg_binary in the config file.");
    }

    Ok(())
}
