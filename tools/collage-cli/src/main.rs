//! Collage CLI: plan, inspect, and render two-clip video collages.
//!
//! Usage:
//!   collage render <V1> <V2> --edit <JSON>   Render a collage with ffmpeg
//!   collage plan --edit <JSON>               Print the compiled filter graph
//!   collage layout <R1> <R2>                 Show canvas geometry for two ratios
//!   collage validate <JSON>                  Validate an edit specification
//!   collage init <PATH>                      Write a template edit specification
//!   collage check                            Check ffmpeg and configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use collage_common::config::AppConfig;
use collage_edit_model::edit::LayoutMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "collage",
    about = "Side-by-side and stacked video collages from two trimmed clips",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the XDG config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a collage of two clips
    Render {
        /// First clip (relative names are also looked up in the uploads dir)
        video1: PathBuf,

        /// Second clip (relative names are also looked up in the uploads dir)
        video2: PathBuf,

        /// Edit specification (JSON)
        #[arg(short, long)]
        edit: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Delete both input clips once the render finishes
        #[arg(long)]
        temporary_inputs: bool,
    },

    /// Compile an edit specification and print the filter graph
    Plan {
        /// Edit specification (JSON)
        #[arg(short, long)]
        edit: PathBuf,

        /// Print the layout and graph as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve canvas geometry for two aspect ratios
    Layout {
        /// Aspect ratio of the first clip, e.g. 16:9
        ratio1: String,

        /// Aspect ratio of the second clip, e.g. 9:16
        ratio2: String,

        /// Layout mode: row|column
        #[arg(long, default_value = "row")]
        mode: LayoutMode,
    },

    /// Validate an edit specification
    Validate {
        /// Path to the edit specification
        path: PathBuf,
    },

    /// Write a template edit specification
    Init {
        /// Destination file
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check that ffmpeg is usable
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_required(path)?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    collage_common::logging::init_logging(&config.logging);
    tracing::debug!(
        ffmpeg = %config.encoder.ffmpeg_binary,
        processed_dir = %config.work_dirs.processed_dir.display(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Render {
            video1,
            video2,
            edit,
            output,
            temporary_inputs,
        } => commands::render::run(&config, video1, video2, edit, output, temporary_inputs).await,
        Commands::Plan { edit, json } => commands::plan::run(edit, json),
        Commands::Layout {
            ratio1,
            ratio2,
            mode,
        } => commands::layout::run(&ratio1, &ratio2, mode),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Init { path, force } => commands::init::run(path, force),
        Commands::Check => commands::check::run(&config, cli.config.as_deref()),
    }
}
