//! Collage jobs and the render entry point.

use std::path::{Path, PathBuf};

use collage_common::config::EncoderDefaults;
use collage_common::error::{CollageError, CollageResult};
use collage_edit_model::edit::EditSpec;
use collage_processing_core::compiler::{compile_spec, CollagePlan};

use crate::cleanup::{remove_partial_output, TemporaryFiles};
use crate::ffmpeg::FfmpegBackend;

/// Who owns the input files once they are handed to a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputOwnership {
    /// The caller keeps the files; the job never touches them.
    #[default]
    Borrowed,
    /// The job owns the files and deletes them when it finishes.
    Temporary,
}

/// One collage request ready to be rendered.
#[derive(Debug, Clone)]
pub struct CollageJob {
    /// Source clips, in clip order.
    pub inputs: [PathBuf; 2],

    /// Whether `inputs` are deleted after the run.
    pub ownership: InputOwnership,

    /// Trim, audio and layout decisions.
    pub spec: EditSpec,

    /// Output file path.
    pub output_path: PathBuf,

    /// Codec settings.
    pub encoder: EncoderDefaults,
}

impl CollageJob {
    pub fn new(
        first: impl Into<PathBuf>,
        second: impl Into<PathBuf>,
        spec: EditSpec,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inputs: [first.into(), second.into()],
            ownership: InputOwnership::Borrowed,
            spec,
            output_path: output_path.into(),
            encoder: EncoderDefaults::default(),
        }
    }

    pub fn with_ownership(mut self, ownership: InputOwnership) -> Self {
        self.ownership = ownership;
        self
    }

    pub fn with_encoder(mut self, encoder: EncoderDefaults) -> Self {
        self.encoder = encoder;
        self
    }

    fn temporary_inputs(&self) -> TemporaryFiles {
        match self.ownership {
            InputOwnership::Temporary => TemporaryFiles::new(self.inputs.iter().cloned()),
            InputOwnership::Borrowed => TemporaryFiles::default(),
        }
    }
}

/// Progress callback for rendering.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send>;

/// Render progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Output timestamp reached so far, in seconds.
    pub out_time_secs: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: RenderStage,
}

impl RenderProgress {
    pub fn at_stage(stage: RenderStage) -> Self {
        let progress = if stage == RenderStage::Complete {
            1.0
        } else {
            0.0
        };
        Self {
            progress,
            out_time_secs: 0.0,
            eta_secs: 0.0,
            stage,
        }
    }
}

/// Stages of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// Trait for media executors.
pub trait RenderBackend: Send {
    /// Run the compiled plan for `job`, writing `job.output_path`.
    fn render(
        &mut self,
        job: &CollageJob,
        plan: &CollagePlan,
        progress: Option<&ProgressCallback>,
    ) -> CollageResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Default output location: `<processed_dir>/collage-<unix millis>.mp4`.
pub fn default_output_path(processed_dir: &Path) -> PathBuf {
    processed_dir.join(format!(
        "collage-{}.mp4",
        chrono::Utc::now().timestamp_millis()
    ))
}

/// Find a source clip. A relative path that does not exist from the
/// working directory is looked up under `uploads_dir`; anything else is
/// returned unchanged.
pub fn locate_input(path: &Path, uploads_dir: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    let uploaded = uploads_dir.join(path);
    if uploaded.is_file() {
        tracing::debug!(
            requested = %path.display(),
            resolved = %uploaded.display(),
            "Using uploaded clip"
        );
        return uploaded;
    }
    path.to_path_buf()
}

/// Render a collage with the ffmpeg backend configured in `job.encoder`.
///
/// This is the main entry point for rendering. The job is consumed, so a
/// request runs at most once.
pub async fn render_collage(
    job: CollageJob,
    progress: Option<ProgressCallback>,
) -> CollageResult<PathBuf> {
    let backend = FfmpegBackend::new(&job.encoder.ffmpeg_binary);
    render_collage_with(Box::new(backend), job, progress).await
}

/// Render a collage with an explicit backend.
pub async fn render_collage_with(
    mut backend: Box<dyn RenderBackend>,
    job: CollageJob,
    progress: Option<ProgressCallback>,
) -> CollageResult<PathBuf> {
    tokio::task::spawn_blocking(move || run_job(backend.as_mut(), job, progress))
        .await
        .map_err(|e| CollageError::Other(anyhow::anyhow!("render task failed: {e}")))?
}

/// Blocking body of a render. Temporary inputs are released when this
/// returns, on every path.
pub fn run_job(
    backend: &mut dyn RenderBackend,
    job: CollageJob,
    progress: Option<ProgressCallback>,
) -> CollageResult<PathBuf> {
    let _inputs = job.temporary_inputs();
    let report = |stage: RenderStage| {
        if let Some(cb) = &progress {
            cb(RenderProgress::at_stage(stage));
        }
    };

    tracing::info!(
        first = %job.inputs[0].display(),
        second = %job.inputs[1].display(),
        output = %job.output_path.display(),
        layout = %job.spec.layout,
        "Starting collage render"
    );
    report(RenderStage::Preparing);

    let plan = match prepare(backend, &job) {
        Ok(plan) => plan,
        Err(err) => {
            report(RenderStage::Failed);
            return Err(err);
        }
    };

    tracing::info!(backend = backend.name(), "Using render backend");
    let started = std::time::Instant::now();
    if let Err(err) = backend.render(&job, &plan, progress.as_ref()) {
        remove_partial_output(&job.output_path);
        report(RenderStage::Failed);
        tracing::warn!(error = %err, "Collage render failed");
        return Err(err);
    }

    tracing::info!(
        elapsed_secs = started.elapsed().as_secs_f64(),
        output = %job.output_path.display(),
        "Collage render finished"
    );
    Ok(job.output_path)
}

fn prepare(backend: &dyn RenderBackend, job: &CollageJob) -> CollageResult<CollagePlan> {
    let plan = compile_spec(&job.spec)?;

    for input in &job.inputs {
        if !input.is_file() {
            return Err(CollageError::FileNotFound {
                path: input.clone(),
            });
        }
    }

    if let Some(parent) = job.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Compare resolved paths so `..` and symlink aliases of an input are caught.
    let output = resolve_output_path(&job.output_path)?;
    for input in &job.inputs {
        if input.canonicalize()? == output {
            return Err(CollageError::invalid_argument(format!(
                "output {} would overwrite input {}",
                job.output_path.display(),
                input.display()
            )));
        }
    }

    if !backend.is_available() {
        return Err(CollageError::unsupported(format!(
            "render backend {} is not available",
            backend.name()
        )));
    }

    Ok(plan)
}

/// Canonical form of an output path whose file may not exist yet. The
/// parent directory must exist.
fn resolve_output_path(path: &Path) -> CollageResult<PathBuf> {
    if path.exists() {
        return Ok(path.canonicalize()?);
    }
    let name = path.file_name().ok_or_else(|| {
        CollageError::invalid_argument(format!(
            "output {} does not name a file",
            path.display()
        ))
    })?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok(parent.canonicalize()?.join(name))
}
