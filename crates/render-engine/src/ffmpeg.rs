//! ffmpeg backend: argument assembly, process supervision, progress parsing.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use collage_common::config::EncoderDefaults;
use collage_common::error::{CollageError, CollageResult};
use collage_processing_core::compiler::CollagePlan;

use crate::export::{CollageJob, ProgressCallback, RenderBackend, RenderProgress, RenderStage};

/// How long ffmpeg may go without advancing its output clock before a
/// warning is logged.
const STALL_WARNING: Duration = Duration::from_secs(10);

/// Trailing stderr lines kept in an execution error.
const DIAGNOSTIC_LINES: usize = 20;

/// Runs collage plans through an ffmpeg executable.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    binary: String,
}

impl FfmpegBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn run_ffmpeg(
        &self,
        args: &[String],
        expected_duration_secs: f64,
        progress: Option<&ProgressCallback>,
    ) -> CollageResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            CollageError::external_execution(
                "not started",
                format!("failed to start {}: {e}", self.binary),
            )
        })?;

        tracing::info!(
            pid = child.id(),
            args_len = args.len(),
            expected_duration_secs,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| {
                CollageError::external_execution("running", "failed to capture ffmpeg stdout")
            })?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| {
                CollageError::external_execution("running", "failed to capture ffmpeg stderr")
            })?;

        // ffmpeg blocks once the stderr pipe fills up, so drain it off-thread.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();

        let mut latest = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = Instant::now();
        loop {
            line.clear();
            let bytes = match reader.read_line(&mut line) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(error = %err, "Failed reading ffmpeg progress");
                    break;
                }
            };
            if bytes == 0 {
                break;
            }

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            latest.update(key, value);
            if key != "progress" {
                continue;
            }

            if latest.out_time_secs > last_progress_secs + 0.001 {
                last_progress_secs = latest.out_time_secs;
                last_progress_wall = Instant::now();
            }
            if let Some(cb) = progress {
                cb(progress_report(
                    &latest,
                    expected_duration_secs,
                    start.elapsed().as_secs_f64(),
                ));
            }
            if last_progress_wall.elapsed() >= STALL_WARNING {
                tracing::warn!(
                    out_time_secs = latest.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_progress_wall = Instant::now();
            }
        }

        // Close our end of the progress pipe so a child still writing to it
        // cannot block forever once we stop reading.
        drop(reader);

        let status = child.wait().map_err(|e| {
            CollageError::external_execution("unknown", format!("failed to wait on ffmpeg: {e}"))
        })?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        tracing::info!(
            status = %status,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "ffmpeg process exited"
        );

        if !status.success() {
            return Err(CollageError::external_execution(
                status.to_string(),
                summarize_diagnostics(&stderr_output),
            ));
        }

        Ok(())
    }
}

impl RenderBackend for FfmpegBackend {
    fn render(
        &mut self,
        job: &CollageJob,
        plan: &CollagePlan,
        progress: Option<&ProgressCallback>,
    ) -> CollageResult<()> {
        let args = build_args(job, plan);
        write_plan_report(&job.output_path, plan, &self.binary, &args);

        self.run_ffmpeg(&args, plan.duration_secs, progress)?;

        let written = std::fs::metadata(&job.output_path)
            .map(|meta| meta.len())
            .unwrap_or(0);
        if written == 0 {
            return Err(CollageError::external_execution(
                "exit status: 0",
                format!("ffmpeg produced no output at {}", job.output_path.display()),
            ));
        }

        if let Some(cb) = progress {
            cb(RenderProgress {
                progress: 1.0,
                out_time_secs: plan.duration_secs,
                eta_secs: 0.0,
                stage: RenderStage::Complete,
            });
        }
        tracing::info!(bytes = written, "ffmpeg output verified");
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Full ffmpeg argument vector for one job.
pub fn build_args(job: &CollageJob, plan: &CollagePlan) -> Vec<String> {
    let mut args: Vec<String> = [
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-nostats",
        "-progress",
        "pipe:1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    for input in &job.inputs {
        args.push("-i".to_string());
        args.push(input.display().to_string());
    }

    args.push("-filter_complex".to_string());
    args.push(plan.graph.to_filter_complex());
    args.push("-map".to_string());
    args.push(format!("[{}]", plan.graph.video_out()));
    args.push("-map".to_string());
    args.push(format!("[{}]", plan.graph.audio_out()));

    args.append(&mut codec_args(&job.encoder));
    args.push("-shortest".to_string());
    args.push(job.output_path.display().to_string());
    args
}

fn codec_args(encoder: &EncoderDefaults) -> Vec<String> {
    vec![
        "-c:v".to_string(),
        encoder.video_codec.clone(),
        "-preset".to_string(),
        encoder.preset.clone(),
        "-pix_fmt".to_string(),
        encoder.pixel_format.clone(),
        "-c:a".to_string(),
        encoder.audio_codec.clone(),
    ]
}

/// Write `<output>.plan.txt` next to the output. Failure only warns.
fn write_plan_report(output: &Path, plan: &CollagePlan, binary: &str, args: &[String]) {
    let layout = serde_json::to_string(&plan.layout).unwrap_or_else(|e| format!("<{e}>"));
    let report = format!(
        "layout={layout}\nduration_secs={:.3}\nnodes={}\nfilter_complex={}\ncommand={binary} {}\n",
        plan.duration_secs,
        plan.graph.node_count(),
        plan.graph.to_filter_complex(),
        args.join(" "),
    );

    let path = output.with_extension("plan.txt");
    if let Err(err) = std::fs::write(&path, report) {
        tracing::warn!(error = %err, path = %path.display(), "Failed to write plan report");
    } else {
        tracing::info!(path = %path.display(), "Wrote plan report");
    }
}

/// Keep the tail of ffmpeg's stderr, which is where the actual error lives.
fn summarize_diagnostics(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return "ffmpeg reported no diagnostics".to_string();
    }
    let skip = lines.len().saturating_sub(DIAGNOSTIC_LINES);
    lines[skip..].join("\n")
}

/// Whether `binary` runs at all.
pub fn command_exists(binary: &str) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// First line of `binary -version`, if it runs.
pub fn ffmpeg_version(binary: &str) -> Option<String> {
    let output = Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let raw = String::from_utf8(output.stdout).ok()?;
    raw.lines().next().map(|line| line.trim().to_string())
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // Despite the name, ffmpeg reports out_time_ms in microseconds.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> RenderProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    RenderProgress {
        progress: if state.complete { 1.0 } else { progress },
        out_time_secs: state.out_time_secs,
        eta_secs,
        stage: if state.complete {
            RenderStage::Finalizing
        } else {
            RenderStage::Rendering
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collage_edit_model::edit::{ClipEdit, EditSpec, LayoutMode};
    use collage_processing_core::compiler::compile_spec;

    fn sample_job() -> CollageJob {
        let spec = EditSpec::new(
            LayoutMode::Row,
            ClipEdit::new(0.0, 10.0),
            ClipEdit::new(2.0, 6.0),
        );
        CollageJob::new("/in/one.mp4", "/in/two.mov", spec, "/out/collage.mp4")
    }

    #[test]
    fn test_args_follow_executor_contract() {
        let job = sample_job();
        let plan = compile_spec(&job.spec).unwrap();
        let args = build_args(&job, &plan);

        let pos = |needle: &str| args.iter().position(|a| a == needle).unwrap();
        let preamble = [
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostats",
            "-progress",
            "pipe:1",
        ];
        assert_eq!(&args[..7], &preamble);
        assert_eq!(args[pos("-filter_complex") + 1], plan.graph.to_filter_complex());
        assert_eq!(args[pos("-c:v") + 1], "libx264");
        assert_eq!(args[pos("-preset") + 1], "fast");
        assert_eq!(args[pos("-pix_fmt") + 1], "yuv420p");
        assert_eq!(args[pos("-c:a") + 1], "aac");
        assert!(args.contains(&"-shortest".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/out/collage.mp4"));

        let inputs: Vec<&str> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| a.as_str() == "-i")
            .map(|(i, _)| args[i + 1].as_str())
            .collect();
        assert_eq!(inputs, vec!["/in/one.mp4", "/in/two.mov"]);

        let maps: Vec<&str> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| a.as_str() == "-map")
            .map(|(i, _)| args[i + 1].as_str())
            .collect();
        assert_eq!(maps, vec!["[vout]", "[aout]"]);
    }

    #[test]
    fn test_encoder_overrides_reach_args() {
        let job = sample_job().with_encoder(EncoderDefaults {
            video_codec: "libx265".to_string(),
            preset: "veryfast".to_string(),
            ..EncoderDefaults::default()
        });
        let plan = compile_spec(&job.spec).unwrap();
        let args = build_args(&job, &plan);
        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libx265"));
        assert!(args.windows(2).any(|w| w[0] == "-preset" && w[1] == "veryfast"));
    }

    #[test]
    fn test_progress_state_parses_ffmpeg_keys() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "2500000");
        assert!((state.out_time_secs - 2.5).abs() < 1e-9);
        state.update("out_time_ms", "4000000");
        assert!((state.out_time_secs - 4.0).abs() < 1e-9);
        state.update("out_time_us", "N/A");
        assert!((state.out_time_secs - 4.0).abs() < 1e-9);
        state.update("progress", "continue");
        assert!(!state.complete);
        state.update("progress", "end");
        assert!(state.complete);
    }

    #[test]
    fn test_progress_report_clamps_and_estimates() {
        let state = ProgressState {
            out_time_secs: 5.0,
            complete: false,
        };
        let report = progress_report(&state, 10.0, 2.0);
        assert!((report.progress - 0.5).abs() < 1e-9);
        assert!((report.eta_secs - 2.0).abs() < 1e-9);
        assert_eq!(report.stage, RenderStage::Rendering);

        let overshoot = ProgressState {
            out_time_secs: 12.0,
            complete: false,
        };
        assert_eq!(progress_report(&overshoot, 10.0, 1.0).progress, 1.0);

        let done = ProgressState {
            out_time_secs: 9.9,
            complete: true,
        };
        let report = progress_report(&done, 10.0, 3.0);
        assert_eq!(report.progress, 1.0);
        assert_eq!(report.stage, RenderStage::Finalizing);

        assert_eq!(progress_report(&state, 0.0, 1.0).progress, 0.0);
    }

    #[test]
    fn test_diagnostics_keep_the_tail() {
        let stderr: String = (0..30).map(|i| format!("line {i}\n\n")).collect();
        let summary = summarize_diagnostics(&stderr);
        assert_eq!(summary.lines().count(), DIAGNOSTIC_LINES);
        assert!(summary.starts_with("line 10"));
        assert!(summary.ends_with("line 29"));
        assert_eq!(summarize_diagnostics("  \n"), "ffmpeg reported no diagnostics");
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let backend = FfmpegBackend::new("collage-test-no-such-ffmpeg");
        assert!(!backend.is_available());
        assert!(ffmpeg_version(backend.binary()).is_none());
    }

    #[test]
    fn test_plan_report_written_next_to_output() {
        let dir = std::env::temp_dir().join("collage_test_plan_report");
        std::fs::create_dir_all(&dir).unwrap();
        let mut job = sample_job();
        job.output_path = dir.join("collage-1.mp4");
        let plan = compile_spec(&job.spec).unwrap();
        let args = build_args(&job, &plan);

        write_plan_report(&job.output_path, &plan, "ffmpeg", &args);
        let report = std::fs::read_to_string(dir.join("collage-1.plan.txt")).unwrap();
        assert!(report.contains("duration_secs=10.000"));
        assert!(report.contains("[vout]"));
        assert!(report.contains("\"canvas_height\":1080"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_progress_does_not_deadlock_wait() {
        // Invalid UTF-8 aborts progress parsing, then the child keeps writing
        // far more than a pipe buffer holds.
        let backend = FfmpegBackend::new("sh");
        let args = vec![
            "-c".to_string(),
            "printf '\\377\\n'; head -c 1000000 /dev/zero; exit 0".to_string(),
        ];
        let result = backend.run_ffmpeg(&args, 1.0, None);
        assert!(result.is_ok());
    }

    #[test]
    fn test_failed_spawn_is_external_execution_error() {
        let backend = FfmpegBackend::new("collage-test-no-such-ffmpeg");
        let err = backend.run_ffmpeg(&[], 1.0, None).unwrap_err();
        assert!(matches!(err, CollageError::ExternalExecution { .. }));
    }
}
