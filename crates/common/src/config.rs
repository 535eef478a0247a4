//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CollageError, CollageResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where uploaded inputs and finished collages live.
    #[serde(default)]
    pub work_dirs: WorkDirs,

    /// Encoder settings handed to the media executor.
    #[serde(default)]
    pub encoder: EncoderDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Working directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkDirs {
    /// Directory receiving uploaded source clips.
    pub uploads_dir: PathBuf,

    /// Directory receiving rendered collages.
    pub processed_dir: PathBuf,
}

/// Encoder parameters passed to ffmpeg.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderDefaults {
    /// ffmpeg executable name or absolute path.
    pub ffmpeg_binary: String,

    /// Video codec (`-c:v`).
    pub video_codec: String,

    /// Encoder speed preset (`-preset`).
    pub preset: String,

    /// Audio codec (`-c:a`).
    pub audio_codec: String,

    /// Output pixel format (`-pix_fmt`).
    pub pixel_format: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "collage=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dirs: WorkDirs::default(),
            encoder: EncoderDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WorkDirs {
    fn default() -> Self {
        let base = data_dir();
        Self {
            uploads_dir: base.join("uploads"),
            processed_dir: base.join("processed"),
        }
    }
}

impl Default for EncoderDefaults {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            video_codec: "libx264".to_string(),
            preset: "fast".to_string(),
            audio_codec: "aac".to_string(),
            pixel_format: "yuv420p".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from a path the user named explicitly. Unlike
    /// [`AppConfig::load_from`], a missing or malformed file is an error.
    pub fn load_required(config_path: &Path) -> CollageResult<Self> {
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            CollageError::config(format!("cannot read {}: {e}", config_path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            CollageError::config(format!("cannot parse {}: {e}", config_path.display()))
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("collage").join("config.json")
}

fn data_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("collage")
}
