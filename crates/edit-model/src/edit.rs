//! Clip edits and the two-clip edit specification.
//!
//! The JSON shape mirrors what the editor front-end submits:
//!
//! ```json
//! {
//!   "layout": "row",
//!   "trimmer1": { "startTime": 0, "endTime": 10, "volume": 1,
//!                 "aspectRatio": "16:9",
//!                 "equalizer": [{ "id": "band1", "frequency": 60, "gain": 3 }] },
//!   "trimmer2": { ... }
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use collage_common::error::{CollageError, CollageResult};
use serde::{Deserialize, Serialize};

use crate::ratio::AspectRatio;

/// Lowest accepted equalizer gain (dB).
pub const MIN_GAIN_DB: f64 = -12.0;
/// Highest accepted equalizer gain (dB).
pub const MAX_GAIN_DB: f64 = 12.0;

/// How the two clips are arranged on the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Side by side.
    #[default]
    Row,
    /// Stacked vertically.
    Column,
}

impl LayoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Column => "column",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = CollageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "row" => Ok(Self::Row),
            "column" => Ok(Self::Column),
            other => Err(CollageError::invalid_argument(format!(
                "unknown layout mode {other:?} (expected row or column)"
            ))),
        }
    }
}

/// Which of the two input clips something refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClipIndex {
    First,
    Second,
}

impl ClipIndex {
    /// Both clips, in processing order.
    pub const ALL: [ClipIndex; 2] = [ClipIndex::First, ClipIndex::Second];

    /// Zero-based position of the clip's source among the executor inputs.
    pub fn input_index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

impl fmt::Display for ClipIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip {}", self.input_index() + 1)
    }
}

/// One peaking equalizer band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqBand {
    /// Identifier, unique within a clip's equalizer.
    pub id: String,

    /// Center frequency in Hz.
    #[serde(rename = "frequency")]
    pub frequency_hz: f64,

    /// Boost (positive) or cut (negative) in dB.
    #[serde(rename = "gain")]
    pub gain_db: f64,
}

impl EqBand {
    pub fn new(id: impl Into<String>, frequency_hz: f64, gain_db: f64) -> Self {
        Self {
            id: id.into(),
            frequency_hz,
            gain_db,
        }
    }

    /// A band with zero gain does nothing and never reaches the filter graph.
    pub fn is_flat(&self) -> bool {
        self.gain_db == 0.0
    }

    /// The flat five-band preset the editor starts every clip with.
    pub fn default_bands() -> Vec<EqBand> {
        vec![
            EqBand::new("band1", 60.0, 0.0),
            EqBand::new("band2", 250.0, 0.0),
            EqBand::new("band3", 1000.0, 0.0),
            EqBand::new("band4", 4000.0, 0.0),
            EqBand::new("band5", 12000.0, 0.0),
        ]
    }
}

/// Per-clip editing decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipEdit {
    /// Trim start in seconds.
    pub start_time: f64,

    /// Trim end in seconds (exclusive).
    pub end_time: f64,

    /// Linear gain; 1.0 is unity.
    #[serde(default = "unity_volume")]
    pub volume: f64,

    /// Target aspect ratio the clip is center-cropped to.
    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    /// Bands in processing order.
    #[serde(default)]
    pub equalizer: Vec<EqBand>,
}

fn unity_volume() -> f64 {
    1.0
}

impl ClipEdit {
    /// A unity-gain, flat-EQ, 16:9 edit of `[start_time, end_time)`.
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self {
            start_time,
            end_time,
            volume: 1.0,
            aspect_ratio: AspectRatio::default(),
            equalizer: Vec::new(),
        }
    }

    /// Length of the trim window in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Bands that actually alter the signal, in declared order.
    pub fn active_bands(&self) -> impl Iterator<Item = &EqBand> {
        self.equalizer.iter().filter(|band| !band.is_flat())
    }

    /// Check the clip's fields. `clip` names the clip in error messages.
    pub fn validate(&self, clip: ClipIndex) -> CollageResult<()> {
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(CollageError::invalid_argument(format!(
                "{clip}: startTime must be a finite value >= 0, got {}",
                self.start_time
            )));
        }
        if !self.end_time.is_finite() || self.end_time <= self.start_time {
            return Err(CollageError::invalid_argument(format!(
                "{clip}: endTime ({}) must be greater than startTime ({})",
                self.end_time, self.start_time
            )));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(CollageError::invalid_argument(format!(
                "{clip}: volume must be a finite value >= 0, got {}",
                self.volume
            )));
        }

        let mut seen = HashSet::new();
        for band in &self.equalizer {
            if !seen.insert(band.id.as_str()) {
                return Err(CollageError::invalid_argument(format!(
                    "{clip}: duplicate equalizer band id {:?}",
                    band.id
                )));
            }
            if !band.frequency_hz.is_finite() || band.frequency_hz <= 0.0 {
                return Err(CollageError::invalid_argument(format!(
                    "{clip}: band {:?} frequency must be positive, got {}",
                    band.id, band.frequency_hz
                )));
            }
            if !band.gain_db.is_finite() || !(MIN_GAIN_DB..=MAX_GAIN_DB).contains(&band.gain_db) {
                return Err(CollageError::invalid_argument(format!(
                    "{clip}: band {:?} gain {} dB is outside [{MIN_GAIN_DB}, {MAX_GAIN_DB}]",
                    band.id, band.gain_db
                )));
            }
        }

        Ok(())
    }
}

/// The full edit request: layout plus both clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSpec {
    /// Absent in older requests; those were always side by side.
    #[serde(default)]
    pub layout: LayoutMode,

    #[serde(rename = "trimmer1")]
    pub first: ClipEdit,

    #[serde(rename = "trimmer2")]
    pub second: ClipEdit,
}

impl EditSpec {
    pub fn new(layout: LayoutMode, first: ClipEdit, second: ClipEdit) -> Self {
        Self {
            layout,
            first,
            second,
        }
    }

    /// Starting point for a new request: two ten-second 16:9 clips with the
    /// flat five-band equalizer.
    pub fn template() -> Self {
        let clip = ClipEdit {
            equalizer: EqBand::default_bands(),
            ..ClipEdit::new(0.0, 10.0)
        };
        Self::new(LayoutMode::Row, clip.clone(), clip)
    }

    /// Parse a JSON edit spec. Malformed JSON is a caller error.
    pub fn from_json(json: &str) -> CollageResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            CollageError::invalid_argument(format!("malformed edit specification: {e}"))
        })
    }

    /// Read and parse an edit spec file.
    pub fn load(path: impl AsRef<std::path::Path>) -> CollageResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CollageError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> CollageResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn clip(&self, index: ClipIndex) -> &ClipEdit {
        match index {
            ClipIndex::First => &self.first,
            ClipIndex::Second => &self.second,
        }
    }

    /// Validate both clips, first clip first.
    pub fn validate(&self) -> CollageResult<()> {
        for index in ClipIndex::ALL {
            self.clip(index).validate(index)?;
        }
        Ok(())
    }

    /// Length of the longer trimmed clip; the mixed audio runs this long.
    pub fn longest_duration_secs(&self) -> f64 {
        self.first.duration_secs().max(self.second.duration_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_front_end_payload() {
        let json = r#"{
            "layout": "column",
            "trimmer1": {
                "startTime": 1.5, "endTime": 6, "volume": 0.8, "aspectRatio": "9:16",
                "equalizer": [{"id": "band1", "frequency": 60, "gain": 4}]
            },
            "trimmer2": {
                "startTime": 0, "endTime": 3, "volume": 1.2, "aspectRatio": "1:1",
                "equalizer": []
            }
        }"#;

        let spec = EditSpec::from_json(json).unwrap();
        assert_eq!(spec.layout, LayoutMode::Column);
        assert_eq!(spec.first.aspect_ratio, AspectRatio::new(9, 16).unwrap());
        assert_eq!(spec.first.equalizer[0].frequency_hz, 60.0);
        assert_eq!(spec.first.equalizer[0].gain_db, 4.0);
        assert!((spec.first.duration_secs() - 4.5).abs() < 1e-12);
        assert!((spec.longest_duration_secs() - 4.5).abs() < 1e-12);
        spec.validate().unwrap();
    }

    #[test]
    fn test_layout_defaults_to_row() {
        let json = r#"{
            "trimmer1": {"startTime": 0, "endTime": 1, "volume": 1, "aspectRatio": "16:9", "equalizer": []},
            "trimmer2": {"startTime": 0, "endTime": 1, "volume": 1, "aspectRatio": "16:9", "equalizer": []}
        }"#;
        assert_eq!(EditSpec::from_json(json).unwrap().layout, LayoutMode::Row);
    }

    #[test]
    fn test_malformed_ratio_is_caller_error() {
        let json = r#"{
            "trimmer1": {"startTime": 0, "endTime": 1, "aspectRatio": "16x9"},
            "trimmer2": {"startTime": 0, "endTime": 1}
        }"#;
        let err = EditSpec::from_json(json).unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_equal_start_and_end_rejected() {
        let clip = ClipEdit::new(5.0, 5.0);
        let err = clip.validate(ClipIndex::First).unwrap_err();
        assert!(matches!(err, CollageError::InvalidArgument { .. }));
        assert!(err.to_string().contains("clip 1"));
    }

    #[test]
    fn test_negative_start_and_volume_rejected() {
        assert!(ClipEdit::new(-1.0, 2.0).validate(ClipIndex::First).is_err());

        let mut clip = ClipEdit::new(0.0, 2.0);
        clip.volume = -0.5;
        assert!(clip.validate(ClipIndex::Second).is_err());

        clip.volume = f64::NAN;
        assert!(clip.validate(ClipIndex::Second).is_err());
    }

    #[test]
    fn test_gain_out_of_range_rejected() {
        let mut clip = ClipEdit::new(0.0, 2.0);
        clip.equalizer = vec![EqBand::new("b1", 1000.0, 12.5)];
        let err = clip.validate(ClipIndex::Second).unwrap_err();
        assert!(err.to_string().contains("clip 2"));

        clip.equalizer = vec![EqBand::new("b1", 1000.0, -12.0)];
        clip.validate(ClipIndex::Second).unwrap();
    }

    #[test]
    fn test_duplicate_band_ids_rejected() {
        let mut clip = ClipEdit::new(0.0, 2.0);
        clip.equalizer = vec![
            EqBand::new("b1", 60.0, 1.0),
            EqBand::new("b1", 250.0, 2.0),
        ];
        assert!(clip.validate(ClipIndex::First).is_err());
    }

    #[test]
    fn test_non_positive_frequency_rejected() {
        let mut clip = ClipEdit::new(0.0, 2.0);
        clip.equalizer = vec![EqBand::new("b1", 0.0, 1.0)];
        assert!(clip.validate(ClipIndex::First).is_err());
    }

    #[test]
    fn test_active_bands_skip_flat_ones_in_order() {
        let mut clip = ClipEdit::new(0.0, 2.0);
        clip.equalizer = vec![
            EqBand::new("a", 60.0, 0.0),
            EqBand::new("b", 250.0, -3.0),
            EqBand::new("c", 1000.0, 0.0),
            EqBand::new("d", 4000.0, 6.0),
        ];
        let ids: Vec<&str> = clip.active_bands().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d"]);
    }

    #[test]
    fn test_template_is_valid_and_flat() {
        let spec = EditSpec::template();
        spec.validate().unwrap();
        assert_eq!(spec.first.equalizer.len(), 5);
        assert_eq!(spec.first.active_bands().count(), 0);

        let json = spec.to_json_pretty().unwrap();
        assert!(json.contains("\"trimmer1\""));
        assert!(json.contains("\"startTime\""));
        assert_eq!(EditSpec::from_json(&json).unwrap(), spec);
    }

    #[test]
    fn test_layout_mode_from_str() {
        assert_eq!("Column".parse::<LayoutMode>().unwrap(), LayoutMode::Column);
        assert_eq!("row".parse::<LayoutMode>().unwrap(), LayoutMode::Row);
        assert!("grid".parse::<LayoutMode>().is_err());
    }
}
