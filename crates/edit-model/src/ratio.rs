//! Aspect ratio parsing.
//!
//! Ratios arrive as `"W:H"` strings. They are parsed by splitting on the
//! separator and reading two positive integers; nothing else is accepted.

use std::fmt;
use std::str::FromStr;

use collage_common::error::{CollageError, CollageResult};
use serde::{Deserialize, Serialize};

/// Separator between the width and height terms.
pub const RATIO_SEPARATOR: char = ':';

/// A target aspect ratio made of two positive integer terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    width: u32,
    height: u32,
}

impl AspectRatio {
    /// 16:9 landscape.
    pub const LANDSCAPE: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };

    /// Create a ratio, rejecting zero terms.
    pub fn new(width: u32, height: u32) -> CollageResult<Self> {
        if width == 0 || height == 0 {
            return Err(CollageError::invalid_argument(format!(
                "aspect ratio terms must be positive, got {width}:{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Width term.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height term.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width divided by height.
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::LANDSCAPE
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.width, RATIO_SEPARATOR, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = CollageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s.trim().split_once(RATIO_SEPARATOR).ok_or_else(|| {
            CollageError::invalid_argument(format!(
                "aspect ratio {s:?} must have the form W{RATIO_SEPARATOR}H"
            ))
        })?;

        let width = parse_term(w, s)?;
        let height = parse_term(h, s)?;
        Self::new(width, height)
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = CollageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.to_string()
    }
}

fn parse_term(term: &str, whole: &str) -> CollageResult<u32> {
    let term = term.trim();
    // `u32::from_str` accepts a leading '+'; only bare digits are allowed here.
    if term.is_empty() || !term.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CollageError::invalid_argument(format!(
            "aspect ratio {whole:?} has a non-numeric term {term:?}"
        )));
    }
    term.parse::<u32>().map_err(|e| {
        CollageError::invalid_argument(format!(
            "aspect ratio {whole:?} has an out-of-range term {term:?}: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_landscape() {
        let ratio: AspectRatio = "16:9".parse().unwrap();
        assert_eq!(ratio.width(), 16);
        assert_eq!(ratio.height(), 9);
        assert!((ratio.as_f64() - 16.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_tolerates_surrounding_whitespace() {
        let ratio: AspectRatio = " 9 : 16 ".parse().unwrap();
        assert_eq!(ratio, AspectRatio::new(9, 16).unwrap());
    }

    #[test]
    fn test_rejects_zero_terms() {
        assert!("0:9".parse::<AspectRatio>().is_err());
        assert!("16:0".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_rejects_negative_and_non_numeric() {
        for bad in ["-16:9", "16:-9", "a:b", "16", "16:9:1", "", ":", "1.5:1", "+4:3", "16/9"] {
            let err = bad.parse::<AspectRatio>().unwrap_err();
            assert!(err.is_caller_error(), "{bad:?} should be rejected as invalid");
        }
    }

    #[test]
    fn test_rejects_expressions() {
        assert!("16*2:9".parse::<AspectRatio>().is_err());
        assert!("process.exit():1".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_serde_uses_string_form() {
        let ratio = AspectRatio::new(4, 3).unwrap();
        let json = serde_json::to_string(&ratio).unwrap();
        assert_eq!(json, "\"4:3\"");

        let parsed: AspectRatio = serde_json::from_str("\"1:1\"").unwrap();
        assert_eq!(parsed, AspectRatio::new(1, 1).unwrap());

        assert!(serde_json::from_str::<AspectRatio>("\"0:1\"").is_err());
    }
}
