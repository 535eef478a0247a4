//! Numeric helpers shared by the resolver and the compiler.

use collage_common::error::{CollageError, CollageResult};

/// Largest canvas or frame edge the resolver will produce.
pub const MAX_DIMENSION: u32 = 32_768;

/// Smallest frame edge; the encoder cannot scale to zero.
pub const MIN_DIMENSION: u32 = 2;

/// Round to the nearest even number: `2 * round(n / 2)`.
pub fn ensure_even(n: f64) -> f64 {
    2.0 * (n / 2.0).round()
}

/// Round `n` to an even pixel dimension within
/// `[MIN_DIMENSION, MAX_DIMENSION]`.
pub fn even_dimension(n: f64) -> CollageResult<u32> {
    if !n.is_finite() {
        return Err(CollageError::invalid_argument(format!(
            "dimension {n} is not a finite number"
        )));
    }
    let even = ensure_even(n).max(MIN_DIMENSION as f64);
    if even > MAX_DIMENSION as f64 {
        return Err(CollageError::invalid_argument(format!(
            "dimension {even} exceeds the maximum of {MAX_DIMENSION}"
        )));
    }
    Ok(even as u32)
}

/// Render a number for a filter argument.
///
/// Uses the shortest text that parses back to the same value, so two
/// distinct trim points never render alike and a non-zero gain never
/// renders as `0`. Never uses exponent notation.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_even_rounds_to_nearest() {
        assert_eq!(ensure_even(1040.0), 1040.0);
        assert_eq!(ensure_even(1848.8), 1848.0);
        assert_eq!(ensure_even(585.0), 586.0);
        assert_eq!(ensure_even(584.9), 584.0);
        assert_eq!(ensure_even(0.4), 0.0);
    }

    #[test]
    fn test_even_dimension_bounds() {
        assert_eq!(even_dimension(0.3).unwrap(), MIN_DIMENSION);
        assert_eq!(even_dimension(1849.0).unwrap(), 1848);
        assert!(even_dimension(f64::INFINITY).is_err());
        assert!(even_dimension(f64::NAN).is_err());
        assert!(even_dimension(100_000.0).is_err());
    }

    #[test]
    fn test_format_number_is_shortest_exact() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(-3.25), "-3.25");
        assert_eq!(format_number(1.41), "1.41");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333333333");
    }

    #[test]
    fn test_format_number_keeps_tiny_values_distinct() {
        assert_eq!(format_number(0.0000001), "0.0000001");
        assert_eq!(format_number(0.0000004), "0.0000004");
        assert_ne!(format_number(0.0000001), "0");

        for value in [0.0000001, 1e-12, 12345.678901234, 7.5] {
            assert_eq!(format_number(value).parse::<f64>().unwrap(), value);
        }
    }
}
