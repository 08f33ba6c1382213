//! Float rounding at a fixed number of decimal digits.

/// Rounds half away from zero to `precision` decimal digits.
pub fn round_float(value: f64, precision: u32) -> f64 {
    let ratio = scale(precision);
    (value * ratio).round() / ratio
}

/// Rounds toward negative infinity at `precision` decimal digits.
pub fn round_down_float(value: f64, precision: u32) -> f64 {
    let ratio = scale(precision);
    (value * ratio).floor() / ratio
}

/// Rounds toward positive infinity at `precision` decimal digits.
pub fn round_up_float(value: f64, precision: u32) -> f64 {
    let ratio = scale(precision);
    (value * ratio).ceil() / ratio
}

fn scale(precision: u32) -> f64 {
    10f64.powi(precision.min(i32::MAX as u32) as i32)
}

#[cfg(test)]
mod tests {
    use super::{round_down_float, round_float, round_up_float};

    #[test]
    fn rounds_to_precision() {
        let value = 0.123_748_638_462_938_74;
        assert_eq!(round_float(value, 5), 0.12375);
        assert_eq!(round_float(value, 7), 0.1237486);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_float(2.5, 0), 3.0);
        assert_eq!(round_float(-2.5, 0), -3.0);
        assert_eq!(round_float(1.25, 1), 1.3);
    }

    #[test]
    fn floor_and_ceil() {
        assert_eq!(round_down_float(1.239, 2), 1.23);
        assert_eq!(round_up_float(1.231, 2), 1.24);
        assert_eq!(round_down_float(-1.231, 2), -1.24);
        assert_eq!(round_up_float(-1.239, 2), -1.23);
    }
}
