pub mod telemetry;

use tracing::warn;

/// Clamp a probability-like value into [0, 1]. Corrections are logged so
/// out-of-range outputs stay visible for calibration review; NaN becomes 0.
pub fn clamp_unit(field: &'static str, value: f64) -> f64 {
    if value.is_nan() {
        warn!(field, "NaN clamped to 0");
        return 0.0;
    }
    if !(0.0..=1.0).contains(&value) {
        warn!(field, value, "value outside [0, 1] clamped");
        return value.clamp(0.0, 1.0);
    }
    value
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(clamp_unit("t", 1.2), 1.0);
        assert_eq!(clamp_unit("t", -0.1), 0.0);
        assert_eq!(clamp_unit("t", f64::NAN), 0.0);
        assert_eq!(clamp_unit("t", 0.42), 0.42);
    }

    #[test]
    fn rounds_to_three_places() {
        assert_eq!(round3(0.41249), 0.412);
        assert_eq!(round3(0.9), 0.9);
    }
}
