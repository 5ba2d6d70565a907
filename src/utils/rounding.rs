//! Numeric rounding independent of display formatting.

/// Rounds half away from zero to `decimals` places.
pub fn round_half_away(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    // f64::round already rounds ties away from zero
    (value * factor).round() / factor
}
