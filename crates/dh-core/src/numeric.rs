//! Small numeric helpers that never produce NaN.

/// Division that yields zero instead of NaN/inf when the denominator vanishes
/// or the numerator is zero.
pub fn ratio_or_zero(num: f64, den: f64) -> f64 {
    if num == 0.0 || !den.is_finite() || den.abs() < f64::EPSILON {
        0.0
    } else {
        num / den
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Coefficient of variation (population std / mean), `None` when undefined.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let mu = mean(values)?;
    if mu.abs() < f64::EPSILON {
        return None;
    }
    let var = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt() / mu.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_or_zero_never_nan() {
        assert_eq!(ratio_or_zero(0.0, 0.0), 0.0);
        assert_eq!(ratio_or_zero(5.0, 0.0), 0.0);
        assert_eq!(ratio_or_zero(5.0, f64::INFINITY), 0.0);
        assert_eq!(ratio_or_zero(6.0, 3.0), 2.0);
    }

    #[test]
    fn mean_of_nothing() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn cv_of_identical_values_is_zero() {
        assert_eq!(coefficient_of_variation(&[4.0, 4.0, 4.0]), Some(0.0));
        assert!(coefficient_of_variation(&[]).is_none());
        assert!(coefficient_of_variation(&[0.0, 0.0]).is_none());
        let cv = coefficient_of_variation(&[1.0, 3.0]).unwrap();
        assert!((cv - 0.5).abs() < 1e-12);
    }
}
