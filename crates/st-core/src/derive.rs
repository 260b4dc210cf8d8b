//! Derived metric computation.
//!
//! Everything here is a pure function over values already present in a
//! record. Stored results keep full precision; rounding happens only in
//! the presentation-facing formatters.

/// Milliseconds per hour, for duration derivation.
const MS_PER_HOUR: f64 = 3_600_000.0;

/// PMI lift: observed joint probability over the independence baseline.
///
/// Undefined when either marginal is zero; returns NaN as the sentinel.
/// Callers must treat an undefined lift as "insufficient data", not as
/// low lift.
pub fn lift(p_a: f64, p_b: f64, p_ab: f64) -> f64 {
    if p_a == 0.0 || p_b == 0.0 {
        return f64::NAN;
    }
    p_ab / (p_a * p_b)
}

/// Format a lag for display.
///
/// Zero is "simultaneous"; anything else is sign-prefixed minutes with one
/// decimal. The sign reflects participant order: `+` when participants[0]
/// leads.
pub fn format_lag(lag_seconds: f64, first_leads: bool) -> String {
    if lag_seconds == 0.0 {
        return "simultaneous".to_string();
    }
    let sign = if first_leads { '+' } else { '-' };
    format!("{}{:.1}m", sign, lag_seconds.abs() / 60.0)
}

/// Convert a millisecond span to hours at full precision.
pub fn duration_hours(duration_ms: i64) -> f64 {
    duration_ms as f64 / MS_PER_HOUR
}

/// Presentation form of a duration: one decimal place.
pub fn format_duration_hours(hours: f64) -> String {
    format!("{:.1}h", hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lift() {
        // 0.15 / (0.15 * 0.15) ≈ 6.667
        let l = lift(0.15, 0.15, 0.15);
        assert!((l - 6.666_666_666_666_667).abs() < 1e-9);
    }

    #[test]
    fn test_lift_undefined_on_zero_marginal() {
        assert!(lift(0.0, 0.15, 0.1).is_nan());
        assert!(lift(0.15, 0.0, 0.1).is_nan());
    }

    #[test]
    fn test_format_lag_positive() {
        assert_eq!(format_lag(120.0, true), "+2.0m");
        assert_eq!(format_lag(90.0, true), "+1.5m");
    }

    #[test]
    fn test_format_lag_follower_first() {
        assert_eq!(format_lag(120.0, false), "-2.0m");
    }

    #[test]
    fn test_format_lag_zero() {
        assert_eq!(format_lag(0.0, true), "simultaneous");
        assert_eq!(format_lag(0.0, false), "simultaneous");
    }

    #[test]
    fn test_duration_hours_full_precision() {
        let hours = duration_hours(5_400_000);
        assert!((hours - 1.5).abs() < 1e-12);

        // Full precision stored; rounding is presentation-only.
        let hours = duration_hours(5_000_000);
        assert!((hours - 1.388_888_888_888_889).abs() < 1e-9);
        assert_eq!(format_duration_hours(hours), "1.4h");
    }
}
