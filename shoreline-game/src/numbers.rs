//! Numeric helpers centralizing clamps and safe numeric casts.

use num_traits::cast::cast;

use crate::constants::{EVENT_IMPACT_MAX, EVENT_IMPACT_MIN, SCORE_MAX, SCORE_MIN};

/// Clamp a score axis into the `[0, 100]` range.
#[must_use]
pub fn clamp_score(value: i64) -> i32 {
    let clamped = value.clamp(i64::from(SCORE_MIN), i64::from(SCORE_MAX));
    cast::<i64, i32>(clamped).unwrap_or(SCORE_MIN)
}

/// Clamp a single random-event impact into `[-3, 3]`.
#[must_use]
pub const fn clamp_impact(value: i32) -> i32 {
    if value < EVENT_IMPACT_MIN {
        EVENT_IMPACT_MIN
    } else if value > EVENT_IMPACT_MAX {
        EVENT_IMPACT_MAX
    } else {
        value
    }
}

/// Clamp a probability into `[0, ceiling]`, mapping non-finite values to zero.
#[must_use]
pub fn clamp_probability(value: f64, ceiling: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, ceiling)
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert an i64 sum to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Mean of a slice of integers, `0.0` when empty.
#[must_use]
pub fn mean_i32(values: &[i32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total: i64 = values.iter().copied().map(i64::from).sum();
    i64_to_f64(total) / usize_to_f64(values.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_clamp_covers_both_edges() {
        assert_eq!(clamp_score(-12), 0);
        assert_eq!(clamp_score(57), 57);
        assert_eq!(clamp_score(i64::MAX), 100);
    }

    #[test]
    fn impact_clamp_is_symmetric() {
        assert_eq!(clamp_impact(7), 3);
        assert_eq!(clamp_impact(-9), -3);
        assert_eq!(clamp_impact(-2), -2);
    }

    #[test]
    fn probability_clamp_handles_non_finite() {
        assert!(clamp_probability(f64::NAN, 0.1).abs() < f64::EPSILON);
        assert!((clamp_probability(0.4, 0.1) - 0.1).abs() < f64::EPSILON);
        assert!(clamp_probability(-0.2, 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn mean_of_empty_slice_is_zero() {
        assert!(mean_i32(&[]).abs() < f64::EPSILON);
        assert!((mean_i32(&[1, 2, 3, 4]) - 2.5).abs() < f64::EPSILON);
    }
}
