use std::f64::consts::TAU;

use crate::prelude::{ReconError, ReconResult};

/// Wraps `angle` into `[0, 2π)`.
pub fn wrap_to_turn(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid rounds tiny negatives up to exactly TAU
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Reframes raw projection angles for short-scan weighting.
///
/// Angles are first expressed relative to the first view and wrapped into
/// `[0, 2π)`. Every view is then tried as the anchor of the sequence and the
/// anchor yielding the smallest maximum angle wins; ties go to the lowest
/// index, so repeated runs agree.
pub fn normalize_angles(raw: &[f64]) -> ReconResult<Vec<f64>> {
    let first = *raw
        .first()
        .ok_or_else(|| ReconError::InvalidGeometry("no projection angles".into()))?;
    if let Some(view) = raw.iter().position(|a| !a.is_finite()) {
        return Err(ReconError::InvalidGeometry(format!(
            "angle of view {} is not finite",
            view
        )));
    }

    let relative: Vec<f64> = raw.iter().map(|&a| wrap_to_turn(a - first)).collect();

    let mut best_anchor = 0;
    let mut best_max = f64::INFINITY;
    for (anchor, &origin) in relative.iter().enumerate() {
        let max = relative
            .iter()
            .map(|&a| wrap_to_turn(a - origin))
            .fold(0.0_f64, f64::max);
        if max < best_max {
            best_max = max;
            best_anchor = anchor;
        }
    }

    let origin = relative[best_anchor];
    Ok(relative.iter().map(|&a| wrap_to_turn(a - origin)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn empty_sequence_is_invalid_geometry() {
        assert!(matches!(
            normalize_angles(&[]),
            Err(ReconError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn single_view_maps_to_zero() {
        assert_eq!(normalize_angles(&[4.2]).unwrap(), vec![0.0]);
    }

    #[test]
    fn three_views_pick_rotation_with_smallest_maximum() {
        let raw = [0.5 * PI, 1.5 * PI, 0.0];
        let normalized = normalize_angles(&raw).unwrap();
        let max = normalized.iter().cloned().fold(0.0, f64::max);

        let shifted: Vec<f64> = raw.iter().map(|&a| wrap_to_turn(a - raw[0])).collect();
        for &origin in &shifted {
            let candidate = shifted
                .iter()
                .map(|&a| wrap_to_turn(a - origin))
                .fold(0.0, f64::max);
            assert!(max <= candidate + 1e-12);
        }

        assert_abs_diff_eq!(normalized[0], PI, epsilon = 1e-12);
        assert_abs_diff_eq!(normalized[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalized[2], 0.5 * PI, epsilon = 1e-12);
    }

    #[test]
    fn angles_outside_one_turn_are_wrapped() {
        let normalized = normalize_angles(&[-3.0 * PI, -2.5 * PI]).unwrap();
        for a in &normalized {
            assert!((0.0..TAU).contains(a));
        }
        assert_abs_diff_eq!(normalized[1], 0.5 * PI, epsilon = 1e-12);
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw: Vec<f64> = (0..36).map(|i| 1.3 + i as f64 * 0.1).collect();
        let once = normalize_angles(&raw).unwrap();
        let twice = normalize_angles(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, normalize_angles(&raw).unwrap());
        assert_eq!(once[0], 0.0);
    }

    #[test]
    fn equal_maxima_choose_lowest_anchor() {
        // full circle in quarter steps: every anchor yields a max of 1.5π
        let raw = [0.0, 0.5 * PI, PI, 1.5 * PI];
        let normalized = normalize_angles(&raw).unwrap();
        assert_eq!(normalized[0], 0.0);
    }
}
