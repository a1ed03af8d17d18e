use std::f64::consts::{FRAC_PI_4, PI};

use ndarray::{Array1, Array3};
use rayon::prelude::*;

use crate::geometry::normalize_angles;
use crate::prelude::{ReconError, ReconResult};

/// Negative slack allowed on a normalized angle before it is rejected.
pub const ANGLE_TOLERANCE: f64 = 1e-9;

/// Detector row description shared by every Parker row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParkerParams {
    pub source_det_dist_mm: f64,
    pub columns: usize,
    pub pixel_width_mm: f64,
}

impl ParkerParams {
    /// Overscan angle: half the fan angle subtended by the detector row.
    pub fn delta(&self) -> f64 {
        ((self.columns as f64 * self.pixel_width_mm / 2.0) / self.source_det_dist_mm).atan()
    }

    /// Fan angle of the ray through the centre of column `u`.
    pub fn alpha(&self, u: usize) -> f64 {
        ((u as f64 + 0.5 - self.columns as f64 / 2.0) * self.pixel_width_mm
            / self.source_det_dist_mm)
            .atan()
    }
}

/// Redundancy weight of a single ray at projection angle `beta` and fan angle `alpha`.
pub fn parker_weight(beta: f64, alpha: f64, delta: f64) -> f64 {
    if beta >= 0.0 && beta < 2.0 * (delta + alpha) {
        (FRAC_PI_4 * beta / (delta + alpha)).sin().powi(2)
    } else if beta >= PI + 2.0 * alpha && beta < PI + 2.0 * delta {
        (FRAC_PI_4 * (PI + 2.0 * delta - beta) / (delta - alpha))
            .sin()
            .powi(2)
    } else if beta >= PI + 2.0 * delta {
        0.0
    } else {
        1.0
    }
}

/// Parker weights for one view, one entry per detector column.
///
/// `beta` within [`ANGLE_TOLERANCE`] below zero is accepted and weighted as
/// given, which places it outside the ramp-up window.
pub fn parker_row(beta: f64, params: &ParkerParams, delta: f64) -> ReconResult<Array1<f64>> {
    if !(beta + ANGLE_TOLERANCE >= 0.0) {
        return Err(ReconError::InvalidAngle {
            view: 0,
            angle: beta,
        });
    }
    Ok(Array1::from_shape_fn(params.columns, |u| {
        parker_weight(beta, params.alpha(u), delta)
    }))
}

/// Parker weight volume of shape `(N, 1, U)` for the given raw projection angles.
pub fn parker_weights(raw_angles: &[f64], params: &ParkerParams) -> ReconResult<Array3<f32>> {
    if params.columns == 0 {
        return Err(ReconError::InvalidConfig("detector has no columns".into()));
    }
    let betas = normalize_angles(raw_angles)?;
    let delta = params.delta();

    let rows = betas
        .par_iter()
        .enumerate()
        .map(|(view, &beta)| {
            parker_row(beta, params, delta).map_err(|err| match err {
                ReconError::InvalidAngle { angle, .. } => ReconError::InvalidAngle { view, angle },
                other => other,
            })
        })
        .collect::<ReconResult<Vec<_>>>()?;

    let mut weights = Array3::<f32>::zeros((betas.len(), 1, params.columns));
    for (view, row) in rows.iter().enumerate() {
        for (u, &w) in row.iter().enumerate() {
            weights[[view, 0, u]] = w as f32;
        }
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params() -> ParkerParams {
        ParkerParams {
            source_det_dist_mm: 1200.0,
            columns: 64,
            pixel_width_mm: 2.0,
        }
    }

    #[test]
    fn weights_stay_in_unit_interval() {
        let p = params();
        let delta = p.delta();
        let steps = 400;
        for i in 0..=steps {
            let beta = i as f64 * (PI + 3.0 * delta) / steps as f64;
            let row = parker_row(beta, &p, delta).unwrap();
            for &w in row.iter() {
                assert!((0.0..=1.0).contains(&w), "beta {} weight {}", beta, w);
            }
        }
    }

    #[test]
    fn leading_edge_is_zero_and_interior_is_one() {
        let delta = 0.1;
        let alpha = 0.0;
        assert_eq!(parker_weight(0.0, alpha, delta), 0.0);
        assert_abs_diff_eq!(parker_weight(0.1, alpha, delta), 0.5, epsilon = 1e-12);
        assert!(parker_weight(0.15, alpha, delta) > parker_weight(0.1, alpha, delta));
        assert_eq!(parker_weight(2.0 * (delta + alpha), alpha, delta), 1.0);
        assert_eq!(parker_weight(PI / 2.0, alpha, delta), 1.0);
    }

    #[test]
    fn trailing_region_falls_to_zero() {
        let delta = 0.1;
        let alpha = 0.0;
        assert_abs_diff_eq!(
            parker_weight(PI + 2.0 * delta - 1e-9, alpha, delta),
            0.0,
            epsilon = 1e-12
        );
        assert_eq!(parker_weight(PI + 2.0 * delta, alpha, delta), 0.0);
        assert_eq!(parker_weight(4.0, alpha, delta), 0.0);
    }

    #[test]
    fn conjugate_rays_sum_to_one() {
        let delta = 0.12;
        for &alpha in &[-0.08, 0.0, 0.05] {
            for &beta in &[0.01, 0.05, 0.1] {
                let w = parker_weight(beta, alpha, delta);
                let conjugate = parker_weight(beta + PI - 2.0 * alpha, -alpha, delta);
                assert_abs_diff_eq!(w + conjugate, 1.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn degenerate_window_is_one_inside_half_turn() {
        let p = ParkerParams {
            source_det_dist_mm: 1.0e9,
            columns: 16,
            pixel_width_mm: 1.0,
        };
        let delta = p.delta();
        for i in 1..100 {
            let beta = 0.01 + i as f64 * (PI - 0.02) / 100.0;
            let row = parker_row(beta, &p, delta).unwrap();
            assert!(row.iter().all(|&w| w == 1.0));
        }
    }

    #[test]
    fn negative_angle_is_rejected() {
        let p = params();
        let err = parker_row(-0.01, &p, p.delta()).unwrap_err();
        assert!(matches!(err, ReconError::InvalidAngle { .. }));
    }

    #[test]
    fn angle_just_below_zero_is_weighted_as_given() {
        let p = ParkerParams {
            source_det_dist_mm: 1200.0,
            columns: 8,
            pixel_width_mm: 1.0,
        };
        let delta = p.delta();
        let beta = -ANGLE_TOLERANCE / 2.0;
        let row = parker_row(beta, &p, delta).unwrap();
        for (u, &w) in row.iter().enumerate() {
            assert_eq!(w, 1.0);
            assert_eq!(w, parker_weight(beta, p.alpha(u), delta));
        }
    }

    #[test]
    fn weight_volume_has_broadcast_shape() {
        let p = params();
        let angles: Vec<f64> = (0..10).map(|i| 1.0 + i as f64 * 0.35).collect();
        let weights = parker_weights(&angles, &p).unwrap();
        assert_eq!(weights.shape(), &[10, 1, 64]);
        assert!(weights.iter().all(|&w| (0.0..=1.0).contains(&w)));
        assert_eq!(weights[[0, 0, 10]], 0.0);
    }

    #[test]
    fn empty_angles_are_invalid_geometry() {
        assert!(matches!(
            parker_weights(&[], &params()),
            Err(ReconError::InvalidGeometry(_))
        ));
    }
}
