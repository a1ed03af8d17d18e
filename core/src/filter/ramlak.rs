use std::f64::consts::PI;

use ndarray::Array1;

use crate::prelude::{ReconError, ReconResult};

/// Spatial Ram-Lak kernel of odd length `width` for detector pitch `pixel_width_mm`.
///
/// Entry `i` (for `i` in `-hw..=hw`) is `-1 / (i π p)²` at odd offsets, zero at
/// even non-zero offsets and `p² / 4` at the centre.
pub fn ramlak_kernel(width: usize, pixel_width_mm: f64) -> ReconResult<Array1<f64>> {
    if width == 0 || width % 2 == 0 {
        return Err(ReconError::InvalidKernelWidth(width));
    }
    let hw = ((width - 1) / 2) as i64;
    Ok((-hw..=hw)
        .map(|i| {
            if i == 0 {
                pixel_width_mm.powi(2) / 4.0
            } else if i % 2 != 0 {
                -1.0 / (i as f64 * PI * pixel_width_mm).powi(2)
            } else {
                0.0
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn width_five_unit_pitch_matches_closed_form() {
        let kernel = ramlak_kernel(5, 1.0).unwrap();
        let side = -1.0 / (PI * PI);
        let expected = [0.0, side, 0.25, side, 0.0];
        assert_eq!(kernel.len(), 5);
        for (k, e) in kernel.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(k, e, epsilon = 1e-15);
        }
    }

    #[test]
    fn kernel_is_symmetric_with_quarter_pitch_centre() {
        for &pitch in &[0.5, 1.0, 1.7] {
            let kernel = ramlak_kernel(101, pitch).unwrap();
            let hw = 50;
            assert_eq!(kernel[hw], pitch * pitch / 4.0);
            for i in 1..=hw {
                assert_eq!(kernel[hw - i], kernel[hw + i]);
            }
        }
    }

    #[test]
    fn kernel_is_high_pass() {
        let kernel = ramlak_kernel(31, 1.0).unwrap();
        let centre = kernel[15];
        let rest: f64 = kernel.sum() - centre;
        assert!(centre > 0.0);
        assert!(rest <= 0.0);
    }

    #[test]
    fn even_or_zero_width_is_rejected() {
        assert_eq!(ramlak_kernel(4, 1.0), Err(ReconError::InvalidKernelWidth(4)));
        assert_eq!(ramlak_kernel(0, 1.0), Err(ReconError::InvalidKernelWidth(0)));
    }
}
