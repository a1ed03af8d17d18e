use nalgebra::{Matrix3, Matrix3x4, Vector3, Vector4};

use crate::config::{DetectorConfig, ReconConfig};
use crate::prelude::{ReconError, ReconResult};

const EPS: f64 = 1e-12;

/// Projective mapping from world millimetres to detector pixel indices for one view.
///
/// The detector coordinate of pixel `(v, u)` is its centre, so `u` runs from
/// `0` to `U - 1` across the row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionMatrix(Matrix3x4<f64>);

/// Detector position of a projected point, together with its homogeneous depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorPoint {
    pub u: f64,
    pub v: f64,
    pub depth: f64,
}

impl ProjectionMatrix {
    pub fn new(matrix: Matrix3x4<f64>) -> Self {
        Self(matrix)
    }

    pub fn from_rows(rows: [[f64; 4]; 3]) -> Self {
        Self(Matrix3x4::from_fn(|r, c| rows[r][c]))
    }

    pub fn rows(&self) -> [[f64; 4]; 3] {
        let mut rows = [[0.0; 4]; 3];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.0[(r, c)];
            }
        }
        rows
    }

    pub fn matrix(&self) -> &Matrix3x4<f64> {
        &self.0
    }

    /// Projects a world point; `None` when it lies on or behind the source plane.
    pub fn project(&self, point: [f64; 3]) -> Option<DetectorPoint> {
        let h = self.0 * Vector4::new(point[0], point[1], point[2], 1.0);
        let depth = h[2];
        if !depth.is_finite() || depth <= EPS {
            return None;
        }
        Some(DetectorPoint {
            u: h[0] / depth,
            v: h[1] / depth,
            depth,
        })
    }

    /// Camera centre, i.e. the null space of the matrix.
    pub fn source_position(&self) -> Option<Vector3<f64>> {
        let m: Matrix3<f64> = self.0.fixed_view::<3, 3>(0, 0).into_owned();
        let p4: Vector3<f64> = self.0.column(3).into_owned();
        let inv = m.try_inverse()?;
        Some(-(inv * p4))
    }

    /// Azimuth (radians) of the source in the `x-y` plane.
    pub fn primary_angle(&self) -> ReconResult<f64> {
        let source = self.source_position().ok_or_else(|| {
            ReconError::InvalidGeometry("projection matrix is singular".into())
        })?;
        Ok(source[1].atan2(source[0]))
    }

    /// Matrix of a circular trajectory view with the source at `angle` around the z axis.
    ///
    /// The matrix is scaled so that the isocenter projects with depth 1.
    pub fn circular(
        angle: f64,
        source_iso_dist_mm: f64,
        detector: &DetectorConfig,
        rows: usize,
        columns: usize,
    ) -> Self {
        let (s, c) = angle.sin_cos();
        let source = Vector3::new(source_iso_dist_mm * c, source_iso_dist_mm * s, 0.0);
        let rotation = Matrix3::new(-s, c, 0.0, 0.0, 0.0, -1.0, -c, -s, 0.0);
        let translation = -(rotation * source);

        let fu = detector.source_det_dist_mm / detector.pixel_width_mm;
        let fv = detector.source_det_dist_mm / detector.pixel_height_mm;
        let cu = columns as f64 / 2.0 - 0.5;
        let cv = rows as f64 / 2.0 - 0.5;
        let intrinsics = Matrix3::new(fu, 0.0, cu, 0.0, fv, cv, 0.0, 0.0, 1.0);

        let mut extrinsics = Matrix3x4::zeros();
        extrinsics.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
        extrinsics.set_column(3, &translation);

        Self(intrinsics * extrinsics / source_iso_dist_mm)
    }
}

/// Circular source trajectory used for synthetic acquisitions.
#[derive(Debug, Clone, PartialEq)]
pub struct CircularTrajectory {
    pub source_iso_dist_mm: f64,
    pub start_angle: f64,
    pub angular_range: f64,
}

/// Geometry matrices paired 1:1 with their projection angles.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    matrices: Vec<ProjectionMatrix>,
    angles: Vec<f64>,
}

impl Geometry {
    pub fn new(matrices: Vec<ProjectionMatrix>, angles: Vec<f64>) -> ReconResult<Self> {
        if matrices.is_empty() {
            return Err(ReconError::InvalidGeometry("geometry holds no views".into()));
        }
        if matrices.len() != angles.len() {
            return Err(ReconError::InvalidGeometry(format!(
                "{} geometry matrices but {} angles",
                matrices.len(),
                angles.len()
            )));
        }
        Ok(Self { matrices, angles })
    }

    /// Builds the geometry from matrices alone, deriving each angle from its source position.
    pub fn from_matrices(matrices: Vec<ProjectionMatrix>) -> ReconResult<Self> {
        let angles = matrices
            .iter()
            .map(ProjectionMatrix::primary_angle)
            .collect::<ReconResult<Vec<_>>>()?;
        Self::new(matrices, angles)
    }

    /// Equally spaced views over `trajectory.angular_range`, endpoint excluded.
    pub fn circular(trajectory: &CircularTrajectory, config: &ReconConfig) -> ReconResult<Self> {
        let views = config.views();
        if views == 0 {
            return Err(ReconError::InvalidGeometry("geometry holds no views".into()));
        }
        if !(trajectory.source_iso_dist_mm > 0.0) {
            return Err(ReconError::InvalidConfig(format!(
                "source-isocenter distance {} mm must be positive",
                trajectory.source_iso_dist_mm
            )));
        }
        let step = trajectory.angular_range / views as f64;
        let angles: Vec<f64> = (0..views)
            .map(|i| trajectory.start_angle + i as f64 * step)
            .collect();
        let matrices = angles
            .iter()
            .map(|&angle| {
                ProjectionMatrix::circular(
                    angle,
                    trajectory.source_iso_dist_mm,
                    &config.detector,
                    config.rows(),
                    config.columns(),
                )
            })
            .collect();
        Self::new(matrices, angles)
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    pub fn matrices(&self) -> &[ProjectionMatrix] {
        &self.matrices
    }

    pub fn angles(&self) -> &[f64] {
        &self.angles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn small_config() -> ReconConfig {
        ReconConfig {
            proj_shape: [8, 16, 24],
            ..Default::default()
        }
    }

    #[test]
    fn isocenter_projects_to_detector_centre() {
        let config = small_config();
        let p = ProjectionMatrix::circular(0.3, 800.0, &config.detector, 16, 24);
        let hit = p.project([0.0, 0.0, 0.0]).unwrap();
        assert_abs_diff_eq!(hit.u, 11.5, epsilon = 1e-9);
        assert_abs_diff_eq!(hit.v, 7.5, epsilon = 1e-9);
        assert_abs_diff_eq!(hit.depth, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn points_behind_source_are_rejected() {
        let config = small_config();
        let p = ProjectionMatrix::circular(0.0, 800.0, &config.detector, 16, 24);
        assert!(p.project([900.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn angle_is_recovered_from_matrix() {
        let config = small_config();
        for &angle in &[0.0, 0.7, 2.5, -1.2] {
            let p = ProjectionMatrix::circular(angle, 750.0, &config.detector, 16, 24);
            assert_abs_diff_eq!(p.primary_angle().unwrap(), angle, epsilon = 1e-9);
            let source = p.source_position().unwrap();
            assert_abs_diff_eq!(source.norm(), 750.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn magnification_matches_distance_ratio() {
        let config = small_config();
        let p = ProjectionMatrix::circular(0.0, 600.0, &config.detector, 16, 24);
        let centre = p.project([0.0, 0.0, 0.0]).unwrap();
        let offset = p.project([0.0, 1.0, 0.0]).unwrap();
        assert_abs_diff_eq!(offset.u - centre.u, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn mismatched_counts_are_invalid() {
        let config = small_config();
        let p = ProjectionMatrix::circular(0.0, 600.0, &config.detector, 16, 24);
        assert!(matches!(
            Geometry::new(vec![p, p], vec![0.0]),
            Err(ReconError::InvalidGeometry(_))
        ));
        assert!(Geometry::new(Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn circular_geometry_spaces_views_evenly() {
        let config = small_config();
        let trajectory = CircularTrajectory {
            source_iso_dist_mm: 750.0,
            start_angle: 0.0,
            angular_range: PI,
        };
        let geometry = Geometry::circular(&trajectory, &config).unwrap();
        assert_eq!(geometry.len(), 8);
        assert_abs_diff_eq!(geometry.angles()[1], PI / 8.0, epsilon = 1e-12);
        let rebuilt = Geometry::from_matrices(geometry.matrices().to_vec()).unwrap();
        for (a, b) in rebuilt.angles().iter().zip(geometry.angles()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }
}
