use serde::{Deserialize, Serialize};

use crate::prelude::{ReconError, ReconResult};

/// Reconstruction grid description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Voxel counts along `(x, y, z)`.
    pub shape: [usize; 3],
    /// World position (mm) of voxel `(0, 0, 0)`.
    pub origin: [f64; 3],
    /// Voxel pitch (mm) along each axis.
    pub voxel_dimen: [f64; 3],
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            shape: [200, 200, 200],
            origin: [-99.5, -99.5, -99.5],
            voxel_dimen: [1.0, 1.0, 1.0],
        }
    }
}

/// Flat-panel detector description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub pixel_width_mm: f64,
    pub pixel_height_mm: f64,
    pub source_det_dist_mm: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            pixel_width_mm: 1.0,
            pixel_height_mm: 1.0,
            source_det_dist_mm: 1200.0,
        }
    }
}

/// Which square-root term the cosine weights use.
///
/// `Legacy` reproduces the historical `sd² + dv + dv` expression, `Corrected`
/// uses the textbook `sd² + du + dv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosineFormula {
    #[default]
    Legacy,
    Corrected,
}

/// How the ramp kernel is applied along detector rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterBackend {
    #[default]
    Direct,
    Fft,
}

/// Immutable configuration threaded into every component constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub volume: VolumeConfig,
    pub detector: DetectorConfig,
    /// Projection stack shape `(N, V, U)`.
    pub proj_shape: [usize; 3],
    pub ramlak_width: usize,
    pub cosine_formula: CosineFormula,
    pub filter_backend: FilterBackend,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            volume: VolumeConfig::default(),
            detector: DetectorConfig::default(),
            proj_shape: [200, 480, 620],
            ramlak_width: 101,
            cosine_formula: CosineFormula::default(),
            filter_backend: FilterBackend::default(),
        }
    }
}

impl ReconConfig {
    pub fn views(&self) -> usize {
        self.proj_shape[0]
    }

    pub fn rows(&self) -> usize {
        self.proj_shape[1]
    }

    pub fn columns(&self) -> usize {
        self.proj_shape[2]
    }

    /// Checks every recognized option before any derived tensor is built.
    pub fn validate(&self) -> ReconResult<()> {
        if self.proj_shape[0] == 0 {
            return Err(ReconError::InvalidGeometry(
                "projection stack holds no views".into(),
            ));
        }
        if self.proj_shape.iter().any(|&d| d == 0) {
            return Err(ReconError::InvalidConfig(format!(
                "projection shape {:?} has an empty axis",
                self.proj_shape
            )));
        }
        if self.volume.shape.iter().any(|&d| d == 0) {
            return Err(ReconError::InvalidConfig(format!(
                "volume shape {:?} has an empty axis",
                self.volume.shape
            )));
        }
        if self.volume.voxel_dimen.iter().any(|&d| !(d > 0.0)) {
            return Err(ReconError::InvalidConfig(format!(
                "voxel dimensions {:?} must be positive",
                self.volume.voxel_dimen
            )));
        }
        let detector = &self.detector;
        if !(detector.pixel_width_mm > 0.0) || !(detector.pixel_height_mm > 0.0) {
            return Err(ReconError::InvalidConfig(format!(
                "pixel pitch {}x{} mm must be positive",
                detector.pixel_width_mm, detector.pixel_height_mm
            )));
        }
        if !(detector.source_det_dist_mm > 0.0) {
            return Err(ReconError::InvalidConfig(format!(
                "source-detector distance {} mm must be positive",
                detector.source_det_dist_mm
            )));
        }
        if self.ramlak_width == 0 || self.ramlak_width % 2 == 0 {
            return Err(ReconError::InvalidKernelWidth(self.ramlak_width));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ReconConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.columns(), 620);
        assert_eq!(config.cosine_formula, CosineFormula::Legacy);
    }

    #[test]
    fn even_ramp_width_is_rejected() {
        let config = ReconConfig {
            ramlak_width: 100,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ReconError::InvalidKernelWidth(100)));
    }

    #[test]
    fn zero_views_is_invalid_geometry() {
        let config = ReconConfig {
            proj_shape: [0, 4, 4],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ReconError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn negative_pitch_is_rejected() {
        let mut config = ReconConfig::default();
        config.detector.pixel_height_mm = -1.0;
        assert!(matches!(config.validate(), Err(ReconError::InvalidConfig(_))));
    }
}
