use std::f64::consts::PI;
use std::sync::Arc;

use anyhow::Context;
use conebeam::geometry::{CircularTrajectory, Geometry};
use conebeam::prelude::{ProjectionStack, Volume};
use conebeam::projector::{NativeProjector, OperatorAttributes, VoxelDrivenProjector};
use conebeam::weights::ParkerParams;
use conebeam::ReconConfig;
use ndarray::Array3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Uniform-density ball in world millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: [f64; 3],
    pub radius_mm: f64,
    pub density: f32,
}

/// Configuration for generating a synthetic short-scan acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhantomConfig {
    pub source_iso_dist_mm: f64,
    pub start_angle: f64,
    /// Defaults to a short scan of π plus the full fan angle.
    pub angular_range: Option<f64>,
    pub spheres: Vec<Sphere>,
    pub noise: f32,
    pub seed: u64,
}

impl Default for PhantomConfig {
    fn default() -> Self {
        Self {
            source_iso_dist_mm: 750.0,
            start_angle: 0.0,
            angular_range: None,
            spheres: vec![
                Sphere {
                    center: [0.0, 0.0, 0.0],
                    radius_mm: 60.0,
                    density: 1.0,
                },
                Sphere {
                    center: [25.0, -10.0, 5.0],
                    radius_mm: 15.0,
                    density: 0.5,
                },
            ],
            noise: 0.0,
            seed: 0,
        }
    }
}

impl PhantomConfig {
    pub fn trajectory(&self, config: &ReconConfig) -> CircularTrajectory {
        let angular_range = self.angular_range.unwrap_or_else(|| {
            let params = ParkerParams {
                source_det_dist_mm: config.detector.source_det_dist_mm,
                columns: config.columns(),
                pixel_width_mm: config.detector.pixel_width_mm,
            };
            PI + 2.0 * params.delta()
        });
        CircularTrajectory {
            source_iso_dist_mm: self.source_iso_dist_mm,
            start_angle: self.start_angle,
            angular_range,
        }
    }
}

/// Synthetic acquisition: ground-truth volume, its projections and geometry.
pub struct SyntheticScan {
    pub geometry: Geometry,
    pub phantom: Volume,
    pub projections: ProjectionStack,
}

pub fn build_phantom_volume(phantom: &PhantomConfig, attributes: &OperatorAttributes) -> Volume {
    Array3::from_shape_fn(attributes.vol_shape, |(x, y, z)| {
        let p = attributes.voxel_center(x, y, z);
        phantom
            .spheres
            .iter()
            .filter(|s| {
                let d2: f64 = (0..3).map(|i| (p[i] - s.center[i]).powi(2)).sum();
                d2 <= s.radius_mm * s.radius_mm
            })
            .map(|s| s.density)
            .sum()
    })
}

pub fn build_synthetic_scan(
    config: &ReconConfig,
    phantom: &PhantomConfig,
) -> anyhow::Result<SyntheticScan> {
    let geometry = Geometry::circular(&phantom.trajectory(config), config)
        .context("building circular trajectory")?;
    let attributes = OperatorAttributes::from_config(config, &geometry)
        .context("building operator attributes")?;
    let volume = build_phantom_volume(phantom, &attributes);

    let projector = Arc::new(VoxelDrivenProjector::new());
    let mut projections = projector
        .forward_project(volume.view(), &attributes)
        .context("forward projecting phantom")?;

    if phantom.noise > 0.0 {
        let mut rng = StdRng::seed_from_u64(phantom.seed);
        let noise = phantom.noise;
        projections.mapv_inplace(|v| v + rng.gen_range(-noise..noise));
    }

    Ok(SyntheticScan {
        geometry,
        phantom: volume,
        projections,
    })
}
