use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use conebeam::geometry::Geometry;
use conebeam::math::{StatsHelper, Summary};
use conebeam::prelude::{ProjectionStack, Volume};
use conebeam::processing::FdkPipeline;
use conebeam::projector::{DifferentiableOperator, VoxelDrivenProjector};
use conebeam::telemetry::MetricsSnapshot;
use ndarray::Array3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

/// Raw projections with the geometry they were acquired under.
pub struct Acquisition {
    pub projections: ProjectionStack,
    pub geometry: Geometry,
}

pub struct WorkflowResult {
    pub volume: Volume,
    pub summary: Summary,
    pub notes: Vec<String>,
    pub metrics: MetricsSnapshot,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    projector: Arc<VoxelDrivenProjector>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            projector: Arc::new(VoxelDrivenProjector::new()),
        }
    }

    fn pipeline(&self, geometry: Geometry) -> anyhow::Result<FdkPipeline<VoxelDrivenProjector>> {
        FdkPipeline::new(self.config.recon.clone(), geometry, self.projector.clone())
            .context("building FDK pipeline")
    }

    pub fn execute(&self, acquisition: Acquisition) -> anyhow::Result<WorkflowResult> {
        let pipeline = self.pipeline(acquisition.geometry)?;
        let reconstruction = pipeline
            .reconstruct(acquisition.projections)
            .context("running FDK reconstruction")?;
        let summary = StatsHelper::summary(&reconstruction.volume);

        Ok(WorkflowResult {
            volume: reconstruction.volume,
            summary,
            notes: reconstruction.notes,
            metrics: pipeline.metrics(),
        })
    }

    /// Relative error between `<A x, y>` and `<x, Aᵗ y>` for seeded random tensors.
    pub fn check_adjoint(&self, geometry: Geometry, seed: u64) -> anyhow::Result<f64> {
        let pipeline = self.pipeline(geometry)?;
        let project = pipeline.projector();
        let backproject = pipeline.backprojector();
        let attributes = project.attributes();

        let mut rng = StdRng::seed_from_u64(seed);
        let x: Array3<f32> =
            Array3::from_shape_fn(attributes.vol_shape, |_| rng.gen_range(-1.0..1.0));
        let y: Array3<f32> =
            Array3::from_shape_fn(attributes.proj_shape, |_| rng.gen_range(-1.0..1.0));

        let ax = project
            .forward(x.view())
            .context("forward projecting random volume")?;
        let aty = backproject
            .forward(y.view())
            .context("backprojecting random projections")?;
        let lhs = StatsHelper::dot(&ax, &y).context("pairing projections")?;
        let rhs = StatsHelper::dot(&x, &aty).context("pairing volumes")?;
        Ok((lhs - rhs).abs() / lhs.abs().max(rhs.abs()).max(f64::MIN_POSITIVE))
    }
}
