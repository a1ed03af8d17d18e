use std::sync::Arc;
use std::time::Instant;

use crate::config::ReconConfig;
use crate::geometry::Geometry;
use crate::prelude::{
    ensure_shape, ProcessingStage, ProjectionStack, ReconError, ReconResult, StageInput, Volume,
};
use crate::processing::{CosineStage, ParkerStage, RamlakStage};
use crate::projector::{
    BackprojectOp, DifferentiableOperator, NativeProjector, OperatorAttributes, ProjectOp,
};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{MetricsRecorder, MetricsSnapshot};

/// Filtered projections together with the notes each stage emitted.
#[derive(Debug, Clone)]
pub struct FilteredProjections {
    pub projections: ProjectionStack,
    pub notes: Vec<String>,
}

/// Result of one FDK run.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub volume: Volume,
    pub notes: Vec<String>,
}

/// FDK orchestrator: cosine, Parker, ramp filter, then backprojection.
pub struct FdkPipeline<P: NativeProjector> {
    config: ReconConfig,
    geometry: Geometry,
    backprojector: BackprojectOp<P>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl<P: NativeProjector> FdkPipeline<P> {
    pub fn new(config: ReconConfig, geometry: Geometry, projector: Arc<P>) -> ReconResult<Self> {
        config.validate()?;
        if geometry.len() != config.views() {
            return Err(ReconError::InvalidGeometry(format!(
                "{} geometry views for a stack of {}",
                geometry.len(),
                config.views()
            )));
        }
        let attributes = OperatorAttributes::from_config(&config, &geometry)?;
        Ok(Self {
            config,
            geometry,
            backprojector: BackprojectOp::new(projector, attributes),
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("fdk"),
        })
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn attributes(&self) -> &OperatorAttributes {
        self.backprojector.attributes()
    }

    /// Differentiable forward projector sharing this pipeline's attribute bundle.
    pub fn projector(&self) -> ProjectOp<P> {
        self.backprojector.adjoint()
    }

    pub fn backprojector(&self) -> &BackprojectOp<P> {
        &self.backprojector
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn stages(&self) -> Vec<Box<dyn ProcessingStage>> {
        vec![
            Box::new(CosineStage::new()),
            Box::new(ParkerStage::new(self.geometry.angles().to_vec())),
            Box::new(RamlakStage::new()),
        ]
    }

    fn run_stage(
        &self,
        stage: &mut dyn ProcessingStage,
        projections: ProjectionStack,
        notes: &mut Vec<String>,
    ) -> ReconResult<ProjectionStack> {
        let started = Instant::now();
        stage.initialize(&self.config)?;
        let output = stage.execute(StageInput { projections });
        stage.cleanup();
        let output = output?;
        self.metrics.record_stage(started.elapsed());
        for note in &output.metadata.notes {
            self.logger.record(note);
        }
        notes.extend(output.metadata.notes);
        Ok(output.projections)
    }

    /// Applies the weighting and ramp filtering chain to a raw projection stack.
    pub fn filter(&self, projections: ProjectionStack) -> ReconResult<FilteredProjections> {
        let result = self.filter_inner(projections);
        if result.is_err() {
            self.metrics.record_error();
        }
        result
    }

    fn filter_inner(&self, projections: ProjectionStack) -> ReconResult<FilteredProjections> {
        ensure_shape("projection stack", &self.config.proj_shape, projections.shape())?;
        let mut notes = Vec::new();
        let mut current = projections;
        for mut stage in self.stages() {
            self.logger.detail(&format!("running {} stage", stage.name()));
            current = self.run_stage(stage.as_mut(), current, &mut notes)?;
        }
        Ok(FilteredProjections {
            projections: current,
            notes,
        })
    }

    /// Full FDK reconstruction of a raw projection stack.
    pub fn reconstruct(&self, projections: ProjectionStack) -> ReconResult<Reconstruction> {
        let filtered = self.filter(projections)?;
        let started = Instant::now();
        let volume = match self.backprojector.forward(filtered.projections.view()) {
            Ok(volume) => volume,
            Err(err) => {
                self.metrics.record_error();
                self.logger.warn(&format!("backprojection failed: {}", err));
                return Err(err);
            }
        };
        self.metrics.record_stage(started.elapsed());
        ensure_shape("volume", &self.config.volume.shape, volume.shape())?;

        let mut notes = filtered.notes;
        notes.push(format!("backprojected {:?}", self.config.volume.shape));
        self.logger
            .record(&format!("reconstructed {:?} volume", self.config.volume.shape));
        Ok(Reconstruction { volume, notes })
    }
}
