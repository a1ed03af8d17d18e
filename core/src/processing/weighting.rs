use ndarray::Array3;

use crate::config::ReconConfig;
use crate::prelude::{
    ensure_shape, ProcessingStage, ReconError, ReconResult, StageInput, StageMetadata,
    StageOutput,
};
use crate::telemetry::log::LogManager;
use crate::weights::{apply_weights, cosine_weights, parker_weights, CosineParams, ParkerParams};

fn weight_range(weights: &Array3<f32>) -> (f32, f32) {
    weights
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &w| {
            (lo.min(w), hi.max(w))
        })
}

fn weighted_output(
    name: &'static str,
    config: Option<&ReconConfig>,
    weights: Option<&Array3<f32>>,
    input: StageInput,
    logger: &LogManager,
) -> ReconResult<StageOutput> {
    let config = config.ok_or(ReconError::NotInitialized(name))?;
    let weights = weights.ok_or(ReconError::NotInitialized(name))?;
    ensure_shape(name, &config.proj_shape, input.projections.shape())?;

    let mut projections = input.projections;
    apply_weights(&mut projections, weights)?;

    let range = weight_range(weights);
    logger.detail(&format!("weights in [{:.4}, {:.4}]", range.0, range.1));
    Ok(StageOutput {
        projections,
        metadata: StageMetadata {
            weight_range: Some(range),
            notes: vec![format!("{} weights [{:.4}, {:.4}]", name, range.0, range.1)],
        },
    })
}

/// Flat-detector cosine weighting, shape `(1, V, U)`.
pub struct CosineStage {
    config: Option<ReconConfig>,
    weights: Option<Array3<f32>>,
    logger: LogManager,
}

impl CosineStage {
    pub fn new() -> Self {
        Self {
            config: None,
            weights: None,
            logger: LogManager::new("cosine"),
        }
    }
}

impl Default for CosineStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for CosineStage {
    fn name(&self) -> &'static str {
        "cosine"
    }

    fn initialize(&mut self, config: &ReconConfig) -> ReconResult<()> {
        config.validate()?;
        let params = CosineParams {
            source_det_dist_mm: config.detector.source_det_dist_mm,
            rows: config.rows(),
            columns: config.columns(),
            pixel_width_mm: config.detector.pixel_width_mm,
            pixel_height_mm: config.detector.pixel_height_mm,
            formula: config.cosine_formula,
        };
        self.weights = Some(cosine_weights(&params)?);
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: StageInput) -> ReconResult<StageOutput> {
        weighted_output(
            self.name(),
            self.config.as_ref(),
            self.weights.as_ref(),
            input,
            &self.logger,
        )
    }

    fn cleanup(&mut self) {
        self.config = None;
        self.weights = None;
    }
}

/// Parker short-scan weighting, shape `(N, 1, U)`.
pub struct ParkerStage {
    angles: Vec<f64>,
    config: Option<ReconConfig>,
    weights: Option<Array3<f32>>,
    logger: LogManager,
}

impl ParkerStage {
    pub fn new(angles: Vec<f64>) -> Self {
        Self {
            angles,
            config: None,
            weights: None,
            logger: LogManager::new("parker"),
        }
    }
}

impl ProcessingStage for ParkerStage {
    fn name(&self) -> &'static str {
        "parker"
    }

    fn initialize(&mut self, config: &ReconConfig) -> ReconResult<()> {
        config.validate()?;
        if self.angles.len() != config.views() {
            return Err(ReconError::InvalidGeometry(format!(
                "{} angles for {} views",
                self.angles.len(),
                config.views()
            )));
        }
        let params = ParkerParams {
            source_det_dist_mm: config.detector.source_det_dist_mm,
            columns: config.columns(),
            pixel_width_mm: config.detector.pixel_width_mm,
        };
        self.logger
            .detail(&format!("overscan angle {:.5} rad", params.delta()));
        self.weights = Some(parker_weights(&self.angles, &params)?);
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: StageInput) -> ReconResult<StageOutput> {
        weighted_output(
            self.name(),
            self.config.as_ref(),
            self.weights.as_ref(),
            input,
            &self.logger,
        )
    }

    fn cleanup(&mut self) {
        self.config = None;
        self.weights = None;
    }
}
