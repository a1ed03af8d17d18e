use ndarray::Array1;

use crate::config::ReconConfig;
use crate::filter::{filter_rows, ramlak_kernel};
use crate::prelude::{
    ensure_shape, ProcessingStage, ReconError, ReconResult, StageInput, StageMetadata,
    StageOutput,
};
use crate::telemetry::log::LogManager;

/// Ram-Lak ramp filtering along detector columns, one lane per `(view, row)`.
pub struct RamlakStage {
    config: Option<ReconConfig>,
    kernel: Option<Array1<f64>>,
    logger: LogManager,
}

impl RamlakStage {
    pub fn new() -> Self {
        Self {
            config: None,
            kernel: None,
            logger: LogManager::new("ramlak"),
        }
    }

    pub fn kernel(&self) -> Option<&Array1<f64>> {
        self.kernel.as_ref()
    }
}

impl Default for RamlakStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for RamlakStage {
    fn name(&self) -> &'static str {
        "ramlak"
    }

    fn initialize(&mut self, config: &ReconConfig) -> ReconResult<()> {
        config.validate()?;
        let kernel = ramlak_kernel(config.ramlak_width, config.detector.pixel_width_mm)?;
        if kernel.sum() < 0.0 {
            self.logger.warn(&format!(
                "kernel of width {} at pitch {} mm has negative DC response",
                config.ramlak_width, config.detector.pixel_width_mm
            ));
        }
        self.kernel = Some(kernel);
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: StageInput) -> ReconResult<StageOutput> {
        let config = self
            .config
            .as_ref()
            .ok_or(ReconError::NotInitialized("ramlak"))?;
        let kernel = self
            .kernel
            .as_ref()
            .ok_or(ReconError::NotInitialized("ramlak"))?;
        ensure_shape("ramlak", &config.proj_shape, input.projections.shape())?;

        let taps = kernel.to_vec();
        let projections = filter_rows(&input.projections, &taps, config.filter_backend)?;
        self.logger.detail(&format!(
            "filtered {} lanes with {} taps ({:?})",
            config.views() * config.rows(),
            taps.len(),
            config.filter_backend
        ));

        Ok(StageOutput {
            projections,
            metadata: StageMetadata {
                weight_range: None,
                notes: vec![format!("ramlak width {}", taps.len())],
            },
        })
    }

    fn cleanup(&mut self) {
        self.config = None;
        self.kernel = None;
    }
}
