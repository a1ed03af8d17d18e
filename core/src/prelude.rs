use ndarray::Array3;

use crate::config::ReconConfig;

/// Projection stack indexed `(view, detector-row, detector-column)`.
pub type ProjectionStack = Array3<f32>;

/// Reconstructed volume indexed `(x, y, z)`.
pub type Volume = Array3<f32>;

/// Input payload for a filtering stage.
#[derive(Debug, Clone)]
pub struct StageInput {
    pub projections: ProjectionStack,
}

/// Output produced by each stage.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub projections: ProjectionStack,
    pub metadata: StageMetadata,
}

/// Metadata used for chaining stages and telemetry.
#[derive(Debug, Clone, Default)]
pub struct StageMetadata {
    pub weight_range: Option<(f32, f32)>,
    pub notes: Vec<String>,
}

/// Common error type for weighting, filtering and projection.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ReconError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("invalid angle {angle} at view {view}: below tolerance of zero")]
    InvalidAngle { view: usize, angle: f64 },
    #[error("invalid ramp filter width {0}: must be odd and positive")]
    InvalidKernelWidth(usize),
    #[error("shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("native operator failure: {0}")]
    OperatorFailure(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("stage not initialized: {0}")]
    NotInitialized(&'static str),
}

impl ReconError {
    pub fn shape_mismatch(context: &str, expected: &[usize], found: &[usize]) -> Self {
        ReconError::ShapeMismatch {
            context: context.to_string(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

pub type ReconResult<T> = Result<T, ReconError>;

/// Trait describing a projection-domain filtering stage.
pub trait ProcessingStage {
    fn name(&self) -> &'static str;
    fn initialize(&mut self, config: &ReconConfig) -> ReconResult<()>;
    fn execute(&mut self, input: StageInput) -> ReconResult<StageOutput>;
    fn cleanup(&mut self);
}

/// Fails with [`ReconError::ShapeMismatch`] unless `found` equals `expected`.
pub fn ensure_shape(context: &str, expected: &[usize], found: &[usize]) -> ReconResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(ReconError::shape_mismatch(context, expected, found))
    }
}
