pub mod pipeline;
pub mod ramlak;
pub mod weighting;

pub use pipeline::{FdkPipeline, FilteredProjections, Reconstruction};
pub use ramlak::RamlakStage;
pub use weighting::{CosineStage, ParkerStage};
