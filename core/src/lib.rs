//! Core weighting, filtering and projector plumbing for cone-beam FDK reconstruction.
//!
//! The modules follow the classic filtered-backprojection chain (cosine weights,
//! Parker short-scan weights, Ram-Lak ramp filter, backprojection) while exposing
//! the projector pair as differentiable adjoint operators for iterative use.

pub mod config;
pub mod filter;
pub mod geometry;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod projector;
pub mod telemetry;
pub mod weights;

pub use config::ReconConfig;
pub use prelude::{ProcessingStage, ReconError, ReconResult, StageInput, StageOutput};
