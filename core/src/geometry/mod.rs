pub mod angles;
pub mod matrix;

pub use angles::{normalize_angles, wrap_to_turn};
pub use matrix::{CircularTrajectory, DetectorPoint, Geometry, ProjectionMatrix};
