//! Boundary with the native ray-tracing projector.
//!
//! A [`NativeProjector`] consumes an [`OperatorAttributes`] bundle as read-only
//! configuration plus one differentiable tensor. Any forward call and any
//! backprojection call that share the same bundle are adjoint to each other;
//! [`adjoint`] builds the differentiable operators on top of that contract.

pub mod adjoint;
pub mod voxel;

pub use adjoint::{
    BackprojectOp, DifferentiableOperator, GradientTape, Invocation, OperatorKind, ProjectOp,
};
pub use voxel::VoxelDrivenProjector;

use std::sync::Arc;

use ndarray::{Array3, ArrayView3};

use crate::config::ReconConfig;
use crate::geometry::{Geometry, ProjectionMatrix};
use crate::prelude::{ensure_shape, ReconError, ReconResult};

/// Geometric configuration shared between a projector call and its adjoint.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorAttributes {
    pub geom: Arc<[ProjectionMatrix]>,
    pub vol_shape: [usize; 3],
    pub vol_origin: [f64; 3],
    pub voxel_dimen: [f64; 3],
    pub proj_shape: [usize; 3],
}

impl OperatorAttributes {
    pub fn new(
        geom: Arc<[ProjectionMatrix]>,
        vol_shape: [usize; 3],
        vol_origin: [f64; 3],
        voxel_dimen: [f64; 3],
        proj_shape: [usize; 3],
    ) -> ReconResult<Self> {
        if geom.is_empty() {
            return Err(ReconError::InvalidGeometry(
                "operator bundle holds no geometry matrices".into(),
            ));
        }
        if geom.len() != proj_shape[0] {
            return Err(ReconError::InvalidGeometry(format!(
                "{} geometry matrices for {} projections",
                geom.len(),
                proj_shape[0]
            )));
        }
        Ok(Self {
            geom,
            vol_shape,
            vol_origin,
            voxel_dimen,
            proj_shape,
        })
    }

    pub fn from_config(config: &ReconConfig, geometry: &Geometry) -> ReconResult<Self> {
        Self::new(
            geometry.matrices().to_vec().into(),
            config.volume.shape,
            config.volume.origin,
            config.volume.voxel_dimen,
            config.proj_shape,
        )
    }

    /// World position (mm) of the centre of voxel `(x, y, z)`.
    pub fn voxel_center(&self, x: usize, y: usize, z: usize) -> [f64; 3] {
        [
            self.vol_origin[0] + x as f64 * self.voxel_dimen[0],
            self.vol_origin[1] + y as f64 * self.voxel_dimen[1],
            self.vol_origin[2] + z as f64 * self.voxel_dimen[2],
        ]
    }

    pub fn check_volume(&self, volume: &ArrayView3<f32>) -> ReconResult<()> {
        ensure_shape("volume input", &self.vol_shape, volume.shape())
    }

    pub fn check_projections(&self, projections: &ArrayView3<f32>) -> ReconResult<()> {
        ensure_shape("projection input", &self.proj_shape, projections.shape())
    }
}

/// Forward projector / backprojector pair behind the native operator boundary.
///
/// Implementations are pure: the output depends only on the tensor and the bundle.
pub trait NativeProjector: Send + Sync {
    fn forward_project(
        &self,
        volume: ArrayView3<f32>,
        attributes: &OperatorAttributes,
    ) -> ReconResult<Array3<f32>>;

    fn backproject(
        &self,
        projections: ArrayView3<f32>,
        attributes: &OperatorAttributes,
    ) -> ReconResult<Array3<f32>>;
}
