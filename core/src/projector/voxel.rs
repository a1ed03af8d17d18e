use log::debug;
use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

use crate::geometry::ProjectionMatrix;
use crate::prelude::{ReconError, ReconResult};
use crate::projector::{NativeProjector, OperatorAttributes};

/// Bilinear detector footprint of one voxel centre in one view.
#[derive(Debug, Clone, Copy)]
struct Footprint {
    taps: [(usize, f64); 4],
    len: usize,
}

impl Footprint {
    fn taps(&self) -> &[(usize, f64)] {
        &self.taps[..self.len]
    }
}

/// Flat detector indices and weights hit by `point`, scaled by the inverse
/// squared depth. Taps outside the detector are dropped.
fn footprint(
    matrix: &ProjectionMatrix,
    point: [f64; 3],
    rows: usize,
    columns: usize,
) -> Option<Footprint> {
    let hit = matrix.project(point)?;
    if !hit.u.is_finite() || !hit.v.is_finite() {
        return None;
    }
    let u0 = hit.u.floor();
    let v0 = hit.v.floor();
    let fu = hit.u - u0;
    let fv = hit.v - v0;
    let scale = 1.0 / (hit.depth * hit.depth);

    let mut out = Footprint {
        taps: [(0, 0.0); 4],
        len: 0,
    };
    let corners = [
        (v0, u0, (1.0 - fv) * (1.0 - fu)),
        (v0, u0 + 1.0, (1.0 - fv) * fu),
        (v0 + 1.0, u0, fv * (1.0 - fu)),
        (v0 + 1.0, u0 + 1.0, fv * fu),
    ];
    for (v, u, w) in corners {
        if v < 0.0 || u < 0.0 || v >= rows as f64 || u >= columns as f64 || w == 0.0 {
            continue;
        }
        out.taps[out.len] = (v as usize * columns + u as usize, w * scale);
        out.len += 1;
    }
    if out.len == 0 {
        None
    } else {
        Some(out)
    }
}

fn ensure_finite(values: &[f64], what: &str) -> ReconResult<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ReconError::OperatorFailure(format!(
            "{} produced non-finite values",
            what
        )))
    }
}

/// CPU reference projector: voxel-driven bilinear splatting and its exact transpose.
///
/// Forward projection splats every voxel onto the detector; backprojection
/// gathers from the same footprint, so the pair satisfies `<Ax, y> = <x, Aᵗy>`
/// up to rounding.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoxelDrivenProjector;

impl VoxelDrivenProjector {
    pub fn new() -> Self {
        Self
    }
}

impl NativeProjector for VoxelDrivenProjector {
    fn forward_project(
        &self,
        volume: ArrayView3<f32>,
        attributes: &OperatorAttributes,
    ) -> ReconResult<Array3<f32>> {
        attributes.check_volume(&volume)?;
        let [n, rows, columns] = attributes.proj_shape;
        let [nx, ny, nz] = attributes.vol_shape;
        debug!(
            "forward projecting {:?} volume into {} views",
            attributes.vol_shape, n
        );

        let planes: Vec<Vec<f64>> = attributes
            .geom
            .par_iter()
            .map(|matrix| {
                let mut plane = vec![0.0_f64; rows * columns];
                for x in 0..nx {
                    for y in 0..ny {
                        for z in 0..nz {
                            let value = volume[[x, y, z]];
                            if value == 0.0 {
                                continue;
                            }
                            let point = attributes.voxel_center(x, y, z);
                            if let Some(fp) = footprint(matrix, point, rows, columns) {
                                for &(idx, w) in fp.taps() {
                                    plane[idx] += w * value as f64;
                                }
                            }
                        }
                    }
                }
                plane
            })
            .collect();

        let data: Vec<f64> = planes.into_iter().flatten().collect();
        ensure_finite(&data, "forward projection")?;
        Array3::from_shape_vec((n, rows, columns), data.into_iter().map(|v| v as f32).collect())
            .map_err(|err| ReconError::OperatorFailure(err.to_string()))
    }

    fn backproject(
        &self,
        projections: ArrayView3<f32>,
        attributes: &OperatorAttributes,
    ) -> ReconResult<Array3<f32>> {
        attributes.check_projections(&projections)?;
        let [_, rows, columns] = attributes.proj_shape;
        let [nx, ny, nz] = attributes.vol_shape;
        debug!(
            "backprojecting {} views into {:?} volume",
            attributes.proj_shape[0], attributes.vol_shape
        );

        let slabs: Vec<Vec<f64>> = (0..nx)
            .into_par_iter()
            .map(|x| {
                let mut slab = vec![0.0_f64; ny * nz];
                for y in 0..ny {
                    for z in 0..nz {
                        let point = attributes.voxel_center(x, y, z);
                        let mut acc = 0.0_f64;
                        for (view, matrix) in attributes.geom.iter().enumerate() {
                            if let Some(fp) = footprint(matrix, point, rows, columns) {
                                for &(idx, w) in fp.taps() {
                                    let value = projections[[view, idx / columns, idx % columns]];
                                    acc += w * value as f64;
                                }
                            }
                        }
                        slab[y * nz + z] = acc;
                    }
                }
                slab
            })
            .collect();

        let data: Vec<f64> = slabs.into_iter().flatten().collect();
        ensure_finite(&data, "backprojection")?;
        Array3::from_shape_vec((nx, ny, nz), data.into_iter().map(|v| v as f32).collect())
            .map_err(|err| ReconError::OperatorFailure(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;
    use crate::geometry::{CircularTrajectory, Geometry};
    use std::f64::consts::PI;

    fn attributes() -> OperatorAttributes {
        let mut config = ReconConfig {
            proj_shape: [6, 12, 16],
            ..Default::default()
        };
        config.volume.shape = [8, 8, 6];
        config.volume.origin = [-3.5, -3.5, -2.5];
        config.detector.source_det_dist_mm = 40.0;
        let trajectory = CircularTrajectory {
            source_iso_dist_mm: 20.0,
            start_angle: 0.0,
            angular_range: PI,
        };
        let geometry = Geometry::circular(&trajectory, &config).unwrap();
        OperatorAttributes::from_config(&config, &geometry).unwrap()
    }

    #[test]
    fn isocenter_voxel_lands_near_detector_centre() {
        let attrs = attributes();
        let mut volume = Array3::<f32>::zeros((8, 8, 6));
        volume[[4, 4, 3]] = 1.0;
        let proj = VoxelDrivenProjector::new()
            .forward_project(volume.view(), &attrs)
            .unwrap();
        assert_eq!(proj.dim(), (6, 12, 16));
        let total: f32 = proj.iter().sum();
        assert!(total > 0.0);
        assert_eq!(proj[[0, 0, 0]], 0.0);
    }

    #[test]
    fn footprint_weights_sum_to_inverse_square_depth() {
        let attrs = attributes();
        let point = attrs.voxel_center(4, 4, 3);
        let fp = footprint(&attrs.geom[0], point, 12, 16).unwrap();
        let depth = attrs.geom[0].project(point).unwrap().depth;
        let sum: f64 = fp.taps().iter().map(|&(_, w)| w).sum();
        assert!((sum - 1.0 / (depth * depth)).abs() < 1e-12);
    }

    #[test]
    fn wrong_volume_shape_is_rejected() {
        let attrs = attributes();
        let volume = Array3::<f32>::zeros((8, 8, 5));
        let err = VoxelDrivenProjector::new()
            .forward_project(volume.view(), &attrs)
            .unwrap_err();
        assert!(matches!(err, ReconError::ShapeMismatch { .. }));
    }

    #[test]
    fn wrong_projection_shape_is_rejected() {
        let attrs = attributes();
        let projections = Array3::<f32>::zeros((5, 12, 16));
        assert!(VoxelDrivenProjector::new()
            .backproject(projections.view(), &attrs)
            .is_err());
    }

    #[test]
    fn backprojection_of_uniform_data_is_positive_inside_field() {
        let attrs = attributes();
        let projections = Array3::<f32>::ones((6, 12, 16));
        let volume = VoxelDrivenProjector::new()
            .backproject(projections.view(), &attrs)
            .unwrap();
        assert_eq!(volume.dim(), (8, 8, 6));
        assert!(volume[[4, 4, 3]] > 0.0);
    }
}
