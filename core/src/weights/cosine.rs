use ndarray::Array3;

use crate::config::CosineFormula;
use crate::prelude::{ReconError, ReconResult};

/// Detector description needed by the cosine weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CosineParams {
    pub source_det_dist_mm: f64,
    pub rows: usize,
    pub columns: usize,
    pub pixel_width_mm: f64,
    pub pixel_height_mm: f64,
    pub formula: CosineFormula,
}

/// Cosine weight volume of shape `(1, V, U)`.
///
/// With [`CosineFormula::Legacy`] the row offset enters the square root twice
/// and the column offset not at all.
pub fn cosine_weights(params: &CosineParams) -> ReconResult<Array3<f32>> {
    if params.rows == 0 || params.columns == 0 {
        return Err(ReconError::InvalidConfig(format!(
            "detector {}x{} has an empty axis",
            params.rows, params.columns
        )));
    }
    let sd = params.source_det_dist_mm;
    let sd2 = sd * sd;
    let cu = params.columns as f64 / 2.0 * params.pixel_width_mm;
    let cv = params.rows as f64 / 2.0 * params.pixel_height_mm;

    Ok(Array3::from_shape_fn(
        (1, params.rows, params.columns),
        |(_, v, u)| {
            let dv = ((v as f64 + 0.5) * params.pixel_height_mm - cv).powi(2);
            let du = ((u as f64 + 0.5) * params.pixel_width_mm - cu).powi(2);
            let radial = match params.formula {
                CosineFormula::Legacy => dv + dv,
                CosineFormula::Corrected => du + dv,
            };
            (sd / (sd2 + radial).sqrt()) as f32
        },
    ))
}
