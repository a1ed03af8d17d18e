pub mod cosine;
pub mod parker;

pub use cosine::{cosine_weights, CosineParams};
pub use parker::{parker_row, parker_weight, parker_weights, ParkerParams, ANGLE_TOLERANCE};

use ndarray::Array3;
use rayon::prelude::*;

use crate::prelude::{ReconError, ReconResult};

/// Multiplies `stack` in place by a weight volume.
///
/// Each weight axis must either match the stack axis or be 1, in which case the
/// weight is repeated along it. Anything else is a [`ReconError::ShapeMismatch`].
pub fn apply_weights(stack: &mut Array3<f32>, weights: &Array3<f32>) -> ReconResult<()> {
    let (n, v, u) = stack.dim();
    let (wn, wv, wu) = weights.dim();
    let compatible = |w: usize, s: usize| w == s || w == 1;
    if !(compatible(wn, n) && compatible(wv, v) && compatible(wu, u)) {
        return Err(ReconError::shape_mismatch(
            "weight broadcast",
            &[n, v, u],
            &[wn, wv, wu],
        ));
    }
    if stack.is_empty() {
        return Ok(());
    }

    let weights: Vec<f32> = weights.iter().copied().collect();
    let mut data: Vec<f32> = stack.iter().copied().collect();

    data.par_chunks_mut(v * u)
        .enumerate()
        .for_each(|(view, plane)| {
            let wview = if wn == 1 { 0 } else { view };
            for row in 0..v {
                let wrow = if wv == 1 { 0 } else { row };
                let base = (wview * wv + wrow) * wu;
                for (col, value) in plane[row * u..(row + 1) * u].iter_mut().enumerate() {
                    let wcol = if wu == 1 { 0 } else { col };
                    *value *= weights[base + wcol];
                }
            }
        });

    *stack = Array3::from_shape_vec((n, v, u), data)
        .map_err(|_| ReconError::shape_mismatch("weight broadcast", &[n, v, u], &[n * v * u]))?;
    Ok(())
}
