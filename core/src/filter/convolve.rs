use ndarray::Array3;
use rayon::prelude::*;

use crate::config::FilterBackend;
use crate::math::fft::FftConvolver;
use crate::prelude::{ReconError, ReconResult};

/// "Same" convolution of one row with an odd-length kernel, zero padded, no bias.
pub fn convolve_same(row: &[f32], kernel: &[f64]) -> Vec<f32> {
    let len = row.len() as isize;
    let hw = (kernel.len() / 2) as isize;
    (0..len)
        .map(|m| {
            let mut acc = 0.0_f64;
            for (j, &k) in kernel.iter().enumerate() {
                let idx = m + hw - j as isize;
                if (0..len).contains(&idx) {
                    acc += k * row[idx as usize] as f64;
                }
            }
            acc as f32
        })
        .collect()
}

/// Filters every `(view, row)` lane of `stack` along the detector columns.
pub fn filter_rows(
    stack: &Array3<f32>,
    kernel: &[f64],
    backend: FilterBackend,
) -> ReconResult<Array3<f32>> {
    if kernel.len() % 2 == 0 {
        return Err(ReconError::InvalidKernelWidth(kernel.len()));
    }
    let (n, v, u) = stack.dim();
    if stack.is_empty() {
        return Ok(stack.clone());
    }
    let mut data: Vec<f32> = stack.iter().copied().collect();

    match backend {
        FilterBackend::Direct => data.par_chunks_mut(u).for_each(|lane| {
            let filtered = convolve_same(lane, kernel);
            lane.copy_from_slice(&filtered);
        }),
        FilterBackend::Fft => {
            let convolver = FftConvolver::new(kernel, u);
            data.par_chunks_mut(u).for_each(|lane| {
                let filtered = convolver.convolve_same(lane);
                lane.copy_from_slice(&filtered);
            });
        }
    }

    Array3::from_shape_vec((n, v, u), data)
        .map_err(|_| ReconError::shape_mismatch("ramp filter", &[n, v, u], &[n * v * u]))
}
