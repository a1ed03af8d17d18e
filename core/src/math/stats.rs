use ndarray::{ArrayBase, Data, Dimension, Zip};

use crate::prelude::{ensure_shape, ReconResult};

/// Summary of a volume or projection stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub rms: f64,
}

pub struct StatsHelper;

impl StatsHelper {
    /// Inner product accumulated in `f64`. Both operands must share a shape.
    pub fn dot<S1, S2, D>(lhs: &ArrayBase<S1, D>, rhs: &ArrayBase<S2, D>) -> ReconResult<f64>
    where
        S1: Data<Elem = f32>,
        S2: Data<Elem = f32>,
        D: Dimension,
    {
        ensure_shape("dot product", lhs.shape(), rhs.shape())?;
        Ok(Zip::from(lhs)
            .and(rhs)
            .fold(0.0_f64, |acc, &a, &b| acc + a as f64 * b as f64))
    }

    pub fn summary<S, D>(values: &ArrayBase<S, D>) -> Summary
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        if values.is_empty() {
            return Summary {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                rms: 0.0,
            };
        }
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0_f64;
        let mut sum_sq = 0.0_f64;
        for &v in values.iter() {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            sum_sq += v as f64 * v as f64;
        }
        let count = values.len() as f64;
        Summary {
            min,
            max,
            mean: sum / count,
            rms: (sum_sq / count).sqrt(),
        }
    }
}
