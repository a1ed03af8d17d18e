use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};

/// Zero-padded linear convolution of fixed-length rows with one kernel.
///
/// The plans and the kernel spectrum are built once and shared across threads;
/// each call allocates its own working buffer.
pub struct FftConvolver {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    kernel_spectrum: Vec<Complex64>,
    signal_len: usize,
    kernel_len: usize,
}

impl FftConvolver {
    pub fn new(kernel: &[f64], signal_len: usize) -> Self {
        let size = (signal_len + kernel.len()).saturating_sub(1).max(1).next_power_of_two();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);

        let mut kernel_spectrum = vec![Complex64::zero(); size];
        for (slot, &k) in kernel_spectrum.iter_mut().zip(kernel) {
            *slot = Complex64::new(k, 0.0);
        }
        forward.process(&mut kernel_spectrum);

        Self {
            forward,
            inverse,
            kernel_spectrum,
            signal_len,
            kernel_len: kernel.len(),
        }
    }

    pub fn fft_len(&self) -> usize {
        self.kernel_spectrum.len()
    }

    /// Convolves `row` and returns the centred `signal_len` samples ("same" mode).
    pub fn convolve_same(&self, row: &[f32]) -> Vec<f32> {
        let size = self.fft_len();
        let mut buffer = vec![Complex64::zero(); size];
        for (slot, &value) in buffer.iter_mut().zip(row) {
            *slot = Complex64::new(value as f64, 0.0);
        }

        self.forward.process(&mut buffer);
        for (b, k) in buffer.iter_mut().zip(&self.kernel_spectrum) {
            *b *= *k;
        }
        self.inverse.process(&mut buffer);

        let offset = self.kernel_len / 2;
        let scale = 1.0 / size as f64;
        buffer[offset..offset + self.signal_len]
            .iter()
            .map(|c| (c.re * scale) as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_kernel_returns_input() {
        let conv = FftConvolver::new(&[0.0, 1.0, 0.0], 4);
        let output = conv.convolve_same(&[1.0, 2.0, -1.0, 0.5]);
        assert_eq!(output.len(), 4);
        for (o, e) in output.iter().zip([1.0, 2.0, -1.0, 0.5]) {
            assert!((o - e).abs() < 1e-6);
        }
    }

    #[test]
    fn plan_covers_full_linear_convolution() {
        let conv = FftConvolver::new(&[1.0; 7], 10);
        assert!(conv.fft_len() >= 16);
    }
}
