pub mod fft;
pub mod stats;

pub use fft::FftConvolver;
pub use stats::{StatsHelper, Summary};
