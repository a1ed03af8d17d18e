pub mod convolve;
pub mod ramlak;

pub use convolve::{convolve_same, filter_rows};
pub use ramlak::ramlak_kernel;
