use anyhow::Context;
use conebeam::config::{CosineFormula, FilterBackend};
use conebeam::ReconConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::generator::phantom::PhantomConfig;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub recon: ReconConfig,
    /// Synthetic acquisition used when no projection files are given.
    pub phantom: Option<PhantomConfig>,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .recon
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        proj_shape: [usize; 3],
        volume_shape: [usize; 3],
        ramlak_width: usize,
        corrected_cosine: bool,
        fft: bool,
    ) -> Self {
        let mut recon = ReconConfig {
            proj_shape,
            ramlak_width,
            ..Default::default()
        };
        recon.volume.shape = volume_shape;
        recon.volume.origin = volume_shape.map(|n| -(n as f64 - 1.0) / 2.0);
        if corrected_cosine {
            recon.cosine_formula = CosineFormula::Corrected;
        }
        if fft {
            recon.filter_backend = FilterBackend::Fft;
        }
        Self {
            recon,
            phantom: None,
        }
    }
}
