use anyhow::Context;
use clap::Parser;
use conebeam::math::StatsHelper;
use generator::phantom::build_synthetic_scan;
use log::info;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::io::{read_geometry, read_projections, write_geometry, write_volume};
use workflow::runner::{Acquisition, Runner};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Cone-beam FDK reconstruction driver")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Projection stack (.npy, shape N x V x U); a synthetic phantom is scanned when omitted
    #[arg(long, requires = "geometry")]
    projections: Option<PathBuf>,
    /// Projection-matrix table (JSON)
    #[arg(long, requires = "projections")]
    geometry: Option<PathBuf>,
    /// Destination of the reconstructed volume (.npy)
    #[arg(long, default_value = "volume.npy")]
    output: PathBuf,
    /// Also write the synthetic geometry table next to the volume
    #[arg(long, default_value_t = false)]
    dump_geometry: bool,
    #[arg(long, default_value_t = 200)]
    views: usize,
    #[arg(long, default_value_t = 480)]
    rows: usize,
    #[arg(long, default_value_t = 620)]
    columns: usize,
    #[arg(long, default_value_t = 200)]
    volume_size: usize,
    #[arg(long, default_value_t = 101)]
    ramlak_width: usize,
    /// Use the textbook `du + dv` cosine weights instead of the legacy `dv + dv`
    #[arg(long, default_value_t = false)]
    corrected_cosine: bool,
    /// Apply the ramp filter through FFT convolution
    #[arg(long, default_value_t = false)]
    fft: bool,
    /// Report the projector adjointness error before reconstructing
    #[arg(long, default_value_t = false)]
    check_adjoint: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(
            [args.views, args.rows, args.columns],
            [args.volume_size; 3],
            args.ramlak_width,
            args.corrected_cosine,
            args.fft,
        )
    };
    let runner = Runner::new(workflow_config.clone());

    let acquisition = match (&args.projections, &args.geometry) {
        (Some(projections), Some(geometry)) => Acquisition {
            projections: read_projections(projections)?,
            geometry: read_geometry(geometry)?,
        },
        _ => {
            let phantom = workflow_config.phantom.clone().unwrap_or_default();
            info!(
                "scanning synthetic phantom with {} spheres",
                phantom.spheres.len()
            );
            let scan = build_synthetic_scan(&workflow_config.recon, &phantom)
                .context("generating synthetic acquisition")?;
            let truth = StatsHelper::summary(&scan.phantom);
            info!(
                "phantom density in [{:.3}, {:.3}], mean {:.4}",
                truth.min, truth.max, truth.mean
            );
            if args.dump_geometry {
                write_geometry(args.output.with_extension("geom.json"), &scan.geometry)?;
            }
            Acquisition {
                projections: scan.projections,
                geometry: scan.geometry,
            }
        }
    };

    if args.check_adjoint {
        let error = runner
            .check_adjoint(acquisition.geometry.clone(), 0)
            .context("checking projector adjointness")?;
        println!("Adjointness relative error: {:.3e}", error);
    }

    let result = runner.execute(acquisition)?;
    for note in &result.notes {
        info!("{}", note);
    }
    write_volume(&args.output, &result.volume)?;

    println!(
        "Reconstruction -> min {:.4}, max {:.4}, mean {:.4}, rms {:.4}; {} stages in {:.2?}",
        result.summary.min,
        result.summary.max,
        result.summary.mean,
        result.summary.rms,
        result.metrics.stages,
        result.metrics.elapsed
    );
    println!("Volume written to {}", args.output.display());

    Ok(())
}
