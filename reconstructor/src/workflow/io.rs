use anyhow::Context;
use conebeam::geometry::{Geometry, ProjectionMatrix};
use conebeam::prelude::{ProjectionStack, Volume};
use ndarray_npy::{read_npy, write_npy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One row of a projection-matrix table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryEntry {
    pub matrix: [[f64; 4]; 3],
    /// Derived from the matrix when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

/// Reads a JSON array of [`GeometryEntry`] into a validated geometry.
pub fn read_geometry<P: AsRef<Path>>(path: P) -> anyhow::Result<Geometry> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref)
        .with_context(|| format!("reading geometry table {}", path_ref.display()))?;
    let entries: Vec<GeometryEntry> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing geometry table {}", path_ref.display()))?;
    geometry_from_entries(&entries)
        .with_context(|| format!("validating geometry table {}", path_ref.display()))
}

pub fn geometry_from_entries(entries: &[GeometryEntry]) -> anyhow::Result<Geometry> {
    let mut matrices = Vec::with_capacity(entries.len());
    let mut angles = Vec::with_capacity(entries.len());
    for (view, entry) in entries.iter().enumerate() {
        let matrix = ProjectionMatrix::from_rows(entry.matrix);
        let angle = match entry.angle {
            Some(angle) => angle,
            None => matrix
                .primary_angle()
                .with_context(|| format!("deriving angle of view {}", view))?,
        };
        matrices.push(matrix);
        angles.push(angle);
    }
    Ok(Geometry::new(matrices, angles)?)
}

pub fn write_geometry<P: AsRef<Path>>(path: P, geometry: &Geometry) -> anyhow::Result<()> {
    let path_ref = path.as_ref();
    let entries: Vec<GeometryEntry> = geometry
        .matrices()
        .iter()
        .zip(geometry.angles())
        .map(|(m, &angle)| GeometryEntry {
            matrix: m.rows(),
            angle: Some(angle),
        })
        .collect();
    let json = serde_json::to_string_pretty(&entries)?;
    fs::write(path_ref, json)
        .with_context(|| format!("writing geometry table {}", path_ref.display()))
}

pub fn read_projections<P: AsRef<Path>>(path: P) -> anyhow::Result<ProjectionStack> {
    let path_ref = path.as_ref();
    read_npy(path_ref).with_context(|| format!("reading projections {}", path_ref.display()))
}

pub fn write_volume<P: AsRef<Path>>(path: P, volume: &Volume) -> anyhow::Result<()> {
    let path_ref = path.as_ref();
    if let Some(parent) = path_ref.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
    }
    write_npy(path_ref, volume).with_context(|| format!("writing volume {}", path_ref.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conebeam::geometry::CircularTrajectory;
    use conebeam::ReconConfig;
    use ndarray::Array3;
    use tempfile::tempdir;

    fn geometry() -> Geometry {
        let config = ReconConfig {
            proj_shape: [3, 4, 6],
            ..Default::default()
        };
        let trajectory = CircularTrajectory {
            source_iso_dist_mm: 700.0,
            start_angle: 0.5,
            angular_range: 2.0,
        };
        Geometry::circular(&trajectory, &config).unwrap()
    }

    #[test]
    fn geometry_table_survives_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geom.json");
        let original = geometry();
        write_geometry(&path, &original).unwrap();
        let loaded = read_geometry(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.angles(), original.angles());
        for (a, b) in loaded.matrices().iter().zip(original.matrices()) {
            assert_eq!(a.rows(), b.rows());
        }
    }

    #[test]
    fn missing_angles_are_derived_from_matrices() {
        let original = geometry();
        let entries: Vec<GeometryEntry> = original
            .matrices()
            .iter()
            .map(|m| GeometryEntry {
                matrix: m.rows(),
                angle: None,
            })
            .collect();
        let loaded = geometry_from_entries(&entries).unwrap();
        for (a, b) in loaded.angles().iter().zip(original.angles()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(geometry_from_entries(&[]).is_err());
    }

    #[test]
    fn volume_is_written_as_npy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("volume.npy");
        let volume = Array3::from_shape_fn((2, 3, 4), |(x, y, z)| (x + y + z) as f32);
        write_volume(&path, &volume).unwrap();
        let back: Volume = read_npy(&path).unwrap();
        assert_eq!(back, volume);
    }
}
