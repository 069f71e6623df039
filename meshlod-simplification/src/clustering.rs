//! Clustering-based mesh and point cloud simplification
//!
//! Both simplifiers snap vertices to a uniform grid whose resolution is searched so that
//! the surviving triangle (or point) count lands just under the target. Every cell keeps
//! the one original vertex that best fits the cell's quadric, so no new positions are
//! created and vertex attributes stay valid.

use crate::sloppy::{simplify_points, simplify_sloppy_in_place};
use crate::{mesh_from_indices, reduction_target, MeshSimplifier};
use meshlod_core::{try_filled, Error, Point3f, PointCloud, Result, TriangleMesh};
use tracing::debug;

/// Grid clustering simplifier.
///
/// Always reaches the requested face count, at the cost of topology: small holes close
/// and thin features may disappear. Much faster than [`crate::EdgeCollapseSimplifier`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusteringSimplifier;

impl ClusteringSimplifier {
    pub fn new() -> Self {
        Self
    }
}

impl MeshSimplifier for ClusteringSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh> {
        let Some(target_index_count) = reduction_target(mesh, reduction_ratio)? else {
            return Ok(mesh.clone());
        };

        let mut indices = mesh.indices().to_vec();
        let count = simplify_sloppy_in_place(&mut indices, &mesh.positions(), target_index_count)?;

        Ok(mesh_from_indices(mesh, &indices, count))
    }
}

/// Point cloud simplifier that keeps one representative point per grid cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointSimplifier;

impl PointSimplifier {
    pub fn new() -> Self {
        Self
    }

    /// Reduce `cloud` by `reduction_ratio` (0.0 = keep everything, 1.0 = remove everything).
    ///
    /// The result is a subset of the input points in cell discovery order.
    pub fn simplify(&self, cloud: &PointCloud<Point3f>, reduction_ratio: f32) -> Result<PointCloud<Point3f>> {
        if cloud.is_empty() {
            return Err(Error::InvalidData("Point cloud is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&reduction_ratio) {
            return Err(Error::InvalidData(
                "Reduction ratio must be between 0.0 and 1.0".to_string(),
            ));
        }
        if reduction_ratio == 0.0 {
            return Ok(cloud.clone());
        }

        let target = ((1.0 - reduction_ratio) * cloud.len() as f32) as usize;

        let mut selected = try_filled("selected points", target, 0u32)?;
        let count = simplify_points(&mut selected, &cloud.positions(), target)?;

        debug!("PointSimplifier: kept {} of {} points", count, cloud.len());

        Ok(cloud.select(&selected[..count]))
    }
}
