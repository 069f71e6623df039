//! Edge collapse simplification
//!
//! Adapts the quadric error engine in [`crate::simplify`] to [`TriangleMesh`] values,
//! with an optional fallback to grid clustering for meshes the precise pass cannot
//! reduce far enough.

use crate::simplify::simplify_in_place;
use crate::sloppy::simplify_sloppy_in_place;
use crate::{mesh_from_indices, reduction_target, MeshSimplifier};
use meshlod_core::{Result, TriangleMesh};
use tracing::debug;

/// Quadric error edge collapse simplifier.
///
/// Collapses edges in order of increasing quadric error until the target face count is
/// reached or the next collapse would exceed `target_error`. Border and seam vertices only
/// slide along their own edge loop, so silhouettes and attribute seams survive.
pub struct EdgeCollapseSimplifier {
    /// Largest allowed error, relative to the mesh extent (0.01 = 1%)
    pub target_error: f32,
    /// Fall back to grid clustering when the precise pass stops above the target
    pub aggressive: bool,
    /// Only fall back for targets larger than this many triangles
    pub aggressive_min_triangles: usize,
}

impl Default for EdgeCollapseSimplifier {
    fn default() -> Self {
        Self {
            target_error: 1e-2,
            aggressive: false,
            aggressive_min_triangles: 50,
        }
    }
}

impl EdgeCollapseSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(target_error: f32, aggressive: bool, aggressive_min_triangles: usize) -> Self {
        Self {
            target_error,
            aggressive,
            aggressive_min_triangles,
        }
    }
}

impl MeshSimplifier for EdgeCollapseSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh> {
        let Some(target_index_count) = reduction_target(mesh, reduction_ratio)? else {
            return Ok(mesh.clone());
        };

        let positions = mesh.positions();
        let mut indices = mesh.indices().to_vec();

        let mut count = simplify_in_place(&mut indices, &positions, target_index_count, self.target_error)?;

        if self.aggressive
            && target_index_count > self.aggressive_min_triangles * 3
            && count > target_index_count
        {
            debug!(
                "EdgeCollapseSimplifier: precise pass stopped at {} triangles (target {}), clustering the rest",
                count / 3,
                target_index_count / 3
            );
            count = simplify_sloppy_in_place(&mut indices[..count], &positions, target_index_count)?;
        }

        Ok(mesh_from_indices(mesh, &indices, count))
    }
}
