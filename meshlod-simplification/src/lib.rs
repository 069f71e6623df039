//! Mesh simplification and decimation algorithms
//!
//! This crate reduces the triangle count of indexed meshes while keeping their
//! appearance close to the original:
//! - Quadric error edge collapse ([`simplify`]) that respects borders and attribute seams
//! - Grid clustering ([`simplify_sloppy`]) that always reaches the target
//! - Point cloud reduction ([`simplify_points`])
//!
//! The engine works on raw index buffers and a strided [`VertexPositions`] view and never
//! touches vertex data. [`EdgeCollapseSimplifier`], [`ClusteringSimplifier`],
//! [`LodChainBuilder`] and [`simplify_batch`] wrap it for [`TriangleMesh`] values.

pub mod adjacency;
pub mod batch;
pub mod classify;
pub mod clustering;
pub mod collapse;
pub mod edge_collapse;
pub mod hash;
pub mod lod;
pub mod quadric;
pub mod remap;
pub mod simplify;
pub mod sloppy;

pub use batch::*;
pub use classify::{LockedStats, VertexKind, NO_LOOP};
pub use clustering::*;
pub use edge_collapse::*;
pub use lod::*;
pub use simplify::{simplify, simplify_in_place, simplify_with_debug, SimplifyDebug};
pub use sloppy::{simplify_points, simplify_sloppy, simplify_sloppy_in_place, MAX_GRID_SIZE};

pub use meshlod_core::VertexPositions;
use meshlod_core::{Error, Result, TriangleMesh};

/// Simplify a mesh by reducing the number of faces/vertices
pub trait MeshSimplifier {
    /// Simplify mesh with target reduction ratio (0.0 = no reduction, 1.0 = maximum reduction)
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh>;
}

/// Checks an adapter request and turns the ratio into a target index count.
///
/// `None` means the ratio asks for no reduction at all.
pub(crate) fn reduction_target(mesh: &TriangleMesh, reduction_ratio: f32) -> Result<Option<usize>> {
    if mesh.is_empty() {
        return Err(Error::InvalidData("Mesh is empty".to_string()));
    }
    if !(0.0..=1.0).contains(&reduction_ratio) {
        return Err(Error::InvalidData(
            "Reduction ratio must be between 0.0 and 1.0".to_string(),
        ));
    }
    if reduction_ratio == 0.0 {
        return Ok(None);
    }

    let target_faces = ((1.0 - reduction_ratio) * mesh.faces.len() as f32) as usize;
    Ok(Some(target_faces * 3))
}

/// Rebuild `mesh` around the first `count` entries of a simplified index buffer.
pub(crate) fn mesh_from_indices(mesh: &TriangleMesh, indices: &[u32], count: usize) -> TriangleMesh {
    let faces: &[[u32; 3]] = bytemuck::cast_slice(&indices[..count]);
    mesh.with_faces(faces.to_vec())
}
