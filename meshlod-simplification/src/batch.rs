//! Parallel simplification of independent meshes

use crate::MeshSimplifier;
use meshlod_core::{Result, TriangleMesh};
use rayon::prelude::*;

/// Simplify every mesh in `meshes` with the same simplifier and ratio, in parallel.
///
/// Each call owns its working memory, so meshes never share state. Results keep the input
/// order and one failing mesh does not affect the others.
pub fn simplify_batch<S>(meshes: &[TriangleMesh], simplifier: &S, reduction_ratio: f32) -> Vec<Result<TriangleMesh>>
where
    S: MeshSimplifier + Sync + ?Sized,
{
    meshes
        .par_iter()
        .map(|mesh| simplifier.simplify(mesh, reduction_ratio))
        .collect()
}
