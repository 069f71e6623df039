//! Level-of-detail chain generation

use crate::simplify::simplify_in_place;
use crate::mesh_from_indices;
use meshlod_core::{Error, Result, TriangleMesh};
use tracing::debug;

/// Builds a chain of progressively coarser meshes from one source mesh.
///
/// Level `n` targets `index_count * ratio^n` indices, rounded down to whole triangles, so
/// level 0 is the source itself. Every level is simplified from the source rather than
/// from the previous level, which keeps errors from compounding down the chain.
#[derive(Debug, Clone)]
pub struct LodChainBuilder {
    /// Number of levels, including the source level
    pub levels: usize,
    /// Triangle ratio between consecutive levels
    pub ratio: f32,
    /// Largest allowed error per level, relative to the mesh extent
    pub target_error: f32,
}

impl Default for LodChainBuilder {
    fn default() -> Self {
        Self {
            levels: 4,
            ratio: 0.5,
            target_error: 1e-2,
        }
    }
}

impl LodChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(levels: usize, ratio: f32, target_error: f32) -> Self {
        Self {
            levels,
            ratio,
            target_error,
        }
    }

    /// Target index count for `level`
    pub fn target_index_count(&self, index_count: usize, level: usize) -> usize {
        let scale = self.ratio.powi(level as i32);
        let target = (index_count as f64 * scale as f64) as usize;
        target / 3 * 3
    }

    pub fn build(&self, mesh: &TriangleMesh) -> Result<Vec<TriangleMesh>> {
        if mesh.is_empty() {
            return Err(Error::InvalidData("Mesh is empty".to_string()));
        }
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(Error::InvalidData(
                "LOD ratio must be in (0.0, 1.0]".to_string(),
            ));
        }

        let positions = mesh.positions();
        let source = mesh.indices();

        let mut chain = Vec::with_capacity(self.levels);
        let mut indices = Vec::with_capacity(source.len());

        for level in 0..self.levels {
            let target = self.target_index_count(source.len(), level);

            indices.clear();
            indices.extend_from_slice(source);
            let count = simplify_in_place(&mut indices, &positions, target, self.target_error)?;

            debug!(
                "LodChainBuilder: level {} target {} triangles, got {}",
                level,
                target / 3,
                count / 3
            );

            chain.push(mesh_from_indices(mesh, &indices, count));
        }

        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlod_core::Point3f;

    fn make_curved_surface(size: usize) -> TriangleMesh {
        let mut vertices = Vec::new();
        for y in 0..size {
            for x in 0..size {
                let fx = x as f32 / (size - 1) as f32 * std::f32::consts::PI;
                let fy = y as f32 / (size - 1) as f32 * std::f32::consts::PI;
                vertices.push(Point3f::new(x as f32, y as f32, (fx.sin() * fy.sin()) * 2.0));
            }
        }
        let mut faces = Vec::new();
        for y in 0..(size - 1) as u32 {
            for x in 0..(size - 1) as u32 {
                let tl = y * size as u32 + x;
                let tr = tl + 1;
                let bl = tl + size as u32;
                let br = bl + 1;
                faces.push([tl, bl, tr]);
                faces.push([tr, bl, br]);
            }
        }
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    #[test]
    fn test_creation() {
        let b = LodChainBuilder::new();
        assert_eq!(b.levels, 4);
        assert_eq!(b.ratio, 0.5);
        assert_eq!(b.target_error, 1e-2);
    }

    #[test]
    fn test_target_index_count() {
        let b = LodChainBuilder::new();
        assert_eq!(b.target_index_count(300, 0), 300);
        assert_eq!(b.target_index_count(300, 1), 150);
        assert_eq!(b.target_index_count(300, 2), 75);
        // 37.5 rounds down to 37, then to whole triangles
        assert_eq!(b.target_index_count(300, 3), 36);
    }

    #[test]
    fn test_invalid_input() {
        let b = LodChainBuilder::new();
        assert!(b.build(&TriangleMesh::new()).is_err());

        let b = LodChainBuilder::with_params(3, 0.0, 1e-2);
        assert!(b.build(&make_curved_surface(4)).is_err());
    }

    #[test]
    fn test_chain_is_monotonic() {
        let mesh = make_curved_surface(16);
        let chain = LodChainBuilder::with_params(4, 0.5, 0.05).build(&mesh).unwrap();

        assert_eq!(chain.len(), 4);
        assert_eq!(chain[0].faces, mesh.faces);
        for pair in chain.windows(2) {
            assert!(pair[1].face_count() <= pair[0].face_count());
        }
        assert!(chain[3].face_count() < mesh.face_count());
    }

    #[test]
    fn test_zero_levels() {
        let chain = LodChainBuilder::with_params(0, 0.5, 1e-2)
            .build(&make_curved_surface(4))
            .unwrap();
        assert!(chain.is_empty());
    }
}
