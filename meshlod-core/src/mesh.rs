//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use crate::positions::VertexPositions;
use serde::{Deserialize, Serialize};

/// An indexed triangle mesh.
///
/// Normals and colors are per-vertex attributes; simplification only rewrites `faces`
/// and keeps the vertex buffer as-is, so attributes stay valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[u32; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub colors: Option<Vec<[u8; 3]>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            colors: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            colors: None,
        }
    }

    /// Create a mesh from vertices and a flat index buffer
    pub fn from_indices(vertices: Vec<Point3f>, indices: &[u32]) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(Error::invalid_argument(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }

        let faces = bytemuck::cast_slice::<u32, [u32; 3]>(indices).to_vec();
        Ok(Self::from_vertices_and_faces(vertices, faces))
    }

    /// Same vertex buffer and attributes, different triangles
    pub fn with_faces(&self, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices: self.vertices.clone(),
            faces,
            normals: self.normals.clone(),
            colors: self.colors.clone(),
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn index_count(&self) -> usize {
        self.faces.len() * 3
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Faces as a flat index buffer
    pub fn indices(&self) -> &[u32] {
        bytemuck::cast_slice(&self.faces)
    }

    pub fn positions(&self) -> VertexPositions<'_> {
        VertexPositions::from_points(&self.vertices)
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [u32; 3]) {
        self.faces.push(face);
    }

    /// Number of distinct vertices referenced by at least one face
    pub fn referenced_vertex_count(&self) -> usize {
        let mut used = vec![false; self.vertices.len()];
        for &index in self.indices() {
            if let Some(flag) = used.get_mut(index as usize) {
                *flag = true;
            }
        }
        used.into_iter().filter(|&u| u).count()
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set vertex colors
    pub fn set_colors(&mut self, colors: Vec<[u8; 3]>) {
        if colors.len() == self.vertices.len() {
            self.colors = Some(colors);
        }
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.normals = None;
        self.colors = None;
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(5.0, 5.0, 5.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_flat_indices() {
        let mesh = quad();
        assert_eq!(mesh.indices(), &[0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.index_count(), 6);
    }

    #[test]
    fn test_from_indices() {
        let mesh = quad();
        let rebuilt = TriangleMesh::from_indices(mesh.vertices.clone(), mesh.indices()).unwrap();
        assert_eq!(rebuilt, mesh);

        assert!(TriangleMesh::from_indices(mesh.vertices.clone(), &[0, 1]).is_err());
    }

    #[test]
    fn test_with_faces_keeps_attributes() {
        let mut mesh = quad();
        mesh.set_colors(vec![[1, 2, 3]; 5]);
        let reduced = mesh.with_faces(vec![[0, 1, 2]]);

        assert_eq!(reduced.face_count(), 1);
        assert_eq!(reduced.vertex_count(), 5);
        assert_eq!(reduced.colors, mesh.colors);
    }

    #[test]
    fn test_referenced_vertices() {
        let mesh = quad();
        assert_eq!(mesh.referenced_vertex_count(), 4);
        assert_eq!(TriangleMesh::new().referenced_vertex_count(), 0);
    }

    #[test]
    fn test_attribute_length_mismatch_is_ignored() {
        let mut mesh = quad();
        mesh.set_normals(vec![Vector3f::z(); 2]);
        assert!(mesh.normals.is_none());
    }
}
