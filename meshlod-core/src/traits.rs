//! Core traits for meshlod

use crate::{mesh::*, point::*, point_cloud::*, positions::VertexPositions};

/// Objects with an axis-aligned bounding box
pub trait Bounded {
    /// Get the bounding box of the object; [`Aabb::empty`] when there is nothing to bound
    fn bounding_box(&self) -> Aabb;
}

impl Bounded for VertexPositions<'_> {
    fn bounding_box(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for p in self.iter() {
            bounds.extend(&p);
        }
        bounds
    }
}

impl Bounded for TriangleMesh {
    fn bounding_box(&self) -> Aabb {
        self.positions().bounding_box()
    }
}

impl Bounded for PointCloud<Point3f> {
    fn bounding_box(&self) -> Aabb {
        self.positions().bounding_box()
    }
}
