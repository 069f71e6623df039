//! Point types and related functionality

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Axis-aligned bounds of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3f,
    pub max: Point3f,
}

impl Aabb {
    /// Bounds that contain nothing; extending them with any point yields that point.
    pub fn empty() -> Self {
        Self {
            min: Point3f::new(f32::MAX, f32::MAX, f32::MAX),
            max: Point3f::new(-f32::MAX, -f32::MAX, -f32::MAX),
        }
    }

    pub fn extend(&mut self, p: &Point3f) {
        for i in 0..3 {
            self.min[i] = if self.min[i] > p[i] { p[i] } else { self.min[i] };
            self.max[i] = if self.max[i] < p[i] { p[i] } else { self.max[i] };
        }
    }

    /// Largest side length; zero for empty or single-point bounds
    pub fn max_extent(&self) -> f32 {
        let mut extent = 0.0f32;
        for i in 0..3 {
            let side = self.max[i] - self.min[i];
            extent = if side < extent { extent } else { side };
        }
        extent
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
