//! Quadric error metric
//!
//! A quadric stores the symmetric 4x4 matrix
//!
//! ```txt
//! [a00, a10, a20, b0]
//! [   , a11, a21, b1]
//! [   ,    , a22, b2]
//! [   ,    ,    , c ]
//! ```
//!
//! together with the accumulated weight `w`. Evaluating it at a point gives the weighted sum
//! of squared distances to all the planes that were added; [`Quadric::error`] divides the
//! weight back out.

use crate::classify::VertexKind;
use meshlod_core::{try_with_capacity, Bounded, Result, Vector3f, VertexPositions};
use std::ops::{Add, AddAssign};

/// Weight of the edge quadrics along open borders
const BORDER_EDGE_WEIGHT: f32 = 10.0;
/// Weight of the edge quadrics along attribute seams
const SEAM_EDGE_WEIGHT: f32 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quadric {
    pub a00: f32,
    pub a11: f32,
    pub a22: f32,
    pub a10: f32,
    pub a20: f32,
    pub a21: f32,
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub c: f32,
    pub w: f32,
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Self) {
        self.a00 += rhs.a00;
        self.a11 += rhs.a11;
        self.a22 += rhs.a22;
        self.a10 += rhs.a10;
        self.a20 += rhs.a20;
        self.a21 += rhs.a21;
        self.b0 += rhs.b0;
        self.b1 += rhs.b1;
        self.b2 += rhs.b2;
        self.c += rhs.c;
        self.w += rhs.w;
    }
}

impl Add for Quadric {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

/// Normalize `v` in place unless it has zero length; returns the original length.
#[inline]
fn normalize(v: &mut Vector3f) -> f32 {
    let length = v.norm();

    if length > 0.0 {
        *v /= length;
    }

    length
}

impl Quadric {
    /// Squared distance to the plane `ax + by + cz + d = 0`, scaled by `w`
    pub fn from_plane(a: f32, b: f32, c: f32, d: f32, w: f32) -> Self {
        let aw = a * w;
        let bw = b * w;
        let cw = c * w;
        let dw = d * w;

        Self {
            a00: a * aw,
            a11: b * bw,
            a22: c * cw,
            a10: a * bw,
            a20: a * cw,
            a21: b * cw,
            b0: a * dw,
            b1: b * dw,
            b2: c * dw,
            c: d * dw,
            w,
        }
    }

    /// Squared distance to the point `p`, scaled by `w`
    pub fn from_point(p: &Vector3f, w: f32) -> Self {
        Self {
            a00: w,
            a11: w,
            a22: w,
            a10: 0.0,
            a20: 0.0,
            a21: 0.0,
            b0: -2.0 * p.x * w,
            b1: -2.0 * p.y * w,
            b2: -2.0 * p.z * w,
            c: p.norm_squared() * w,
            w,
        }
    }

    /// Plane of the triangle, weighted by the square root of its (doubled) area
    pub fn from_triangle(p0: &Vector3f, p1: &Vector3f, p2: &Vector3f, weight: f32) -> Self {
        let p10 = p1 - p0;
        let p20 = p2 - p0;

        let mut normal = p10.cross(&p20);
        let area = normalize(&mut normal);

        let distance = normal.dot(p0);

        // sqrt keeps the error linear in the triangle size, which tends to help silhouettes
        Self::from_plane(normal.x, normal.y, normal.z, -distance, area.sqrt() * weight)
    }

    /// Plane through the edge `p0 -> p1` perpendicular to the triangle, weighted by edge length.
    ///
    /// Penalizes moving vertices off the edge inside the triangle's plane.
    pub fn from_triangle_edge(p0: &Vector3f, p1: &Vector3f, p2: &Vector3f, weight: f32) -> Self {
        let mut p10 = p1 - p0;
        let length = normalize(&mut p10);

        // projection of p2 - p0 onto the edge direction
        let p20 = p2 - p0;
        let p20p = p20.dot(&p10);

        // altitude of the triangle from p2 onto the edge
        let mut normal = p20 - p10 * p20p;
        normalize(&mut normal);

        let distance = normal.dot(p0);

        Self::from_plane(normal.x, normal.y, normal.z, -distance, length * weight)
    }

    /// Weighted mean squared distance of `v` to the accumulated planes/points.
    pub fn error(&self, v: &Vector3f) -> f32 {
        let mut rx = self.b0;
        let mut ry = self.b1;
        let mut rz = self.b2;

        rx += self.a10 * v.y;
        ry += self.a21 * v.z;
        rz += self.a20 * v.x;

        rx *= 2.0;
        ry *= 2.0;
        rz *= 2.0;

        rx += self.a00 * v.x;
        ry += self.a11 * v.y;
        rz += self.a22 * v.z;

        let mut r = self.c;
        r += rx * v.x;
        r += ry * v.y;
        r += rz * v.z;

        let s = if self.w == 0.0 { 0.0 } else { 1.0 / self.w };

        r.abs() * s
    }
}

/// Copy positions out and map them into the unit cube: `(p - min) / max_extent`.
///
/// Degenerate inputs where every position coincides map to the origin.
pub fn rescale_positions(positions: &VertexPositions) -> Result<Vec<Vector3f>> {
    let bounds = positions.bounding_box();
    let extent = bounds.max_extent();
    let scale = if extent == 0.0 { 0.0 } else { 1.0 / extent };

    let mut result = try_with_capacity("rescaled positions", positions.len())?;
    result.extend(positions.iter().map(|p| (p - bounds.min) * scale));

    Ok(result)
}

pub fn fill_face_quadrics(quadrics: &mut [Quadric], indices: &[u32], positions: &[Vector3f], remap: &[u32]) {
    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);

        let q = Quadric::from_triangle(&positions[i0], &positions[i1], &positions[i2], 1.0);

        quadrics[remap[i0] as usize] += q;
        quadrics[remap[i1] as usize] += q;
        quadrics[remap[i2] as usize] += q;
    }
}

/// Add edge quadrics for every half-edge that runs along a border or seam loop.
pub fn fill_edge_quadrics(
    quadrics: &mut [Quadric],
    indices: &[u32],
    positions: &[Vector3f],
    remap: &[u32],
    kinds: &[VertexKind],
    loops: &[u32],
) {
    const NEXT: [usize; 3] = [1, 2, 0];

    for tri in indices.chunks_exact(3) {
        for e in 0..3 {
            let i0 = tri[e];
            let i1 = tri[NEXT[e]];

            let k0 = kinds[i0 as usize];
            let k1 = kinds[i1 as usize];

            // loops track half-edges so checking i0 -> i1 is enough
            if k0 != k1 || !matches!(k0, VertexKind::Border | VertexKind::Seam) || loops[i0 as usize] != i1 {
                continue;
            }

            let i2 = tri[NEXT[NEXT[e]]];

            let weight = if k0 == VertexKind::Seam {
                SEAM_EDGE_WEIGHT
            } else {
                BORDER_EDGE_WEIGHT
            };

            let q = Quadric::from_triangle_edge(
                &positions[i0 as usize],
                &positions[i1 as usize],
                &positions[i2 as usize],
                weight,
            );

            quadrics[remap[i0 as usize] as usize] += q;
            quadrics[remap[i1 as usize] as usize] += q;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshlod_core::Point3f;

    #[test]
    fn test_plane_error() {
        // z = 1
        let q = Quadric::from_plane(0.0, 0.0, 1.0, -1.0, 3.0);

        assert_relative_eq!(q.error(&Vector3f::new(5.0, -2.0, 1.0)), 0.0);
        assert_relative_eq!(q.error(&Vector3f::new(0.0, 0.0, 3.0)), 4.0);
    }

    #[test]
    fn test_point_error() {
        let q = Quadric::from_point(&Vector3f::new(1.0, 2.0, 3.0), 0.5);

        assert_relative_eq!(q.error(&Vector3f::new(1.0, 2.0, 3.0)), 0.0);
        assert_relative_eq!(q.error(&Vector3f::new(1.0, 2.0, 5.0)), 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sum_averages_by_weight() {
        let q = Quadric::from_point(&Vector3f::new(0.0, 0.0, 0.0), 1.0)
            + Quadric::from_point(&Vector3f::new(2.0, 0.0, 0.0), 1.0);

        assert_relative_eq!(q.w, 2.0);
        assert_relative_eq!(q.error(&Vector3f::new(1.0, 0.0, 0.0)), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_weight_has_zero_error() {
        let q = Quadric::default();
        assert_eq!(q.error(&Vector3f::new(7.0, 7.0, 7.0)), 0.0);
    }

    #[test]
    fn test_triangle_error_is_height_squared() {
        let p0 = Vector3f::new(0.0, 0.0, 0.0);
        let p1 = Vector3f::new(1.0, 0.0, 0.0);
        let p2 = Vector3f::new(0.0, 1.0, 0.0);

        let q = Quadric::from_triangle(&p0, &p1, &p2, 1.0);

        assert_relative_eq!(q.w, 1.0);
        assert_relative_eq!(q.error(&Vector3f::new(0.3, 0.3, 2.0)), 4.0, epsilon = 1e-5);
        assert_relative_eq!(q.error(&Vector3f::new(10.0, -4.0, 0.0)), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_degenerate_triangle_has_zero_weight() {
        let p = Vector3f::new(1.0, 1.0, 1.0);
        let q = Quadric::from_triangle(&p, &p, &p, 1.0);

        assert_eq!(q.w, 0.0);
        assert_eq!(q.error(&Vector3f::new(0.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_edge_quadric() {
        let p0 = Vector3f::new(0.0, 0.0, 0.0);
        let p1 = Vector3f::new(2.0, 0.0, 0.0);
        let p2 = Vector3f::new(0.5, 1.0, 0.0);

        let q = Quadric::from_triangle_edge(&p0, &p1, &p2, 10.0);

        assert_relative_eq!(q.w, 20.0);
        // sliding along the edge or out of the triangle plane is free
        assert_relative_eq!(q.error(&Vector3f::new(5.0, 0.0, 7.0)), 0.0, epsilon = 1e-5);
        assert_relative_eq!(q.error(&Vector3f::new(5.0, 2.0, 0.0)), 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rescale_positions() {
        let points = vec![Point3f::new(1.0, 1.0, 1.0), Point3f::new(3.0, 2.0, 1.0)];
        let rescaled = rescale_positions(&VertexPositions::from_points(&points)).unwrap();

        assert_eq!(rescaled[0], Vector3f::new(0.0, 0.0, 0.0));
        assert_eq!(rescaled[1], Vector3f::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn test_rescale_coincident_positions() {
        let points = vec![Point3f::new(4.0, 4.0, 4.0); 3];
        let rescaled = rescale_positions(&VertexPositions::from_points(&points)).unwrap();

        assert!(rescaled.iter().all(|p| *p == Vector3f::zeros()));
    }

    #[test]
    fn test_face_quadrics_accumulate_on_canonical_vertices() {
        let positions = vec![
            Vector3f::new(0.0, 0.0, 0.0),
            Vector3f::new(1.0, 0.0, 0.0),
            Vector3f::new(0.0, 1.0, 0.0),
            Vector3f::new(0.0, 0.0, 0.0),
        ];
        let remap = [0, 1, 2, 0];
        let mut quadrics = vec![Quadric::default(); 4];

        fill_face_quadrics(&mut quadrics, &[0, 1, 2, 3, 2, 1], &positions, &remap);

        assert_relative_eq!(quadrics[0].w, 2.0);
        assert_eq!(quadrics[3], Quadric::default());
    }
}
