//! Strided read-only view over vertex positions

use crate::error::{Error, Result};
use crate::point::*;

/// Largest supported distance between consecutive positions, in bytes
pub const MAX_POSITION_STRIDE: usize = 256;

/// A read-only view of `len` vertex positions stored as 3 leading floats every `stride` floats.
///
/// This lets callers hand over interleaved vertex buffers (position followed by normals,
/// UVs, ...) without copying the positions out first.
#[derive(Debug, Clone, Copy)]
pub struct VertexPositions<'a> {
    data: &'a [f32],
    stride: usize,
    len: usize,
}

impl<'a> VertexPositions<'a> {
    /// Create a view over `vertex_count` positions spaced `stride_bytes` apart.
    ///
    /// The stride must be a non-zero multiple of 4 bytes, hold at least 3 floats and not
    /// exceed [`MAX_POSITION_STRIDE`].
    pub fn new(data: &'a [f32], stride_bytes: usize, vertex_count: usize) -> Result<Self> {
        let float_size = std::mem::size_of::<f32>();

        if stride_bytes == 0 || stride_bytes % float_size != 0 {
            return Err(Error::invalid_argument(format!(
                "position stride {stride_bytes} must be a non-zero multiple of {float_size} bytes"
            )));
        }
        if stride_bytes > MAX_POSITION_STRIDE {
            return Err(Error::invalid_argument(format!(
                "position stride {stride_bytes} exceeds {MAX_POSITION_STRIDE} bytes"
            )));
        }
        if stride_bytes < 3 * float_size {
            return Err(Error::invalid_argument(format!(
                "position stride {stride_bytes} cannot hold 3 floats"
            )));
        }

        let stride = stride_bytes / float_size;
        let required = match vertex_count {
            0 => Some(0),
            n => (n - 1).checked_mul(stride).and_then(|r| r.checked_add(3)),
        };

        match required {
            Some(required) if data.len() >= required => {}
            _ => {
                return Err(Error::invalid_argument(format!(
                    "position buffer holds {} floats, too short for {} vertices with stride {}",
                    data.len(),
                    vertex_count,
                    stride_bytes
                )));
            }
        }

        Ok(Self {
            data,
            stride,
            len: vertex_count,
        })
    }

    /// Create a view over tightly packed points
    pub fn from_points(points: &'a [Point3f]) -> Self {
        Self {
            data: bytemuck::cast_slice(points),
            stride: 3,
            len: points.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distance between consecutive positions, in floats
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn coords(&self, index: usize) -> [f32; 3] {
        let offset = index * self.stride;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }

    #[inline]
    pub fn point(&self, index: usize) -> Point3f {
        let [x, y, z] = self.coords(index);
        Point3f::new(x, y, z)
    }

    /// Raw IEEE-754 bit patterns of a position; two positions are identical iff their bits are.
    #[inline]
    pub fn bits(&self, index: usize) -> [u32; 3] {
        let [x, y, z] = self.coords(index);
        [x.to_bits(), y.to_bits(), z.to_bits()]
    }

    pub fn iter(&self) -> impl Iterator<Item = Point3f> + '_ {
        (0..self.len).map(move |i| self.point(i))
    }
}

impl<'a> From<&'a [Point3f]> for VertexPositions<'a> {
    fn from(points: &'a [Point3f]) -> Self {
        Self::from_points(points)
    }
}
