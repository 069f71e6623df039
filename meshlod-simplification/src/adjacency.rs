//! Half-edge adjacency in compressed-row form
//!
//! Every triangle `(a, b, c)` contributes the directed edges `a->b`, `b->c` and `c->a`.
//! The edges leaving vertex `v` are stored contiguously at
//! `data[offsets[v]..offsets[v] + counts[v]]`.

use meshlod_core::{try_filled, Result};

#[derive(Debug, Clone)]
pub struct EdgeAdjacency {
    counts: Vec<u32>,
    offsets: Vec<u32>,
    data: Vec<u32>,
}

impl EdgeAdjacency {
    /// Indices must already be validated against `vertex_count`.
    pub fn build(indices: &[u32], vertex_count: usize) -> Result<Self> {
        let mut counts = try_filled("adjacency counts", vertex_count, 0u32)?;
        let mut offsets = try_filled("adjacency offsets", vertex_count, 0u32)?;
        let mut data = try_filled("adjacency data", indices.len(), 0u32)?;

        for &v in indices {
            counts[v as usize] += 1;
        }

        let mut offset = 0u32;
        for (o, &c) in offsets.iter_mut().zip(&counts) {
            *o = offset;
            offset += c;
        }

        debug_assert_eq!(offset as usize, indices.len());

        // offsets double as write cursors here
        for tri in indices.chunks_exact(3) {
            let (a, b, c) = (tri[0], tri[1], tri[2]);

            for (from, to) in [(a, b), (b, c), (c, a)] {
                let cursor = &mut offsets[from as usize];
                data[*cursor as usize] = to;
                *cursor += 1;
            }
        }

        // restore the cursors back to range starts
        for (o, &c) in offsets.iter_mut().zip(&counts) {
            debug_assert!(*o >= c);
            *o -= c;
        }

        Ok(Self {
            counts,
            offsets,
            data,
        })
    }

    /// Targets of all half-edges leaving `v`
    #[inline]
    pub fn neighbors(&self, v: u32) -> &[u32] {
        let start = self.offsets[v as usize] as usize;
        let count = self.counts[v as usize] as usize;
        &self.data[start..start + count]
    }

    #[inline]
    pub fn has_edge(&self, a: u32, b: u32) -> bool {
        self.neighbors(a).contains(&b)
    }

    /// Number of half-edges leaving `v` without a reverse half-edge, and the target of the last one
    pub fn count_open_edges(&self, v: u32) -> (usize, Option<u32>) {
        let mut count = 0;
        let mut last = None;

        for &n in self.neighbors(v) {
            if !self.has_edge(n, v) {
                count += 1;
                last = Some(n);
            }
        }

        (count, last)
    }

    /// First vertex in `a`'s wedge ring with a half-edge to `b`
    pub fn find_wedge_edge(&self, wedge: &[u32], a: u32, b: u32) -> Option<u32> {
        let mut v = a;

        loop {
            if self.has_edge(v, b) {
                return Some(v);
            }

            v = wedge[v as usize];

            if v == a {
                return None;
            }
        }
    }
}
