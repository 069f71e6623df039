//! Position remap and wedge rings
//!
//! Vertices with bit-identical positions are merged onto the first such vertex (the
//! canonical vertex). All vertices sharing a position are additionally linked into a
//! cyclic list, the wedge ring, so attribute seams can be walked.

use crate::hash::{HashTable, PositionHasher, EMPTY};
use meshlod_core::{try_filled, Result, VertexPositions};

#[derive(Debug, Clone)]
pub struct PositionRemap {
    /// Canonical vertex for each vertex; `remap[remap[v]] == remap[v]`
    pub remap: Vec<u32>,
    /// Next vertex with the same position; follows a cycle per position
    pub wedge: Vec<u32>,
}

impl PositionRemap {
    pub fn build(positions: &VertexPositions) -> Result<Self> {
        let vertex_count = positions.len();

        let mut remap = try_filled("position remap", vertex_count, 0u32)?;
        let mut wedge = try_filled("wedge ring", vertex_count, 0u32)?;
        let mut table = HashTable::new("position table", vertex_count)?;

        let hasher = PositionHasher {
            positions: *positions,
        };

        for i in 0..vertex_count as u32 {
            let entry = table.find(&hasher, i);

            if *entry == EMPTY {
                *entry = i;
            }

            remap[i as usize] = *entry;
        }

        // splice each duplicate into its canonical vertex's ring right after the canonical vertex
        for (i, w) in wedge.iter_mut().enumerate() {
            *w = i as u32;
        }

        for i in 0..vertex_count {
            let r = remap[i] as usize;

            if r != i {
                wedge[i] = wedge[r];
                wedge[r] = i as u32;
            }
        }

        Ok(Self { remap, wedge })
    }

    pub fn len(&self) -> usize {
        self.remap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remap.is_empty()
    }

    #[inline]
    pub fn is_canonical(&self, v: u32) -> bool {
        self.remap[v as usize] == v
    }

    pub fn unique_positions(&self) -> usize {
        (0..self.len() as u32).filter(|&v| self.is_canonical(v)).count()
    }
}

/// All vertices sharing a position, walked along the wedge cycle starting at `start`
pub struct WedgeRing<'a> {
    wedge: &'a [u32],
    start: u32,
    next: Option<u32>,
}

impl<'a> WedgeRing<'a> {
    pub fn new(wedge: &'a [u32], start: u32) -> Self {
        Self {
            wedge,
            start,
            next: Some(start),
        }
    }
}

impl Iterator for WedgeRing<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let v = self.next?;
        let n = self.wedge[v as usize];
        self.next = (n != self.start).then_some(n);
        Some(v)
    }
}
