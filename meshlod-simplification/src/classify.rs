//! Vertex topology classification
//!
//! Each vertex is classified once, before simplification, by counting the half-edges
//! leaving it that have no reverse half-edge. The kind decides which collapses are legal
//! for the whole run.

use crate::adjacency::EdgeAdjacency;
use crate::remap::PositionRemap;
use meshlod_core::{try_filled, Result};

/// Marker for vertices without an edge loop
pub const NO_LOOP: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VertexKind {
    /// Not on an attribute seam, not on any boundary
    Manifold,
    /// Not on an attribute seam, has exactly one open half-edge
    Border,
    /// On an attribute seam with exactly two seam edges
    Seam,
    /// None of the above; may move as long as all wedges move to the target vertex
    Complex,
    /// None of the above; never moves
    Locked,
}

impl VertexKind {
    pub const COUNT: usize = 5;

    pub const ALL: [VertexKind; Self::COUNT] = [
        VertexKind::Manifold,
        VertexKind::Border,
        VertexKind::Seam,
        VertexKind::Complex,
        VertexKind::Locked,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether a vertex of this kind may be collapsed onto a vertex of kind `target`.
    ///
    /// Collapsing kind A into kind B keeps the target's kind B valid: manifold vertices go
    /// anywhere, border and seam vertices stay on their own kind, complex vertices go onto
    /// complex or locked vertices and locked vertices never move.
    #[inline]
    pub fn can_collapse_into(self, target: VertexKind) -> bool {
        CAN_COLLAPSE[self.index()][target.index()]
    }

    /// Whether an edge between these kinds is guaranteed to also exist in reverse.
    ///
    /// For seam edges the reverse edge only exists in the position-only topology.
    #[inline]
    pub fn has_opposite(self, other: VertexKind) -> bool {
        HAS_OPPOSITE[self.index()][other.index()]
    }
}

const CAN_COLLAPSE: [[bool; VertexKind::COUNT]; VertexKind::COUNT] = [
    [true, true, true, true, true],
    [false, true, false, false, false],
    [false, false, true, false, false],
    [false, false, false, true, true],
    [false, false, false, false, false],
];

const HAS_OPPOSITE: [[bool; VertexKind::COUNT]; VertexKind::COUNT] = [
    [true, true, true, false, true],
    [true, false, true, false, false],
    [true, true, true, false, true],
    [false, false, false, false, false],
    [true, false, true, false, false],
];

/// Why vertices ended up locked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockedStats {
    pub many_open_edges: usize,
    pub disconnected_seam: usize,
    pub many_seam_edges: usize,
    pub many_wedges: usize,
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub kinds: Vec<VertexKind>,
    /// For border/seam vertices, the far end of the vertex's open half-edge; [`NO_LOOP`] otherwise
    pub loops: Vec<u32>,
    pub locked: LockedStats,
}

impl Classification {
    /// Number of canonical vertices per kind, indexed by [`VertexKind::index`]
    pub fn kind_histogram(&self, remap: &PositionRemap) -> [usize; VertexKind::COUNT] {
        let mut histogram = [0; VertexKind::COUNT];
        for (v, kind) in self.kinds.iter().enumerate() {
            if remap.is_canonical(v as u32) {
                histogram[kind.index()] += 1;
            }
        }
        histogram
    }
}

pub fn classify_vertices(adjacency: &EdgeAdjacency, remap: &PositionRemap) -> Result<Classification> {
    let vertex_count = remap.len();

    let mut kinds = try_filled("vertex kinds", vertex_count, VertexKind::Manifold)?;
    let mut loops = try_filled("edge loops", vertex_count, NO_LOOP)?;
    let mut locked = LockedStats::default();

    let wedge = &remap.wedge;

    for i in 0..vertex_count {
        let v = i as u32;

        if !remap.is_canonical(v) {
            debug_assert!(remap.remap[i] < v);
            kinds[i] = kinds[remap.remap[i] as usize];
            continue;
        }

        if wedge[i] == v {
            // no attribute seam; vertices with no open edges count as manifold even when
            // more than two triangles share an edge. a border vertex has *one* open half-edge
            // since we only track outgoing half-edges
            match adjacency.count_open_edges(v) {
                (0, _) => kinds[i] = VertexKind::Manifold,
                (1, Some(n)) => {
                    kinds[i] = VertexKind::Border;
                    loops[i] = n;
                }
                _ => {
                    kinds[i] = VertexKind::Locked;
                    locked.many_open_edges += 1;
                }
            }
        } else if wedge[wedge[i] as usize] == v {
            // attribute seam; the seam edges of both wedges have to connect post-remap
            let w = wedge[i];

            match (adjacency.count_open_edges(v), adjacency.count_open_edges(w)) {
                ((1, Some(a)), (1, Some(b))) => {
                    let ao = adjacency.find_wedge_edge(wedge, a, w);
                    let bo = adjacency.find_wedge_edge(wedge, b, v);

                    if ao.is_some() && bo.is_some() {
                        kinds[i] = VertexKind::Seam;
                        loops[i] = a;
                        loops[w as usize] = b;
                    } else {
                        kinds[i] = VertexKind::Locked;
                        locked.disconnected_seam += 1;
                    }
                }
                _ => {
                    kinds[i] = VertexKind::Locked;
                    locked.many_seam_edges += 1;
                }
            }
        } else {
            // three or more vertices share this position
            kinds[i] = VertexKind::Locked;
            locked.many_wedges += 1;
        }
    }

    Ok(Classification { kinds, loops, locked })
}
