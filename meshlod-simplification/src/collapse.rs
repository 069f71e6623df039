//! Edge collapse passes
//!
//! One pass picks every legal edge collapse in the current index buffer, ranks them by
//! quadric error, bucket-sorts them and applies them greedily. Each canonical vertex takes
//! part in at most one collapse per pass, so errors computed at the start of the pass stay
//! valid while the pass runs.

use crate::classify::{VertexKind, NO_LOOP};
use crate::quadric::Quadric;
use crate::remap::WedgeRing;
use meshlod_core::Vector3f;

/// Bits of the error used as the bucket sort key
const SORT_BITS: u32 = 11;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collapse {
    /// Vertex that moves
    pub v0: u32,
    /// Vertex it moves onto
    pub v1: u32,
    /// Both directions are legal; resolved during ranking
    pub bidi: bool,
    pub error: f32,
}

impl Collapse {
    #[inline]
    fn sort_key(&self) -> usize {
        // errors are non-negative, so the sign bit carries nothing
        ((self.error.to_bits() << 1) >> (32 - SORT_BITS)) as usize
    }
}

/// Fill `collapses` with one candidate per collapsible edge of `indices`.
///
/// `collapses` must have capacity for `indices.len()` candidates.
pub fn pick_edge_collapses(
    collapses: &mut Vec<Collapse>,
    indices: &[u32],
    remap: &[u32],
    kinds: &[VertexKind],
    loops: &[u32],
) {
    const NEXT: [usize; 3] = [1, 2, 0];

    collapses.clear();

    for tri in indices.chunks_exact(3) {
        for e in 0..3 {
            let i0 = tri[e];
            let i1 = tri[NEXT[e]];

            // zero-length edges in the input, or a manifold vertex collapsed onto both wedges
            // of a seam; left alone to keep the mesh together
            if remap[i0 as usize] == remap[i1 as usize] {
                continue;
            }

            let k0 = kinds[i0 as usize];
            let k1 = kinds[i1 as usize];

            let forward = k0.can_collapse_into(k1);
            let backward = k1.can_collapse_into(k0);

            if !forward && !backward {
                continue;
            }

            // manifold and seam edges show up twice (i0 -> i1 and i1 -> i0); keep one
            if k0.has_opposite(k1) && remap[i1 as usize] > remap[i0 as usize] {
                continue;
            }

            // both ends on a border or seam without a direct loop edge: two different loops
            if k0 == k1 && matches!(k0, VertexKind::Border | VertexKind::Seam) && loops[i0 as usize] != i1 {
                continue;
            }

            let collapse = if forward && backward {
                Collapse {
                    v0: i0,
                    v1: i1,
                    bidi: true,
                    error: 0.0,
                }
            } else if forward {
                Collapse {
                    v0: i0,
                    v1: i1,
                    bidi: false,
                    error: 0.0,
                }
            } else {
                Collapse {
                    v0: i1,
                    v1: i0,
                    bidi: false,
                    error: 0.0,
                }
            };

            debug_assert!(collapses.len() < collapses.capacity());
            collapses.push(collapse);
        }
    }
}

/// Evaluate each candidate and settle bidirectional ones on the cheaper direction.
pub fn rank_edge_collapses(collapses: &mut [Collapse], positions: &[Vector3f], quadrics: &[Quadric], remap: &[u32]) {
    for c in collapses {
        let i0 = c.v0;
        let i1 = c.v1;

        // unidirectional edges evaluate the same direction twice
        let (j0, j1) = if c.bidi { (i1, i0) } else { (i0, i1) };

        let ei = quadrics[remap[i0 as usize] as usize].error(&positions[i1 as usize]);
        let ej = quadrics[remap[j0 as usize] as usize].error(&positions[j1 as usize]);

        if ei <= ej {
            c.v0 = i0;
            c.v1 = i1;
            c.error = ei;
        } else {
            c.v0 = j0;
            c.v1 = j1;
            c.error = ej;
        }
    }
}

/// Write into `order` the candidate indices sorted by the top bits of their error.
///
/// Candidates within a bucket keep their original order.
pub fn sort_edge_collapses(order: &mut [u32], collapses: &[Collapse]) {
    debug_assert_eq!(order.len(), collapses.len());

    let mut histogram = [0u32; 1 << SORT_BITS];

    for c in collapses {
        histogram[c.sort_key()] += 1;
    }

    let mut sum = 0u32;
    for h in histogram.iter_mut() {
        let count = *h;
        *h = sum;
        sum += count;
    }

    debug_assert_eq!(sum as usize, collapses.len());

    for (i, c) in collapses.iter().enumerate() {
        let slot = &mut histogram[c.sort_key()];
        order[*slot as usize] = i as u32;
        *slot += 1;
    }
}

/// Limits for a single pass
#[derive(Debug, Clone, Copy)]
pub struct PassBudget {
    pub triangle_collapse_goal: usize,
    /// Soft limit; once exceeded the pass stops after a tenth of the goal
    pub error_goal: f32,
    /// Hard limit on any single collapse
    pub error_limit: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassOutcome {
    pub edge_collapses: usize,
    pub triangle_collapses: usize,
    /// Largest error among the applied collapses
    pub max_error: f32,
}

/// Per-pass vertex state: where each vertex moves and which positions already moved.
#[derive(Debug, Clone)]
pub struct PassState {
    pub collapse_remap: Vec<u32>,
    pub collapse_locked: Vec<bool>,
}

impl PassState {
    pub fn new(collapse_remap: Vec<u32>, collapse_locked: Vec<bool>) -> Self {
        debug_assert_eq!(collapse_remap.len(), collapse_locked.len());
        let mut state = Self {
            collapse_remap,
            collapse_locked,
        };
        state.reset();
        state
    }

    pub fn reset(&mut self) {
        for (i, r) in self.collapse_remap.iter_mut().enumerate() {
            *r = i as u32;
        }
        self.collapse_locked.fill(false);
    }
}

#[allow(clippy::too_many_arguments)]
pub fn perform_edge_collapses(
    state: &mut PassState,
    quadrics: &mut [Quadric],
    collapses: &[Collapse],
    order: &[u32],
    remap: &[u32],
    wedge: &[u32],
    kinds: &[VertexKind],
    budget: &PassBudget,
) -> PassOutcome {
    let mut outcome = PassOutcome::default();

    let collapse_remap = &mut state.collapse_remap;
    let collapse_locked = &mut state.collapse_locked;

    for &ci in order {
        let c = &collapses[ci as usize];

        if c.error > budget.error_limit {
            break;
        }

        if c.error > budget.error_goal && outcome.triangle_collapses > budget.triangle_collapse_goal / 10 {
            break;
        }

        if outcome.triangle_collapses >= budget.triangle_collapse_goal {
            break;
        }

        let i0 = c.v0 as usize;
        let i1 = c.v1 as usize;

        let r0 = remap[i0] as usize;
        let r1 = remap[i1] as usize;

        // a position moves at most once per pass, and nothing moves onto a moved position
        if collapse_locked[r0] || collapse_locked[r1] {
            continue;
        }

        debug_assert_eq!(collapse_remap[r0] as usize, r0);
        debug_assert_eq!(collapse_remap[r1] as usize, r1);

        let q0 = quadrics[r0];
        quadrics[r1] += q0;

        match kinds[i0] {
            VertexKind::Complex => {
                for v in WedgeRing::new(wedge, i0 as u32) {
                    collapse_remap[v as usize] = r1 as u32;
                }
            }
            VertexKind::Seam => {
                // move both halves of the seam onto the matching halves of the target
                let s0 = wedge[i0];
                let s1 = wedge[i1];

                debug_assert!(s0 as usize != i0 && s1 as usize != i1);
                debug_assert!(wedge[s0 as usize] as usize == i0 && wedge[s1 as usize] as usize == i1);

                collapse_remap[i0] = i1 as u32;
                collapse_remap[s0 as usize] = s1;
            }
            _ => {
                debug_assert_eq!(wedge[i0] as usize, i0);

                collapse_remap[i0] = i1 as u32;
            }
        }

        collapse_locked[r0] = true;
        collapse_locked[r1] = true;

        // border edges take one triangle with them, other edges two or more
        outcome.triangle_collapses += if kinds[i0] == VertexKind::Border { 1 } else { 2 };
        outcome.edge_collapses += 1;
        outcome.max_error = outcome.max_error.max(c.error);
    }

    outcome
}

/// Rewrite triangles through `collapse_remap`, dropping degenerate ones; returns the new index count.
pub fn remap_index_buffer(indices: &mut [u32], collapse_remap: &[u32]) -> usize {
    debug_assert_eq!(indices.len() % 3, 0);

    let mut write = 0;

    for read in (0..indices.len()).step_by(3) {
        let v0 = collapse_remap[indices[read] as usize];
        let v1 = collapse_remap[indices[read + 1] as usize];
        let v2 = collapse_remap[indices[read + 2] as usize];

        // nothing moves twice in a pass
        debug_assert_eq!(collapse_remap[v0 as usize], v0);
        debug_assert_eq!(collapse_remap[v1 as usize], v1);
        debug_assert_eq!(collapse_remap[v2 as usize], v2);

        if v0 != v1 && v0 != v2 && v1 != v2 {
            indices[write] = v0;
            indices[write + 1] = v1;
            indices[write + 2] = v2;
            write += 3;
        }
    }

    write
}

/// Follow collapsed vertices so every loop pointer names a surviving vertex.
pub fn remap_edge_loops(loops: &mut [u32], collapse_remap: &[u32]) {
    for i in 0..loops.len() {
        let l = loops[i];

        if l != NO_LOOP {
            let r = collapse_remap[l as usize];

            // the seam edge was collapsed against the loop direction
            loops[i] = if r as usize == i { loops[l as usize] } else { r };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collapse(v0: u32, v1: u32, error: f32) -> Collapse {
        Collapse {
            v0,
            v1,
            bidi: false,
            error,
        }
    }

    #[test]
    fn test_pick_skips_redundant_manifold_edges() {
        // closed tetrahedron: 6 undirected edges, each seen twice
        let indices = [0, 1, 2, 0, 2, 3, 0, 3, 1, 2, 1, 3];
        let remap = [0, 1, 2, 3];
        let kinds = [VertexKind::Manifold; 4];
        let loops = [NO_LOOP; 4];

        let mut collapses = Vec::with_capacity(indices.len());
        pick_edge_collapses(&mut collapses, &indices, &remap, &kinds, &loops);

        assert_eq!(collapses.len(), 6);
        assert!(collapses.iter().all(|c| c.bidi && c.v0 > c.v1));
    }

    #[test]
    fn test_pick_orients_one_way_edges() {
        let indices = [0, 1, 2];
        let remap = [0, 1, 2];
        let kinds = [VertexKind::Manifold, VertexKind::Locked, VertexKind::Locked];
        let loops = [NO_LOOP; 3];

        let mut collapses = Vec::with_capacity(indices.len());
        pick_edge_collapses(&mut collapses, &indices, &remap, &kinds, &loops);

        // 1 -> 2 is locked on both ends and 0 -> 1 defers to its reverse half-edge
        assert_eq!(collapses, vec![Collapse { v0: 0, v1: 2, bidi: false, error: 0.0 }]);
    }

    #[test]
    fn test_pick_rejects_edges_across_loops() {
        let indices = [0, 1, 2];
        let remap = [0, 1, 2];
        let kinds = [VertexKind::Border; 3];
        // 0 -> 1 is on the loop, the others point elsewhere
        let loops = [1, 0, 1];

        let mut collapses = Vec::with_capacity(indices.len());
        pick_edge_collapses(&mut collapses, &indices, &remap, &kinds, &loops);

        assert_eq!(collapses, vec![Collapse { v0: 0, v1: 1, bidi: true, error: 0.0 }]);
    }

    #[test]
    fn test_rank_picks_cheaper_direction() {
        let positions = vec![Vector3f::new(0.0, 0.0, 0.0), Vector3f::new(1.0, 0.0, 0.0)];
        // vertex 0 is pinned hard, vertex 1 loosely
        let quadrics = vec![
            Quadric::from_point(&positions[0], 1.0),
            Quadric::from_point(&positions[1], 1.0) + Quadric::from_point(&Vector3f::new(0.5, 0.0, 0.0), 1.0),
        ];
        let mut collapses = vec![Collapse { v0: 0, v1: 1, bidi: true, error: 0.0 }];

        rank_edge_collapses(&mut collapses, &positions, &quadrics, &[0, 1]);

        assert_eq!((collapses[0].v0, collapses[0].v1), (1, 0));
        assert!((collapses[0].error - 0.625).abs() < 1e-6);
    }

    #[test]
    fn test_sort_orders_by_error() {
        let collapses = vec![
            collapse(0, 1, 0.5),
            collapse(1, 2, 0.0),
            collapse(2, 3, 1e-4),
            collapse(3, 4, 100.0),
            collapse(4, 5, 0.0),
        ];
        let mut order = vec![0; collapses.len()];

        sort_edge_collapses(&mut order, &collapses);

        assert_eq!(order, vec![1, 4, 2, 0, 3]);
    }

    #[test]
    fn test_perform_locks_vertices_for_the_pass() {
        let kinds = [VertexKind::Manifold; 4];
        let remap = [0, 1, 2, 3];
        let wedge = [0, 1, 2, 3];
        let mut quadrics = vec![Quadric::default(); 4];
        let collapses = vec![collapse(0, 1, 0.0), collapse(1, 2, 0.0), collapse(3, 2, 0.0)];
        let order = [0, 1, 2];
        let mut state = PassState::new(vec![0; 4], vec![false; 4]);

        let budget = PassBudget {
            triangle_collapse_goal: 100,
            error_goal: f32::MAX,
            error_limit: 1.0,
        };
        let outcome = perform_edge_collapses(
            &mut state, &mut quadrics, &collapses, &order, &remap, &wedge, &kinds, &budget,
        );

        // 1 -> 2 touches the already moved pair
        assert_eq!(outcome.edge_collapses, 2);
        assert_eq!(outcome.triangle_collapses, 4);
        assert_eq!(state.collapse_remap, vec![1, 1, 2, 2]);
    }

    #[test]
    fn test_perform_respects_limits() {
        let kinds = [VertexKind::Border; 6];
        let remap = [0, 1, 2, 3, 4, 5];
        let wedge = [0, 1, 2, 3, 4, 5];
        let collapses = vec![collapse(0, 1, 0.0), collapse(2, 3, 0.5), collapse(4, 5, 2.0)];
        let order = [0, 1, 2];

        let mut quadrics = vec![Quadric::default(); 6];
        let mut state = PassState::new(vec![0; 6], vec![false; 6]);
        let budget = PassBudget {
            triangle_collapse_goal: 100,
            error_goal: f32::MAX,
            error_limit: 1.0,
        };
        let outcome = perform_edge_collapses(
            &mut state, &mut quadrics, &collapses, &order, &remap, &wedge, &kinds, &budget,
        );
        assert_eq!(outcome.edge_collapses, 2);
        assert_eq!(outcome.triangle_collapses, 2);
        assert_eq!(outcome.max_error, 0.5);

        state.reset();
        let budget = PassBudget {
            triangle_collapse_goal: 1,
            error_goal: f32::MAX,
            error_limit: 1.0,
        };
        let outcome = perform_edge_collapses(
            &mut state, &mut quadrics, &collapses, &order, &remap, &wedge, &kinds, &budget,
        );
        assert_eq!(outcome.edge_collapses, 1);
    }

    #[test]
    fn test_perform_merges_quadrics() {
        let kinds = [VertexKind::Manifold; 2];
        let p = Vector3f::new(1.0, 0.0, 0.0);
        let mut quadrics = vec![Quadric::from_point(&p, 2.0), Quadric::from_point(&p, 3.0)];
        let mut state = PassState::new(vec![0; 2], vec![false; 2]);
        let budget = PassBudget {
            triangle_collapse_goal: 10,
            error_goal: f32::MAX,
            error_limit: 1.0,
        };

        perform_edge_collapses(
            &mut state,
            &mut quadrics,
            &[collapse(0, 1, 0.0)],
            &[0],
            &[0, 1],
            &[0, 1],
            &kinds,
            &budget,
        );

        assert_eq!(quadrics[1].w, 5.0);
    }

    #[test]
    fn test_seam_collapse_moves_both_wedges() {
        // 0/2 and 1/3 are seam pairs
        let kinds = [VertexKind::Seam; 4];
        let remap = [0, 1, 0, 1];
        let wedge = [2, 3, 0, 1];
        let mut quadrics = vec![Quadric::default(); 4];
        let mut state = PassState::new(vec![0; 4], vec![false; 4]);
        let budget = PassBudget {
            triangle_collapse_goal: 10,
            error_goal: f32::MAX,
            error_limit: 1.0,
        };

        perform_edge_collapses(
            &mut state,
            &mut quadrics,
            &[collapse(0, 1, 0.0)],
            &[0],
            &remap,
            &wedge,
            &kinds,
            &budget,
        );

        assert_eq!(state.collapse_remap, vec![1, 1, 3, 3]);
    }

    #[test]
    fn test_complex_collapse_moves_wedge_ring() {
        let kinds = [VertexKind::Complex, VertexKind::Manifold, VertexKind::Complex, VertexKind::Complex];
        let remap = [0, 1, 0, 0];
        let wedge = [3, 1, 0, 2];
        let mut quadrics = vec![Quadric::default(); 4];
        let mut state = PassState::new(vec![0; 4], vec![false; 4]);
        let budget = PassBudget {
            triangle_collapse_goal: 10,
            error_goal: f32::MAX,
            error_limit: 1.0,
        };

        perform_edge_collapses(
            &mut state,
            &mut quadrics,
            &[collapse(0, 1, 0.0)],
            &[0],
            &remap,
            &wedge,
            &kinds,
            &budget,
        );

        assert_eq!(state.collapse_remap, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_remap_index_buffer_drops_degenerate() {
        let mut indices = vec![0, 1, 2, 1, 3, 2, 2, 3, 4];
        let collapse_remap = [0, 3, 2, 3, 4];

        let count = remap_index_buffer(&mut indices, &collapse_remap);

        assert_eq!(count, 6);
        assert_eq!(&indices[..count], &[0, 3, 2, 2, 3, 4]);
    }

    #[test]
    fn test_remap_edge_loops() {
        // loop 0 -> 1 -> 2 -> 0, vertex 1 collapsed onto 2
        let mut loops = vec![1, 2, 0, NO_LOOP];
        remap_edge_loops(&mut loops, &[0, 2, 2, 3]);
        assert_eq!(loops, vec![2, 2, 0, NO_LOOP]);

        // 1 collapsed onto 0, against the loop direction of 0
        let mut loops = vec![1, 2, 0];
        remap_edge_loops(&mut loops, &[0, 0, 2]);
        assert_eq!(loops, vec![2, 2, 0]);
    }
}
