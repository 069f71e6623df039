//! Topology-preserving simplification by iterative edge collapse
//!
//! Vertices that share a position are welded for the purpose of topology analysis, so
//! attribute seams survive simplification; border and seam vertices only slide along
//! their own edge loop. The output reuses the input vertices, only the index buffer is
//! rewritten.

use crate::adjacency::EdgeAdjacency;
use crate::classify::{classify_vertices, Classification, VertexKind};
use crate::collapse::{
    perform_edge_collapses, pick_edge_collapses, rank_edge_collapses, remap_edge_loops, remap_index_buffer,
    sort_edge_collapses, Collapse, PassBudget, PassState,
};
use crate::quadric::{fill_edge_quadrics, fill_face_quadrics, rescale_positions, Quadric};
use crate::remap::PositionRemap;
use meshlod_core::{try_filled, try_with_capacity, Error, Result, Vector3f, VertexPositions};
use tracing::{debug, trace};

/// Most collapses in a pass get locked out by their neighbors, so the error goal derived from
/// the ideal last collapse is relaxed by this factor.
const PASS_ERROR_BOUND: f32 = 1.5;

/// Per-vertex classification as it stood when simplification finished.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimplifyDebug {
    pub kinds: Vec<VertexKind>,
    /// Edge loop pointers after all passes ([`crate::NO_LOOP`] for vertices without a loop)
    pub loops: Vec<u32>,
}

pub(crate) fn validate_index_buffer(indices: &[u32], vertex_count: usize) -> Result<()> {
    if indices.len() % 3 != 0 {
        return Err(Error::invalid_argument(format!(
            "index count {} is not a multiple of 3",
            indices.len()
        )));
    }

    if let Some(&v) = indices.iter().find(|&&v| v as usize >= vertex_count) {
        return Err(Error::invalid_argument(format!(
            "index {v} is out of range for {vertex_count} vertices"
        )));
    }

    Ok(())
}

pub(crate) fn validate_target(target: usize, available: usize, what: &str) -> Result<()> {
    if target > available {
        return Err(Error::invalid_argument(format!(
            "target {what} count {target} exceeds source count {available}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_destination(len: usize, required: usize) -> Result<()> {
    if len < required {
        return Err(Error::invalid_argument(format!(
            "destination holds {len} elements, {required} required"
        )));
    }
    Ok(())
}

fn validate_target_error(target_error: f32) -> Result<()> {
    if target_error.is_nan() || target_error < 0.0 {
        return Err(Error::invalid_argument(format!(
            "target error {target_error} must be non-negative"
        )));
    }
    Ok(())
}

/// All working state for one simplification call, reserved up front.
struct EdgeCollapseState {
    remap: PositionRemap,
    classification: Classification,
    positions: Vec<Vector3f>,
    quadrics: Vec<Quadric>,
    collapses: Vec<Collapse>,
    order: Vec<u32>,
    pass: PassState,
}

impl EdgeCollapseState {
    fn new(indices: &[u32], positions: &VertexPositions) -> Result<Self> {
        let vertex_count = positions.len();
        let index_count = indices.len();

        let adjacency = EdgeAdjacency::build(indices, vertex_count)?;
        let remap = PositionRemap::build(positions)?;
        let classification = classify_vertices(&adjacency, &remap)?;

        let histogram = classification.kind_histogram(&remap);
        let locked = classification.locked;

        debug!(
            "simplify: position remap {} vertices => {} positions",
            vertex_count,
            remap.unique_positions()
        );
        debug!(
            "simplify: kinds manifold {}, border {}, seam {}, complex {}, locked {}",
            histogram[VertexKind::Manifold.index()],
            histogram[VertexKind::Border.index()],
            histogram[VertexKind::Seam.index()],
            histogram[VertexKind::Complex.index()],
            histogram[VertexKind::Locked.index()]
        );
        debug!(
            "simplify: locked many open edges {}, disconnected seam {}, many seam edges {}, many wedges {}",
            locked.many_open_edges, locked.disconnected_seam, locked.many_seam_edges, locked.many_wedges
        );

        let rescaled = rescale_positions(positions)?;

        let mut quadrics = try_filled("vertex quadrics", vertex_count, Quadric::default())?;
        fill_face_quadrics(&mut quadrics, indices, &rescaled, &remap.remap);
        fill_edge_quadrics(
            &mut quadrics,
            indices,
            &rescaled,
            &remap.remap,
            &classification.kinds,
            &classification.loops,
        );

        let collapses = try_with_capacity("edge collapses", index_count)?;
        let order = try_filled("collapse order", index_count, 0u32)?;
        let pass = PassState::new(
            try_filled("collapse remap", vertex_count, 0u32)?,
            try_filled("collapse locks", vertex_count, false)?,
        );

        Ok(Self {
            remap,
            classification,
            positions: rescaled,
            quadrics,
            collapses,
            order,
            pass,
        })
    }

    /// Collapse edges of `result` until it holds at most `target_index_count` indices or
    /// nothing more can be collapsed within `target_error`; returns the new index count.
    fn run(&mut self, result: &mut [u32], target_index_count: usize, target_error: f32) -> usize {
        let mut result_count = result.len();

        // target_error is linear; quadric errors are squared distances
        let error_limit = target_error * target_error;

        let mut pass_count = 0usize;
        let mut worst_error = 0.0f32;

        while result_count > target_index_count {
            pick_edge_collapses(
                &mut self.collapses,
                &result[..result_count],
                &self.remap.remap,
                &self.classification.kinds,
                &self.classification.loops,
            );

            // topology allows nothing else
            if self.collapses.is_empty() {
                break;
            }

            rank_edge_collapses(&mut self.collapses, &self.positions, &self.quadrics, &self.remap.remap);

            let order = &mut self.order[..self.collapses.len()];
            sort_edge_collapses(order, &self.collapses);

            // most collapses remove two triangles
            let triangle_collapse_goal = (result_count - target_index_count) / 3;
            let edge_collapse_goal = triangle_collapse_goal / 2;

            let error_goal = if edge_collapse_goal < self.collapses.len() {
                self.collapses[order[edge_collapse_goal] as usize].error * PASS_ERROR_BOUND
            } else {
                f32::MAX
            };

            let budget = PassBudget {
                triangle_collapse_goal,
                error_goal,
                error_limit,
            };

            self.pass.reset();

            let outcome = perform_edge_collapses(
                &mut self.pass,
                &mut self.quadrics,
                &self.collapses,
                order,
                &self.remap.remap,
                &self.remap.wedge,
                &self.classification.kinds,
                &budget,
            );

            // every remaining candidate is above the error limit
            if outcome.edge_collapses == 0 {
                break;
            }

            remap_edge_loops(&mut self.classification.loops, &self.pass.collapse_remap);

            let new_count = remap_index_buffer(&mut result[..result_count], &self.pass.collapse_remap);
            debug_assert!(new_count < result_count);

            pass_count += 1;
            worst_error = worst_error.max(outcome.max_error);

            trace!(
                "simplify: pass {}: triangles {} -> {}, collapses {}/{} (goal {}), error {:e} (limit {:e} goal {:e})",
                pass_count,
                result_count / 3,
                new_count / 3,
                outcome.edge_collapses,
                self.collapses.len(),
                edge_collapse_goal,
                outcome.max_error,
                error_limit,
                error_goal
            );

            result_count = new_count;
        }

        debug!("simplify: passes {}, worst error {:e}", pass_count, worst_error);

        result_count
    }

    fn into_debug(self) -> SimplifyDebug {
        SimplifyDebug {
            kinds: self.classification.kinds,
            loops: self.classification.loops,
        }
    }
}

fn validate(indices: &[u32], positions: &VertexPositions, target_index_count: usize, target_error: f32) -> Result<()> {
    validate_index_buffer(indices, positions.len())?;
    validate_target(target_index_count, indices.len(), "index")?;
    validate_target_error(target_error)
}

fn simplify_into(
    destination: &mut [u32],
    indices: &[u32],
    positions: &VertexPositions,
    target_index_count: usize,
    target_error: f32,
) -> Result<(usize, EdgeCollapseState)> {
    validate(indices, positions, target_index_count, target_error)?;
    validate_destination(destination.len(), indices.len())?;

    // reserve everything before touching the destination
    let mut state = EdgeCollapseState::new(indices, positions)?;

    let result = &mut destination[..indices.len()];
    result.copy_from_slice(indices);

    let count = state.run(result, target_index_count, target_error);
    Ok((count, state))
}

/// Reduce `indices` to at most `target_index_count` indices without moving any vertex
/// further than `target_error` (relative to the mesh extent), writing the result to
/// `destination`.
///
/// The result may stay above the target when the topology or the error bound doesn't
/// allow further collapses; that is not an error. `destination` must hold at least
/// `indices.len()` elements; the returned count says how many of them are valid.
///
/// # Examples
///
/// ```
/// use meshlod_core::{Point3f, VertexPositions};
/// use meshlod_simplification::simplify;
///
/// // a flat 3x3 vertex grid, 8 triangles
/// let points: Vec<Point3f> = (0..9)
///     .map(|i| Point3f::new((i % 3) as f32, (i / 3) as f32, 0.0))
///     .collect();
/// let mut indices = Vec::new();
/// for y in 0..2u32 {
///     for x in 0..2u32 {
///         let v = y * 3 + x;
///         indices.extend_from_slice(&[v, v + 1, v + 4, v, v + 4, v + 3]);
///     }
/// }
///
/// let mut destination = vec![0; indices.len()];
/// let count = simplify(&mut destination, &indices, &VertexPositions::from_points(&points), 6, 1e-2)?;
/// assert_eq!(count, 6);
/// # Ok::<(), meshlod_core::Error>(())
/// ```
pub fn simplify(
    destination: &mut [u32],
    indices: &[u32],
    positions: &VertexPositions,
    target_index_count: usize,
    target_error: f32,
) -> Result<usize> {
    simplify_into(destination, indices, positions, target_index_count, target_error).map(|(count, _)| count)
}

/// Same as [`simplify`], also reporting the final vertex classification in `debug`.
pub fn simplify_with_debug(
    destination: &mut [u32],
    indices: &[u32],
    positions: &VertexPositions,
    target_index_count: usize,
    target_error: f32,
    debug: &mut SimplifyDebug,
) -> Result<usize> {
    let (count, state) = simplify_into(destination, indices, positions, target_index_count, target_error)?;
    *debug = state.into_debug();
    Ok(count)
}

/// Same as [`simplify`], rewriting `indices` in place; the first returned-count entries
/// hold the result.
pub fn simplify_in_place(
    indices: &mut [u32],
    positions: &VertexPositions,
    target_index_count: usize,
    target_error: f32,
) -> Result<usize> {
    validate(indices, positions, target_index_count, target_error)?;

    let mut state = EdgeCollapseState::new(indices, positions)?;
    Ok(state.run(indices, target_index_count, target_error))
}
