//! Grid clustering simplification
//!
//! Vertices are snapped to a uniform grid over the unit-rescaled bounds and every occupied
//! cell is represented by the one vertex that minimizes the cell's quadric error. The grid
//! resolution is searched for so that the output lands at or below the target count. This
//! ignores topology entirely, so it always reaches the target, at the cost of quality.

use crate::hash::{CellHasher, HashTable, IdHasher, TriangleHasher, EMPTY};
use crate::quadric::{rescale_positions, Quadric};
use crate::simplify::{validate_destination, validate_index_buffer, validate_target};
use meshlod_core::{try_filled, Result, Vector3f, VertexPositions};
use tracing::{debug, trace};

/// Largest grid resolution per axis; cell coordinates are packed into 10 bits each.
pub const MAX_GRID_SIZE: i32 = 1024;

const INTERPOLATION_PASSES: usize = 5;
const BINARY_PASSES: usize = 10;

/// Pack the grid cell of each vertex as `x << 20 | y << 10 | z`.
pub(crate) fn compute_vertex_ids(vertex_ids: &mut [u32], positions: &[Vector3f], grid_size: i32) {
    debug_assert!((1..=MAX_GRID_SIZE).contains(&grid_size));

    let cell_scale = (grid_size - 1) as f32;

    for (id, v) in vertex_ids.iter_mut().zip(positions) {
        let xi = (v.x * cell_scale + 0.5) as u32;
        let yi = (v.y * cell_scale + 0.5) as u32;
        let zi = (v.z * cell_scale + 0.5) as u32;

        *id = (xi << 20) | (yi << 10) | zi;
    }
}

/// Triangles whose corners fall into three different cells
pub(crate) fn count_triangles(vertex_ids: &[u32], indices: &[u32]) -> usize {
    indices
        .chunks_exact(3)
        .filter(|tri| {
            let id0 = vertex_ids[tri[0] as usize];
            let id1 = vertex_ids[tri[1] as usize];
            let id2 = vertex_ids[tri[2] as usize];

            id0 != id1 && id0 != id2 && id1 != id2
        })
        .count()
}

/// Number of distinct cell ids
pub(crate) fn count_vertex_cells(table: &mut HashTable, vertex_ids: &[u32]) -> usize {
    table.clear();

    let mut result = 0;

    for &id in vertex_ids {
        let entry = table.find(&IdHasher, id);

        if *entry == EMPTY {
            result += 1;
        }

        *entry = id;
    }

    result
}

/// Number the occupied cells densely in first-seen order; returns the cell count.
pub(crate) fn fill_vertex_cells(table: &mut HashTable, vertex_cells: &mut [u32], vertex_ids: &[u32]) -> usize {
    table.clear();

    let hasher = CellHasher { vertex_ids };
    let mut result = 0u32;

    for i in 0..vertex_ids.len() {
        let entry = table.find(&hasher, i as u32);

        if *entry == EMPTY {
            *entry = i as u32;
            vertex_cells[i] = result;
            result += 1;
        } else {
            vertex_cells[i] = vertex_cells[*entry as usize];
        }
    }

    result as usize
}

/// Triangle planes per cell; triangles that collapse into one cell count triple.
pub(crate) fn fill_cell_quadrics_from_triangles(
    cell_quadrics: &mut [Quadric],
    indices: &[u32],
    positions: &[Vector3f],
    vertex_cells: &[u32],
) {
    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);

        let c0 = vertex_cells[i0] as usize;
        let c1 = vertex_cells[i1] as usize;
        let c2 = vertex_cells[i2] as usize;

        let single_cell = c0 == c1 && c0 == c2;
        let weight = if single_cell { 3.0 } else { 1.0 };

        let q = Quadric::from_triangle(&positions[i0], &positions[i1], &positions[i2], weight);

        if single_cell {
            cell_quadrics[c0] += q;
        } else {
            cell_quadrics[c0] += q;
            cell_quadrics[c1] += q;
            cell_quadrics[c2] += q;
        }
    }
}

pub(crate) fn fill_cell_quadrics_from_points(cell_quadrics: &mut [Quadric], positions: &[Vector3f], vertex_cells: &[u32]) {
    for (v, &cell) in positions.iter().zip(vertex_cells) {
        cell_quadrics[cell as usize] += Quadric::from_point(v, 1.0);
    }
}

/// Pick the vertex with the smallest quadric error in each cell (first one on ties).
pub(crate) fn fill_cell_remap(
    cell_remap: &mut [u32],
    cell_errors: &mut [f32],
    vertex_cells: &[u32],
    cell_quadrics: &[Quadric],
    positions: &[Vector3f],
) {
    cell_remap.fill(EMPTY);

    for (i, (&cell, v)) in vertex_cells.iter().zip(positions).enumerate() {
        let cell = cell as usize;
        let error = cell_quadrics[cell].error(v);

        if cell_remap[cell] == EMPTY || cell_errors[cell] > error {
            cell_remap[cell] = i as u32;
            cell_errors[cell] = error;
        }
    }
}

/// Map triangles to cell representatives, dropping collapsed and duplicate triangles.
///
/// Works in place: triangle `i` is read before anything at or past `3 * i` is written.
/// Returns the new index count.
pub(crate) fn filter_triangles(
    indices: &mut [u32],
    table: &mut HashTable,
    vertex_cells: &[u32],
    cell_remap: &[u32],
) -> usize {
    table.clear();

    let mut result = 0usize;

    for read in (0..indices.len()).step_by(3) {
        let c0 = vertex_cells[indices[read] as usize];
        let c1 = vertex_cells[indices[read + 1] as usize];
        let c2 = vertex_cells[indices[read + 2] as usize];

        if c0 == c1 || c0 == c2 || c1 == c2 {
            continue;
        }

        let mut a = cell_remap[c0 as usize];
        let mut b = cell_remap[c1 as usize];
        let mut c = cell_remap[c2 as usize];

        // rotate the smallest index first so that duplicates compare equal
        if b < a && b < c {
            (a, b, c) = (b, c, a);
        } else if c < a && c < b {
            (a, b, c) = (c, a, b);
        }

        let write = result * 3;
        indices[write] = a;
        indices[write + 1] = b;
        indices[write + 2] = c;

        let hasher = TriangleHasher { indices: &*indices };
        let entry = table.find(&hasher, result as u32);

        if *entry == EMPTY {
            *entry = result as u32;
            result += 1;
        }
    }

    result * 3
}

/// Three point interpolation ("revenge of interpolation search")
pub(crate) fn interpolate(y: f32, x0: f32, y0: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let num = (y1 - y) * (x1 - x2) * (x1 - x0) * (y2 - y0);
    let den = (y2 - y) * (x1 - x2) * (y0 - y1) + (y0 - y) * (x1 - x0) * (y1 - y2);
    x1 + num / den
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GridSearchResult {
    /// Finest grid found whose count is at or below the target
    pub grid_size: i32,
    pub count: usize,
}

/// Find the finest grid resolution whose `count_at(grid_size)` stays at or below `target`.
///
/// Keeps the bracket `count_at(min) <= target < count_at(max)`, starting from
/// `[0, MAX_GRID_SIZE + 1)`. Guesses `sqrt(target_cells)` first, refines by interpolation for a
/// few passes, then bisects.
pub(crate) fn search_grid_size(
    label: &str,
    target: usize,
    target_cells: usize,
    source_count: usize,
    mut count_at: impl FnMut(i32) -> usize,
) -> GridSearchResult {
    let mut min_grid = 0i32;
    let mut max_grid = MAX_GRID_SIZE + 1;
    let mut min_count = 0usize;
    let mut max_count = source_count;

    // counts usually grow with the square of the grid size
    let mut next_grid_size = ((target_cells as f32).sqrt() + 0.5) as i32;

    for pass in 0..INTERPOLATION_PASSES + BINARY_PASSES {
        debug_assert!(min_count < target);
        debug_assert!(max_grid - min_grid > 1);

        // clamp into the open bracket so the search converges
        let grid_size = if next_grid_size <= min_grid {
            min_grid + 1
        } else if next_grid_size >= max_grid {
            max_grid - 1
        } else {
            next_grid_size
        };

        let count = count_at(grid_size);

        trace!(
            "{}: pass {} ({}): grid size {}, count {}, {}",
            label,
            pass,
            if pass == 0 {
                "guess"
            } else if pass <= INTERPOLATION_PASSES {
                "lerp"
            } else {
                "binary"
            },
            grid_size,
            count,
            if count <= target { "under" } else { "over" }
        );

        let tip = interpolate(
            target as f32,
            min_grid as f32,
            min_count as f32,
            grid_size as f32,
            count as f32,
            max_grid as f32,
            max_count as f32,
        );

        if count <= target {
            min_grid = grid_size;
            min_count = count;
        } else {
            max_grid = grid_size;
            max_count = count;
        }

        if count == target || max_grid - min_grid <= 1 {
            break;
        }

        // interpolation converges faster but degrades to O(n), bisection is O(log n)
        next_grid_size = if pass < INTERPOLATION_PASSES {
            (tip + 0.5) as i32
        } else {
            (min_grid + max_grid) / 2
        };
    }

    GridSearchResult {
        grid_size: min_grid,
        count: min_count,
    }
}

fn sloppy_filter(
    indices: &[u32],
    positions: &VertexPositions,
    target_index_count: usize,
) -> Result<Option<SloppyPlan>> {
    // about two triangles per vertex in the output
    let target_cell_count = target_index_count / 6;

    if target_cell_count == 0 {
        return Ok(None);
    }

    let vertex_count = positions.len();
    let rescaled = rescale_positions(positions)?;

    debug!(
        "simplify_sloppy: source {} vertices, {} triangles; target {} cells, {} triangles",
        vertex_count,
        indices.len() / 3,
        target_cell_count,
        target_index_count / 3
    );

    let mut vertex_ids = try_filled("vertex ids", vertex_count, 0u32)?;

    let search = search_grid_size(
        "simplify_sloppy",
        target_index_count / 3,
        target_cell_count,
        indices.len() / 3,
        |grid_size| {
            compute_vertex_ids(&mut vertex_ids, &rescaled, grid_size);
            count_triangles(&vertex_ids, indices)
        },
    );

    if search.count == 0 {
        return Ok(None);
    }

    let mut table = HashTable::new("cell table", vertex_count)?;
    let mut vertex_cells = try_filled("vertex cells", vertex_count, 0u32)?;

    compute_vertex_ids(&mut vertex_ids, &rescaled, search.grid_size);
    let cell_count = fill_vertex_cells(&mut table, &mut vertex_cells, &vertex_ids);

    let mut cell_quadrics = try_filled("cell quadrics", cell_count, Quadric::default())?;
    fill_cell_quadrics_from_triangles(&mut cell_quadrics, indices, &rescaled, &vertex_cells);

    let mut cell_remap = try_filled("cell remap", cell_count, EMPTY)?;
    let mut cell_errors = try_filled("cell errors", cell_count, 0.0f32)?;
    fill_cell_remap(&mut cell_remap, &mut cell_errors, &vertex_cells, &cell_quadrics, &rescaled);

    // reused for triangle dedup; sized for every triangle that survives the grid
    let triangle_table = HashTable::new("triangle table", search.count)?;

    Ok(Some(SloppyPlan {
        vertex_cells,
        cell_remap,
        triangle_table,
        cell_count,
        unfiltered: search.count,
    }))
}

/// Everything needed to rewrite the index buffer, computed from the source indices.
struct SloppyPlan {
    vertex_cells: Vec<u32>,
    cell_remap: Vec<u32>,
    triangle_table: HashTable,
    cell_count: usize,
    unfiltered: usize,
}

impl SloppyPlan {
    fn apply(mut self, indices: &mut [u32], target_index_count: usize) -> usize {
        let write = filter_triangles(indices, &mut self.triangle_table, &self.vertex_cells, &self.cell_remap);
        debug_assert!(write <= target_index_count);

        debug!(
            "simplify_sloppy: result {} cells, {} triangles ({} unfiltered)",
            self.cell_count,
            write / 3,
            self.unfiltered
        );

        write
    }
}

/// Reduce `indices` to at most `target_index_count` indices by clustering vertices on a grid,
/// writing the result to `destination` (which must hold `indices.len()` elements).
///
/// Unlike [`crate::simplify`] this always reaches the target but may change topology:
/// holes close, thin parts vanish. Targets below two triangles yield an empty result.
pub fn simplify_sloppy(
    destination: &mut [u32],
    indices: &[u32],
    positions: &VertexPositions,
    target_index_count: usize,
) -> Result<usize> {
    validate_index_buffer(indices, positions.len())?;
    validate_target(target_index_count, indices.len(), "index")?;
    validate_destination(destination.len(), indices.len())?;

    let Some(plan) = sloppy_filter(indices, positions, target_index_count)? else {
        return Ok(0);
    };

    let result = &mut destination[..indices.len()];
    result.copy_from_slice(indices);

    Ok(plan.apply(result, target_index_count))
}

/// Same as [`simplify_sloppy`], rewriting `indices` in place.
pub fn simplify_sloppy_in_place(
    indices: &mut [u32],
    positions: &VertexPositions,
    target_index_count: usize,
) -> Result<usize> {
    validate_index_buffer(indices, positions.len())?;
    validate_target(target_index_count, indices.len(), "index")?;

    let Some(plan) = sloppy_filter(indices, positions, target_index_count)? else {
        return Ok(0);
    };

    Ok(plan.apply(indices, target_index_count))
}

/// Pick at most `target_vertex_count` representative vertices by clustering on a grid.
///
/// Writes original vertex indices into `destination` (which must hold
/// `target_vertex_count` elements) and returns how many were written.
pub fn simplify_points(
    destination: &mut [u32],
    positions: &VertexPositions,
    target_vertex_count: usize,
) -> Result<usize> {
    let vertex_count = positions.len();

    validate_target(target_vertex_count, vertex_count, "vertex")?;
    validate_destination(destination.len(), target_vertex_count)?;

    if target_vertex_count == 0 {
        return Ok(0);
    }

    let rescaled = rescale_positions(positions)?;

    debug!(
        "simplify_points: source {} vertices; target {} cells",
        vertex_count, target_vertex_count
    );

    let mut vertex_ids = try_filled("vertex ids", vertex_count, 0u32)?;
    let mut table = HashTable::new("cell table", vertex_count)?;

    let search = search_grid_size(
        "simplify_points",
        target_vertex_count,
        target_vertex_count,
        vertex_count,
        |grid_size| {
            compute_vertex_ids(&mut vertex_ids, &rescaled, grid_size);
            count_vertex_cells(&mut table, &vertex_ids)
        },
    );

    if search.count == 0 {
        return Ok(0);
    }

    let mut vertex_cells = try_filled("vertex cells", vertex_count, 0u32)?;

    compute_vertex_ids(&mut vertex_ids, &rescaled, search.grid_size);
    let cell_count = fill_vertex_cells(&mut table, &mut vertex_cells, &vertex_ids);

    let mut cell_quadrics = try_filled("cell quadrics", cell_count, Quadric::default())?;
    fill_cell_quadrics_from_points(&mut cell_quadrics, &rescaled, &vertex_cells);

    let mut cell_remap = try_filled("cell remap", cell_count, EMPTY)?;
    let mut cell_errors = try_filled("cell errors", cell_count, 0.0f32)?;
    fill_cell_remap(&mut cell_remap, &mut cell_errors, &vertex_cells, &cell_quadrics, &rescaled);

    debug_assert!(cell_count <= target_vertex_count);
    destination[..cell_count].copy_from_slice(&cell_remap);

    debug!("simplify_points: result {} cells", cell_count);

    Ok(cell_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlod_core::Point3f;

    #[test]
    fn test_vertex_ids_pack_cells() {
        let positions = vec![
            Vector3f::new(0.0, 0.0, 0.0),
            Vector3f::new(1.0, 0.5, 0.2),
            Vector3f::new(0.49, 0.51, 1.0),
        ];
        let mut ids = vec![0; 3];

        compute_vertex_ids(&mut ids, &positions, 3);
        assert_eq!(ids[0], 0);
        assert_eq!(ids[1], (2 << 20) | (1 << 10));
        assert_eq!(ids[2], (1 << 20) | (1 << 10) | 2);

        // a single cell
        compute_vertex_ids(&mut ids, &positions, 1);
        assert!(ids.iter().all(|&id| id == 0));
    }

    #[test]
    fn test_count_triangles() {
        let ids = [0, 1, 2, 2];
        assert_eq!(count_triangles(&ids, &[0, 1, 2, 1, 2, 3]), 1);
    }

    #[test]
    fn test_vertex_cells_are_dense() {
        let ids = [7, 3, 7, 9, 3];
        let mut table = HashTable::new("test", ids.len()).unwrap();
        let mut cells = vec![0; ids.len()];

        assert_eq!(count_vertex_cells(&mut table, &ids), 3);
        assert_eq!(fill_vertex_cells(&mut table, &mut cells, &ids), 3);
        assert_eq!(cells, vec![0, 1, 0, 2, 1]);
    }

    #[test]
    fn test_cell_remap_prefers_lowest_error() {
        let positions = vec![
            Vector3f::new(0.0, 0.0, 0.0),
            Vector3f::new(0.5, 0.0, 0.0),
            Vector3f::new(1.0, 0.0, 0.0),
        ];
        let cells = [0, 0, 0];
        let mut quadrics = vec![Quadric::default()];
        fill_cell_quadrics_from_points(&mut quadrics, &positions, &cells);

        let mut remap = vec![0; 1];
        let mut errors = vec![0.0; 1];
        fill_cell_remap(&mut remap, &mut errors, &cells, &quadrics, &positions);

        // the centroid vertex wins
        assert_eq!(remap, vec![1]);
    }

    #[test]
    fn test_filter_rotates_and_dedups() {
        // each vertex in its own cell; the second triangle is a rotation of the first
        let mut indices = vec![2, 0, 1, 0, 1, 2, 1, 2, 3, 3, 3, 1];
        let cells = [0, 1, 2, 3];
        let remap = [0, 1, 2, 3];
        let mut table = HashTable::new("test", 4).unwrap();

        let count = filter_triangles(&mut indices, &mut table, &cells, &remap);

        assert_eq!(count, 6);
        assert_eq!(&indices[..count], &[0, 1, 2, 1, 2, 3]);
    }

    #[test]
    fn test_grid_search_exact_hit() {
        let mut calls = Vec::new();
        let result = search_grid_size("test", 100, 100, 1_000_000, |g| {
            calls.push(g);
            (g * g) as usize
        });

        assert_eq!(calls, vec![10]);
        assert_eq!(result, GridSearchResult { grid_size: 10, count: 100 });
    }

    #[test]
    fn test_grid_search_brackets_target() {
        let count_at = |g: i32| (2 * g * g) as usize;
        let result = search_grid_size("test", 1000, 1000, 2 * 1025 * 1025, count_at);

        assert_eq!(result.grid_size, 22);
        assert_eq!(result.count, 968);
    }

    #[test]
    fn test_grid_search_gives_up_when_everything_is_over() {
        let result = search_grid_size("test", 5, 5, 100, |_| 100);
        assert_eq!(result.count, 0);
        assert_eq!(result.grid_size, 0);
    }

    #[test]
    fn test_sloppy_degenerate_input() {
        let points = vec![Point3f::origin(); 3];
        let positions = VertexPositions::from_points(&points);
        let mut destination = vec![0; 6];

        assert_eq!(simplify_sloppy(&mut destination, &[0, 1, 2], &positions, 0).unwrap(), 0);
        assert_eq!(simplify_sloppy(&mut destination, &[0, 1, 2, 0, 1, 2], &positions, 6).unwrap(), 0);
    }

    #[test]
    fn test_points_target_zero() {
        let points = vec![Point3f::origin(); 3];
        let positions = VertexPositions::from_points(&points);

        assert_eq!(simplify_points(&mut [], &positions, 0).unwrap(), 0);
    }

    #[test]
    fn test_points_coincident_collapse_to_one() {
        let points = vec![Point3f::new(1.0, 2.0, 3.0); 5];
        let positions = VertexPositions::from_points(&points);
        let mut destination = vec![u32::MAX; 5];

        assert_eq!(simplify_points(&mut destination, &positions, 5).unwrap(), 1);
        assert_eq!(destination[0], 0);
    }
}
