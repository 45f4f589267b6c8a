//! Neighbour counting and the generation rule.
//!
//! Everything here is a pure function of its input grid. The grid has hard
//! borders: neighbours that would fall off the edge count as dead, they are
//! never wrapped to the opposite side.

use crate::grid::{Grid, GridError};

/// The eight Moore-neighbourhood offsets as `(row, col)` deltas.
pub const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Count the live cells among the eight neighbours of `(row, col)`.
///
/// Off-grid neighbours are dead, so a corner cell has at most 3 live
/// neighbours and an edge cell at most 5.
///
/// # Errors
///
/// Returns [`GridError::OutOfBounds`] if `(row, col)` itself is outside
/// the grid.
pub fn count_live_neighbors(grid: &Grid, row: usize, col: usize) -> Result<u8, GridError> {
    // Validates the coordinate.
    grid.is_alive(row, col)?;
    Ok(live_neighbors(grid, row, col))
}

/// Apply the classical survival/birth rule to one cell.
///
/// A live cell with 2 or 3 live neighbours survives, a dead cell with
/// exactly 3 is born, and every other cell ends up dead.
pub const fn next_cell_state(alive: bool, neighbors: u8) -> bool {
    matches!((alive, neighbors), (true, 2 | 3) | (false, 3))
}

/// Compute the next generation of `grid` into a freshly allocated grid.
///
/// Every cell of the output is derived from the unmodified input, so the
/// result never depends on the order in which cells are visited.
pub fn next_generation(grid: &Grid) -> Grid {
    let rows = grid.rows();
    let cols = grid.cols();
    let cells = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .map(|(row, col)| {
            next_cell_state(grid.alive_or_dead(row, col), live_neighbors(grid, row, col))
        })
        .collect();
    Grid::from_parts(rows, cols, cells)
}

fn live_neighbors(grid: &Grid, row: usize, col: usize) -> u8 {
    let mut count: u8 = 0;
    for &(dr, dc) in &NEIGHBOR_OFFSETS {
        let (Some(r), Some(c)) = (row.checked_add_signed(dr), col.checked_add_signed(dc)) else {
            continue;
        };
        if grid.alive_or_dead(r, c) {
            count = count.saturating_add(1);
        }
    }
    count
}
