//! Fixed-size, edge-bounded cell grid.
//!
//! A [`Grid`] is a row-major matrix of boolean cells whose dimensions are
//! fixed at construction. Grids are never edited in place by the rest of
//! the crate: every change (a toggle, a new generation, a clear) produces a
//! fresh grid, and the controller replaces its current grid wholesale.
//!
//! # Design Principles
//!
//! - Every public coordinate access is bounds-checked. Out-of-range
//!   coordinates are rejected, never clamped or wrapped.
//! - Index arithmetic is checked; a grid whose cell count would overflow
//!   `usize` cannot be built.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Errors that can occur when building or addressing a grid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    /// A grid was requested with a zero (or overflowing) dimension.
    #[error("invalid grid dimensions {rows}x{cols}: both must be at least 1")]
    InvalidDimension {
        /// Requested row count.
        rows: usize,
        /// Requested column count.
        cols: usize,
    },

    /// A coordinate lies outside the grid.
    #[error("cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
        /// Number of rows in the grid.
        rows: usize,
        /// Number of columns in the grid.
        cols: usize,
    },

    /// A random fill density outside `[0.0, 1.0]`.
    #[error("invalid fill density {density}: must be within 0.0..=1.0")]
    InvalidDensity {
        /// The rejected density.
        density: f64,
    },
}

/// A 2D matrix of live/dead cells with fixed dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Grid {
    /// Number of rows (height).
    rows: usize,

    /// Number of columns (width).
    cols: usize,

    /// Row-major cell storage of length `rows * cols`.
    cells: Vec<bool>,
}

impl Grid {
    /// Create a grid of the given dimensions with every cell dead.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimension`] if either dimension is zero
    /// or the total cell count overflows `usize`.
    pub fn new(rows: usize, cols: usize) -> Result<Self, GridError> {
        let len = cell_count(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            cells: vec![false; len],
        })
    }

    /// Create a grid with exactly the listed `(row, col)` cells alive.
    ///
    /// Duplicate coordinates are allowed and simply leave the cell alive.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimension`] for bad dimensions and
    /// [`GridError::OutOfBounds`] if any listed cell lies outside the grid.
    pub fn from_live_cells(
        rows: usize,
        cols: usize,
        live: &[(usize, usize)],
    ) -> Result<Self, GridError> {
        let mut grid = Self::new(rows, cols)?;
        for &(row, col) in live {
            let idx = grid.index(row, col)?;
            if let Some(cell) = grid.cells.get_mut(idx) {
                *cell = true;
            }
        }
        Ok(grid)
    }

    /// Create a grid where each cell is independently alive with
    /// probability `density`, drawn from a generator seeded with `seed`.
    ///
    /// The same `(rows, cols, density, seed)` always yields the same grid.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimension`] for bad dimensions and
    /// [`GridError::InvalidDensity`] if `density` is not within
    /// `0.0..=1.0` (NaN included).
    pub fn random(rows: usize, cols: usize, density: f64, seed: u64) -> Result<Self, GridError> {
        if !(0.0..=1.0).contains(&density) {
            return Err(GridError::InvalidDensity { density });
        }
        let len = cell_count(rows, cols)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let cells = (0..len).map(|_| rng.random_bool(density)).collect();
        Ok(Self { rows, cols, cells })
    }

    /// Assemble a grid from already-validated parts.
    ///
    /// Callers guarantee `cells.len() == rows * cols`.
    pub(crate) const fn from_parts(rows: usize, cols: usize, cells: Vec<bool>) -> Self {
        Self { rows, cols, cells }
    }

    /// Return the number of rows.
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Return the number of columns.
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Return whether the cell at `(row, col)` is alive.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] if the coordinate is outside the
    /// grid.
    pub fn is_alive(&self, row: usize, col: usize) -> Result<bool, GridError> {
        let idx = self.index(row, col)?;
        Ok(self.cells.get(idx).copied().unwrap_or(false))
    }

    /// Cell state lookup that treats anything off-grid as dead.
    pub(crate) fn alive_or_dead(&self, row: usize, col: usize) -> bool {
        self.index(row, col)
            .ok()
            .and_then(|idx| self.cells.get(idx).copied())
            .unwrap_or(false)
    }

    /// Return a copy of this grid with the cell at `(row, col)` flipped.
    ///
    /// `self` is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] if the coordinate is outside the
    /// grid.
    pub fn toggle(&self, row: usize, col: usize) -> Result<Self, GridError> {
        let idx = self.index(row, col)?;
        let mut next = self.clone();
        if let Some(cell) = next.cells.get_mut(idx) {
            *cell = !*cell;
        }
        Ok(next)
    }

    /// Return the number of live cells.
    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|&&alive| alive).count()
    }

    /// Iterate over the coordinates of every live cell in row-major order.
    pub fn live_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &alive)| alive)
            .filter_map(move |(idx, _)| Some((idx.checked_div(cols)?, idx.checked_rem(cols)?)))
    }

    /// Return one row of cells, or `None` if `row` is out of range.
    pub fn row(&self, row: usize) -> Option<&[bool]> {
        if row >= self.rows {
            return None;
        }
        let start = row.checked_mul(self.cols)?;
        let end = start.checked_add(self.cols)?;
        self.cells.get(start..end)
    }

    /// Return `true` if every cell is dead.
    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|&alive| alive)
    }

    /// Translate `(row, col)` into a storage index.
    fn index(&self, row: usize, col: usize) -> Result<usize, GridError> {
        let out_of_bounds = || GridError::OutOfBounds {
            row,
            col,
            rows: self.rows,
            cols: self.cols,
        };
        if row >= self.rows || col >= self.cols {
            return Err(out_of_bounds());
        }
        row.checked_mul(self.cols)
            .and_then(|base| base.checked_add(col))
            .ok_or_else(out_of_bounds)
    }
}

/// Validate dimensions and return the total number of cells.
fn cell_count(rows: usize, cols: usize) -> Result<usize, GridError> {
    if rows == 0 || cols == 0 {
        return Err(GridError::InvalidDimension { rows, cols });
    }
    rows.checked_mul(cols)
        .ok_or(GridError::InvalidDimension { rows, cols })
}
