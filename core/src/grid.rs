//! Dense row-major two-dimensional storage.

use serde::{Deserialize, Serialize};

/// Rectangular array of cells addressed by `(x, y)`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid2<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid2<T> {
    /// Creates a `width` × `height` grid filled with `fill`.
    #[must_use]
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; width * height],
        }
    }

    /// Resizes to `width` × `height`, resetting every cell to `fill`.
    pub fn resize(&mut self, width: usize, height: usize, fill: T) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize(width * height, fill);
    }

    /// Overwrites every cell with `fill`.
    pub fn fill(&mut self, fill: T) {
        for cell in &mut self.cells {
            *cell = fill.clone();
        }
    }
}

impl<T> Grid2<T> {
    /// Columns in the grid.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Rows in the grid.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    fn offset(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Reads the cell at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.offset(x, y).map(|offset| &self.cells[offset])
    }

    /// Mutable access to the cell at `(x, y)`.
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        self.offset(x, y).map(|offset| &mut self.cells[offset])
    }

    /// Writes the cell at `(x, y)`. Returns false when out of bounds.
    pub fn set(&mut self, x: usize, y: usize, value: T) -> bool {
        match self.get_mut(x, y) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressing_is_row_major() {
        let mut grid = Grid2::new(3, 2, 0);
        assert!(grid.set(2, 1, 7));
        assert!(!grid.set(3, 0, 1));
        assert_eq!(grid.cells()[5], 7);
        assert_eq!(grid.get(2, 1), Some(&7));
        assert_eq!(grid.get(0, 2), None);
    }

    #[test]
    fn resize_resets_contents() {
        let mut grid = Grid2::new(2, 2, 1);
        grid.resize(1, 3, 9);
        assert_eq!(grid.width(), 1);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.cells(), &[9, 9, 9]);
    }
}
