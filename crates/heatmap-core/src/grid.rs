use crate::bounds::GridCell;
use crate::constants::MAX_RESOLUTION;
use crate::error::{CoreError, Result};

/// Accepts `2..=MAX_RESOLUTION` cells per side.
pub fn check_resolution(resolution: usize) -> Result<()> {
    if !(2..=MAX_RESOLUTION).contains(&resolution) {
        return Err(CoreError::InvalidGrid(format!(
            "resolution must be between 2 and {MAX_RESOLUTION}, got {resolution}"
        )));
    }
    Ok(())
}

/// Square matrix of non-negative counts, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DensityGrid {
    resolution: usize,
    cells: Vec<u32>,
}

impl DensityGrid {
    /// Callers validate `resolution` with [`check_resolution`] first.
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution,
            cells: vec![0; resolution * resolution],
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn get(&self, cell: GridCell) -> u32 {
        self.index(cell).map(|i| self.cells[i]).unwrap_or(0)
    }

    /// Saturating increment. Returns false if the cell lies outside the grid.
    pub fn increment(&mut self, cell: GridCell) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.cells[i] = self.cells[i].saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Decrement clamped at zero. Returns false when the cell was already
    /// zero (or outside the grid), i.e. the decrement would have underflowed.
    pub fn decrement(&mut self, cell: GridCell) -> bool {
        match self.index(cell) {
            Some(i) if self.cells[i] > 0 => {
                self.cells[i] -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    pub fn sum(&self) -> u64 {
        self.cells.iter().map(|&c| u64::from(c)).sum()
    }

    pub fn max(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }

    /// Row-major cell values.
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Iterate `(row, values)` from north to south.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &[u32])> {
        self.cells.chunks(self.resolution.max(1)).enumerate()
    }

    fn index(&self, cell: GridCell) -> Option<usize> {
        if cell.row < self.resolution && cell.col < self.resolution {
            Some(cell.row * self.resolution + cell.col)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_resolution_limits() {
        assert!(check_resolution(2).is_ok());
        assert!(check_resolution(MAX_RESOLUTION).is_ok());
        assert!(check_resolution(0).is_err());
        assert!(check_resolution(1).is_err());
        assert!(check_resolution(MAX_RESOLUTION + 1).is_err());
        assert!(check_resolution(usize::MAX).is_err());
    }

    #[test]
    fn test_new_is_zeroed() {
        let grid = DensityGrid::new(10);
        assert_eq!(grid.sum(), 0);
        assert_eq!(grid.max(), 0);
        assert!(grid.is_empty());
        assert_eq!(grid.cells().len(), 100);
    }

    #[test]
    fn test_increment_and_decrement() {
        let mut grid = DensityGrid::new(10);
        let cell = GridCell::new(3, 4);
        assert!(grid.increment(cell));
        assert!(grid.increment(cell));
        assert_eq!(grid.get(cell), 2);
        assert!(grid.decrement(cell));
        assert_eq!(grid.get(cell), 1);
        assert_eq!(grid.cells()[34], 1);
    }

    #[test]
    fn test_decrement_clamps_at_zero() {
        let mut grid = DensityGrid::new(4);
        let cell = GridCell::new(1, 1);
        assert!(!grid.decrement(cell));
        assert_eq!(grid.get(cell), 0);
    }

    #[test]
    fn test_out_of_range_cell_ignored() {
        let mut grid = DensityGrid::new(4);
        assert!(!grid.increment(GridCell::new(4, 0)));
        assert!(!grid.increment(GridCell::new(0, 4)));
        assert_eq!(grid.sum(), 0);
    }

    #[test]
    fn test_clear() {
        let mut grid = DensityGrid::new(4);
        grid.increment(GridCell::new(0, 0));
        grid.increment(GridCell::new(3, 3));
        grid.clear();
        assert!(grid.is_empty());
    }

    #[test]
    fn test_rows_order() {
        let mut grid = DensityGrid::new(3);
        grid.increment(GridCell::new(2, 1));
        let rows: Vec<_> = grid.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].1, &[0, 1, 0]);
    }
}
