//! Fill detection over a 3x3 grid.

use crate::Cell;

/// Checks if every cell is occupied.
///
/// A full grid with no winner is a draw.
pub fn is_full(cells: &[Cell; 9]) -> bool {
    cells.iter().all(|cell| !cell.is_empty())
}

/// Indices of the empty cells, ascending.
pub fn open_positions(cells: &[Cell; 9]) -> impl Iterator<Item = usize> + '_ {
    cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.is_empty())
        .map(|(i, _)| i)
}
