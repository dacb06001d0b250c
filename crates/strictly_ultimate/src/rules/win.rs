//! Win detection over a 3x3 grid.

use crate::{Cell, Symbol};

/// The eight winning triples, row-major indices.
pub const LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// Returns the first line held entirely by one side, with that side.
pub fn find_winning_line(cells: &[Cell; 9]) -> Option<(Symbol, [usize; 3])> {
    LINES.iter().find_map(|&line| {
        let [a, b, c] = line;
        match cells[a] {
            Cell::Occupied(symbol) if cells[b] == cells[a] && cells[c] == cells[a] => {
                Some((symbol, line))
            }
            _ => None,
        }
    })
}

/// Checks if there is a winner on the grid.
pub fn check_winner(cells: &[Cell; 9]) -> Option<Symbol> {
    find_winning_line(cells).map(|(symbol, _)| symbol)
}

/// True if `who` playing at the empty `pos` would complete a line.
pub fn completes_line(cells: &[Cell; 9], pos: usize, who: Symbol) -> bool {
    if !cells[pos].is_empty() {
        return false;
    }
    let mark = Cell::Occupied(who);
    LINES
        .iter()
        .filter(|line| line.contains(&pos))
        .any(|line| line.iter().all(|&i| i == pos || cells[i] == mark))
}

/// Number of lines where `who` holds two cells and the third is empty.
pub fn count_threats(cells: &[Cell; 9], who: Symbol) -> usize {
    let mark = Cell::Occupied(who);
    LINES
        .iter()
        .filter(|line| {
            let own = line.iter().filter(|&&i| cells[i] == mark).count();
            let empty = line.iter().filter(|&&i| cells[i].is_empty()).count();
            own == 2 && empty == 1
        })
        .count()
}
