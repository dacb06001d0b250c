//! A single 3x3 board.

use crate::rules;
use crate::{Cell, Outcome, RuleError, Symbol};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// One of the nine inner boards.
///
/// The outcome is cached and recomputed on every successful `play`.
/// Once it is decided no cell can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubBoard {
    index: usize,
    cells: [Cell; 9],
    outcome: Option<Outcome>,
    winning_line: Option<[usize; 3]>,
}

impl SubBoard {
    /// Creates an empty standalone sub-board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty sub-board sitting at `index` on the macro board.
    pub fn at(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Rebuilds a sub-board from raw cells, recomputing its outcome.
    pub fn from_cells(index: usize, cells: [Cell; 9]) -> Self {
        let mut board = Self {
            index,
            cells,
            outcome: None,
            winning_line: None,
        };
        board.refresh_outcome();
        board
    }

    /// Claims `cell_index` for `symbol` and returns the new outcome.
    ///
    /// # Errors
    ///
    /// - [`RuleError::SubBoardClosed`] if the board is already decided
    /// - [`RuleError::OutOfRange`] if `cell_index` is not 0-8
    /// - [`RuleError::CellOccupied`] if the cell is taken
    #[instrument(skip(self), fields(sub_index = self.index))]
    pub fn play(&mut self, cell_index: usize, symbol: Symbol) -> Result<Option<Outcome>, RuleError> {
        if self.outcome.is_some() {
            return Err(RuleError::SubBoardClosed {
                sub_index: self.index,
            });
        }
        let cell = self
            .cells
            .get(cell_index)
            .copied()
            .ok_or(RuleError::OutOfRange { index: cell_index })?;
        if !cell.is_empty() {
            return Err(RuleError::CellOccupied { cell_index });
        }

        self.cells[cell_index] = Cell::Occupied(symbol);
        self.refresh_outcome();

        if let Some(outcome) = self.outcome {
            debug!(%outcome, line = ?self.winning_line, "Sub-board decided");
        }
        Ok(self.outcome)
    }

    /// Position of this board on the macro board.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The triple that produced a win, if the board is won.
    pub fn winning_line(&self) -> Option<[usize; 3]> {
        self.winning_line
    }

    /// Cached outcome (`None` while still open).
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// True while moves can still land here.
    pub fn is_open(&self) -> bool {
        self.outcome.is_none()
    }

    /// Cell at `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell; 9] {
        &self.cells
    }

    /// Playable cells: empty cells of an open board, ascending.
    pub fn open_cells(&self) -> impl Iterator<Item = usize> + '_ {
        let open = self.is_open();
        rules::open_positions(&self.cells).filter(move |_| open)
    }

    /// Number of marks held by `symbol`.
    pub fn count(&self, symbol: Symbol) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.symbol() == Some(symbol))
            .count()
    }

    fn refresh_outcome(&mut self) {
        if let Some((symbol, line)) = rules::find_winning_line(&self.cells) {
            self.outcome = Some(Outcome::Won(symbol));
            self.winning_line = Some(line);
        } else if rules::is_full(&self.cells) {
            self.outcome = Some(Outcome::Draw);
            self.winning_line = None;
        } else {
            self.outcome = None;
            self.winning_line = None;
        }
    }

    /// True if both sides hold a complete line (only reachable from bad input).
    pub(crate) fn has_conflicting_lines(&self) -> bool {
        let holds_line = |symbol: Symbol| {
            let mark = Cell::Occupied(symbol);
            rules::LINES
                .iter()
                .any(|line| line.iter().all(|&i| self.cells[i] == mark))
        };
        holds_line(Symbol::X) && holds_line(Symbol::O)
    }
}
