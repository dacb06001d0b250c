//! The 3x3 grid of sub-boards.

use crate::rules;
use crate::{Cell, Move, MoveOutcome, Outcome, RuleError, SubBoard, Symbol};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// The outer board: nine sub-boards plus the derived macro board.
///
/// Invariants:
/// - `active_sub_index`, when set, names an open sub-board
/// - every decided macro cell mirrors the outcome of its sub-board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaBoard {
    boards: [SubBoard; 9],
    macro_board: [Option<Outcome>; 9],
    active_sub_index: Option<usize>,
    outcome: Option<Outcome>,
}

/// Read-only snapshot of a meta board, for rendering and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    /// Sub-board the next move must land in (`None` means free choice).
    pub active_sub_index: Option<usize>,
    /// Outcome of every sub-board, indexed like the sub-boards.
    pub macro_board: [Option<Outcome>; 9],
    /// Cells of every sub-board.
    pub sub_boards: [[Cell; 9]; 9],
    /// Winning triple of every won sub-board.
    pub winning_lines: [Option<[usize; 3]>; 9],
    /// Outcome of the whole game.
    pub outcome: Option<Outcome>,
}

impl MetaBoard {
    /// Creates an empty board with free choice for the first move.
    #[instrument]
    pub fn new() -> Self {
        Self {
            boards: std::array::from_fn(SubBoard::at),
            macro_board: [None; 9],
            active_sub_index: None,
            outcome: None,
        }
    }

    /// Rebuilds a board from sub-boards and a routing constraint.
    ///
    /// The macro board and global outcome are recomputed. An active index
    /// that points to a decided sub-board, or any index once the game is
    /// decided, collapses to free choice.
    pub fn from_parts(boards: [SubBoard; 9], active_sub_index: Option<usize>) -> Self {
        let mut board = Self {
            boards,
            macro_board: std::array::from_fn(|i| boards[i].outcome()),
            active_sub_index: None,
            outcome: None,
        };
        board.outcome = board.compute_outcome();
        board.active_sub_index = active_sub_index
            .filter(|&i| board.outcome.is_none() && board.boards.get(i).is_some_and(SubBoard::is_open));
        board
    }

    /// Applies a move for `symbol`.
    ///
    /// All checks run before any mutation. On success the macro board, the
    /// global outcome and the routing constraint are updated: the opponent is
    /// sent to the sub-board matching `cell_index`, or gets free choice when
    /// that sub-board is decided.
    ///
    /// # Errors
    ///
    /// - [`RuleError::GameOver`] if the game is decided
    /// - [`RuleError::OutOfRange`] if either index is not 0-8
    /// - [`RuleError::WrongBoard`] if a different sub-board is active
    /// - [`RuleError::SubBoardClosed`] if the target sub-board is decided
    /// - [`RuleError::CellOccupied`] if the target cell is taken
    #[instrument(skip(self), fields(active = ?self.active_sub_index))]
    pub fn apply_move(
        &mut self,
        sub_index: usize,
        cell_index: usize,
        symbol: Symbol,
    ) -> Result<MoveOutcome, RuleError> {
        if self.outcome.is_some() {
            return Err(RuleError::GameOver);
        }
        if sub_index >= 9 {
            return Err(RuleError::OutOfRange { index: sub_index });
        }
        if cell_index >= 9 {
            return Err(RuleError::OutOfRange { index: cell_index });
        }
        if let Some(expected) = self.active_sub_index
            && expected != sub_index
        {
            return Err(RuleError::WrongBoard {
                expected,
                got: sub_index,
            });
        }

        let sub_outcome = self.boards[sub_index].play(cell_index, symbol)?;

        if let Some(decided) = sub_outcome {
            self.macro_board[sub_index] = Some(decided);
            self.outcome = self.compute_outcome();
            if let Some(outcome) = self.outcome {
                info!(%outcome, "Game decided");
            }
        }

        self.active_sub_index = if self.outcome.is_none() && self.boards[cell_index].is_open() {
            Some(cell_index)
        } else {
            None
        };
        debug!(next_active = ?self.active_sub_index, "Routing updated");

        Ok(MoveOutcome::new(
            Move::new(sub_index, cell_index, symbol),
            sub_outcome,
            self.outcome,
            self.active_sub_index,
        ))
    }

    /// Legal `(sub_index, cell_index)` pairs, recomputed from current state.
    ///
    /// Restricted to the active sub-board when one is set; decided sub-boards
    /// are skipped. Empty once the game is decided.
    pub fn legal_moves(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let decided = self.outcome.is_some();
        let active = self.active_sub_index;
        self.boards
            .iter()
            .enumerate()
            .filter(move |(i, board)| {
                !decided && board.is_open() && active.is_none_or(|a| a == *i)
            })
            .flat_map(|(i, board)| board.open_cells().map(move |cell| (i, cell)))
    }

    /// Outcome of the whole game.
    pub fn global_outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Sub-board the next move must land in.
    pub fn active_sub_index(&self) -> Option<usize> {
        self.active_sub_index
    }

    /// Outcome of every sub-board.
    pub fn macro_board(&self) -> &[Option<Outcome>; 9] {
        &self.macro_board
    }

    /// Macro board projected onto cells: won sub-boards become marks, drawn
    /// and open ones stay empty.
    pub fn macro_cells(&self) -> [Cell; 9] {
        self.macro_board.map(|outcome| match outcome {
            Some(Outcome::Won(symbol)) => Cell::Occupied(symbol),
            _ => Cell::Empty,
        })
    }

    /// Sub-board at `index`.
    pub fn sub_board(&self, index: usize) -> Option<&SubBoard> {
        self.boards.get(index)
    }

    /// All sub-boards.
    pub fn sub_boards(&self) -> &[SubBoard; 9] {
        &self.boards
    }

    /// Number of marks on the whole board held by `symbol`.
    pub fn count(&self, symbol: Symbol) -> usize {
        self.boards.iter().map(|board| board.count(symbol)).sum()
    }

    /// Read-only snapshot for rendering and broadcast.
    pub fn state(&self) -> GlobalState {
        GlobalState {
            active_sub_index: self.active_sub_index,
            macro_board: self.macro_board,
            sub_boards: self.boards.map(|board| *board.cells()),
            winning_lines: self.boards.map(|board| board.winning_line()),
            outcome: self.outcome,
        }
    }

    /// Formats the board as a 9x9 grid.
    ///
    /// Empty cells of the active sub-board are drawn as `*`, other empty
    /// cells as `.`.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..9 {
            if row > 0 && row % 3 == 0 {
                result.push_str("------+-------+------\n");
            }
            for col in 0..9 {
                let sub = (row / 3) * 3 + col / 3;
                let cell = (row % 3) * 3 + col % 3;
                if col > 0 && col % 3 == 0 {
                    result.push_str("| ");
                }
                let glyph = match self.boards[sub].cells()[cell] {
                    Cell::Occupied(symbol) => symbol.glyph(),
                    Cell::Empty if self.active_sub_index == Some(sub) => '*',
                    Cell::Empty => '.',
                };
                result.push(glyph);
                if col < 8 {
                    result.push(' ');
                }
            }
            result.push('\n');
        }
        result
    }

    fn compute_outcome(&self) -> Option<Outcome> {
        if let Some(winner) = rules::check_winner(&self.macro_cells()) {
            return Some(Outcome::Won(winner));
        }
        if self.macro_board.iter().all(Option::is_some) {
            return Some(Outcome::Draw);
        }
        None
    }
}

impl Default for MetaBoard {
    fn default() -> Self {
        Self::new()
    }
}
