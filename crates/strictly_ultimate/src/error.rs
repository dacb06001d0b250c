//! Rule and snapshot errors.

use crate::Symbol;

/// Error raised when a move (or a decision request) is not legal.
///
/// Every check runs before any mutation, so an error always leaves the
/// board untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum RuleError {
    /// A sub-board or cell index outside 0-8.
    #[display("Index {} is out of range (must be 0-8)", index)]
    OutOfRange {
        /// The offending index.
        index: usize,
    },

    /// The target cell already holds a mark.
    #[display("Cell {} is already occupied", cell_index)]
    CellOccupied {
        /// The occupied cell.
        cell_index: usize,
    },

    /// The target sub-board is already won or drawn.
    #[display("Sub-board {} is already decided", sub_index)]
    SubBoardClosed {
        /// The decided sub-board.
        sub_index: usize,
    },

    /// The move targets a sub-board other than the active one.
    #[display("Must play in sub-board {}, not {}", expected, got)]
    WrongBoard {
        /// The active sub-board.
        expected: usize,
        /// The requested sub-board.
        got: usize,
    },

    /// The game has already been decided.
    #[display("Game is already over")]
    GameOver,

    /// The symbol is not the side to move.
    #[display("It's not {}'s turn ({} to move)", got, expected)]
    WrongTurn {
        /// Side to move.
        expected: Symbol,
        /// Side that tried to move.
        got: Symbol,
    },

    /// A decision was requested on a position without legal moves.
    #[display("No legal moves available")]
    NoLegalMoves,
}

/// Error raised when a persisted snapshot cannot be turned back into a board.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SnapshotError {
    /// The flattened board does not hold 81 cells.
    #[display("Snapshot holds {} cells, expected 81", len)]
    BadLength {
        /// Number of cells found.
        len: usize,
    },

    /// A cell glyph other than `' '`, `'X'` or `'O'`.
    #[display("Unknown glyph {:?} at cell {}", glyph, index)]
    BadGlyph {
        /// Flattened index of the cell.
        index: usize,
        /// The glyph found.
        glyph: char,
    },

    /// Both sides hold a line in the same sub-board.
    #[display("Sub-board {} has two winners", sub_index)]
    ConflictingWinners {
        /// The contradictory sub-board.
        sub_index: usize,
    },

    /// Mark counts do not match the recorded last mover.
    #[display("Mark counts (X={}, O={}) do not match last mover {:?}", x_count, o_count, last_mover)]
    InconsistentTurn {
        /// Number of X marks.
        x_count: usize,
        /// Number of O marks.
        o_count: usize,
        /// Recorded last mover.
        last_mover: Option<Symbol>,
    },

    /// The active index points outside the board or to a decided sub-board.
    #[display("Active sub-board {} is not playable", sub_index)]
    InvalidActiveIndex {
        /// The recorded active index.
        sub_index: usize,
    },

    /// The recorded last move does not match the board.
    #[display("Last move {}/{} is not on the board", sub_index, cell_index)]
    InvalidLastMove {
        /// Recorded sub-board index.
        sub_index: usize,
        /// Recorded cell index.
        cell_index: usize,
    },
}
