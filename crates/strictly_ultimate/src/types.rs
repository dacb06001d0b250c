//! Core domain types for ultimate tic-tac-toe.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Side in the game.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum Symbol {
    /// Player X (goes first).
    X,
    /// Player O (goes second).
    O,
}

impl Symbol {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }

    /// Storage glyph for this side.
    pub fn glyph(self) -> char {
        match self {
            Symbol::X => 'X',
            Symbol::O => 'O',
        }
    }
}

/// A single cell of a sub-board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    /// Nobody has played here.
    #[default]
    Empty,
    /// Cell claimed by a side. Never overwritten.
    Occupied(Symbol),
}

impl Cell {
    /// Checks if the cell is empty.
    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Returns the occupying side, if any.
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(symbol) => Some(symbol),
        }
    }

    /// Storage glyph: `' '`, `'X'` or `'O'`.
    pub fn glyph(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Occupied(symbol) => symbol.glyph(),
        }
    }

    /// Parses a storage glyph.
    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            ' ' => Some(Cell::Empty),
            'X' => Some(Cell::Occupied(Symbol::X)),
            'O' => Some(Cell::Occupied(Symbol::O)),
            _ => None,
        }
    }
}

/// Decided result of a board (sub-board or the whole game).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Three in a row for this side.
    Won(Symbol),
    /// No line possible and nothing left to play.
    Draw,
}

impl Outcome {
    /// Returns the winner if there is one.
    pub fn winner(&self) -> Option<Symbol> {
        match self {
            Outcome::Won(symbol) => Some(*symbol),
            Outcome::Draw => None,
        }
    }

    /// Returns true if the board was drawn.
    pub fn is_draw(&self) -> bool {
        matches!(self, Outcome::Draw)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Won(symbol) => write!(f, "{} wins", symbol),
            Outcome::Draw => write!(f, "Draw"),
        }
    }
}

/// A move: a side claiming one cell of one sub-board.
///
/// Moves are first-class domain events. They can be validated before
/// application, serialized for replay and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// Sub-board index on the macro board (0-8, row-major).
    pub sub_index: usize,
    /// Cell index inside the sub-board (0-8, row-major).
    pub cell_index: usize,
    /// Side making the move.
    pub symbol: Symbol,
}

impl Move {
    /// Creates a new move.
    pub fn new(sub_index: usize, cell_index: usize, symbol: Symbol) -> Self {
        Self {
            sub_index,
            cell_index,
            symbol,
        }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}/{}", self.symbol, self.sub_index, self.cell_index)
    }
}

/// Result of an applied move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct MoveOutcome {
    /// The move that was applied.
    applied: Move,
    /// Outcome of the target sub-board after the move.
    sub_outcome: Option<Outcome>,
    /// Outcome of the whole game after the move.
    global_outcome: Option<Outcome>,
    /// Where the next move must land (`None` means free choice).
    active_sub_index: Option<usize>,
}

impl MoveOutcome {
    pub(crate) fn new(
        applied: Move,
        sub_outcome: Option<Outcome>,
        global_outcome: Option<Outcome>,
        active_sub_index: Option<usize>,
    ) -> Self {
        Self {
            applied,
            sub_outcome,
            global_outcome,
            active_sub_index,
        }
    }

    /// True if the move decided its sub-board.
    pub fn captured_sub_board(&self) -> bool {
        self.sub_outcome.is_some()
    }
}
