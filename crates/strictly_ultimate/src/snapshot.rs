//! Storage boundary for rounds.
//!
//! Boards are persisted as an 81-character string, sub-board major
//! (`sub_index * 9 + cell_index`), with `' '`, `'X'` and `'O'` glyphs.
//! The glyph mapping exists only here; in memory cells are [`Cell`] values.

use crate::{Cell, MetaBoard, Move, RulesEngine, SnapshotError, SubBoard, Symbol};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Number of cells in a flattened board.
pub const FLAT_CELLS: usize = 81;

/// Serializable state of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Flattened board, 81 glyphs.
    pub cells: String,
    /// Routing constraint for the next move.
    pub active_sub_index: Option<usize>,
    /// Side that moved last.
    pub last_mover: Option<Symbol>,
    /// Last applied move as `(sub_index, cell_index)`.
    #[serde(default)]
    pub last_move: Option<(usize, usize)>,
    /// Side that forfeited the round.
    #[serde(default)]
    pub forfeited_by: Option<Symbol>,
}

pub(crate) struct Restored {
    pub(crate) board: MetaBoard,
    pub(crate) last_move: Option<Move>,
}

impl BoardSnapshot {
    /// Captures the state of `engine`.
    pub fn capture(engine: &RulesEngine) -> Self {
        let board = engine.board();
        let cells = board
            .sub_boards()
            .iter()
            .flat_map(|sub| sub.cells().iter().map(|cell| cell.glyph()))
            .collect();
        Self {
            cells,
            active_sub_index: board.active_sub_index(),
            last_mover: engine.last_mover(),
            last_move: engine
                .last_move()
                .map(|mv| (mv.sub_index, mv.cell_index)),
            forfeited_by: engine.forfeited_by(),
        }
    }

    #[instrument(skip(self), fields(active = ?self.active_sub_index))]
    pub(crate) fn restore(&self) -> Result<Restored, SnapshotError> {
        let glyphs: Vec<char> = self.cells.chars().collect();
        if glyphs.len() != FLAT_CELLS {
            warn!(len = glyphs.len(), "Snapshot has wrong length");
            return Err(SnapshotError::BadLength { len: glyphs.len() });
        }

        let mut flat = [Cell::Empty; FLAT_CELLS];
        for (index, glyph) in glyphs.into_iter().enumerate() {
            flat[index] = Cell::from_glyph(glyph).ok_or(SnapshotError::BadGlyph { index, glyph })?;
        }

        let boards: [SubBoard; 9] = std::array::from_fn(|sub| {
            let mut cells = [Cell::Empty; 9];
            cells.copy_from_slice(&flat[sub * 9..sub * 9 + 9]);
            SubBoard::from_cells(sub, cells)
        });
        if let Some(sub_index) = boards.iter().position(SubBoard::has_conflicting_lines) {
            return Err(SnapshotError::ConflictingWinners { sub_index });
        }

        self.check_turn(&flat)?;

        let board = MetaBoard::from_parts(boards, None);
        if let Some(sub_index) = self.active_sub_index
            && (board.global_outcome().is_some()
                || !board.sub_board(sub_index).is_some_and(SubBoard::is_open))
        {
            return Err(SnapshotError::InvalidActiveIndex { sub_index });
        }
        let board = MetaBoard::from_parts(*board.sub_boards(), self.active_sub_index);

        let last_move = match (self.last_move, self.last_mover) {
            (Some((sub_index, cell_index)), Some(symbol)) => {
                let held = board
                    .sub_board(sub_index)
                    .and_then(|sub| sub.get(cell_index))
                    .and_then(Cell::symbol);
                if held != Some(symbol) {
                    return Err(SnapshotError::InvalidLastMove {
                        sub_index,
                        cell_index,
                    });
                }
                Some(Move::new(sub_index, cell_index, symbol))
            }
            (Some((sub_index, cell_index)), None) => {
                return Err(SnapshotError::InvalidLastMove {
                    sub_index,
                    cell_index,
                });
            }
            (None, _) => None,
        };

        debug!("Snapshot restored");
        Ok(Restored { board, last_move })
    }

    fn check_turn(&self, flat: &[Cell; FLAT_CELLS]) -> Result<(), SnapshotError> {
        let x_count = flat.iter().filter(|c| c.symbol() == Some(Symbol::X)).count();
        let o_count = flat.iter().filter(|c| c.symbol() == Some(Symbol::O)).count();
        let consistent = match self.last_mover {
            None => x_count == 0 && o_count == 0,
            Some(Symbol::X) => x_count == o_count + 1,
            Some(Symbol::O) => x_count == o_count && x_count > 0,
        };
        if consistent {
            Ok(())
        } else {
            Err(SnapshotError::InconsistentTurn {
                x_count,
                o_count,
                last_mover: self.last_mover,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn played() -> RulesEngine {
        let mut engine = RulesEngine::new();
        for (sub, cell, symbol) in [
            (4, 4, Symbol::X),
            (4, 2, Symbol::O),
            (2, 4, Symbol::X),
            (4, 6, Symbol::O),
        ] {
            engine.play(sub, cell, symbol).expect("legal");
        }
        engine
    }

    #[test]
    fn test_capture_layout() {
        let snapshot = played().snapshot();
        assert_eq!(snapshot.cells.chars().count(), FLAT_CELLS);
        assert_eq!(snapshot.cells.chars().nth(4 * 9 + 4), Some('X'));
        assert_eq!(snapshot.cells.chars().nth(4 * 9 + 2), Some('O'));
        assert_eq!(snapshot.active_sub_index, Some(6));
        assert_eq!(snapshot.last_mover, Some(Symbol::O));
        assert_eq!(snapshot.last_move, Some((4, 6)));
    }

    #[test]
    fn test_restore_reproduces_legal_moves() {
        let engine = played();
        let json = serde_json::to_string(&engine.snapshot()).expect("serialize");
        let snapshot: BoardSnapshot = serde_json::from_str(&json).expect("deserialize");
        let restored = RulesEngine::from_snapshot(&snapshot).expect("restore");

        let before: Vec<_> = engine.legal_moves(Symbol::X).collect();
        let after: Vec<_> = restored.legal_moves(Symbol::X).collect();
        assert_eq!(before, after);
        assert_eq!(engine.board().state(), restored.board().state());
        assert_eq!(restored.last_move(), engine.last_move());
    }

    #[test]
    fn test_rejects_bad_length() {
        let mut snapshot = played().snapshot();
        snapshot.cells.pop();
        assert_eq!(
            RulesEngine::from_snapshot(&snapshot),
            Err(SnapshotError::BadLength { len: 80 })
        );
    }

    #[test]
    fn test_rejects_bad_glyph() {
        let mut snapshot = played().snapshot();
        snapshot.cells.replace_range(0..1, "Z");
        assert_eq!(
            RulesEngine::from_snapshot(&snapshot),
            Err(SnapshotError::BadGlyph {
                index: 0,
                glyph: 'Z'
            })
        );
    }

    #[test]
    fn test_rejects_inconsistent_last_mover() {
        let mut snapshot = played().snapshot();
        snapshot.last_mover = Some(Symbol::X);
        assert!(matches!(
            RulesEngine::from_snapshot(&snapshot),
            Err(SnapshotError::InconsistentTurn { .. })
        ));
    }

    #[test]
    fn test_rejects_active_index_on_decided_board() {
        let mut snapshot = RulesEngine::new().snapshot();
        let mut cells: Vec<char> = snapshot.cells.chars().collect();
        for (i, glyph) in [(0, 'X'), (9, 'O'), (1, 'X'), (10, 'O'), (2, 'X')] {
            cells[i] = glyph;
        }
        snapshot.cells = cells.into_iter().collect();
        snapshot.last_mover = Some(Symbol::X);
        snapshot.active_sub_index = Some(0);
        assert_eq!(
            RulesEngine::from_snapshot(&snapshot),
            Err(SnapshotError::InvalidActiveIndex { sub_index: 0 })
        );
    }
}
