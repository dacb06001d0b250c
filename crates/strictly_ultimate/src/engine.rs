//! Round state machine over a meta board.
//!
//! The engine is the authority on whose turn it is. It wraps a
//! [`MetaBoard`] with the last mover, the move history and forfeits.

use crate::ai::Strategy;
use crate::snapshot::BoardSnapshot;
use crate::{MetaBoard, Move, MoveOutcome, Outcome, RuleError, SnapshotError, Symbol};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Phase of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    /// Moves are accepted.
    InProgress,
    /// Won, drawn or forfeited.
    Decided(Outcome),
}

/// Rules engine for a single round.
///
/// Transitions:
/// - `InProgress --apply_move--> InProgress | Decided`
/// - `any --surrender(side)--> Decided(Won(opponent))`
/// - `Decided --reset--> InProgress`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesEngine {
    board: MetaBoard,
    last_mover: Option<Symbol>,
    last_move: Option<Move>,
    history: Vec<Move>,
    forfeited_by: Option<Symbol>,
}

impl RulesEngine {
    /// Creates a fresh round: empty board, free choice, X to move.
    #[instrument]
    pub fn new() -> Self {
        Self {
            board: MetaBoard::new(),
            last_mover: None,
            last_move: None,
            history: Vec::new(),
            forfeited_by: None,
        }
    }

    /// Current status.
    pub fn status(&self) -> RoundStatus {
        match self.outcome() {
            Some(outcome) => RoundStatus::Decided(outcome),
            None => RoundStatus::InProgress,
        }
    }

    /// Final outcome, if decided. A forfeit overrides the board.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.forfeited_by {
            Some(loser) => Some(Outcome::Won(loser.opponent())),
            None => self.board.global_outcome(),
        }
    }

    /// True once the round is decided.
    pub fn is_decided(&self) -> bool {
        self.outcome().is_some()
    }

    /// Side to move, or `None` once decided.
    pub fn to_move(&self) -> Option<Symbol> {
        if self.is_decided() {
            return None;
        }
        Some(self.last_mover.map_or(Symbol::X, Symbol::opponent))
    }

    /// Validates and applies a move.
    ///
    /// Either the whole move applies or nothing changes.
    ///
    /// # Errors
    ///
    /// [`RuleError::GameOver`] once decided, [`RuleError::WrongTurn`] when the
    /// symbol is not the side to move, plus every [`MetaBoard::apply_move`]
    /// error.
    #[instrument(skip(self), fields(moves = self.history.len()))]
    pub fn apply_move(&mut self, mv: Move) -> Result<MoveOutcome, RuleError> {
        let expected = self.to_move().ok_or(RuleError::GameOver)?;
        if mv.symbol != expected {
            warn!(%expected, got = %mv.symbol, "Move out of turn");
            return Err(RuleError::WrongTurn {
                expected,
                got: mv.symbol,
            });
        }

        let outcome = self
            .board
            .apply_move(mv.sub_index, mv.cell_index, mv.symbol)?;

        self.last_mover = Some(mv.symbol);
        self.last_move = Some(mv);
        self.history.push(mv);

        if let Some(decided) = outcome.global_outcome() {
            info!(%decided, moves = self.history.len(), "Round decided");
        }
        Ok(outcome)
    }

    /// Convenience wrapper over [`RulesEngine::apply_move`].
    pub fn play(
        &mut self,
        sub_index: usize,
        cell_index: usize,
        symbol: Symbol,
    ) -> Result<MoveOutcome, RuleError> {
        self.apply_move(Move::new(sub_index, cell_index, symbol))
    }

    /// Legal moves for `symbol`; empty unless it is that side's turn.
    pub fn legal_moves(&self, symbol: Symbol) -> impl Iterator<Item = (usize, usize)> + '_ {
        let on_turn = self.to_move() == Some(symbol);
        self.board.legal_moves().filter(move |_| on_turn)
    }

    /// Asks `strategy` for a move for `symbol` without touching the round.
    ///
    /// # Errors
    ///
    /// [`RuleError::GameOver`], [`RuleError::WrongTurn`] or
    /// [`RuleError::NoLegalMoves`].
    #[instrument(skip(self, rng))]
    pub fn ai_decide<R: Rng>(
        &self,
        strategy: &Strategy,
        symbol: Symbol,
        rng: &mut R,
    ) -> Result<Move, RuleError> {
        let expected = self.to_move().ok_or(RuleError::GameOver)?;
        if symbol != expected {
            return Err(RuleError::WrongTurn {
                expected,
                got: symbol,
            });
        }
        let (sub_index, cell_index) = strategy.decide(&self.board, symbol, rng)?;
        Ok(Move::new(sub_index, cell_index, symbol))
    }

    /// Concedes the round for `side`.
    ///
    /// A round that is already decided keeps its outcome.
    #[instrument(skip(self))]
    pub fn surrender(&mut self, side: Symbol) -> Outcome {
        if let Some(outcome) = self.outcome() {
            warn!(%outcome, "Surrender after the round was decided");
            return outcome;
        }
        self.forfeited_by = Some(side);
        info!(loser = %side, "Round forfeited");
        Outcome::Won(side.opponent())
    }

    /// Starts a new round: fresh sub-boards, free choice, X to move.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        *self = Self::new();
        info!("Round reset");
    }

    /// The board.
    pub fn board(&self) -> &MetaBoard {
        &self.board
    }

    /// Side that moved last.
    pub fn last_mover(&self) -> Option<Symbol> {
        self.last_mover
    }

    /// Last applied move, for highlighting.
    pub fn last_move(&self) -> Option<&Move> {
        self.last_move.as_ref()
    }

    /// Moves applied in this engine, oldest first.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Side that forfeited, if any.
    pub fn forfeited_by(&self) -> Option<Symbol> {
        self.forfeited_by
    }

    /// Storage snapshot of the round.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::capture(self)
    }

    /// Rebuilds a round from a storage snapshot.
    ///
    /// The history starts empty; the last move is restored.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the snapshot is malformed or
    /// inconsistent.
    #[instrument(skip(snapshot))]
    pub fn from_snapshot(snapshot: &BoardSnapshot) -> Result<Self, SnapshotError> {
        let restored = snapshot.restore()?;
        Ok(Self {
            board: restored.board,
            last_mover: snapshot.last_mover,
            last_move: restored.last_move,
            history: Vec::new(),
            forfeited_by: snapshot.forfeited_by,
        })
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let engine = RulesEngine::new();
        assert_eq!(engine.status(), RoundStatus::InProgress);
        assert_eq!(engine.to_move(), Some(Symbol::X));
        assert_eq!(engine.board().active_sub_index(), None);
        assert_eq!(engine.legal_moves(Symbol::X).count(), 81);
        assert_eq!(engine.legal_moves(Symbol::O).count(), 0);
    }

    #[test]
    fn test_turns_alternate() {
        let mut engine = RulesEngine::new();
        engine.play(4, 4, Symbol::X).expect("legal");
        assert_eq!(engine.to_move(), Some(Symbol::O));
        assert_eq!(
            engine.play(4, 0, Symbol::X),
            Err(RuleError::WrongTurn {
                expected: Symbol::O,
                got: Symbol::X
            })
        );
        engine.play(4, 0, Symbol::O).expect("legal");
        assert_eq!(engine.to_move(), Some(Symbol::X));
        assert_eq!(engine.history().len(), 2);
        assert_eq!(engine.last_move(), Some(&Move::new(4, 0, Symbol::O)));
    }

    #[test]
    fn test_rejected_move_is_atomic() {
        let mut engine = RulesEngine::new();
        engine.play(0, 8, Symbol::X).expect("legal");
        let before = engine.clone();
        assert!(engine.play(3, 0, Symbol::O).is_err());
        assert!(engine.play(8, 42, Symbol::O).is_err());
        assert_eq!(engine, before);
    }

    #[test]
    fn test_surrender_and_reset() {
        let mut engine = RulesEngine::new();
        engine.play(1, 1, Symbol::X).expect("legal");
        assert_eq!(engine.surrender(Symbol::O), Outcome::Won(Symbol::X));
        assert_eq!(engine.status(), RoundStatus::Decided(Outcome::Won(Symbol::X)));
        assert_eq!(engine.to_move(), None);
        assert_eq!(engine.play(1, 0, Symbol::O), Err(RuleError::GameOver));

        // A second surrender does not flip the result.
        assert_eq!(engine.surrender(Symbol::X), Outcome::Won(Symbol::X));

        engine.reset();
        assert_eq!(engine, RulesEngine::new());
    }

    #[test]
    fn test_ai_decide_checks_turn() {
        let engine = RulesEngine::new();
        let mut rng = rand::rng();
        assert!(matches!(
            engine.ai_decide(&Strategy::Random, Symbol::O, &mut rng),
            Err(RuleError::WrongTurn { .. })
        ));
        let mv = engine
            .ai_decide(&Strategy::Heuristic, Symbol::X, &mut rng)
            .expect("decision");
        assert_eq!(mv.symbol, Symbol::X);
    }
}
