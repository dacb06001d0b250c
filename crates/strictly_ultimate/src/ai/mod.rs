//! Computer players.
//!
//! A [`Strategy`] is a closed set of decision makers. Every strategy reads a
//! board and returns a move without mutating it. Randomness always comes
//! from the caller's generator, so a seeded generator gives repeatable play.

mod eval;
mod heuristic;
mod minimax;
mod random;

pub use eval::{MoveClass, classify, evaluate};
pub use heuristic::Rule;

use crate::{MetaBoard, RuleError, SubBoard, Symbol};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, instrument};

/// Cell ordering tried first by the searches: center, corners, sides.
pub const MOVE_ORDER: [usize; 9] = [4, 0, 2, 6, 8, 1, 3, 5, 7];

/// Decision maker for a computer side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Strategy {
    /// Uniformly random legal move.
    Random,
    /// Rule-based play: win, block, fork, block fork, center, corners, sides.
    Heuristic,
    /// Depth-limited minimax with alpha-beta pruning.
    Minimax {
        /// Search depth in plies (1 to [`Strategy::MAX_DEPTH`]).
        depth: u8,
    },
}

impl Strategy {
    /// Deepest search accepted.
    pub const MAX_DEPTH: u8 = 9;

    /// Depth used when none is given.
    pub const DEFAULT_DEPTH: u8 = 4;

    /// Chooses a `(sub_index, cell_index)` for `symbol` on the nested board.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NoLegalMoves`] when the board offers no move.
    #[instrument(skip(self, board, rng), fields(strategy = %self))]
    pub fn decide<R: Rng>(
        &self,
        board: &MetaBoard,
        symbol: Symbol,
        rng: &mut R,
    ) -> Result<(usize, usize), RuleError> {
        let choice = match self {
            Strategy::Random => random::decide(board, rng),
            Strategy::Heuristic => heuristic::decide(board, symbol),
            Strategy::Minimax { depth } => minimax::decide(board, symbol, *depth),
        }?;
        debug!(sub_index = choice.0, cell_index = choice.1, "Strategy decided");
        Ok(choice)
    }

    /// Chooses a cell for `symbol` on a lone 3x3 board (classic mode).
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NoLegalMoves`] when the board is decided or full.
    #[instrument(skip(self, board, rng), fields(strategy = %self))]
    pub fn decide_single<R: Rng>(
        &self,
        board: &SubBoard,
        symbol: Symbol,
        rng: &mut R,
    ) -> Result<usize, RuleError> {
        match self {
            Strategy::Random => random::decide_single(board, rng),
            Strategy::Heuristic => heuristic::decide_single(board, symbol),
            Strategy::Minimax { depth } => minimax::decide_single(board, symbol, *depth),
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Heuristic
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Random => write!(f, "random"),
            Strategy::Heuristic => write!(f, "heuristic"),
            Strategy::Minimax { depth } => write!(f, "minimax:{}", depth),
        }
    }
}

/// Error parsing a strategy tag.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Unknown strategy '{}' (expected random, heuristic or minimax[:1-9])", tag)]
pub struct StrategyParseError {
    /// The rejected tag.
    pub tag: String,
}

impl FromStr for Strategy {
    type Err = StrategyParseError;

    /// Parses `random`, `heuristic` (or `good`), `minimax` (or `legend`),
    /// optionally followed by `:depth` for minimax.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reject = || StrategyParseError { tag: s.to_string() };
        let lowered = s.trim().to_lowercase();
        let (name, depth) = match lowered.split_once(':') {
            Some((name, depth)) => (name, Some(depth)),
            None => (lowered.as_str(), None),
        };
        match (name, depth) {
            ("random", None) => Ok(Strategy::Random),
            ("heuristic" | "good", None) => Ok(Strategy::Heuristic),
            ("minimax" | "legend", None) => Ok(Strategy::Minimax {
                depth: Strategy::DEFAULT_DEPTH,
            }),
            ("minimax" | "legend", Some(depth)) => {
                let depth: u8 = depth.trim().parse().map_err(|_| reject())?;
                if (1..=Strategy::MAX_DEPTH).contains(&depth) {
                    Ok(Strategy::Minimax { depth })
                } else {
                    Err(reject())
                }
            }
            _ => Err(reject()),
        }
    }
}

impl TryFrom<String> for Strategy {
    type Error = StrategyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Strategy> for String {
    fn from(value: Strategy) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!("random".parse(), Ok(Strategy::Random));
        assert_eq!("Good".parse(), Ok(Strategy::Heuristic));
        assert_eq!(
            "legend".parse(),
            Ok(Strategy::Minimax {
                depth: Strategy::DEFAULT_DEPTH
            })
        );
        assert_eq!("minimax:6".parse(), Ok(Strategy::Minimax { depth: 6 }));
        assert!("minimax:0".parse::<Strategy>().is_err());
        assert!("minimax:12".parse::<Strategy>().is_err());
        assert!("random:3".parse::<Strategy>().is_err());
        assert!("clever".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_serde_uses_tags() {
        let json = serde_json::to_string(&Strategy::Minimax { depth: 3 }).expect("serialize");
        assert_eq!(json, "\"minimax:3\"");
        let parsed: Strategy = serde_json::from_str("\"heuristic\"").expect("deserialize");
        assert_eq!(parsed, Strategy::Heuristic);
        assert!(serde_json::from_str::<Strategy>("\"bogus\"").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for strategy in [
            Strategy::Random,
            Strategy::Heuristic,
            Strategy::Minimax { depth: 7 },
        ] {
            assert_eq!(strategy.to_string().parse(), Ok(strategy));
        }
    }
}
