//! Strictly Ultimate - ultimate tic-tac-toe rules and computer players
//!
//! Nine classic boards arranged in a 3x3 grid. The cell you play in picks
//! the board your opponent must play in next. Capture three boards in a
//! line to win.
//!
//! # Architecture
//!
//! - **Rules**: pure line and fill checks over nine cells
//! - **Boards**: [`SubBoard`] and the nested [`MetaBoard`] with routing
//! - **Engine**: [`RulesEngine`] tracks turns, forfeits and history
//! - **Snapshots**: [`BoardSnapshot`] is the 81-glyph storage format
//! - **AI**: [`Strategy`] picks moves (random, heuristic, minimax)
//!
//! # Example
//!
//! ```
//! use strictly_ultimate::{RulesEngine, Strategy, Symbol};
//!
//! let mut engine = RulesEngine::new();
//! engine.play(4, 4, Symbol::X)?;
//! assert_eq!(engine.board().active_sub_index(), Some(4));
//!
//! let mut rng = rand::rng();
//! let reply = engine.ai_decide(&Strategy::Heuristic, Symbol::O, &mut rng)?;
//! engine.apply_move(reply)?;
//! # Ok::<(), strictly_ultimate::RuleError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod engine;
mod error;
mod meta_board;
mod snapshot;
mod sub_board;
mod types;

pub mod ai;
pub mod rules;

// Crate-level exports - Core types
pub use types::{Cell, Move, MoveOutcome, Outcome, Symbol};

// Crate-level exports - Errors
pub use error::{RuleError, SnapshotError};

// Crate-level exports - Boards
pub use meta_board::{GlobalState, MetaBoard};
pub use sub_board::SubBoard;

// Crate-level exports - Engine
pub use engine::{RoundStatus, RulesEngine};
pub use snapshot::{BoardSnapshot, FLAT_CELLS};

// Crate-level exports - Computer players
pub use ai::{Strategy, StrategyParseError};
