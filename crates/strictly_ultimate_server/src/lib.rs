//! Strictly Ultimate server library - match sessions over the rules engine
//!
//! Wraps the pure game crate with the pieces a multiplayer room needs.
//!
//! # Architecture
//!
//! - **Session**: [`MatchSession`] seats two players and runs clocks,
//!   surrender and replay votes over a [`strictly_ultimate::RulesEngine`]
//! - **Manager**: [`MatchManager`] keeps live matches, serializes access per
//!   match, runs clock tasks and plays computer turns
//! - **Server**: an axum JSON API over the manager
//! - **Terminal**: human vs computer at the console, and self-play
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use strictly_ultimate::Symbol;
//! use strictly_ultimate_server::{MatchSession, Participant, PlayerKind};
//!
//! let alice = Participant::new("alice".into(), "Alice".into(), PlayerKind::Human);
//! let bob = Participant::new("bob".into(), "Bob".into(), PlayerKind::Human);
//! let mut session = MatchSession::start_round("room".into(), alice, bob, None);
//! session.play("alice", 4, 0, Duration::ZERO)?;
//! assert_eq!(session.to_move(), Some(Symbol::O));
//! # Ok::<(), strictly_ultimate_server::SessionError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod manager;
mod server;
mod session;
mod terminal;

pub mod cli;

// Crate-level exports - Configuration
pub use config::{ConfigError, ServerConfig};

// Crate-level exports - Sessions
pub use session::{
    Disposition, MatchId, MatchSession, Participant, PlayResult, PlayerId, PlayerKind,
    PlayerResult, ReplayVotes, RoundEndReason, RoundRecord, RoundReset, SessionError,
    SessionPhase, SessionSnapshot,
};

// Crate-level exports - Match registry
pub use manager::{ManagerError, MatchEvent, MatchManager, MatchSummary, MatchView};

// Crate-level exports - HTTP API
pub use server::{
    ApiError, CreateMatchRequest, CreateMatchResponse, JoinRequest, JoinResponse, MoveRequest,
    MoveResponse, PlayerRequest, SurrenderResponse, VoteRequest, VoteResponse, create_router,
};

// Crate-level exports - Terminal
pub use terminal::{PlayerInput, TerminalError, Tally, parse_command, play_terminal, self_play};
