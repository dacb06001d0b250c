//! Match sessions for two-player play.
//!
//! A [`MatchSession`] wraps a [`RulesEngine`] with the bookkeeping of a
//! room: who sits in which slot, per-side clocks, surrender and replay
//! votes. It never reads the wall clock; callers pass elapsed time in.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strictly_ultimate::{
    BoardSnapshot, Move, MoveOutcome, Outcome, RuleError, RulesEngine, SnapshotError, Strategy,
    Symbol,
};
use tracing::{debug, info, instrument, warn};

/// Unique identifier for a match (room code).
pub type MatchId = String;

/// Unique identifier for a player.
pub type PlayerId = String;

/// Who controls a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "strategy", rename_all = "lowercase")]
pub enum PlayerKind {
    /// A person; moves arrive from a transport.
    Human,
    /// A computer side driven by a strategy.
    Computer(Strategy),
}

impl PlayerKind {
    /// True for human players.
    pub fn is_human(&self) -> bool {
        matches!(self, PlayerKind::Human)
    }

    /// Strategy of a computer player.
    pub fn strategy(&self) -> Option<Strategy> {
        match self {
            PlayerKind::Human => None,
            PlayerKind::Computer(strategy) => Some(*strategy),
        }
    }
}

/// A player seated in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Participant {
    /// Player's unique ID.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Human or computer.
    pub kind: PlayerKind,
}

/// Lifecycle of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Fewer than two players have joined.
    WaitingForPlayers,
    /// A round is being played.
    InProgress,
    /// The round is decided.
    RoundOver,
    /// A replay was requested and votes are being collected.
    AwaitingReplayVotes,
}

/// Why a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RoundEndReason {
    /// Decided on the board.
    Board {
        /// Final board outcome.
        outcome: Outcome,
    },
    /// A clock ran out.
    Timeout {
        /// Side whose clock ran out.
        loser: Symbol,
    },
    /// A side conceded.
    Surrender {
        /// Side that conceded.
        loser: Symbol,
    },
}

impl RoundEndReason {
    /// Final outcome of the round.
    pub fn outcome(&self) -> Outcome {
        match self {
            RoundEndReason::Board { outcome } => *outcome,
            RoundEndReason::Timeout { loser } | RoundEndReason::Surrender { loser } => {
                Outcome::Won(loser.opponent())
            }
        }
    }

    /// Winning side, if the round was not drawn.
    pub fn winner(&self) -> Option<Symbol> {
        self.outcome().winner()
    }
}

impl std::fmt::Display for RoundEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundEndReason::Board { outcome } => write!(f, "{}", outcome),
            RoundEndReason::Timeout { loser } => {
                write!(f, "{} wins on time", loser.opponent())
            }
            RoundEndReason::Surrender { loser } => {
                write!(f, "{} wins by surrender", loser.opponent())
            }
        }
    }
}

/// Result of a finished round from one side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
pub enum PlayerResult {
    /// This side won.
    Win,
    /// This side lost.
    Loss,
    /// Nobody won.
    Draw,
}

/// A finished round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct RoundRecord {
    /// Round number, starting at 1.
    round: u32,
    /// How the round ended.
    reason: RoundEndReason,
    /// Moves applied in the round.
    moves: usize,
    /// When the round ended.
    finished_at: DateTime<Utc>,
}

impl RoundRecord {
    /// Result of the round for `symbol`.
    pub fn result_for(&self, symbol: Symbol) -> PlayerResult {
        match self.reason.winner() {
            Some(winner) if winner == symbol => PlayerResult::Win,
            Some(_) => PlayerResult::Loss,
            None => PlayerResult::Draw,
        }
    }
}

/// Replay votes per side; `None` means not voted yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayVotes {
    /// Vote of X.
    pub x: Option<bool>,
    /// Vote of O.
    pub o: Option<bool>,
}

impl ReplayVotes {
    /// Vote of `symbol`.
    pub fn get(&self, symbol: Symbol) -> Option<bool> {
        match symbol {
            Symbol::X => self.x,
            Symbol::O => self.o,
        }
    }

    fn set(&mut self, symbol: Symbol, yes: bool) {
        match symbol {
            Symbol::X => self.x = Some(yes),
            Symbol::O => self.o = Some(yes),
        }
    }

    fn unanimous(&self) -> bool {
        self.x == Some(true) && self.o == Some(true)
    }
}

/// Emitted when mutual replay votes start a new round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReset {
    /// Number of the round that just started.
    pub round: u32,
}

/// Result of a move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PlayResult {
    /// The move was applied.
    Applied {
        /// What the move did to the board.
        outcome: MoveOutcome,
        /// Set when the move decided the round.
        round_end: Option<RoundEndReason>,
    },
    /// The mover's clock ran out before the move landed.
    TimedOut {
        /// The timeout that ended the round.
        round_end: RoundEndReason,
    },
}

impl PlayResult {
    /// How the round ended, if this request ended it.
    pub fn round_end(&self) -> Option<RoundEndReason> {
        match self {
            PlayResult::Applied { round_end, .. } => *round_end,
            PlayResult::TimedOut { round_end } => Some(*round_end),
        }
    }
}

/// How a transport should answer a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// The client acted on stale state; send it the unchanged state again.
    Rebroadcast,
    /// Report the error; state is unchanged.
    Reject,
}

/// Errors from match sessions.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum SessionError {
    /// Both slots are taken.
    #[display("Match already has two players")]
    SlotsFull,

    /// The player is not seated in this match.
    #[display("Unknown player '{}'", player_id)]
    UnknownPlayer {
        /// Rejected player ID.
        player_id: PlayerId,
    },

    /// The match is still waiting for players.
    #[display("Match has not started")]
    NotStarted,

    /// Replay requests and votes need a finished round.
    #[display("Round is not over")]
    NotRoundOver,

    /// The side to move is not a computer.
    #[display("Side to move is not a computer")]
    NotComputerTurn,

    /// The rules rejected the request.
    #[display("{}", _0)]
    Rule(#[error(source)] RuleError),
}

impl SessionError {
    /// Classifies the error for the transport.
    pub fn disposition(&self) -> Disposition {
        match self {
            SessionError::Rule(
                RuleError::WrongBoard { .. }
                | RuleError::CellOccupied { .. }
                | RuleError::SubBoardClosed { .. }
                | RuleError::WrongTurn { .. },
            ) => Disposition::Rebroadcast,
            _ => Disposition::Reject,
        }
    }
}

impl From<RuleError> for SessionError {
    fn from(err: RuleError) -> Self {
        SessionError::Rule(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Clocks {
    x: Duration,
    o: Duration,
}

impl Clocks {
    fn remaining(&self, symbol: Symbol) -> Duration {
        match symbol {
            Symbol::X => self.x,
            Symbol::O => self.o,
        }
    }

    /// Debits `elapsed` from `symbol`, floored at zero. Returns what is left.
    fn debit(&mut self, symbol: Symbol, elapsed: Duration) -> Duration {
        let clock = match symbol {
            Symbol::X => &mut self.x,
            Symbol::O => &mut self.o,
        };
        *clock = clock.saturating_sub(elapsed);
        *clock
    }
}

/// Persisted state of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Match ID.
    pub id: MatchId,
    /// Lifecycle phase.
    pub phase: SessionPhase,
    /// Current round number.
    pub round: u32,
    /// Player in the X slot.
    pub player_x: Option<Participant>,
    /// Player in the O slot.
    pub player_o: Option<Participant>,
    /// Board state of the current round.
    pub board: BoardSnapshot,
    /// Clock budget per side per round, in milliseconds.
    pub time_budget_ms: Option<u64>,
    /// Remaining time of X, when clocks run.
    pub remaining_x_ms: Option<u64>,
    /// Remaining time of O, when clocks run.
    pub remaining_o_ms: Option<u64>,
    /// Replay votes.
    pub votes: ReplayVotes,
    /// How the current round ended.
    pub end_reason: Option<RoundEndReason>,
    /// Finished rounds.
    pub history: Vec<RoundRecord>,
}

/// A two-player match.
#[derive(Debug, Clone)]
pub struct MatchSession {
    id: MatchId,
    engine: RulesEngine,
    phase: SessionPhase,
    player_x: Option<Participant>,
    player_o: Option<Participant>,
    time_budget: Option<Duration>,
    clocks: Option<Clocks>,
    votes: ReplayVotes,
    round: u32,
    end_reason: Option<RoundEndReason>,
    history: Vec<RoundRecord>,
}

impl MatchSession {
    /// Creates an empty match.
    ///
    /// `time_budget` is the clock per side per round. Clocks only run when
    /// both players are human.
    #[instrument]
    pub fn new(id: MatchId, time_budget: Option<Duration>) -> Self {
        info!(match_id = %id, "Creating match session");
        Self {
            id,
            engine: RulesEngine::new(),
            phase: SessionPhase::WaitingForPlayers,
            player_x: None,
            player_o: None,
            time_budget,
            clocks: None,
            votes: ReplayVotes::default(),
            round: 0,
            end_reason: None,
            history: Vec::new(),
        }
    }

    /// Creates a match with both players seated and the first round started.
    #[instrument(skip(player_x, player_o), fields(x = %player_x.id, o = %player_o.id))]
    pub fn start_round(
        id: MatchId,
        player_x: Participant,
        player_o: Participant,
        time_budget: Option<Duration>,
    ) -> Self {
        let mut session = Self::new(id, time_budget);
        session.player_x = Some(player_x);
        session.player_o = Some(player_o);
        session.begin_round();
        session
    }

    /// Seats a player. The first player gets X, the second O.
    ///
    /// Joining again with the same ID returns the same slot. The second join
    /// starts the first round.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SlotsFull`] when both slots are taken.
    #[instrument(skip(self, participant), fields(match_id = %self.id, player_id = %participant.id))]
    pub fn join(&mut self, participant: Participant) -> Result<Symbol, SessionError> {
        if let Some(symbol) = self.symbol_of(&participant.id) {
            debug!(%symbol, "Player rejoined");
            return Ok(symbol);
        }

        let symbol = if self.player_x.is_none() {
            self.player_x = Some(participant);
            Symbol::X
        } else if self.player_o.is_none() {
            self.player_o = Some(participant);
            Symbol::O
        } else {
            warn!("Match already has 2 players");
            return Err(SessionError::SlotsFull);
        };
        info!(%symbol, "Player seated");

        if self.phase == SessionPhase::WaitingForPlayers
            && self.player_x.is_some()
            && self.player_o.is_some()
        {
            self.begin_round();
        }
        Ok(symbol)
    }

    /// Applies a move for a human player.
    ///
    /// `elapsed` is the time since the previous debit and is charged to the
    /// mover. If it exhausts the mover's clock the round ends by timeout and
    /// the move is not applied. Rejected moves change nothing.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotStarted`], [`SessionError::UnknownPlayer`], or a
    /// [`SessionError::Rule`] for illegal moves (including moves after the
    /// round is over).
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn play(
        &mut self,
        player_id: &str,
        sub_index: usize,
        cell_index: usize,
        elapsed: Duration,
    ) -> Result<PlayResult, SessionError> {
        self.ensure_in_progress()?;
        let symbol = self.require_symbol(player_id)?;
        if let Some(expected) = self.engine.to_move()
            && expected != symbol
        {
            warn!(%expected, got = %symbol, "Move out of turn");
            return Err(RuleError::WrongTurn {
                expected,
                got: symbol,
            }
            .into());
        }

        if self
            .clocks
            .is_some_and(|clocks| elapsed >= clocks.remaining(symbol))
        {
            if let Some(clocks) = self.clocks.as_mut() {
                clocks.debit(symbol, elapsed);
            }
            let round_end = self.time_out(symbol);
            return Ok(PlayResult::TimedOut { round_end });
        }

        let outcome = self.engine.play(sub_index, cell_index, symbol)?;
        if let Some(clocks) = self.clocks.as_mut() {
            clocks.debit(symbol, elapsed);
        }
        Ok(self.after_move(outcome))
    }

    /// Side and strategy of a computer whose turn it is.
    pub fn pending_computer(&self) -> Option<(Symbol, Strategy)> {
        let side = self.to_move()?;
        let strategy = self.player(side)?.kind.strategy()?;
        Some((side, strategy))
    }

    /// Applies a move chosen for the computer side to move. No clock is
    /// charged.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotComputerTurn`] when the side to move is human or
    /// the move is for the other side, plus the errors of [`MatchSession::play`].
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn play_computer_move(&mut self, mv: Move) -> Result<PlayResult, SessionError> {
        self.ensure_in_progress()?;
        match self.pending_computer() {
            Some((side, _)) if side == mv.symbol => {}
            _ => {
                warn!(symbol = %mv.symbol, "Computer move out of turn");
                return Err(SessionError::NotComputerTurn);
            }
        }
        let outcome = self.engine.apply_move(mv)?;
        Ok(self.after_move(outcome))
    }

    /// Lets the computer side to move choose and play.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotComputerTurn`] when the side to move is human.
    #[instrument(skip(self, rng), fields(match_id = %self.id))]
    pub fn play_auto<R: Rng>(&mut self, rng: &mut R) -> Result<PlayResult, SessionError> {
        self.ensure_in_progress()?;
        let (side, strategy) = self
            .pending_computer()
            .ok_or(SessionError::NotComputerTurn)?;
        let mv = self.engine.ai_decide(&strategy, side, rng)?;
        self.play_computer_move(mv)
    }

    /// Charges `elapsed` to the side to move.
    ///
    /// Returns the end reason when that clock reaches zero. Does nothing
    /// without running clocks or outside a round.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn tick(&mut self, elapsed: Duration) -> Option<RoundEndReason> {
        if self.phase != SessionPhase::InProgress {
            return None;
        }
        let side = self.engine.to_move()?;
        let remaining = self.clocks.as_mut()?.debit(side, elapsed);
        if remaining.is_zero() {
            Some(self.time_out(side))
        } else {
            None
        }
    }

    /// Concedes the round for `symbol`.
    ///
    /// A finished round keeps its result; the existing end reason is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotStarted`] before the first round.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn surrender(&mut self, symbol: Symbol) -> Result<RoundEndReason, SessionError> {
        match self.phase {
            SessionPhase::WaitingForPlayers => Err(SessionError::NotStarted),
            SessionPhase::RoundOver | SessionPhase::AwaitingReplayVotes => {
                let reason = self.end_reason.ok_or(SessionError::NotStarted)?;
                debug!(%reason, "Surrender after round end ignored");
                Ok(reason)
            }
            SessionPhase::InProgress => {
                self.engine.surrender(symbol);
                let reason = RoundEndReason::Surrender { loser: symbol };
                self.finish_round(reason);
                Ok(reason)
            }
        }
    }

    /// Opens replay voting. The requester votes yes; computers always do.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotRoundOver`] while a round is running.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn request_replay(&mut self, symbol: Symbol) -> Result<Option<RoundReset>, SessionError> {
        match self.phase {
            SessionPhase::RoundOver => self.open_voting(),
            SessionPhase::AwaitingReplayVotes => {}
            _ => return Err(SessionError::NotRoundOver),
        }
        info!(%symbol, "Replay requested");
        self.votes.set(symbol, true);
        Ok(self.settle_votes())
    }

    /// Records a replay vote.
    ///
    /// Two yes votes start a new round. A no vote closes voting and the
    /// match stays in [`SessionPhase::RoundOver`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotRoundOver`] while a round is running.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn vote_replay(
        &mut self,
        symbol: Symbol,
        yes: bool,
    ) -> Result<Option<RoundReset>, SessionError> {
        match self.phase {
            SessionPhase::RoundOver | SessionPhase::AwaitingReplayVotes => {}
            _ => return Err(SessionError::NotRoundOver),
        }
        if !yes {
            info!(%symbol, "Replay declined");
            self.votes = ReplayVotes::default();
            self.phase = SessionPhase::RoundOver;
            return Ok(None);
        }
        if self.phase == SessionPhase::RoundOver {
            self.open_voting();
        }
        self.votes.set(symbol, true);
        debug!(%symbol, votes = ?self.votes, "Replay vote recorded");
        Ok(self.settle_votes())
    }

    // Accessors

    /// Match ID.
    pub fn id(&self) -> &MatchId {
        &self.id
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Rules engine of the current round.
    pub fn engine(&self) -> &RulesEngine {
        &self.engine
    }

    /// Current round number (0 before the first round).
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Side to move, while a round is running.
    pub fn to_move(&self) -> Option<Symbol> {
        if self.phase == SessionPhase::InProgress {
            self.engine.to_move()
        } else {
            None
        }
    }

    /// Player in the slot of `symbol`.
    pub fn player(&self, symbol: Symbol) -> Option<&Participant> {
        match symbol {
            Symbol::X => self.player_x.as_ref(),
            Symbol::O => self.player_o.as_ref(),
        }
    }

    /// Slot of the player with `player_id`.
    pub fn symbol_of(&self, player_id: &str) -> Option<Symbol> {
        [Symbol::X, Symbol::O]
            .into_iter()
            .find(|&symbol| self.player(symbol).is_some_and(|p| p.id == player_id))
    }

    /// Remaining clock of `symbol`, when clocks run.
    pub fn remaining(&self, symbol: Symbol) -> Option<Duration> {
        self.clocks.map(|clocks| clocks.remaining(symbol))
    }

    /// True when the current round runs clocks.
    pub fn clocks_running(&self) -> bool {
        self.clocks.is_some() && self.phase == SessionPhase::InProgress
    }

    /// How the last round ended.
    pub fn end_reason(&self) -> Option<RoundEndReason> {
        self.end_reason
    }

    /// Finished rounds, oldest first.
    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    /// Replay votes.
    pub fn votes(&self) -> ReplayVotes {
        self.votes
    }

    // Persistence

    /// Storage snapshot of the match.
    pub fn snapshot(&self) -> SessionSnapshot {
        let millis = |d: Duration| d.as_millis() as u64;
        SessionSnapshot {
            id: self.id.clone(),
            phase: self.phase,
            round: self.round,
            player_x: self.player_x.clone(),
            player_o: self.player_o.clone(),
            board: self.engine.snapshot(),
            time_budget_ms: self.time_budget.map(millis),
            remaining_x_ms: self.remaining(Symbol::X).map(millis),
            remaining_o_ms: self.remaining(Symbol::O).map(millis),
            votes: self.votes,
            end_reason: self.end_reason,
            history: self.history.clone(),
        }
    }

    /// Rebuilds a match from a storage snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the board snapshot is invalid.
    #[instrument(skip(snapshot), fields(match_id = %snapshot.id))]
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Result<Self, SnapshotError> {
        let engine = RulesEngine::from_snapshot(&snapshot.board)?;
        let clocks = match (snapshot.remaining_x_ms, snapshot.remaining_o_ms) {
            (Some(x), Some(o)) => Some(Clocks {
                x: Duration::from_millis(x),
                o: Duration::from_millis(o),
            }),
            _ => None,
        };
        info!(phase = %snapshot.phase, round = snapshot.round, "Match restored");
        Ok(Self {
            id: snapshot.id.clone(),
            engine,
            phase: snapshot.phase,
            player_x: snapshot.player_x.clone(),
            player_o: snapshot.player_o.clone(),
            time_budget: snapshot.time_budget_ms.map(Duration::from_millis),
            clocks,
            votes: snapshot.votes,
            round: snapshot.round,
            end_reason: snapshot.end_reason,
            history: snapshot.history.clone(),
        })
    }

    // Internals

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::WaitingForPlayers => Err(SessionError::NotStarted),
            SessionPhase::InProgress => Ok(()),
            SessionPhase::RoundOver | SessionPhase::AwaitingReplayVotes => {
                Err(RuleError::GameOver.into())
            }
        }
    }

    fn require_symbol(&self, player_id: &str) -> Result<Symbol, SessionError> {
        self.symbol_of(player_id).ok_or_else(|| {
            warn!(player_id, "Unknown player");
            SessionError::UnknownPlayer {
                player_id: player_id.to_string(),
            }
        })
    }

    fn begin_round(&mut self) {
        self.engine.reset();
        self.round += 1;
        self.phase = SessionPhase::InProgress;
        self.votes = ReplayVotes::default();
        self.end_reason = None;

        let is_human = |slot: &Option<Participant>| slot.as_ref().is_some_and(|p| p.kind.is_human());
        let both_human = is_human(&self.player_x) && is_human(&self.player_o);
        self.clocks = match self.time_budget {
            Some(budget) if both_human => Some(Clocks {
                x: budget,
                o: budget,
            }),
            _ => None,
        };
        info!(match_id = %self.id, round = self.round, clocks = self.clocks.is_some(), "Round started");
    }

    fn after_move(&mut self, outcome: MoveOutcome) -> PlayResult {
        let round_end = outcome.global_outcome().map(|decided| {
            let reason = RoundEndReason::Board { outcome: decided };
            self.finish_round(reason);
            reason
        });
        PlayResult::Applied { outcome, round_end }
    }

    fn time_out(&mut self, loser: Symbol) -> RoundEndReason {
        warn!(match_id = %self.id, %loser, "Clock expired");
        self.engine.surrender(loser);
        let reason = RoundEndReason::Timeout { loser };
        self.finish_round(reason);
        reason
    }

    fn finish_round(&mut self, reason: RoundEndReason) {
        self.phase = SessionPhase::RoundOver;
        self.end_reason = Some(reason);
        self.votes = ReplayVotes::default();
        // Counted from the board; a restored engine starts with an empty history.
        let board = self.engine.board();
        let moves = board.count(Symbol::X) + board.count(Symbol::O);
        self.history.push(RoundRecord::new(self.round, reason, moves, Utc::now()));
        info!(match_id = %self.id, round = self.round, %reason, "Round over");
    }

    fn open_voting(&mut self) {
        self.phase = SessionPhase::AwaitingReplayVotes;
        self.votes = ReplayVotes::default();
        for symbol in [Symbol::X, Symbol::O] {
            if self.player(symbol).is_some_and(|p| !p.kind.is_human()) {
                self.votes.set(symbol, true);
            }
        }
    }

    fn settle_votes(&mut self) -> Option<RoundReset> {
        if !self.votes.unanimous() {
            return None;
        }
        self.begin_round();
        Some(RoundReset { round: self.round })
    }
}
