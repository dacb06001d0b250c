//! Match registry and per-match concurrency.
//!
//! Each match sits behind its own async mutex, so moves, clock ticks and
//! votes for one match are applied one at a time while other matches run in
//! parallel. A background task per running round charges the clock of the
//! side to move; it is cancelled when the round ends or the match is
//! removed. Computer moves are searched on the blocking pool without holding
//! the match lock.

use crate::ServerConfig;
use crate::session::{
    MatchId, MatchSession, Participant, PlayResult, PlayerId, RoundEndReason, RoundReset,
    SessionError, SessionPhase, SessionSnapshot,
};
use derive_more::{Display, Error};
use rand::SeedableRng;
use rand::distr::{Alphanumeric, SampleString};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use strictly_ultimate::{GlobalState, Move, Outcome, Strategy, Symbol};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Length of generated room codes.
const ROOM_CODE_LEN: usize = 6;

/// Something that happened in a match, for transports to fan out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    /// A player took a slot.
    PlayerJoined {
        /// Player ID.
        player_id: PlayerId,
        /// Display name.
        name: String,
        /// Assigned slot.
        symbol: Symbol,
    },
    /// A round began.
    RoundStarted {
        /// Round number.
        round: u32,
    },
    /// A move was applied.
    MovePlayed {
        /// The move.
        applied: Move,
        /// Where the next move must land.
        next_active: Option<usize>,
    },
    /// A round was decided.
    RoundEnded {
        /// Round number.
        round: u32,
        /// How it ended.
        reason: RoundEndReason,
        /// Final outcome.
        outcome: Outcome,
    },
    /// A side voted on a replay.
    ReplayVote {
        /// Voting side.
        symbol: Symbol,
        /// The vote.
        yes: bool,
    },
    /// Both sides agreed and a fresh round began.
    RoundReset {
        /// Number of the new round.
        round: u32,
    },
}

/// Errors from the match registry.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ManagerError {
    /// No match with this ID.
    #[display("Match '{}' not found", id)]
    MatchNotFound {
        /// Requested match ID.
        id: MatchId,
    },

    /// A match with this ID already exists.
    #[display("Match '{}' already exists", id)]
    MatchExists {
        /// Requested match ID.
        id: MatchId,
    },

    /// The computer move worker failed.
    #[display("Computer move failed: {}", message)]
    Worker {
        /// Failure description.
        message: String,
    },

    /// The session rejected the request.
    #[display("{}", _0)]
    Session(#[error(source)] SessionError),
}

impl From<SessionError> for ManagerError {
    fn from(err: SessionError) -> Self {
        ManagerError::Session(err)
    }
}

/// Summary of a match for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Match ID.
    pub id: MatchId,
    /// Lifecycle phase.
    pub phase: SessionPhase,
    /// Current round number.
    pub round: u32,
    /// Seated players.
    pub players: usize,
}

/// Read model of a match for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
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
    /// Side to move.
    pub to_move: Option<Symbol>,
    /// Board state.
    pub state: GlobalState,
    /// Last applied move.
    pub last_move: Option<Move>,
    /// Remaining clock of X in milliseconds.
    pub remaining_x_ms: Option<u64>,
    /// Remaining clock of O in milliseconds.
    pub remaining_o_ms: Option<u64>,
    /// How the last round ended.
    pub end_reason: Option<RoundEndReason>,
    /// Text rendering of the board.
    pub display: String,
}

impl MatchView {
    fn of(session: &MatchSession) -> Self {
        let millis = |d: Duration| d.as_millis() as u64;
        let engine = session.engine();
        Self {
            id: session.id().clone(),
            phase: session.phase(),
            round: session.round(),
            player_x: session.player(Symbol::X).cloned(),
            player_o: session.player(Symbol::O).cloned(),
            to_move: session.to_move(),
            state: engine.board().state(),
            last_move: engine.last_move().copied(),
            remaining_x_ms: session.remaining(Symbol::X).map(millis),
            remaining_o_ms: session.remaining(Symbol::O).map(millis),
            end_reason: session.end_reason(),
            display: engine.board().display(),
        }
    }
}

struct MatchEntry {
    session: MatchSession,
    rng: StdRng,
    last_debit: Instant,
    timer: Option<CancellationToken>,
    events: broadcast::Sender<MatchEvent>,
}

impl MatchEntry {
    fn emit(&self, event: MatchEvent) {
        // No subscribers is fine.
        self.events.send(event).ok();
    }

    fn emit_round_end(&mut self, reason: RoundEndReason) {
        self.stop_timer();
        self.emit(MatchEvent::RoundEnded {
            round: self.session.round(),
            reason,
            outcome: reason.outcome(),
        });
    }

    fn emit_play(&mut self, result: &PlayResult) {
        if let PlayResult::Applied { outcome, .. } = result {
            self.emit(MatchEvent::MovePlayed {
                applied: *outcome.applied(),
                next_active: *outcome.active_sub_index(),
            });
        }
        if let Some(reason) = result.round_end() {
            self.emit_round_end(reason);
        }
    }

    fn stop_timer(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
    }
}

struct Registry {
    matches: RwLock<HashMap<MatchId, Arc<Mutex<MatchEntry>>>>,
    time_budget: Option<Duration>,
    tick_interval: Duration,
    event_capacity: usize,
    seed: Option<u64>,
    default_strategy: Strategy,
}

/// Registry of live matches.
#[derive(Clone)]
pub struct MatchManager {
    inner: Arc<Registry>,
}

impl std::fmt::Debug for MatchManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchManager")
            .field("time_budget", &self.inner.time_budget)
            .field("tick_interval", &self.inner.tick_interval)
            .field("default_strategy", &self.inner.default_strategy)
            .finish_non_exhaustive()
    }
}

impl MatchManager {
    /// Creates an empty registry.
    #[instrument(skip(config))]
    pub fn new(config: &ServerConfig) -> Self {
        let default_strategy = config.strategy().unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to the heuristic strategy");
            Strategy::default()
        });
        info!(
            time_budget = ?config.time_budget(),
            tick_ms = config.tick_interval_ms(),
            %default_strategy,
            "Creating match manager"
        );
        Self {
            inner: Arc::new(Registry {
                matches: RwLock::new(HashMap::new()),
                time_budget: config.time_budget(),
                tick_interval: config.tick_interval(),
                event_capacity: (*config.event_capacity()).max(1),
                seed: *config.ai_seed(),
                default_strategy,
            }),
        }
    }

    /// Strategy for computer players that do not name one.
    pub fn default_strategy(&self) -> Strategy {
        self.inner.default_strategy
    }

    /// Creates a match. Generates a room code when `id` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::MatchExists`] for a taken ID.
    #[instrument(skip(self))]
    pub async fn create_match(&self, id: Option<MatchId>) -> Result<MatchId, ManagerError> {
        let mut matches = self.inner.matches.write().await;
        let id = match id {
            Some(id) => {
                if matches.contains_key(&id) {
                    warn!(match_id = %id, "Match already exists");
                    return Err(ManagerError::MatchExists { id });
                }
                id
            }
            None => loop {
                let code = Alphanumeric
                    .sample_string(&mut rand::rng(), ROOM_CODE_LEN)
                    .to_uppercase();
                if !matches.contains_key(&code) {
                    break code;
                }
            },
        };

        let rng = match self.inner.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let (events, _) = broadcast::channel(self.inner.event_capacity);
        let entry = MatchEntry {
            session: MatchSession::new(id.clone(), self.inner.time_budget),
            rng,
            last_debit: Instant::now(),
            timer: None,
            events,
        };
        matches.insert(id.clone(), Arc::new(Mutex::new(entry)));
        info!(match_id = %id, "Created match");
        Ok(id)
    }

    /// Lists matches, sorted by ID.
    #[instrument(skip(self))]
    pub async fn list_matches(&self) -> Vec<MatchSummary> {
        let entries: Vec<_> = self.inner.matches.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            let entry = entry.lock().await;
            let session = &entry.session;
            summaries.push(MatchSummary {
                id: session.id().clone(),
                phase: session.phase(),
                round: session.round(),
                players: [Symbol::X, Symbol::O]
                    .into_iter()
                    .filter(|&s| session.player(s).is_some())
                    .count(),
            });
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(count = summaries.len(), "Listed matches");
        summaries
    }

    /// Removes a match and stops its clock task.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::MatchNotFound`] for an unknown ID.
    #[instrument(skip(self))]
    pub async fn remove_match(&self, id: &str) -> Result<(), ManagerError> {
        let entry = self
            .inner
            .matches
            .write()
            .await
            .remove(id)
            .ok_or_else(|| ManagerError::MatchNotFound { id: id.to_string() })?;
        entry.lock().await.stop_timer();
        info!(match_id = id, "Removed match");
        Ok(())
    }

    /// Seats a player, creating the match when it does not exist.
    ///
    /// When the second player joins the round starts, the clock task starts
    /// when clocks run, and a computer X moves right away.
    #[instrument(skip(self, participant), fields(player_id = %participant.id))]
    pub async fn join(&self, id: &str, participant: Participant) -> Result<Symbol, ManagerError> {
        let entry = match self.entry(id).await {
            Ok(entry) => entry,
            Err(ManagerError::MatchNotFound { .. }) => {
                self.create_match(Some(id.to_string())).await.or_else(|e| match e {
                    ManagerError::MatchExists { .. } => Ok(id.to_string()),
                    other => Err(other),
                })?;
                self.entry(id).await?
            }
            Err(e) => return Err(e),
        };

        let symbol = {
            let mut guard = entry.lock().await;
            let was_waiting = guard.session.phase() == SessionPhase::WaitingForPlayers;
            let (player_id, name) = (participant.id.clone(), participant.name.clone());
            let symbol = guard.session.join(participant)?;
            guard.emit(MatchEvent::PlayerJoined {
                player_id,
                name,
                symbol,
            });
            if was_waiting && guard.session.phase() == SessionPhase::InProgress {
                self.on_round_start(id, &entry, &mut guard);
            }
            symbol
        };

        self.drive_computers(&entry).await?;
        Ok(symbol)
    }

    /// Applies a move for a human player.
    ///
    /// The time since the last clock debit is charged to the mover.
    #[instrument(skip(self))]
    pub async fn play(
        &self,
        id: &str,
        player_id: &str,
        sub_index: usize,
        cell_index: usize,
    ) -> Result<PlayResult, ManagerError> {
        let entry = self.entry(id).await?;
        let result = {
            let mut guard = entry.lock().await;
            let now = Instant::now();
            let elapsed = now.duration_since(guard.last_debit);
            let result = guard.session.play(player_id, sub_index, cell_index, elapsed)?;
            guard.last_debit = now;
            guard.emit_play(&result);
            result
        };
        self.drive_computers(&entry).await?;
        Ok(result)
    }

    /// Concedes the round for a player.
    #[instrument(skip(self))]
    pub async fn surrender(&self, id: &str, player_id: &str) -> Result<RoundEndReason, ManagerError> {
        let entry = self.entry(id).await?;
        let mut guard = entry.lock().await;
        let symbol = Self::seat_of(&guard.session, player_id)?;
        let was_running = guard.session.phase() == SessionPhase::InProgress;
        let reason = guard.session.surrender(symbol)?;
        if was_running {
            guard.emit_round_end(reason);
        }
        Ok(reason)
    }

    /// Opens replay voting for a player.
    #[instrument(skip(self))]
    pub async fn request_replay(
        &self,
        id: &str,
        player_id: &str,
    ) -> Result<Option<RoundReset>, ManagerError> {
        let entry = self.entry(id).await?;
        let reset = {
            let mut guard = entry.lock().await;
            let symbol = Self::seat_of(&guard.session, player_id)?;
            let reset = guard.session.request_replay(symbol)?;
            guard.emit(MatchEvent::ReplayVote { symbol, yes: true });
            if let Some(reset) = reset {
                self.on_reset(id, &entry, &mut guard, reset);
            }
            reset
        };
        self.drive_computers(&entry).await?;
        Ok(reset)
    }

    /// Records a replay vote for a player.
    #[instrument(skip(self))]
    pub async fn vote(
        &self,
        id: &str,
        player_id: &str,
        yes: bool,
    ) -> Result<Option<RoundReset>, ManagerError> {
        let entry = self.entry(id).await?;
        let reset = {
            let mut guard = entry.lock().await;
            let symbol = Self::seat_of(&guard.session, player_id)?;
            let reset = guard.session.vote_replay(symbol, yes)?;
            guard.emit(MatchEvent::ReplayVote { symbol, yes });
            if let Some(reset) = reset {
                self.on_reset(id, &entry, &mut guard, reset);
            }
            reset
        };
        self.drive_computers(&entry).await?;
        Ok(reset)
    }

    /// Read model of a match.
    pub async fn view(&self, id: &str) -> Result<MatchView, ManagerError> {
        let entry = self.entry(id).await?;
        let guard = entry.lock().await;
        Ok(MatchView::of(&guard.session))
    }

    /// Storage snapshot of a match.
    pub async fn snapshot(&self, id: &str) -> Result<SessionSnapshot, ManagerError> {
        let entry = self.entry(id).await?;
        let guard = entry.lock().await;
        Ok(guard.session.snapshot())
    }

    /// Subscribes to the events of a match.
    pub async fn subscribe(&self, id: &str) -> Result<broadcast::Receiver<MatchEvent>, ManagerError> {
        let entry = self.entry(id).await?;
        let guard = entry.lock().await;
        Ok(guard.events.subscribe())
    }

    // Internals

    async fn entry(&self, id: &str) -> Result<Arc<Mutex<MatchEntry>>, ManagerError> {
        self.inner
            .matches
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| {
                debug!(match_id = id, "Match not found");
                ManagerError::MatchNotFound { id: id.to_string() }
            })
    }

    fn seat_of(session: &MatchSession, player_id: &str) -> Result<Symbol, ManagerError> {
        session.symbol_of(player_id).ok_or_else(|| {
            warn!(player_id, "Unknown player");
            ManagerError::Session(SessionError::UnknownPlayer {
                player_id: player_id.to_string(),
            })
        })
    }

    fn on_round_start(&self, id: &str, entry: &Arc<Mutex<MatchEntry>>, guard: &mut MatchEntry) {
        guard.emit(MatchEvent::RoundStarted {
            round: guard.session.round(),
        });
        guard.last_debit = Instant::now();
        guard.stop_timer();
        if guard.session.clocks_running() {
            let token = CancellationToken::new();
            guard.timer = Some(token.clone());
            self.spawn_clock(id.to_string(), Arc::downgrade(entry), token);
        }
    }

    fn on_reset(
        &self,
        id: &str,
        entry: &Arc<Mutex<MatchEntry>>,
        guard: &mut MatchEntry,
        reset: RoundReset,
    ) {
        guard.emit(MatchEvent::RoundReset { round: reset.round });
        self.on_round_start(id, entry, guard);
    }

    /// Charges the side to move every tick until the round ends or the
    /// token is cancelled.
    fn spawn_clock(
        &self,
        id: MatchId,
        entry: std::sync::Weak<Mutex<MatchEntry>>,
        cancel: CancellationToken,
    ) {
        let interval = self.inner.tick_interval;
        tokio::spawn(async move {
            debug!(match_id = %id, "Clock task started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        let Some(entry) = entry.upgrade() else { break };
                        let mut guard = entry.lock().await;
                        // A final move may have won the lock first.
                        if cancel.is_cancelled() {
                            break;
                        }
                        let now = Instant::now();
                        let elapsed = now.duration_since(guard.last_debit);
                        guard.last_debit = now;
                        if let Some(reason) = guard.session.tick(elapsed) {
                            guard.emit_round_end(reason);
                            break;
                        }
                        if !guard.session.clocks_running() {
                            break;
                        }
                    }
                }
            }
            debug!(match_id = %id, "Clock task stopped");
        });
    }

    /// Plays computer turns until a human is to move or the round ends.
    async fn drive_computers(&self, entry: &Arc<Mutex<MatchEntry>>) -> Result<(), ManagerError> {
        loop {
            let (engine, symbol, strategy, round, moves, mut rng) = {
                let mut guard = entry.lock().await;
                let Some((symbol, strategy)) = guard.session.pending_computer() else {
                    return Ok(());
                };
                let rng = StdRng::from_rng(&mut guard.rng);
                (
                    guard.session.engine().clone(),
                    symbol,
                    strategy,
                    guard.session.round(),
                    guard.session.engine().history().len(),
                    rng,
                )
            };

            let mv = tokio::task::spawn_blocking(move || engine.ai_decide(&strategy, symbol, &mut rng))
                .await
                .map_err(|e| ManagerError::Worker {
                    message: e.to_string(),
                })?
                .map_err(SessionError::from)?;

            let mut guard = entry.lock().await;
            // Surrender or timeout during the search ends the round without a new move.
            if guard.session.pending_computer().is_none() {
                debug!(%strategy, "Round no longer waits on the computer");
                return Ok(());
            }
            if guard.session.round() != round || guard.session.engine().history().len() != moves {
                debug!("Board changed during search, retrying");
                continue;
            }
            let result = guard.session.play_computer_move(mv)?;
            guard.last_debit = Instant::now();
            debug!(%mv, %strategy, "Computer moved");
            guard.emit_play(&result);
        }
    }
}
