//! Match session lifecycle: seating, clocks, surrender and replays.

use std::time::Duration;
use strictly_ultimate::{Cell, Outcome, RuleError, Strategy, Symbol};
use strictly_ultimate_server::{
    Disposition, MatchSession, Participant, PlayResult, PlayerKind, RoundEndReason, RoundReset,
    SessionError, SessionPhase,
};

fn human(id: &str) -> Participant {
    Participant::new(id.to_string(), id.to_uppercase(), PlayerKind::Human)
}

fn duel(budget: Option<Duration>) -> MatchSession {
    MatchSession::start_round("room".to_string(), human("alice"), human("bob"), budget)
}

#[test]
fn test_join_assigns_slots_in_order() {
    let mut session = MatchSession::new("room".to_string(), None);
    assert_eq!(session.join(human("alice")), Ok(Symbol::X));
    assert_eq!(session.phase(), SessionPhase::WaitingForPlayers);

    // Rejoining keeps the slot.
    assert_eq!(session.join(human("alice")), Ok(Symbol::X));
    assert_eq!(session.join(human("bob")), Ok(Symbol::O));
    assert_eq!(session.phase(), SessionPhase::InProgress);
    assert_eq!(session.round(), 1);
    assert_eq!(session.to_move(), Some(Symbol::X));

    assert_eq!(session.join(human("carol")), Err(SessionError::SlotsFull));
    assert_eq!(session.join(human("bob")), Ok(Symbol::O));
}

#[test]
fn test_moves_before_start_are_rejected() {
    let mut session = MatchSession::new("room".to_string(), None);
    session.join(human("alice")).expect("join");
    assert_eq!(
        session.play("alice", 4, 4, Duration::ZERO),
        Err(SessionError::NotStarted)
    );
}

#[test]
fn test_stale_moves_are_rebroadcast() {
    let mut session = duel(None);
    session.play("alice", 4, 0, Duration::ZERO).expect("legal");

    let wrong_board = session
        .play("bob", 5, 0, Duration::ZERO)
        .expect_err("must play in board 0");
    assert_eq!(
        wrong_board,
        SessionError::Rule(RuleError::WrongBoard {
            expected: 0,
            got: 5
        })
    );
    assert_eq!(wrong_board.disposition(), Disposition::Rebroadcast);

    let wrong_turn = session
        .play("alice", 0, 4, Duration::ZERO)
        .expect_err("not X's turn");
    assert!(matches!(
        wrong_turn,
        SessionError::Rule(RuleError::WrongTurn {
            expected: Symbol::O,
            got: Symbol::X
        })
    ));
    assert_eq!(wrong_turn.disposition(), Disposition::Rebroadcast);

    let stranger = session
        .play("mallory", 0, 4, Duration::ZERO)
        .expect_err("not seated");
    assert_eq!(stranger.disposition(), Disposition::Reject);

    // Nothing above changed the board.
    assert_eq!(session.engine().history().len(), 1);
    assert_eq!(session.to_move(), Some(Symbol::O));
}

#[test]
fn test_tick_times_out_side_to_move() {
    let mut session = duel(Some(Duration::from_secs(1)));
    assert!(session.clocks_running());

    let reason = session.tick(Duration::from_secs(2));
    assert_eq!(reason, Some(RoundEndReason::Timeout { loser: Symbol::X }));
    assert_eq!(session.phase(), SessionPhase::RoundOver);
    assert_eq!(session.engine().outcome(), Some(Outcome::Won(Symbol::O)));
    assert_eq!(session.remaining(Symbol::X), Some(Duration::ZERO));
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].reason().winner(), Some(Symbol::O));

    // Ticks after the round are ignored.
    assert_eq!(session.tick(Duration::from_secs(5)), None);
}

#[test]
fn test_tick_charges_only_side_to_move() {
    let mut session = duel(Some(Duration::from_secs(10)));
    assert_eq!(session.tick(Duration::from_secs(3)), None);
    session.play("alice", 4, 4, Duration::ZERO).expect("legal");
    assert_eq!(session.tick(Duration::from_secs(2)), None);

    assert_eq!(session.remaining(Symbol::X), Some(Duration::from_secs(7)));
    assert_eq!(session.remaining(Symbol::O), Some(Duration::from_secs(8)));
}

#[test]
fn test_late_move_is_not_applied() {
    let mut session = duel(Some(Duration::from_secs(10)));
    let result = session
        .play("alice", 4, 4, Duration::from_secs(11))
        .expect("timeout is a result");
    assert_eq!(
        result,
        PlayResult::TimedOut {
            round_end: RoundEndReason::Timeout { loser: Symbol::X }
        }
    );
    assert!(session.engine().history().is_empty());
    assert_eq!(
        session.engine().board().state().sub_boards[4][4],
        Cell::Empty
    );
}

#[test]
fn test_move_after_round_over_is_rejected() {
    let mut session = duel(None);
    session.surrender(Symbol::X).expect("surrender");
    let err = session
        .play("bob", 4, 4, Duration::ZERO)
        .expect_err("round is over");
    assert_eq!(err, SessionError::Rule(RuleError::GameOver));
    assert_eq!(err.disposition(), Disposition::Reject);
}

#[test]
fn test_surrender_keeps_existing_result() {
    let mut session = duel(Some(Duration::from_secs(1)));
    session.tick(Duration::from_secs(1));
    assert_eq!(
        session.end_reason(),
        Some(RoundEndReason::Timeout { loser: Symbol::X })
    );

    let reason = session.surrender(Symbol::O).expect("surrender");
    assert_eq!(reason, RoundEndReason::Timeout { loser: Symbol::X });
    assert_eq!(session.engine().outcome(), Some(Outcome::Won(Symbol::O)));
    assert_eq!(session.history().len(), 1);
}

#[test]
fn test_mutual_votes_reset_the_round() {
    let mut session = duel(Some(Duration::from_secs(30)));
    session.play("alice", 4, 4, Duration::from_secs(4)).expect("legal");
    session.surrender(Symbol::O).expect("surrender");

    assert_eq!(session.request_replay(Symbol::X), Ok(None));
    assert_eq!(session.phase(), SessionPhase::AwaitingReplayVotes);
    assert_eq!(session.votes().get(Symbol::X), Some(true));
    assert_eq!(session.votes().get(Symbol::O), None);

    let reset = session.vote_replay(Symbol::O, true).expect("vote");
    assert_eq!(reset, Some(RoundReset { round: 2 }));
    assert_eq!(session.phase(), SessionPhase::InProgress);
    assert_eq!(session.round(), 2);
    assert_eq!(session.end_reason(), None);
    assert_eq!(session.to_move(), Some(Symbol::X));
    assert_eq!(session.remaining(Symbol::X), Some(Duration::from_secs(30)));

    let state = session.engine().board().state();
    assert_eq!(state.active_sub_index, None);
    assert_eq!(state.outcome, None);
    assert!(
        state
            .sub_boards
            .iter()
            .flatten()
            .all(|&cell| cell == Cell::Empty)
    );
    assert_eq!(session.history().len(), 1);
}

#[test]
fn test_no_vote_stays_round_over() {
    let mut session = duel(None);
    session.surrender(Symbol::X).expect("surrender");
    session.request_replay(Symbol::O).expect("request");

    assert_eq!(session.vote_replay(Symbol::X, false), Ok(None));
    assert_eq!(session.phase(), SessionPhase::RoundOver);
    assert_eq!(session.round(), 1);
    assert_eq!(session.votes().get(Symbol::O), None);
}

#[test]
fn test_votes_need_finished_round() {
    let mut session = duel(None);
    assert_eq!(
        session.request_replay(Symbol::X),
        Err(SessionError::NotRoundOver)
    );
    assert_eq!(
        session.vote_replay(Symbol::O, true),
        Err(SessionError::NotRoundOver)
    );
}

#[test]
fn test_computer_votes_yes_automatically() {
    let bot = Participant::new(
        "bot".to_string(),
        "Bot".to_string(),
        PlayerKind::Computer(Strategy::Random),
    );
    let mut session = MatchSession::start_round("room".to_string(), human("alice"), bot, None);
    session.surrender(Symbol::X).expect("surrender");

    let reset = session.request_replay(Symbol::X).expect("request");
    assert_eq!(reset, Some(RoundReset { round: 2 }));
    assert_eq!(session.phase(), SessionPhase::InProgress);
}

#[test]
fn test_computer_side_plays_itself() {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    let bot = Participant::new(
        "bot".to_string(),
        "Bot".to_string(),
        PlayerKind::Computer(Strategy::Heuristic),
    );
    let mut session = MatchSession::start_round("room".to_string(), bot, human("bob"), None);
    assert_eq!(session.pending_computer(), Some((Symbol::X, Strategy::Heuristic)));

    let mut rng = StdRng::seed_from_u64(3);
    let result = session.play_auto(&mut rng).expect("computer move");
    let PlayResult::Applied { outcome, round_end } = result else {
        panic!("expected an applied move, got {:?}", result);
    };
    assert_eq!(outcome.applied().symbol, Symbol::X);
    assert_eq!(round_end, None);
    assert_eq!(session.pending_computer(), None);
    assert_eq!(
        session.play_auto(&mut rng),
        Err(SessionError::NotComputerTurn)
    );
}

#[test]
fn test_restored_round_counts_every_move() {
    let mut session = duel(None);
    session.play("alice", 4, 4, Duration::ZERO).expect("legal");
    session.play("bob", 4, 0, Duration::ZERO).expect("legal");

    let mut restored = MatchSession::from_snapshot(&session.snapshot()).expect("restore");
    restored.play("alice", 0, 4, Duration::ZERO).expect("legal");
    restored.surrender(Symbol::O).expect("surrender");

    let record = &restored.history()[0];
    assert_eq!(*record.moves(), 3);
    assert_eq!(*record.reason(), RoundEndReason::Surrender { loser: Symbol::O });
}
