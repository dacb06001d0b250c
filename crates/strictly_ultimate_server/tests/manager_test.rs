//! Match registry behavior under a paused tokio clock.

use std::time::Duration;
use strictly_ultimate::{RuleError, Strategy, Symbol};
use strictly_ultimate_server::{
    ManagerError, MatchEvent, MatchManager, Participant, PlayerKind, RoundEndReason, ServerConfig,
    SessionError, SessionPhase,
};
use tokio::sync::broadcast;

fn human(id: &str) -> Participant {
    Participant::new(id.to_string(), id.to_uppercase(), PlayerKind::Human)
}

fn computer(id: &str, strategy: Strategy) -> Participant {
    Participant::new(id.to_string(), id.to_uppercase(), PlayerKind::Computer(strategy))
}

fn clocked_manager(budget_secs: u64) -> MatchManager {
    let config = ServerConfig::default()
        .with_time_budget_secs(budget_secs)
        .with_tick_interval_ms(1000)
        .with_ai_seed(Some(7));
    MatchManager::new(&config)
}

/// Receives events until a round ends or the channel closes.
async fn next_round_end(events: &mut broadcast::Receiver<MatchEvent>) -> Option<MatchEvent> {
    loop {
        match events.recv().await {
            Ok(event @ MatchEvent::RoundEnded { .. }) => return Some(event),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_idle_side_loses_on_time() {
    let manager = clocked_manager(2);
    manager
        .create_match(Some("room".to_string()))
        .await
        .expect("create");
    let mut events = manager.subscribe("room").await.expect("subscribe");

    manager.join("room", human("alice")).await.expect("join");
    manager.join("room", human("bob")).await.expect("join");

    let ended = tokio::time::timeout(Duration::from_secs(10), next_round_end(&mut events))
        .await
        .expect("round should end on time");
    assert_eq!(
        ended,
        Some(MatchEvent::RoundEnded {
            round: 1,
            reason: RoundEndReason::Timeout { loser: Symbol::X },
            outcome: strictly_ultimate::Outcome::Won(Symbol::O),
        })
    );

    let view = manager.view("room").await.expect("view");
    assert_eq!(view.phase, SessionPhase::RoundOver);
    assert_eq!(view.remaining_x_ms, Some(0));
    assert_eq!(view.remaining_o_ms, Some(2000));
}

#[tokio::test(start_paused = true)]
async fn test_move_charges_time_since_last_debit() {
    let manager = clocked_manager(2);
    manager.join("room", human("alice")).await.expect("join");
    manager.join("room", human("bob")).await.expect("join");

    tokio::time::advance(Duration::from_millis(500)).await;
    manager.play("room", "alice", 4, 4).await.expect("legal");

    let view = manager.view("room").await.expect("view");
    assert_eq!(view.remaining_x_ms, Some(1500));
    assert_eq!(view.remaining_o_ms, Some(2000));
    assert_eq!(view.to_move, Some(Symbol::O));
}

#[tokio::test(start_paused = true)]
async fn test_replay_restarts_clocks() {
    let manager = clocked_manager(2);
    manager.join("room", human("alice")).await.expect("join");
    manager.join("room", human("bob")).await.expect("join");
    manager.surrender("room", "alice").await.expect("surrender");

    assert_eq!(manager.request_replay("room", "alice").await, Ok(None));
    let reset = manager.vote("room", "bob", true).await.expect("vote");
    assert_eq!(reset.map(|r| r.round), Some(2));

    let mut events = manager.subscribe("room").await.expect("subscribe");
    let ended = tokio::time::timeout(Duration::from_secs(10), next_round_end(&mut events))
        .await
        .expect("second round should time out");
    assert!(matches!(
        ended,
        Some(MatchEvent::RoundEnded {
            round: 2,
            reason: RoundEndReason::Timeout { loser: Symbol::X },
            ..
        })
    ));
}

#[tokio::test]
async fn test_computer_answers_human_move() {
    let manager = MatchManager::new(&ServerConfig::default().with_ai_seed(Some(1)));
    manager.join("room", human("alice")).await.expect("join");
    manager
        .join("room", computer("bot", Strategy::Heuristic))
        .await
        .expect("join");

    let view = manager.view("room").await.expect("view");
    assert_eq!(view.to_move, Some(Symbol::X));
    assert_eq!(view.remaining_x_ms, None);

    manager.play("room", "alice", 4, 4).await.expect("legal");
    let view = manager.view("room").await.expect("view");
    assert_eq!(view.to_move, Some(Symbol::X));
    let reply = view.last_move.expect("computer replied");
    assert_eq!(reply.symbol, Symbol::O);
    assert_eq!(reply.sub_index, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_surrender_during_computer_search() {
    let manager = MatchManager::new(&ServerConfig::default().with_ai_seed(Some(4)));
    manager.join("room", human("alice")).await.expect("join");
    manager
        .join("room", computer("bot", Strategy::Minimax { depth: 7 }))
        .await
        .expect("join");

    let mover = manager.clone();
    let play = tokio::spawn(async move { mover.play("room", "alice", 4, 4).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    let reason = manager.surrender("room", "alice").await.expect("surrender");
    assert_eq!(reason, RoundEndReason::Surrender { loser: Symbol::X });

    // The human move landed, whether or not the reply beat the surrender.
    let result = play.await.expect("task").expect("move was applied");
    assert_eq!(result.round_end(), None);

    let view = manager.view("room").await.expect("view");
    assert_eq!(view.phase, SessionPhase::RoundOver);
    assert_eq!(view.end_reason, Some(reason));
    assert_eq!(view.state.sub_boards[4][4], strictly_ultimate::Cell::Occupied(Symbol::X));
}

#[tokio::test]
async fn test_computer_x_moves_when_round_starts() {
    let manager = MatchManager::new(&ServerConfig::default().with_ai_seed(Some(2)));
    manager
        .join("room", computer("bot", Strategy::Random))
        .await
        .expect("join");
    manager.join("room", human("bob")).await.expect("join");

    let view = manager.view("room").await.expect("view");
    assert_eq!(view.to_move, Some(Symbol::O));
    assert_eq!(view.last_move.map(|mv| mv.symbol), Some(Symbol::X));
}

#[tokio::test]
async fn test_stale_move_leaves_match_unchanged() {
    let manager = MatchManager::new(&ServerConfig::default());
    manager.join("room", human("alice")).await.expect("join");
    manager.join("room", human("bob")).await.expect("join");

    let err = manager
        .play("room", "bob", 4, 4)
        .await
        .expect_err("X moves first");
    assert!(matches!(
        err,
        ManagerError::Session(SessionError::Rule(RuleError::WrongTurn { .. }))
    ));
    let view = manager.view("room").await.expect("view");
    assert_eq!(view.last_move, None);
    assert_eq!(view.to_move, Some(Symbol::X));
}

#[tokio::test(start_paused = true)]
async fn test_removed_match_stops_its_clock() {
    let manager = clocked_manager(2);
    manager
        .create_match(Some("room".to_string()))
        .await
        .expect("create");
    let mut events = manager.subscribe("room").await.expect("subscribe");
    manager.join("room", human("alice")).await.expect("join");
    manager.join("room", human("bob")).await.expect("join");

    manager.remove_match("room").await.expect("remove");
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(next_round_end(&mut events).await, None);
    assert!(matches!(
        manager.view("room").await,
        Err(ManagerError::MatchNotFound { .. })
    ));
}

#[tokio::test]
async fn test_unknown_match() {
    let manager = MatchManager::new(&ServerConfig::default());
    assert_eq!(
        manager.play("nowhere", "alice", 0, 0).await,
        Err(ManagerError::MatchNotFound {
            id: "nowhere".to_string()
        })
    );
    assert!(manager.list_matches().await.is_empty());
}
