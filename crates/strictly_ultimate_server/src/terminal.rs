//! Terminal front end and computer self-play.

use crate::session::{
    MatchSession, Participant, PlayResult, PlayerKind, RoundRecord, SessionError, SessionPhase,
};
use derive_more::{Display, Error, From};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::time::Duration;
use strictly_ultimate::{Strategy, Symbol};
use tracing::{debug, info, instrument};

const HUMAN_ID: &str = "you";
const COMPUTER_ID: &str = "computer";

/// Errors from terminal play.
#[derive(Debug, Display, Error, From)]
pub enum TerminalError {
    /// Reading input or writing output failed.
    #[display("Terminal I/O failed: {}", _0)]
    Io(std::io::Error),
    /// The session rejected a request it should have accepted.
    #[display("Session error: {}", _0)]
    Session(SessionError),
}

/// A parsed line of player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    /// Play at `(sub_index, cell_index)`.
    Move(usize, usize),
    /// Concede the round.
    Surrender,
    /// Leave the game.
    Quit,
}

/// Parses `"<sub> <cell>"` (space or comma separated), `s` or `q`.
pub fn parse_command(line: &str) -> Option<PlayerInput> {
    let line = line.trim().to_lowercase();
    match line.as_str() {
        "s" | "surrender" => return Some(PlayerInput::Surrender),
        "q" | "quit" => return Some(PlayerInput::Quit),
        _ => {}
    }
    let mut parts = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty());
    let sub = parts.next()?.parse().ok()?;
    let cell = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(PlayerInput::Move(sub, cell))
}

/// Plays a human at the terminal against a computer.
///
/// Rounds repeat while the human answers yes to a replay. Returns the
/// finished rounds.
#[instrument(skip(input, output, rng))]
pub fn play_terminal<I, O, G>(
    strategy: Strategy,
    human: Symbol,
    mut input: I,
    mut output: O,
    rng: &mut G,
) -> Result<Vec<RoundRecord>, TerminalError>
where
    I: BufRead,
    O: Write,
    G: Rng,
{
    let you = Participant::new(HUMAN_ID.to_string(), "You".to_string(), PlayerKind::Human);
    let computer = Participant::new(
        COMPUTER_ID.to_string(),
        format!("Computer ({})", strategy),
        PlayerKind::Computer(strategy),
    );
    let (x, o) = match human {
        Symbol::X => (you, computer),
        Symbol::O => (computer, you),
    };
    let mut session = MatchSession::start_round("terminal".to_string(), x, o, None);
    writeln!(
        output,
        "You are {}. Enter moves as '<board> <cell>' (0-8), 's' to surrender, 'q' to quit.",
        human
    )?;

    let mut line = String::new();
    loop {
        match session.phase() {
            SessionPhase::InProgress if session.pending_computer().is_some() => {
                if let PlayResult::Applied { outcome, .. } = session.play_auto(rng)? {
                    writeln!(output, "Computer plays {}", outcome.applied())?;
                }
            }
            SessionPhase::InProgress => {
                writeln!(output, "\n{}", session.engine().board().display())?;
                match session.engine().board().active_sub_index() {
                    Some(sub) => writeln!(output, "Play in board {}:", sub)?,
                    None => writeln!(output, "Play in any open board:")?,
                }
                output.flush()?;

                line.clear();
                if input.read_line(&mut line)? == 0 {
                    debug!("Input closed");
                    break;
                }
                match parse_command(&line) {
                    Some(PlayerInput::Move(sub, cell)) => {
                        if let Err(err) = session.play(HUMAN_ID, sub, cell, Duration::ZERO) {
                            writeln!(output, "{}", err)?;
                        }
                    }
                    Some(PlayerInput::Surrender) => {
                        session.surrender(human)?;
                    }
                    Some(PlayerInput::Quit) => break,
                    None => writeln!(output, "Could not read '{}'", line.trim())?,
                }
            }
            _ => {
                writeln!(output, "\n{}", session.engine().board().display())?;
                if let Some(reason) = session.end_reason() {
                    writeln!(output, "Round over: {}", reason)?;
                }
                writeln!(output, "Play again? [y/n]")?;
                output.flush()?;

                line.clear();
                if input.read_line(&mut line)? == 0 {
                    break;
                }
                if line.trim().eq_ignore_ascii_case("y") {
                    session.request_replay(human)?;
                } else {
                    break;
                }
            }
        }
    }

    info!(rounds = session.history().len(), "Terminal game finished");
    Ok(session.history().to_vec())
}

/// Results of a series of rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Rounds won by X.
    pub x_wins: u32,
    /// Rounds won by O.
    pub o_wins: u32,
    /// Drawn rounds.
    pub draws: u32,
}

impl Tally {
    /// Counts the results of `records`.
    pub fn from_records(records: &[RoundRecord]) -> Self {
        records.iter().fold(Self::default(), |mut tally, record| {
            match record.reason().winner() {
                Some(Symbol::X) => tally.x_wins += 1,
                Some(Symbol::O) => tally.o_wins += 1,
                None => tally.draws += 1,
            }
            tally
        })
    }

    /// Rounds counted.
    pub fn total(&self) -> u32 {
        self.x_wins + self.o_wins + self.draws
    }
}

/// Plays `rounds` computer-vs-computer rounds.
#[instrument(skip(rng))]
pub fn self_play<G: Rng>(
    x: Strategy,
    o: Strategy,
    rounds: u32,
    rng: &mut G,
) -> Result<(Tally, Vec<RoundRecord>), SessionError> {
    let mut session = MatchSession::start_round(
        "selfplay".to_string(),
        Participant::new("x".to_string(), x.to_string(), PlayerKind::Computer(x)),
        Participant::new("o".to_string(), o.to_string(), PlayerKind::Computer(o)),
        None,
    );

    for round in 1..=rounds {
        while session.pending_computer().is_some() {
            session.play_auto(rng)?;
        }
        debug!(round, reason = ?session.end_reason(), "Self-play round finished");
        if round < rounds {
            session.request_replay(Symbol::X)?;
        }
    }

    let tally = Tally::from_records(session.history());
    info!(?tally, "Self-play finished");
    Ok((tally, session.history().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("4 0\n"), Some(PlayerInput::Move(4, 0)));
        assert_eq!(parse_command(" 8,2 "), Some(PlayerInput::Move(8, 2)));
        assert_eq!(parse_command("S"), Some(PlayerInput::Surrender));
        assert_eq!(parse_command("quit"), Some(PlayerInput::Quit));
        assert_eq!(parse_command("4"), None);
        assert_eq!(parse_command("1 2 3"), None);
        assert_eq!(parse_command("a b"), None);
    }

    #[test]
    fn test_self_play_counts_every_round() {
        let mut rng = StdRng::seed_from_u64(5);
        let (tally, records) =
            self_play(Strategy::Random, Strategy::Heuristic, 3, &mut rng).expect("self play");
        assert_eq!(tally.total(), 3);
        assert_eq!(records.len(), 3);
        assert_eq!(*records[2].round(), 3);
    }

    #[test]
    fn test_terminal_surrender_then_quit() {
        let input = b"4 4\ns\nn\n".as_slice();
        let mut output = Vec::new();
        let mut rng = StdRng::seed_from_u64(1);
        let records = play_terminal(Strategy::Random, Symbol::X, input, &mut output, &mut rng)
            .expect("terminal game");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result_for(Symbol::X), crate::PlayerResult::Loss);
        let text = String::from_utf8(output).expect("utf8");
        assert!(text.contains("Computer plays"));
        assert!(text.contains("O wins by surrender"));
    }
}
