//! Rule-based player.
//!
//! Works through a fixed priority list on a 3x3 grid and plays the first
//! rule that yields a cell. Ties within a rule go to the lowest index.

use super::MOVE_ORDER;
use super::eval::{MoveClass, classify};
use crate::rules;
use crate::{Cell, MetaBoard, RuleError, SubBoard, Symbol};
use tracing::trace;

/// Priority rules of the heuristic player, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
pub enum Rule {
    /// Complete an own line.
    Win,
    /// Fill the opponent's winning cell.
    Block,
    /// Create two threats at once.
    Fork,
    /// Occupy the opponent's fork cell.
    BlockFork,
    /// Take the center.
    Center,
    /// Take the corner opposite an opponent corner.
    OppositeCorner,
    /// Take any corner.
    Corner,
    /// Take any side.
    Side,
}

const CORNERS: [usize; 4] = [0, 2, 6, 8];
const SIDES: [usize; 4] = [1, 3, 5, 7];
const OPPOSITE_CORNERS: [(usize, usize); 4] = [(0, 8), (2, 6), (6, 2), (8, 0)];

/// Applies the priority list to a grid. `None` when the grid is full.
pub(super) fn choose(cells: &[Cell; 9], me: Symbol) -> Option<(Rule, usize)> {
    let opponent = me.opponent();
    let empty = |i: usize| cells[i].is_empty();

    if let Some(cell) = (0..9).find(|&i| rules::completes_line(cells, i, me)) {
        return Some((Rule::Win, cell));
    }
    if let Some(cell) = (0..9).find(|&i| rules::completes_line(cells, i, opponent)) {
        return Some((Rule::Block, cell));
    }
    if let Some(cell) = find_fork(cells, me) {
        return Some((Rule::Fork, cell));
    }
    if let Some(cell) = find_fork(cells, opponent) {
        return Some((Rule::BlockFork, cell));
    }
    if empty(4) {
        return Some((Rule::Center, 4));
    }
    if let Some(&(_, cell)) = OPPOSITE_CORNERS
        .iter()
        .find(|&&(corner, opposite)| cells[corner] == Cell::Occupied(opponent) && empty(opposite))
    {
        return Some((Rule::OppositeCorner, cell));
    }
    if let Some(&cell) = CORNERS.iter().find(|&&i| empty(i)) {
        return Some((Rule::Corner, cell));
    }
    SIDES
        .iter()
        .find(|&&i| empty(i))
        .map(|&cell| (Rule::Side, cell))
}

fn find_fork(cells: &[Cell; 9], who: Symbol) -> Option<usize> {
    rules::open_positions(cells).find(|&i| {
        let mut next = *cells;
        next[i] = Cell::Occupied(who);
        rules::count_threats(&next, who) >= 2
    })
}

pub(super) fn decide_single(board: &SubBoard, me: Symbol) -> Result<usize, RuleError> {
    if !board.is_open() {
        return Err(RuleError::NoLegalMoves);
    }
    choose(board.cells(), me)
        .map(|(_, cell)| cell)
        .ok_or(RuleError::NoLegalMoves)
}

/// Picks a sub-board and cell on the nested board.
///
/// Each candidate board proposes its best rule; the strongest rule wins,
/// a game-winning capture beats other captures, then boards are ranked
/// center, corners, sides.
pub(super) fn decide(board: &MetaBoard, me: Symbol) -> Result<(usize, usize), RuleError> {
    if board.global_outcome().is_some() {
        return Err(RuleError::NoLegalMoves);
    }
    let candidates: Vec<usize> = match board.active_sub_index() {
        Some(sub) => vec![sub],
        None => (0..9)
            .filter(|&i| board.sub_board(i).is_some_and(SubBoard::is_open))
            .collect(),
    };

    let best = candidates
        .into_iter()
        .filter_map(|sub| {
            let (rule, cell) = choose(board.sub_board(sub)?.cells(), me)?;
            let wins_game = rule == Rule::Win && classify(board, sub, cell, me) == MoveClass::WinsGame;
            let rank = MOVE_ORDER.iter().position(|&i| i == sub).unwrap_or(MOVE_ORDER.len());
            trace!(sub, cell, %rule, wins_game, "Candidate");
            Some(((rule, !wins_game, rank), (sub, cell)))
        })
        .min_by_key(|(key, _)| *key)
        .map(|(_, choice)| choice);

    best.ok_or(RuleError::NoLegalMoves)
}
