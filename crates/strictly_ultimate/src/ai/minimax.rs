//! Depth-limited minimax in negamax form with alpha-beta pruning.

use super::MOVE_ORDER;
use super::eval::{self, classify};
use crate::rules;
use crate::{Cell, MetaBoard, Outcome, RuleError, SubBoard, Symbol};
use tracing::debug;

/// Score bound; symmetric so negation never overflows.
const INF: i32 = i32::MAX;

/// Score of a won nested game, reduced by the ply it was reached at.
const WIN_REWARD: i32 = 1_000_000;

/// Score of a won 3x3 game, reduced by the ply it was reached at.
const SINGLE_WIN_REWARD: i32 = 100;

fn order_rank(index: usize) -> usize {
    MOVE_ORDER
        .iter()
        .position(|&i| i == index)
        .unwrap_or(MOVE_ORDER.len())
}

// Classic 3x3

pub(super) fn decide_single(board: &SubBoard, me: Symbol, depth: u8) -> Result<usize, RuleError> {
    if !board.is_open() {
        return Err(RuleError::NoLegalMoves);
    }
    let depth = depth.max(1);
    let mut cells = *board.cells();
    let mut best: Option<(usize, i32)> = None;
    let mut alpha = -INF;

    let open: Vec<usize> = MOVE_ORDER.into_iter().filter(|&i| cells[i].is_empty()).collect();
    for cell in open {
        cells[cell] = Cell::Occupied(me);
        let score = -search_single(&mut cells, me.opponent(), depth - 1, 1, -INF, -alpha);
        cells[cell] = Cell::Empty;
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((cell, score));
        }
        alpha = alpha.max(score);
    }

    best.map(|(cell, _)| cell).ok_or(RuleError::NoLegalMoves)
}

fn search_single(cells: &mut [Cell; 9], to_move: Symbol, depth: u8, ply: i32, mut alpha: i32, beta: i32) -> i32 {
    if let Some(winner) = rules::check_winner(cells) {
        let score = SINGLE_WIN_REWARD - ply;
        return if winner == to_move { score } else { -score };
    }
    if rules::is_full(cells) {
        return 0;
    }
    if depth == 0 {
        return rules::count_threats(cells, to_move) as i32
            - rules::count_threats(cells, to_move.opponent()) as i32;
    }

    let mut best = -INF;
    for cell in MOVE_ORDER {
        if !cells[cell].is_empty() {
            continue;
        }
        cells[cell] = Cell::Occupied(to_move);
        let score = -search_single(cells, to_move.opponent(), depth - 1, ply + 1, -beta, -alpha);
        cells[cell] = Cell::Empty;
        best = best.max(score);
        alpha = alpha.max(score);
        if alpha >= beta {
            break;
        }
    }
    best
}

// Nested board

/// Legal moves, captures and center-first cells tried first.
fn ordered_moves(board: &MetaBoard, side: Symbol) -> Vec<(usize, usize)> {
    let mut moves: Vec<(usize, usize)> = board.legal_moves().collect();
    moves.sort_by_key(|&(sub, cell)| (classify(board, sub, cell, side), order_rank(cell), order_rank(sub)));
    moves
}

pub(super) fn decide(board: &MetaBoard, me: Symbol, depth: u8) -> Result<(usize, usize), RuleError> {
    if board.global_outcome().is_some() {
        return Err(RuleError::NoLegalMoves);
    }
    let depth = depth.max(1);
    let mut best: Option<((usize, usize), i32)> = None;
    let mut alpha = -INF;

    for (sub, cell) in ordered_moves(board, me) {
        let mut child = board.clone();
        if child.apply_move(sub, cell, me).is_err() {
            continue;
        }
        let score = -search(&child, me.opponent(), depth - 1, 1, -INF, -alpha);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some(((sub, cell), score));
        }
        alpha = alpha.max(score);
    }

    if let Some(((sub, cell), score)) = best {
        debug!(sub, cell, score, depth, "Search finished");
    }
    best.map(|(choice, _)| choice).ok_or(RuleError::NoLegalMoves)
}

fn search(board: &MetaBoard, to_move: Symbol, depth: u8, ply: i32, mut alpha: i32, beta: i32) -> i32 {
    match board.global_outcome() {
        Some(Outcome::Won(winner)) => {
            let score = WIN_REWARD - ply;
            return if winner == to_move { score } else { -score };
        }
        Some(Outcome::Draw) => return 0,
        None => {}
    }
    if depth == 0 {
        return eval::evaluate(board, to_move);
    }

    let mut best = -INF;
    for (sub, cell) in ordered_moves(board, to_move) {
        let mut child = board.clone();
        if child.apply_move(sub, cell, to_move).is_err() {
            continue;
        }
        let score = -search(&child, to_move.opponent(), depth - 1, ply + 1, -beta, -alpha);
        best = best.max(score);
        alpha = alpha.max(score);
        if alpha >= beta {
            break;
        }
    }
    best
}
