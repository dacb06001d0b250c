//! Uniformly random play.

use crate::{MetaBoard, RuleError, SubBoard};
use rand::Rng;

pub(super) fn decide<R: Rng>(board: &MetaBoard, rng: &mut R) -> Result<(usize, usize), RuleError> {
    let moves: Vec<(usize, usize)> = board.legal_moves().collect();
    if moves.is_empty() {
        return Err(RuleError::NoLegalMoves);
    }
    Ok(moves[rng.random_range(0..moves.len())])
}

pub(super) fn decide_single<R: Rng>(board: &SubBoard, rng: &mut R) -> Result<usize, RuleError> {
    let cells: Vec<usize> = board.open_cells().collect();
    if cells.is_empty() {
        return Err(RuleError::NoLegalMoves);
    }
    Ok(cells[rng.random_range(0..cells.len())])
}
