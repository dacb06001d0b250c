//! Static evaluation of nested positions.

use crate::rules::{self, LINES};
use crate::{Cell, MetaBoard, Outcome, Symbol};

/// Weight of each position on a 3x3 grid: center, corners, sides.
const POSITION_WEIGHT: [i32; 9] = [3, 2, 3, 2, 4, 2, 3, 2, 3];

/// Value of a captured sub-board before position weighting.
const SUB_BOARD_VALUE: i32 = 100;

/// Value of an open macro line by number of captured sub-boards in it.
const MACRO_LINE_VALUE: [i32; 3] = [0, 60, 400];

/// Value of an open line inside a sub-board by number of own marks.
const LOCAL_LINE_VALUE: [i32; 3] = [0, 1, 8];

/// Bonus for holding the center cell of an open sub-board.
const LOCAL_CENTER_VALUE: i32 = 3;

/// How much a move changes the macro picture, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MoveClass {
    /// Captures a sub-board and completes a macro line.
    WinsGame,
    /// Captures a sub-board and leaves two open macro threats.
    MacroFork,
    /// Captures a sub-board.
    CapturesBoard,
    /// Anything else.
    Quiet,
}

/// Classifies `side` playing at `(sub_index, cell_index)`.
///
/// The move is assumed legal.
pub fn classify(board: &MetaBoard, sub_index: usize, cell_index: usize, side: Symbol) -> MoveClass {
    let Some(sub) = board.sub_board(sub_index) else {
        return MoveClass::Quiet;
    };
    if !rules::completes_line(sub.cells(), cell_index, side) {
        return MoveClass::Quiet;
    }

    let mut macro_board = *board.macro_board();
    macro_board[sub_index] = Some(Outcome::Won(side));
    let macro_cells = macro_board.map(|outcome| match outcome {
        Some(Outcome::Won(symbol)) => Cell::Occupied(symbol),
        _ => Cell::Empty,
    });
    if rules::check_winner(&macro_cells) == Some(side) {
        return MoveClass::WinsGame;
    }

    let threats = LINES
        .iter()
        .filter(|line| macro_line_count(&macro_board, line, side) == Some(2))
        .count();
    if threats >= 2 {
        MoveClass::MacroFork
    } else {
        MoveClass::CapturesBoard
    }
}

/// Scores a position from `me`'s point of view.
///
/// Zero-sum: `evaluate(b, X) == -evaluate(b, O)`. Decided positions are
/// scored by the search itself, not here.
pub fn evaluate(board: &MetaBoard, me: Symbol) -> i32 {
    side_score(board, me) - side_score(board, me.opponent())
}

fn side_score(board: &MetaBoard, side: Symbol) -> i32 {
    let macro_board = board.macro_board();
    let mut score = 0;

    for (index, sub) in board.sub_boards().iter().enumerate() {
        match macro_board[index] {
            Some(Outcome::Won(owner)) if owner == side => {
                score += SUB_BOARD_VALUE * POSITION_WEIGHT[index];
            }
            Some(_) => {}
            None => score += local_score(sub.cells(), side) * POSITION_WEIGHT[index],
        }
    }

    for line in &LINES {
        if let Some(count) = macro_line_count(macro_board, line, side) {
            score += MACRO_LINE_VALUE[count.min(2)];
        }
    }

    score
}

/// Number of sub-boards `side` holds on a macro line that is still winnable
/// for `side`, or `None` when the opponent or a draw blocks it.
fn macro_line_count(macro_board: &[Option<Outcome>; 9], line: &[usize; 3], side: Symbol) -> Option<usize> {
    let mut count = 0;
    for &i in line {
        match macro_board[i] {
            None => {}
            Some(Outcome::Won(owner)) if owner == side => count += 1,
            Some(_) => return None,
        }
    }
    Some(count)
}

fn local_score(cells: &[Cell; 9], side: Symbol) -> i32 {
    let mark = Cell::Occupied(side);
    let mut score = 0;
    for line in &LINES {
        let own = line.iter().filter(|&&i| cells[i] == mark).count();
        let blocked = line
            .iter()
            .any(|&i| !cells[i].is_empty() && cells[i] != mark);
        if !blocked {
            score += LOCAL_LINE_VALUE[own.min(2)];
        }
    }
    if cells[4] == mark {
        score += LOCAL_CENTER_VALUE;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SubBoard;

    #[test]
    fn test_empty_board_is_balanced() {
        let board = MetaBoard::new();
        assert_eq!(evaluate(&board, Symbol::X), 0);
    }

    #[test]
    fn test_evaluation_is_zero_sum() {
        let mut board = MetaBoard::new();
        board.apply_move(4, 4, Symbol::X).expect("legal");
        board.apply_move(4, 0, Symbol::O).expect("legal");
        board.apply_move(0, 4, Symbol::X).expect("legal");
        assert_eq!(evaluate(&board, Symbol::X), -evaluate(&board, Symbol::O));
        assert!(evaluate(&board, Symbol::X) > 0);
    }

    #[test]
    fn test_classify_capture_and_game_win() {
        let mut boards: [SubBoard; 9] = std::array::from_fn(SubBoard::at);
        let two_in_row = {
            let mut cells = [Cell::Empty; 9];
            cells[0] = Cell::Occupied(Symbol::X);
            cells[1] = Cell::Occupied(Symbol::X);
            cells
        };
        let won = [Cell::Occupied(Symbol::X); 9];
        boards[0] = SubBoard::from_cells(0, won);
        boards[1] = SubBoard::from_cells(1, won);
        boards[2] = SubBoard::from_cells(2, two_in_row);
        boards[5] = SubBoard::from_cells(5, two_in_row);
        let board = MetaBoard::from_parts(boards, None);

        assert_eq!(classify(&board, 2, 2, Symbol::X), MoveClass::WinsGame);
        assert_eq!(classify(&board, 5, 2, Symbol::X), MoveClass::CapturesBoard);
        assert_eq!(classify(&board, 5, 2, Symbol::O), MoveClass::Quiet);
        assert_eq!(classify(&board, 5, 8, Symbol::X), MoveClass::Quiet);
    }
}
