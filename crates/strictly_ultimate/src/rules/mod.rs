//! Line and fill rules shared by sub-boards, the macro board and the engines.
//!
//! Rules are pure functions over nine cells. They are kept apart from board
//! storage so the search code can run them on scratch copies.

pub mod draw;
pub mod win;

pub use draw::{is_full, open_positions};
pub use win::{LINES, check_winner, count_threats, find_winning_line, completes_line};
