//! Pure tic-tac-toe rules over a 9-cell board.
//!
//! Nothing in this module holds state: [`apply`] returns a new board
//! rather than mutating its input, and [`evaluate`] is a pure read.
//! Both are safe to call concurrently without coordination — turn
//! tracking and game-over bookkeeping live with the room that embeds
//! the board.

use crate::protocol::{Board, Cell, Mark};
use thiserror::Error;

/// The 8 canonical winning lines: 3 rows, 3 columns, 2 diagonals,
/// checked in this (row-major-first) order.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Why a move was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejected {
    /// The cell index is outside the 9 valid positions.
    #[error("cell index {0} out of range")]
    OutOfRange(usize),

    /// The target cell already holds a mark.
    #[error("cell {0} is already occupied")]
    Occupied(usize),

    /// It is the other mark's turn.
    #[error("not {0}'s turn")]
    NotYourTurn(Mark),
}

/// Verdict of [`evaluate`] over a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Empty cells remain and no line is complete.
    InProgress,
    /// `mark` holds all three cells of `line`.
    Win { mark: Mark, line: [usize; 3] },
    /// All 9 cells are filled with no complete line.
    Draw,
}

fn cell(board: &Board, index: usize) -> Cell {
    board.get(index).copied().flatten()
}

/// Apply `mark` to `index`, returning the resulting board.
///
/// `to_move` is the mark whose turn it currently is (tracked by the
/// caller, not the engine). The input board is never mutated.
///
/// # Errors
///
/// Returns [`MoveRejected`] if the index is out of range, the cell is
/// occupied, or it is not `mark`'s turn.
pub fn apply(
    board: &Board,
    index: usize,
    mark: Mark,
    to_move: Mark,
) -> Result<Board, MoveRejected> {
    let Some(target) = board.get(index) else {
        return Err(MoveRejected::OutOfRange(index));
    };
    if target.is_some() {
        return Err(MoveRejected::Occupied(index));
    }
    if mark != to_move {
        return Err(MoveRejected::NotYourTurn(mark));
    }

    let mut next = *board;
    if let Some(slot) = next.get_mut(index) {
        *slot = Some(mark);
    }
    Ok(next)
}

/// Evaluate a board: first complete line in [`LINES`] order wins,
/// a full board with no line is a draw, anything else is in progress.
pub fn evaluate(board: &Board) -> Outcome {
    for line in LINES {
        let [a, b, c] = line;
        if let Some(mark) = cell(board, a) {
            if cell(board, b) == Some(mark) && cell(board, c) == Some(mark) {
                return Outcome::Win { mark, line };
            }
        }
    }

    if board.iter().all(Cell::is_some) {
        Outcome::Draw
    } else {
        Outcome::InProgress
    }
}

/// Number of non-empty cells, i.e. moves played since the last reset.
pub fn move_count(board: &Board) -> usize {
    board.iter().filter(|c| c.is_some()).count()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    const EMPTY: Board = [None; 9];

    fn board(cells: &[(usize, Mark)]) -> Board {
        let mut b = EMPTY;
        for &(i, m) in cells {
            b[i] = Some(m);
        }
        b
    }

    #[test]
    fn apply_places_mark_without_mutating_input() {
        let before = EMPTY;
        let after = apply(&before, 4, Mark::X, Mark::X).unwrap();
        assert_eq!(after[4], Some(Mark::X));
        assert_eq!(before, EMPTY);
    }

    #[test]
    fn apply_rejects_out_of_range_index() {
        let err = apply(&EMPTY, 9, Mark::X, Mark::X).unwrap_err();
        assert_eq!(err, MoveRejected::OutOfRange(9));
    }

    #[test]
    fn apply_rejects_occupied_cell() {
        let b = board(&[(4, Mark::X)]);
        let err = apply(&b, 4, Mark::O, Mark::O).unwrap_err();
        assert_eq!(err, MoveRejected::Occupied(4));
        // The rejection must leave the cell's owner intact.
        assert_eq!(b[4], Some(Mark::X));
    }

    #[test]
    fn apply_rejects_out_of_turn_mark() {
        let err = apply(&EMPTY, 0, Mark::O, Mark::X).unwrap_err();
        assert_eq!(err, MoveRejected::NotYourTurn(Mark::O));
    }

    #[test]
    fn evaluate_empty_board_is_in_progress() {
        assert_eq!(evaluate(&EMPTY), Outcome::InProgress);
    }

    #[test]
    fn evaluate_detects_each_line() {
        for line in LINES {
            let cells: Vec<(usize, Mark)> = line.iter().map(|&i| (i, Mark::O)).collect();
            let b = board(&cells);
            assert_eq!(
                evaluate(&b),
                Outcome::Win {
                    mark: Mark::O,
                    line
                }
            );
        }
    }

    #[test]
    fn evaluate_reports_first_line_in_scan_order() {
        // X holds both the top row and the left column; the row comes
        // first in scan order.
        let b = board(&[
            (0, Mark::X),
            (1, Mark::X),
            (2, Mark::X),
            (3, Mark::X),
            (6, Mark::X),
        ]);
        assert_eq!(
            evaluate(&b),
            Outcome::Win {
                mark: Mark::X,
                line: [0, 1, 2]
            }
        );
    }

    #[test]
    fn evaluate_full_board_without_line_is_draw() {
        // X O X / X O O / O X X
        let b = board(&[
            (0, Mark::X),
            (1, Mark::O),
            (2, Mark::X),
            (3, Mark::X),
            (4, Mark::O),
            (5, Mark::O),
            (6, Mark::O),
            (7, Mark::X),
            (8, Mark::X),
        ]);
        assert_eq!(evaluate(&b), Outcome::Draw);
    }

    #[test]
    fn move_count_tracks_filled_cells() {
        assert_eq!(move_count(&EMPTY), 0);
        let b = board(&[(0, Mark::X), (8, Mark::O)]);
        assert_eq!(move_count(&b), 2);
    }

    /// Exhaustively play every legal game (alternating turns, stopping
    /// at the first win or a full board) and check that no reachable
    /// position ever holds complete lines for both players at once.
    #[test]
    fn no_legal_game_reaches_a_board_with_two_winners() {
        use std::collections::HashSet;

        fn lines_for(board: &Board, mark: Mark) -> usize {
            LINES
                .iter()
                .filter(|line| line.iter().all(|&i| board[i] == Some(mark)))
                .count()
        }

        fn walk(board: Board, to_move: Mark, seen: &mut HashSet<Board>) {
            if !seen.insert(board) {
                return;
            }

            assert!(
                lines_for(&board, Mark::X) == 0 || lines_for(&board, Mark::O) == 0,
                "both players hold a line on a reachable board: {board:?}"
            );

            if !matches!(evaluate(&board), Outcome::InProgress) {
                return;
            }
            for index in 0..9 {
                if let Ok(next) = apply(&board, index, to_move, to_move) {
                    walk(next, to_move.opponent(), seen);
                }
            }
        }

        let mut seen = HashSet::new();
        walk(EMPTY, Mark::X, &mut seen);
        // Sanity: the traversal actually covered the reachable space.
        assert!(seen.len() > 5_000, "only visited {} positions", seen.len());
    }
}
