//! Turning network scores into a legal move.
//!
//! The policy is greedy: columns are ranked by score and the best column that
//! still has room is played. Full columns are skipped transparently, so an agent
//! never loses a game to an illegal move.

use arrayvec::ArrayVec;
use fourfold_engine::{Board, MAX_COLUMNS, MoveError, Player};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("no legal move left on the board")]
pub struct NoLegalMove;

/// Ranks columns by score, best first.
///
/// Equal scores keep ascending column order. Only the first [`MAX_COLUMNS`]
/// scores are considered.
///
/// ```
/// use fourfold_training::policy::rank_columns;
///
/// let ranked = rank_columns(&[0.2, 0.9, 0.2, 0.5]);
/// assert_eq!(ranked.as_slice(), &[1, 3, 0, 2]);
/// ```
#[must_use]
pub fn rank_columns(scores: &[f32]) -> ArrayVec<usize, MAX_COLUMNS> {
    let mut ranked = (0..scores.len().min(MAX_COLUMNS)).collect::<ArrayVec<_, MAX_COLUMNS>>();
    ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    ranked
}

/// Plays the best-ranked column that is not full and returns it.
///
/// Fails with [`NoLegalMove`] when every ranked column is full; the board is
/// unchanged in that case.
pub fn select_and_apply(
    board: &mut Board,
    scores: &[f32],
    player: Player,
) -> Result<usize, NoLegalMove> {
    for column in rank_columns(scores) {
        match board.apply_move(column, player) {
            Ok(_) => return Ok(column),
            Err(MoveError::ColumnFull { .. } | MoveError::InvalidColumn { .. }) => {}
            Err(MoveError::GameOver) => break,
        }
    }
    Err(NoLegalMove)
}
