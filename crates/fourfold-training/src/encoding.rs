use fourfold_engine::{Board, Cell, Player};

/// Encodes a board as network input from `perspective`'s point of view.
///
/// Cells are visited row-major from the top row. Each cell maps to `0.0` when
/// empty, `1.0` when it holds a `perspective` piece and `-1.0` when it holds an
/// opponent piece, so the same agent can play either side.
///
/// # Example
///
/// ```
/// use fourfold_engine::{Board, Player};
/// use fourfold_training::encoding::encode;
///
/// let mut board = Board::default();
/// board.apply_move(0, Player::A).unwrap();
///
/// let input = encode(&board, Player::B);
/// assert_eq!(input.len(), 42);
/// assert_eq!(input[35], -1.0);
/// ```
#[must_use]
pub fn encode(board: &Board, perspective: Player) -> Vec<f32> {
    board
        .cells()
        .iter()
        .map(|cell| match cell {
            Cell::Empty => 0.0,
            Cell::Piece(player) if *player == perspective => 1.0,
            Cell::Piece(_) => -1.0,
        })
        .collect()
}
