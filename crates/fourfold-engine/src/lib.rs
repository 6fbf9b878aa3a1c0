//! Connect Four rules engine.
//!
//! This crate owns everything that happens on the grid:
//!
//! - [`Board`] - Cell storage, gravity drops and terminal detection
//! - [`BoardSize`] - Validated board dimensions (default 6×7)
//! - [`Game`] - A board plus the side to move, for alternating play
//! - [`GameStatus`] - `InProgress`, `Won(player)` or `Tie`
//!
//! The engine knows nothing about agents or tournaments. Consumers drive it through
//! [`Board::apply_move`] and [`Board::check_terminal`] (or the [`Game`] wrapper, which
//! does both and refuses moves after the game has ended).
//!
//! # Example
//!
//! ```
//! use fourfold_engine::{Game, GameStatus, Player};
//!
//! let mut game = Game::default();
//! for column in [0, 1, 0, 1, 0, 1] {
//!     assert_eq!(game.play(column).unwrap(), GameStatus::InProgress);
//! }
//! assert_eq!(game.play(0).unwrap(), GameStatus::Won(Player::A));
//! assert!(game.play(2).is_err());
//! ```

pub use self::{board::*, game::*};

mod board;
mod game;

/// Errors raised when a piece cannot be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum MoveError {
    #[display("column {column} is outside the board (0..{columns})")]
    InvalidColumn { column: usize, columns: usize },
    #[display("column {column} is full")]
    ColumnFull { column: usize },
    #[display("the game is already over")]
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display(
    "unsupported board size {rows}x{columns} (rows and columns must be within {}..={})",
    BoardSize::MIN_EXTENT,
    BoardSize::MAX_EXTENT
)]
pub struct InvalidBoardSize {
    pub rows: usize,
    pub columns: usize,
}
