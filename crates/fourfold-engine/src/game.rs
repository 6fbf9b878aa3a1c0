use crate::{Board, BoardSize, GameStatus, MoveError, Player};

/// A single game: a board, the side to move and the cached status.
///
/// Player A moves first. Each successful [`Game::play`] re-evaluates the status;
/// once it is terminal every further move fails with [`MoveError::GameOver`].
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    to_move: Player,
    status: GameStatus,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(BoardSize::STANDARD)
    }
}

impl Game {
    #[must_use]
    pub fn new(size: BoardSize) -> Self {
        Self {
            board: Board::new(size),
            to_move: Player::A,
            status: GameStatus::InProgress,
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn to_move(&self) -> Player {
        self.to_move
    }

    #[must_use]
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Drops a piece for the side to move and hands the turn over.
    ///
    /// Illegal moves leave the game untouched, so the caller may retry with
    /// another column.
    pub fn play(&mut self, column: usize) -> Result<GameStatus, MoveError> {
        if self.status.is_terminal() {
            return Err(MoveError::GameOver);
        }
        self.board.apply_move(column, self.to_move)?;
        self.status = self.board.check_terminal();
        self.to_move = self.to_move.opponent();
        Ok(self.status)
    }

    /// Starts over on an empty board with player A to move.
    pub fn reset(&mut self) {
        self.board.reset();
        self.to_move = Player::A;
        self.status = GameStatus::InProgress;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_players_alternate() {
        let mut game = Game::default();
        assert_eq!(game.to_move(), Player::A);
        game.play(3).unwrap();
        assert_eq!(game.to_move(), Player::B);
        game.play(3).unwrap();
        assert_eq!(game.to_move(), Player::A);
        assert_eq!(game.board().move_count(), 2);
    }

    #[test]
    fn test_illegal_move_keeps_turn() {
        let mut game = Game::default();
        assert!(game.play(9).unwrap_err().is_invalid_column());
        assert_eq!(game.to_move(), Player::A);
        assert_eq!(game.board().move_count(), 0);
    }

    #[test]
    fn test_terminal_status_is_absorbing() {
        let mut game = Game::default();
        for column in [0, 1, 0, 1, 0, 1] {
            game.play(column).unwrap();
        }
        assert_eq!(game.play(0), Ok(GameStatus::Won(Player::A)));
        assert_eq!(game.play(5), Err(MoveError::GameOver));
        assert_eq!(game.status(), GameStatus::Won(Player::A));
        assert_eq!(game.board().move_count(), 7);
    }

    #[test]
    fn test_reset_starts_new_game() {
        let mut game = Game::default();
        for column in [0, 1, 0, 1, 0, 1, 0] {
            game.play(column).unwrap();
        }
        game.reset();
        assert_eq!(game.status(), GameStatus::InProgress);
        assert_eq!(game.to_move(), Player::A);
        assert_eq!(game.play(4), Ok(GameStatus::InProgress));
    }
}
