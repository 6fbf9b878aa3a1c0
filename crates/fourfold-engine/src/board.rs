use std::fmt;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::{InvalidBoardSize, MoveError};

/// One of the two sides in a game.
///
/// Player A always moves first. It is rendered as `x`, player B as `o`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::IsVariant)]
pub enum Player {
    A,
    B,
}

impl Player {
    /// Returns the other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Player::A => Player::B,
            Player::B => Player::A,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Player::A => 'x',
            Player::B => 'o',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::A => f.write_str("player 1"),
            Player::B => f.write_str("player 2"),
        }
    }
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Piece(Player),
}

impl Cell {
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    #[must_use]
    pub fn player(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::Piece(player) => Some(player),
        }
    }
}

/// Result of [`Board::check_terminal`].
///
/// `Won` and `Tie` are absorbing: once reached, no further moves are legal in a
/// [`Game`](crate::Game).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
pub enum GameStatus {
    InProgress,
    Won(Player),
    Tie,
}

impl GameStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !self.is_in_progress()
    }

    #[must_use]
    pub fn winner(self) -> Option<Player> {
        match self {
            GameStatus::Won(player) => Some(player),
            GameStatus::InProgress | GameStatus::Tie => None,
        }
    }
}

/// Board dimensions.
///
/// Both extents are bounded so that per-column bookkeeping fits in fixed-capacity
/// buffers ([`BoardSize::MAX_EXTENT`]) and a four-in-a-row always fits
/// ([`BoardSize::MIN_EXTENT`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBoardSize", into = "RawBoardSize")]
pub struct BoardSize {
    rows: usize,
    columns: usize,
}

#[derive(Serialize, Deserialize)]
struct RawBoardSize {
    rows: usize,
    columns: usize,
}

impl TryFrom<RawBoardSize> for BoardSize {
    type Error = InvalidBoardSize;

    fn try_from(raw: RawBoardSize) -> Result<Self, Self::Error> {
        BoardSize::new(raw.rows, raw.columns)
    }
}

impl From<BoardSize> for RawBoardSize {
    fn from(size: BoardSize) -> Self {
        RawBoardSize {
            rows: size.rows,
            columns: size.columns,
        }
    }
}

impl Default for BoardSize {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl BoardSize {
    pub const MIN_EXTENT: usize = RUN_LENGTH;
    pub const MAX_EXTENT: usize = MAX_COLUMNS;

    /// The classic 6 rows × 7 columns board.
    pub const STANDARD: Self = Self {
        rows: 6,
        columns: 7,
    };

    pub fn new(rows: usize, columns: usize) -> Result<Self, InvalidBoardSize> {
        let extent = Self::MIN_EXTENT..=Self::MAX_EXTENT;
        if !extent.contains(&rows) || !extent.contains(&columns) {
            return Err(InvalidBoardSize { rows, columns });
        }
        Ok(Self { rows, columns })
    }

    #[must_use]
    pub const fn rows(self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn columns(self) -> usize {
        self.columns
    }

    /// Number of cells (`rows × columns`).
    #[must_use]
    pub const fn cell_count(self) -> usize {
        self.rows * self.columns
    }
}

/// Upper bound on the number of columns (and rows) a board may have.
pub const MAX_COLUMNS: usize = 16;

/// Number of identical pieces in a line needed to win.
pub const RUN_LENGTH: usize = 4;

/// Directions scanned from each run start: rightward, downward, down-right and
/// down-left. Row 0 is the top row, so "down" means increasing row index.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// A Connect Four grid.
///
/// Cells are stored row-major with row 0 at the top. Pieces only enter the board
/// through [`Board::apply_move`], which keeps every column a contiguous stack
/// growing up from the bottom row.
///
/// # Example
///
/// ```
/// use fourfold_engine::{Board, Cell, GameStatus, Player};
///
/// let mut board = Board::default();
/// let row = board.apply_move(3, Player::A).unwrap();
/// assert_eq!(row, board.rows() - 1);
/// assert_eq!(board.cell(row, 3), Cell::Piece(Player::A));
/// assert_eq!(board.check_terminal(), GameStatus::InProgress);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: BoardSize,
    cells: Vec<Cell>,
    heights: ArrayVec<usize, MAX_COLUMNS>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BoardSize::STANDARD)
    }
}

impl Board {
    /// Creates an empty board.
    #[must_use]
    pub fn new(size: BoardSize) -> Self {
        Self {
            size,
            cells: vec![Cell::Empty; size.cell_count()],
            heights: (0..size.columns()).map(|_| 0).collect(),
        }
    }

    #[must_use]
    pub fn size(&self) -> BoardSize {
        self.size
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.size.rows()
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.size.columns()
    }

    /// Returns the cell at `(row, column)`, row 0 being the top row.
    ///
    /// # Panics
    ///
    /// Panics if the position is outside the board.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Cell {
        assert!(row < self.rows() && column < self.columns());
        self.cells[row * self.columns() + column]
    }

    /// Returns all cells in row-major order, top row first.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Returns an iterator over the rows, top row first.
    pub fn row_cells(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks_exact(self.columns())
    }

    /// Returns whether `column` can take no more pieces.
    ///
    /// Columns outside the board are reported as full.
    #[must_use]
    pub fn is_column_full(&self, column: usize) -> bool {
        self.heights
            .get(column)
            .is_none_or(|&height| height >= self.rows())
    }

    /// Returns the columns that can still take a piece, in ascending order.
    #[must_use]
    pub fn legal_columns(&self) -> ArrayVec<usize, MAX_COLUMNS> {
        (0..self.columns())
            .filter(|&column| !self.is_column_full(column))
            .collect()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.heights.iter().all(|&height| height >= self.rows())
    }

    /// Number of pieces on the board.
    #[must_use]
    pub fn move_count(&self) -> usize {
        self.heights.iter().sum()
    }

    /// Drops a piece for `player` into `column`.
    ///
    /// The piece lands in the lowest empty row of the column; that row index is
    /// returned. On error the board is left untouched.
    pub fn apply_move(&mut self, column: usize, player: Player) -> Result<usize, MoveError> {
        if column >= self.columns() {
            return Err(MoveError::InvalidColumn {
                column,
                columns: self.columns(),
            });
        }
        if self.is_column_full(column) {
            return Err(MoveError::ColumnFull { column });
        }
        let row = self.rows() - 1 - self.heights[column];
        let columns = self.columns();
        self.cells[row * columns + column] = Cell::Piece(player);
        self.heights[column] += 1;
        Ok(row)
    }

    /// Computes the status of the position.
    ///
    /// Every occupied cell is treated as a potential run start and checked in the
    /// four [`DIRECTIONS`], skipping directions that would leave the board within
    /// the next three cells. A win takes precedence over a full board.
    #[must_use]
    pub fn check_terminal(&self) -> GameStatus {
        for row in 0..self.rows() {
            for column in 0..self.columns() {
                let Cell::Piece(player) = self.cell(row, column) else {
                    continue;
                };
                let found = DIRECTIONS
                    .iter()
                    .any(|&direction| self.has_run_from(row, column, direction, player));
                if found {
                    return GameStatus::Won(player);
                }
            }
        }
        if self.is_full() {
            GameStatus::Tie
        } else {
            GameStatus::InProgress
        }
    }

    fn has_run_from(
        &self,
        row: usize,
        column: usize,
        (d_row, d_column): (isize, isize),
        player: Player,
    ) -> bool {
        (0..RUN_LENGTH).all(|step| {
            let step = step.cast_signed();
            let r = row.checked_add_signed(d_row * step);
            let c = column.checked_add_signed(d_column * step);
            match (r, c) {
                (Some(r), Some(c)) if r < self.rows() && c < self.columns() => {
                    self.cell(r, c) == Cell::Piece(player)
                }
                _ => false,
            }
        })
    }

    /// Clears every cell so the board can host a new game.
    pub fn reset(&mut self) {
        self.cells.fill(Cell::Empty);
        self.heights.fill(0);
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for column in 0..self.columns() {
            if column > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:>2}", column + 1)?;
        }
        writeln!(f)?;
        for row in self.row_cells() {
            for (column, cell) in row.iter().enumerate() {
                if column > 0 {
                    f.write_str(" ")?;
                }
                let symbol = cell.player().map_or('.', Player::symbol);
                write!(f, "{symbol:>2}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_from_rows(rows: &[&str]) -> Board {
        // Rows are given top first; pieces are dropped bottom-up so gravity holds.
        let columns = rows[0].len();
        let mut board = Board::new(BoardSize::new(rows.len(), columns).unwrap());
        for line in rows.iter().rev() {
            for (column, symbol) in line.chars().enumerate() {
                let player = match symbol {
                    'x' => Player::A,
                    'o' => Player::B,
                    _ => continue,
                };
                board.apply_move(column, player).unwrap();
            }
        }
        board
    }

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::default();
        assert_eq!(board.rows(), 6);
        assert_eq!(board.columns(), 7);
        assert!(board.cells().iter().all(|c| c.is_empty()));
        assert_eq!(board.check_terminal(), GameStatus::InProgress);
        assert_eq!(board.legal_columns().as_slice(), &[0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_gravity_fills_column_bottom_up() {
        let mut board = Board::default();
        let players = [Player::A, Player::B, Player::A, Player::B, Player::A, Player::B];
        for (i, player) in players.iter().enumerate() {
            let row = board.apply_move(2, *player).unwrap();
            assert_eq!(row, board.rows() - 1 - i);
        }
        for (i, player) in players.iter().enumerate() {
            assert_eq!(board.cell(board.rows() - 1 - i, 2), Cell::Piece(*player));
        }
        assert!(board.is_column_full(2));
    }

    #[test]
    fn test_full_column_is_rejected_without_side_effects() {
        let mut board = Board::default();
        for _ in 0..board.rows() {
            board.apply_move(0, Player::A).unwrap();
        }
        let before = board.clone();
        assert_eq!(
            board.apply_move(0, Player::B),
            Err(MoveError::ColumnFull { column: 0 })
        );
        assert_eq!(board, before);
        assert!(!board.legal_columns().contains(&0));
    }

    #[test]
    fn test_invalid_column_is_rejected() {
        let mut board = Board::default();
        assert_eq!(
            board.apply_move(7, Player::A),
            Err(MoveError::InvalidColumn {
                column: 7,
                columns: 7
            })
        );
        assert_eq!(board.move_count(), 0);
    }

    #[test]
    fn test_horizontal_win() {
        let board = board_from_rows(&[
            ".......", //
            ".......",
            ".......",
            ".......",
            ".ooo...",
            ".xxxx..",
        ]);
        assert_eq!(board.check_terminal(), GameStatus::Won(Player::A));
    }

    #[test]
    fn test_vertical_win() {
        let board = board_from_rows(&[
            ".......", //
            ".......",
            "......o",
            "......o",
            "x.....o",
            "xx....o",
        ]);
        assert_eq!(board.check_terminal(), GameStatus::Won(Player::B));
    }

    #[test]
    fn test_down_right_diagonal_win() {
        let board = board_from_rows(&[
            ".......", //
            ".......",
            "x......",
            "ox.....",
            "oox....",
            "ooxx...",
        ]);
        assert_eq!(board.check_terminal(), GameStatus::Won(Player::A));
    }

    #[test]
    fn test_down_left_diagonal_win() {
        let board = board_from_rows(&[
            ".......", //
            ".......",
            "......o",
            ".....ox",
            "....oxx",
            "...oxxo",
        ]);
        assert_eq!(board.check_terminal(), GameStatus::Won(Player::B));
    }

    #[test]
    fn test_run_detected_at_board_edges() {
        let board = board_from_rows(&[
            "...xxxx", //
            "...ooox",
            "...xxxo",
            "...ooox",
            "...xxxo",
            "...ooox",
        ]);
        assert_eq!(board.check_terminal(), GameStatus::Won(Player::A));
    }

    #[test]
    fn test_three_in_a_row_is_not_a_win() {
        let board = board_from_rows(&[
            ".......", //
            ".......",
            ".......",
            ".......",
            ".......",
            "xxx.ooo",
        ]);
        assert_eq!(board.check_terminal(), GameStatus::InProgress);
    }

    #[test]
    fn test_full_board_without_run_is_tie() {
        let board = board_from_rows(&[
            "xxoxxox", //
            "ooxooxo",
            "xxoxxox",
            "ooxooxo",
            "xxoxxox",
            "ooxooxo",
        ]);
        assert!(board.is_full());
        assert_eq!(board.check_terminal(), GameStatus::Tie);
    }

    #[test]
    fn test_win_on_full_board_takes_precedence() {
        let board = board_from_rows(&[
            "xxxxoox", //
            "ooxooxo",
            "xxoxxox",
            "ooxooxo",
            "xxoxxox",
            "ooxooxo",
        ]);
        assert_eq!(board.check_terminal(), GameStatus::Won(Player::A));
    }

    #[test]
    fn test_every_window_is_detected() {
        let size = BoardSize::STANDARD;
        for &(d_row, d_column) in &DIRECTIONS {
            for row in 0..size.rows() {
                for column in 0..size.columns() {
                    let cells: Option<Vec<(usize, usize)>> = (0..RUN_LENGTH)
                        .map(|step| {
                            let step = step.cast_signed();
                            let r = row.checked_add_signed(d_row * step)?;
                            let c = column.checked_add_signed(d_column * step)?;
                            (r < size.rows() && c < size.columns()).then_some((r, c))
                        })
                        .collect();
                    let Some(cells) = cells else { continue };
                    let mut board = Board::new(size);
                    for (r, c) in cells {
                        let columns = board.columns();
                        board.cells[r * columns + c] = Cell::Piece(Player::B);
                    }
                    assert_eq!(
                        board.check_terminal(),
                        GameStatus::Won(Player::B),
                        "run from ({row}, {column}) in direction ({d_row}, {d_column})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_reset_clears_board() {
        let mut board = Board::default();
        board.apply_move(0, Player::A).unwrap();
        board.apply_move(0, Player::B).unwrap();
        board.reset();
        assert_eq!(board, Board::default());
    }

    #[test]
    fn test_board_size_bounds() {
        assert!(BoardSize::new(3, 7).is_err());
        assert!(BoardSize::new(6, 17).is_err());
        let size = BoardSize::new(4, 16).unwrap();
        assert_eq!(size.cell_count(), 64);
    }

    #[test]
    fn test_board_size_deserialization_is_validated() {
        let size: BoardSize = serde_json::from_str(r#"{"rows":5,"columns":8}"#).unwrap();
        assert_eq!((size.rows(), size.columns()), (5, 8));
        assert!(serde_json::from_str::<BoardSize>(r#"{"rows":2,"columns":8}"#).is_err());
    }

    #[test]
    fn test_display() {
        let mut board = Board::new(BoardSize::new(4, 4).unwrap());
        board.apply_move(1, Player::A).unwrap();
        board.apply_move(1, Player::B).unwrap();
        let expected = " 1  2  3  4\n\
                        \x20.  .  .  .\n\
                        \x20.  .  .  .\n\
                        \x20.  o  .  .\n\
                        \x20.  x  .  .\n";
        assert_eq!(board.to_string(), expected);
    }
}
