use serde::{Deserialize, Serialize};

use crate::error::BoardParseError;
use crate::piece::{Color, Piece};
use crate::square::{Square, BOARD_SIZE};

/// The 8x8 grid. Only dark squares ever hold a piece.
///
/// Queries are pure. The mutators (`place`, `remove`, `relocate`, `crown`)
/// do not know the rules of the game; they are called by the match only
/// after a move has been validated, and they panic on writes that would
/// break the board's own invariants (off-board, light square, double
/// occupancy), since those can only come from an engine bug.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Board {
    squares: [[Option<Piece>; 8]; 8],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create an empty board with no pieces. Useful for setting up test positions.
    pub fn empty() -> Self {
        Board { squares: [[None; 8]; 8] }
    }

    /// Opening position: 12 Dark men on rows 0-2, 12 Light men on rows 5-7.
    pub fn new() -> Self {
        let mut board = Board::empty();
        for color in [Color::Dark, Color::Light] {
            for sq in Square::all_dark().filter(|sq| color.home_rows().contains(&sq.row)) {
                board.place(sq, Piece::man(color));
            }
        }
        board
    }

    /// Parse a diagram of eight rows, top row first. `l`/`d` are Light/Dark
    /// men, `L`/`D` kings, `.` or space an empty square. Whitespace between
    /// cells is ignored.
    pub fn parse(diagram: &str) -> Result<Self, BoardParseError> {
        let rows: Vec<Vec<char>> = diagram
            .lines()
            .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty())
            .collect();
        if rows.len() != BOARD_SIZE as usize {
            return Err(BoardParseError::RowCount(rows.len()));
        }

        let mut board = Board::empty();
        for (r, cells) in rows.iter().enumerate() {
            if cells.len() != BOARD_SIZE as usize {
                return Err(BoardParseError::CellCount { row: r, found: cells.len() });
            }
            for (c, &cell) in cells.iter().enumerate() {
                let piece = match cell {
                    '.' => continue,
                    'l' => Piece::man(Color::Light),
                    'L' => Piece::king(Color::Light),
                    'd' => Piece::man(Color::Dark),
                    'D' => Piece::king(Color::Dark),
                    other => return Err(BoardParseError::UnknownCell { row: r, cell: other }),
                };
                let sq = Square::new(r as i32, c as i32);
                if !sq.is_dark() {
                    return Err(BoardParseError::LightSquare(sq));
                }
                board.place(sq, piece);
            }
        }
        Ok(board)
    }

    pub fn in_bounds(sq: Square) -> bool {
        sq.in_bounds()
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        if !sq.in_bounds() {
            return None;
        }
        self.squares[sq.row as usize][sq.col as usize]
    }

    /// True for an on-board square with nothing on it.
    pub fn is_empty(&self, sq: Square) -> bool {
        sq.in_bounds() && self.piece_at(sq).is_none()
    }

    /// Whether every square strictly between `from` and `to` is empty.
    /// Squares that do not share a diagonal have no clear path.
    pub fn path_clear(&self, from: Square, to: Square) -> bool {
        if from.direction_to(to).is_none() {
            return false;
        }
        from.between(to).into_iter().all(|sq| self.piece_at(sq).is_none())
    }

    pub fn place(&mut self, sq: Square, piece: Piece) {
        assert!(sq.in_bounds(), "place: {sq} is off the board");
        assert!(sq.is_dark(), "place: {sq} is a light square");
        let cell = &mut self.squares[sq.row as usize][sq.col as usize];
        assert!(cell.is_none(), "place: {sq} is already occupied");
        *cell = Some(piece);
    }

    pub fn remove(&mut self, sq: Square) -> Piece {
        assert!(sq.in_bounds(), "remove: {sq} is off the board");
        match self.squares[sq.row as usize][sq.col as usize].take() {
            Some(piece) => piece,
            None => panic!("remove: {sq} is empty"),
        }
    }

    /// Move whatever stands on `from` to `to`.
    pub fn relocate(&mut self, from: Square, to: Square) -> Piece {
        let piece = self.remove(from);
        self.place(to, piece);
        piece
    }

    /// Crown the piece on `sq`. Returns true if it was a man.
    pub fn crown(&mut self, sq: Square) -> bool {
        assert!(sq.in_bounds(), "crown: {sq} is off the board");
        match &mut self.squares[sq.row as usize][sq.col as usize] {
            Some(piece) if !piece.is_king => {
                *piece = piece.crowned();
                true
            }
            Some(_) => false,
            None => panic!("crown: {sq} is empty"),
        }
    }

    /// Occupied squares in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all_dark().filter_map(move |sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.pieces().filter(move |(_, p)| p.color == color)
    }

    pub fn count(&self, color: Color) -> usize {
        self.pieces_of(color).count()
    }

    pub fn total(&self) -> usize {
        self.pieces().count()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                let cell = match self.piece_at(Square::new(row, col)) {
                    None => '.',
                    Some(Piece { color: Color::Light, is_king: false }) => 'l',
                    Some(Piece { color: Color::Light, is_king: true }) => 'L',
                    Some(Piece { color: Color::Dark, is_king: false }) => 'd',
                    Some(Piece { color: Color::Dark, is_king: true }) => 'D',
                };
                write!(f, "{cell}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_position_has_twelve_men_each() {
        let board = Board::new();
        assert_eq!(board.count(Color::Light), 12);
        assert_eq!(board.count(Color::Dark), 12);
        assert!(board.pieces().all(|(sq, p)| sq.is_dark() && !p.is_king));
        assert_eq!(board.piece_at(Square::new(5, 0)), Some(Piece::man(Color::Light)));
        assert_eq!(board.piece_at(Square::new(0, 1)), Some(Piece::man(Color::Dark)));
        assert!(board.is_empty(Square::new(4, 1)));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let board = Board::new();
        assert_eq!(Board::parse(&board.to_string()).unwrap(), board);
    }

    #[test]
    fn path_clear_ignores_endpoints() {
        let board = Board::parse(
            "
            . . . . . . . .
            . . . . . . . .
            . L . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . d . . .
            . . . . . . . .
            . . . . . . . .
            ",
        )
        .unwrap();
        assert!(board.path_clear(Square::new(2, 1), Square::new(4, 3)));
        assert!(board.path_clear(Square::new(2, 1), Square::new(5, 4)));
        assert!(!board.path_clear(Square::new(2, 1), Square::new(6, 5)));
        assert!(!board.path_clear(Square::new(2, 1), Square::new(2, 3)));
    }

    #[test]
    fn parse_reports_what_is_wrong() {
        assert_eq!(Board::parse(". . . ."), Err(BoardParseError::RowCount(1)));
        let light_square = "l . . . . . . .\n".to_string() + &". . . . . . . .\n".repeat(7);
        assert_eq!(Board::parse(&light_square), Err(BoardParseError::LightSquare(Square::new(0, 0))));
        let bad_cell = ". x . . . . . .\n".to_string() + &". . . . . . . .\n".repeat(7);
        assert_eq!(Board::parse(&bad_cell), Err(BoardParseError::UnknownCell { row: 0, cell: 'x' }));
        let short = ". . .\n".to_string() + &". . . . . . . .\n".repeat(7);
        assert_eq!(Board::parse(&short), Err(BoardParseError::CellCount { row: 0, found: 3 }));
    }

    #[test]
    fn off_board_queries_are_empty_handed() {
        let board = Board::new();
        assert_eq!(board.piece_at(Square::new(-1, 2)), None);
        assert!(!board.is_empty(Square::new(8, 1)));
    }

    #[test]
    fn crown_is_idempotent() {
        let mut board = Board::empty();
        let sq = Square::new(0, 1);
        board.place(sq, Piece::man(Color::Light));
        assert!(board.crown(sq));
        assert!(!board.crown(sq));
        assert!(board.piece_at(sq).unwrap().is_king);
    }

    #[test]
    #[should_panic(expected = "already occupied")]
    fn double_occupancy_is_a_fault() {
        let mut board = Board::new();
        board.place(Square::new(0, 1), Piece::man(Color::Light));
    }

    #[test]
    #[should_panic(expected = "light square")]
    fn light_square_write_is_a_fault() {
        let mut board = Board::empty();
        board.place(Square::new(0, 0), Piece::man(Color::Light));
    }
}
