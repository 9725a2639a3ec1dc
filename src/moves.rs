use serde::{Deserialize, Serialize};

use crate::square::Square;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Move { from, to }
    }

    /// Draughts notation, e.g. "c3-d4" for a quiet move, "c3:e5" for a
    /// capture. Files run a-h left to right, ranks 1-8 from Light's side
    /// (row 7 is rank 1).
    pub fn to_notation(&self, capture: bool) -> String {
        let sep = if capture { ':' } else { '-' };
        format!("{}{sep}{}", square_name(self.from), square_name(self.to))
    }

    /// Parse "c3-d4" or "c3:e5". The separator is optional ("c3d4").
    pub fn from_notation(s: &str) -> Option<Move> {
        let bytes: Vec<u8> = s.bytes().filter(|b| *b != b'-' && *b != b':').collect();
        if bytes.len() != 4 {
            return None;
        }
        let from = parse_square(bytes[0], bytes[1])?;
        let to = parse_square(bytes[2], bytes[3])?;
        Some(Move { from, to })
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_notation(false))
    }
}

fn square_name(sq: Square) -> String {
    if !sq.in_bounds() {
        return format!("{sq}");
    }
    let file = (b'a' + sq.col as u8) as char;
    let rank = (b'1' + (7 - sq.row) as u8) as char;
    format!("{file}{rank}")
}

fn parse_square(file: u8, rank: u8) -> Option<Square> {
    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return None;
    }
    Some(Square::new(7 - (rank - b'1') as i32, (file - b'a') as i32))
}
