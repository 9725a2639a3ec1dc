use serde::{Deserialize, Serialize};

pub const BOARD_SIZE: i32 = 8;

/// The four diagonal directions as (row delta, col delta).
pub const DIAGONALS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// A board coordinate. Row 0 is the top edge as seen by the Light player.
///
/// Coordinates are signed so that positions decoded from the wire (or
/// stepped off the edge while scanning a diagonal) can be represented and
/// rejected with `in_bounds` instead of wrapping.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    pub row: i32,
    pub col: i32,
}

impl Square {
    pub const fn new(row: i32, col: i32) -> Self {
        Square { row, col }
    }

    pub fn in_bounds(self) -> bool {
        (0..BOARD_SIZE).contains(&self.row) && (0..BOARD_SIZE).contains(&self.col)
    }

    /// Playable squares have an odd coordinate sum.
    pub fn is_dark(self) -> bool {
        (self.row + self.col).rem_euclid(2) == 1
    }

    pub fn offset(self, dr: i32, dc: i32) -> Square {
        Square::new(self.row + dr, self.col + dc)
    }

    /// Unit step from `self` towards `to`, if the two lie on a common diagonal.
    pub fn direction_to(self, to: Square) -> Option<(i32, i32)> {
        let dr = to.row - self.row;
        let dc = to.col - self.col;
        if dr == 0 || dr.abs() != dc.abs() {
            return None;
        }
        Some((dr.signum(), dc.signum()))
    }

    /// Squares strictly between `self` and `to` along their diagonal.
    /// Empty when the two are adjacent or not diagonal.
    pub fn between(self, to: Square) -> Vec<Square> {
        let Some((dr, dc)) = self.direction_to(to) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut sq = self.offset(dr, dc);
        while sq != to {
            out.push(sq);
            sq = sq.offset(dr, dc);
        }
        out
    }

    /// All playable squares, row-major.
    pub fn all_dark() -> impl Iterator<Item = Square> {
        (0..BOARD_SIZE)
            .flat_map(|row| (0..BOARD_SIZE).map(move |col| Square::new(row, col)))
            .filter(|sq| sq.is_dark())
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
