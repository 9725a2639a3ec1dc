use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Color {
    Light,
    Dark,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::Light => Color::Dark,
            Color::Dark => Color::Light,
        }
    }

    /// Row delta of a non-capturing man move. Light starts at the bottom
    /// (rows 5-7) and walks towards row 0.
    pub fn forward(self) -> i32 {
        match self {
            Color::Light => -1,
            Color::Dark => 1,
        }
    }

    /// Row on which a man of this color is crowned.
    pub fn promotion_row(self) -> i32 {
        match self {
            Color::Light => 0,
            Color::Dark => 7,
        }
    }

    /// Rows filled with men in the opening position.
    pub fn home_rows(self) -> std::ops::Range<i32> {
        match self {
            Color::Light => 5..8,
            Color::Dark => 0..3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Light => "Light",
            Color::Dark => "Dark",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Piece {
    pub color: Color,
    pub is_king: bool,
}

impl Piece {
    pub fn man(color: Color) -> Self {
        Piece { color, is_king: false }
    }

    pub fn king(color: Color) -> Self {
        Piece { color, is_king: true }
    }

    /// Crown the piece. Kings stay kings.
    pub fn crowned(self) -> Self {
        Piece { is_king: true, ..self }
    }
}
