//! Error taxonomy.
//!
//! Rule violations and session errors are ordinary results sent back to the
//! connection that caused them; nothing here is fatal. Board invariant faults
//! are not represented: they panic inside [`crate::board::Board`].

use serde::{Deserialize, Serialize};

use crate::square::Square;

/// A rejected intent. The match is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RuleViolation {
    #[error("square is off the board")]
    OutOfBounds,
    #[error("there is no piece on the starting square")]
    NoPiece,
    #[error("that piece belongs to your opponent")]
    WrongOwner,
    #[error("the destination square is occupied")]
    DestinationOccupied,
    #[error("moves must be diagonal")]
    NotDiagonal,
    #[error("a capture is available and must be taken")]
    MustCapture,
    #[error("that is not a valid capture")]
    InvalidCapture,
    #[error("illegal move")]
    IllegalMove,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("continue capturing with the same piece")]
    MustContinueCapture,
    #[error("no game is in progress")]
    GameNotInProgress,
    #[error("there is no pending offer to answer")]
    NoPendingOffer,
    #[error("you cannot answer your own offer")]
    OwnOffer,
    #[error("another offer is already pending")]
    OfferPending,
}

/// Failures binding a connection to a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum SessionError {
    #[error("this match already has two players")]
    MatchFull,
    #[error("waiting for an opponent to join")]
    NoOpponent,
    #[error("send a join message first")]
    NotJoined,
    #[error("this connection has already joined")]
    AlreadyJoined,
    #[error("the match has shut down")]
    SessionClosed,
}

/// A board diagram that does not describe a legal position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardParseError {
    #[error("expected 8 rows, found {0}")]
    RowCount(usize),
    #[error("row {row}: expected 8 cells, found {found}")]
    CellCount { row: usize, found: usize },
    #[error("row {row}: unknown cell {cell:?}")]
    UnknownCell { row: usize, cell: char },
    #[error("piece on light square {0}")]
    LightSquare(Square),
}

/// Frames the server could not make sense of.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u32),
    #[error("binary frames are not supported")]
    BinaryFrame,
}

impl ProtocolError {
    /// Stable machine-readable code for the `error` message.
    pub fn reason(&self) -> &'static str {
        match self {
            ProtocolError::Malformed(_) => "Malformed",
            ProtocolError::UnsupportedVersion(_) => "UnsupportedVersion",
            ProtocolError::BinaryFrame => "BinaryFrame",
        }
    }
}
