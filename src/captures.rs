// =============================================================================
// Capture resolution and move generation
//
// The single source of truth for "what may this piece do". Validation,
// capture-chain continuation, stalemate detection and self-play all call into
// here so they can never disagree.
//
// Canonical rules: men capture in all four diagonal directions but only step
// forward when not capturing. Kings fly along open diagonals and, when
// capturing, jump exactly one opponent piece and may land on any empty square
// beyond it up to the next piece or the edge.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::moves::Move;
use crate::piece::Color;
use crate::square::{Square, DIAGONALS};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CaptureCandidate {
    pub from: Square,
    pub to: Square,
    pub captured_at: Square,
}

impl CaptureCandidate {
    pub fn as_move(&self) -> Move {
        Move::new(self.from, self.to)
    }
}

/// Captures available to the piece standing on `from`. Empty if the square
/// holds no piece.
pub fn captures_for(board: &Board, from: Square) -> Vec<CaptureCandidate> {
    let mut out = Vec::new();
    let Some(piece) = board.piece_at(from) else {
        return out;
    };

    for &(dr, dc) in &DIAGONALS {
        if piece.is_king {
            // Slide over empty squares to the first occupied one.
            let mut sq = from.offset(dr, dc);
            while board.is_empty(sq) {
                sq = sq.offset(dr, dc);
            }
            let Some(target) = board.piece_at(sq) else {
                continue; // ran off the edge
            };
            if target.color == piece.color {
                continue;
            }
            let captured_at = sq;
            let mut landing = captured_at.offset(dr, dc);
            while board.is_empty(landing) {
                out.push(CaptureCandidate { from, to: landing, captured_at });
                landing = landing.offset(dr, dc);
            }
        } else {
            let captured_at = from.offset(dr, dc);
            let landing = from.offset(2 * dr, 2 * dc);
            let jumps_opponent = board
                .piece_at(captured_at)
                .map(|p| p.color != piece.color)
                .unwrap_or(false);
            if jumps_opponent && board.is_empty(landing) {
                out.push(CaptureCandidate { from, to: landing, captured_at });
            }
        }
    }
    out
}

/// Every capture available to `color`. Non-empty means quiet moves are
/// illegal for that color this turn.
pub fn forced_captures(board: &Board, color: Color) -> Vec<CaptureCandidate> {
    board
        .pieces_of(color)
        .flat_map(|(sq, _)| captures_for(board, sq))
        .collect()
}

/// Non-capturing moves for the piece on `from`, ignoring the forced-capture
/// rule.
pub fn quiet_moves_for(board: &Board, from: Square) -> Vec<Move> {
    let mut out = Vec::new();
    let Some(piece) = board.piece_at(from) else {
        return out;
    };

    if piece.is_king {
        for &(dr, dc) in &DIAGONALS {
            let mut sq = from.offset(dr, dc);
            while board.is_empty(sq) {
                out.push(Move::new(from, sq));
                sq = sq.offset(dr, dc);
            }
        }
    } else {
        let dr = piece.color.forward();
        for dc in [-1, 1] {
            let to = from.offset(dr, dc);
            if board.is_empty(to) {
                out.push(Move::new(from, to));
            }
        }
    }
    out
}

/// Legal moves for `color` with the forced-capture rule applied. When
/// `pinned` is set (mid capture chain) only that piece's captures count.
pub fn legal_moves(board: &Board, color: Color, pinned: Option<Square>) -> Vec<Move> {
    if let Some(sq) = pinned {
        return captures_for(board, sq).iter().map(CaptureCandidate::as_move).collect();
    }
    let captures = forced_captures(board, color);
    if !captures.is_empty() {
        return captures.iter().map(CaptureCandidate::as_move).collect();
    }
    board
        .pieces_of(color)
        .flat_map(|(sq, _)| quiet_moves_for(board, sq))
        .collect()
}

/// Cheaper than `legal_moves(..).is_empty()`: stops at the first move found.
pub fn has_legal_move(board: &Board, color: Color) -> bool {
    board.pieces_of(color).any(|(sq, _)| {
        !captures_for(board, sq).is_empty() || !quiet_moves_for(board, sq).is_empty()
    })
}
