use crate::board::Board;
use crate::captures::{captures_for, forced_captures, CaptureCandidate};
use crate::error::RuleViolation;
use crate::game::Match;
use crate::moves::Move;

/// Check `mv` against the current position without touching it.
///
/// On success returns the capture the move performs, if any, so the caller
/// can remove the jumped piece and test for continuation without scanning
/// the board again. The checks run in a fixed order and the first failure
/// wins, so clients always see the same reason for the same mistake.
pub fn validate(game: &Match, mv: &Move) -> Result<Option<CaptureCandidate>, RuleViolation> {
    let board = game.board();

    if !Board::in_bounds(mv.from) || !Board::in_bounds(mv.to) {
        return Err(RuleViolation::OutOfBounds);
    }

    let piece = board.piece_at(mv.from).ok_or(RuleViolation::NoPiece)?;
    if piece.color != game.to_move() {
        return Err(RuleViolation::WrongOwner);
    }
    if let Some(pinned) = game.continuation() {
        if mv.from != pinned {
            return Err(RuleViolation::MustContinueCapture);
        }
    }

    if !board.is_empty(mv.to) {
        return Err(RuleViolation::DestinationOccupied);
    }

    let dr = mv.to.row - mv.from.row;
    let dc = mv.to.col - mv.from.col;
    if dr.abs() != dc.abs() {
        return Err(RuleViolation::NotDiagonal);
    }

    let captures = match game.continuation() {
        Some(pinned) => captures_for(board, pinned),
        None => forced_captures(board, game.to_move()),
    };

    if !captures.is_empty() {
        if let Some(hit) = captures.iter().find(|c| c.from == mv.from && c.to == mv.to) {
            return Ok(Some(*hit));
        }
        // A jump over an enemy piece that is not on the list is a botched
        // capture; anything else is a quiet move while a capture is due.
        let jumps_enemy = mv
            .from
            .between(mv.to)
            .into_iter()
            .any(|sq| board.piece_at(sq).is_some_and(|p| p.color != piece.color));
        return Err(if jumps_enemy || game.continuation().is_some() {
            RuleViolation::InvalidCapture
        } else {
            RuleViolation::MustCapture
        });
    }

    let legal_quiet = if piece.is_king {
        board.path_clear(mv.from, mv.to)
    } else {
        dr == piece.color.forward() && dr.abs() == 1
    };
    if legal_quiet {
        Ok(None)
    } else {
        Err(RuleViolation::IllegalMove)
    }
}
