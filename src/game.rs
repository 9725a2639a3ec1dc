// =============================================================================
// Match state machine
//
// Waiting -> Playing -> Finished. Within Playing, `continuation` pins the side
// to move to one piece for the rest of a capture chain. All mutation goes
// through the methods below; every one of them either succeeds completely or
// returns a RuleViolation with the match untouched.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::captures::{captures_for, has_legal_move, legal_moves};
use crate::error::RuleViolation;
use crate::moves::Move;
use crate::piece::Color;
use crate::square::Square;
use crate::validate::validate;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Waiting,
    Playing,
    Finished,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Winner(Color),
    Draw,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EndCause {
    /// The loser has no pieces left.
    NoPieces,
    /// The loser is to move and has no legal move.
    NoMoves,
    Resignation,
    Disconnect,
    Agreement,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct GameOver {
    pub outcome: Outcome,
    pub cause: EndCause,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OfferKind {
    Draw,
    NewGame,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct PendingOffer {
    pub kind: OfferKind,
    pub by: Color,
}

/// Everything a client needs to animate one applied move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveReport {
    pub mv: Move,
    pub by: Color,
    pub captured_at: Option<Square>,
    pub promoted: bool,
    pub continuation: Option<Square>,
    pub to_move: Color,
    pub game_over: Option<GameOver>,
}

/// Result of a new-game request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NewGameRequest {
    /// Waiting for the opponent's answer.
    Pending,
    /// The board was reset (peer absent, or both sides asked).
    Reset,
}

/// Read-only copy of a match, as broadcast to both players.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub board: Board,
    pub to_move: Color,
    pub phase: Phase,
    pub continuation: Option<Square>,
    pub result: Option<GameOver>,
    pub pending_offer: Option<PendingOffer>,
}

#[derive(Clone, Debug)]
pub struct Match {
    board: Board,
    to_move: Color,
    phase: Phase,
    continuation: Option<Square>,
    result: Option<GameOver>,
    pending_offer: Option<PendingOffer>,
}

impl Default for Match {
    fn default() -> Self {
        Self::new()
    }
}

impl Match {
    /// A match in the opening position waiting for its second player.
    pub fn new() -> Self {
        Match {
            board: Board::new(),
            to_move: Color::Light,
            phase: Phase::Waiting,
            continuation: None,
            result: None,
            pending_offer: None,
        }
    }

    /// A match already in play from an arbitrary position.
    pub fn with_board(board: Board, to_move: Color) -> Self {
        Match {
            board,
            to_move,
            phase: Phase::Playing,
            continuation: None,
            result: None,
            pending_offer: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn to_move(&self) -> Color {
        self.to_move
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn continuation(&self) -> Option<Square> {
        self.continuation
    }

    pub fn result(&self) -> Option<GameOver> {
        self.result
    }

    pub fn winner(&self) -> Option<Outcome> {
        self.result.map(|r| r.outcome)
    }

    pub fn pending_offer(&self) -> Option<PendingOffer> {
        self.pending_offer
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: self.board.clone(),
            to_move: self.to_move,
            phase: self.phase,
            continuation: self.continuation,
            result: self.result,
            pending_offer: self.pending_offer,
        }
    }

    /// Legal moves for the side to move, honouring forced capture and any
    /// capture chain in progress. Empty unless the match is being played.
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.phase != Phase::Playing {
            return Vec::new();
        }
        legal_moves(&self.board, self.to_move, self.continuation)
    }

    /// Waiting -> Playing. No-op in any other phase.
    pub fn start(&mut self) {
        if self.phase == Phase::Waiting {
            self.phase = Phase::Playing;
        }
    }

    /// Back to the opening position, Light to move, Playing.
    pub fn reset(&mut self) {
        *self = Match::with_board(Board::new(), Color::Light);
    }

    pub fn apply_move(&mut self, by: Color, mv: Move) -> Result<MoveReport, RuleViolation> {
        if self.phase != Phase::Playing {
            return Err(RuleViolation::GameNotInProgress);
        }
        if by != self.to_move {
            return Err(RuleViolation::NotYourTurn);
        }
        let capture = validate(self, &mv)?;

        // Validation passed; from here on nothing may fail.
        let piece = self.board.relocate(mv.from, mv.to);
        if let Some(hit) = capture {
            self.board.remove(hit.captured_at);
        }
        let promoted = mv.to.row == piece.color.promotion_row() && self.board.crown(mv.to);

        if matches!(self.pending_offer, Some(PendingOffer { kind: OfferKind::Draw, .. })) {
            self.pending_offer = None;
        }

        self.continuation = None;
        if capture.is_some() && !captures_for(&self.board, mv.to).is_empty() {
            self.continuation = Some(mv.to);
        } else {
            self.to_move = self.to_move.opposite();
        }

        let game_over = self.check_game_over();
        Ok(MoveReport {
            mv,
            by,
            captured_at: capture.map(|c| c.captured_at),
            promoted,
            continuation: self.continuation,
            to_move: self.to_move,
            game_over,
        })
    }

    /// Decide whether the side to move has lost. Finishes the match and
    /// returns the result if so; returns the existing result once finished.
    pub fn check_game_over(&mut self) -> Option<GameOver> {
        match self.phase {
            Phase::Waiting => return None,
            Phase::Finished => return self.result,
            Phase::Playing => {}
        }

        let side = self.to_move;
        if self.board.count(side) == 0 {
            return Some(self.finish(Outcome::Winner(side.opposite()), EndCause::NoPieces));
        }
        if self.board.count(side.opposite()) == 0 {
            return Some(self.finish(Outcome::Winner(side), EndCause::NoPieces));
        }
        if self.continuation.is_none() && !has_legal_move(&self.board, side) {
            return Some(self.finish(Outcome::Winner(side.opposite()), EndCause::NoMoves));
        }
        None
    }

    /// Offer a draw. If the opponent already offered one, this accepts it.
    pub fn offer_draw(&mut self, by: Color) -> Result<Option<GameOver>, RuleViolation> {
        if self.phase != Phase::Playing {
            return Err(RuleViolation::GameNotInProgress);
        }
        match self.pending_offer {
            None => {
                self.pending_offer = Some(PendingOffer { kind: OfferKind::Draw, by });
                Ok(None)
            }
            Some(PendingOffer { kind: OfferKind::Draw, by: offerer }) if offerer != by => {
                Ok(Some(self.finish(Outcome::Draw, EndCause::Agreement)))
            }
            Some(_) => Err(RuleViolation::OfferPending),
        }
    }

    /// Answer the opponent's draw offer. Returns the result when accepted.
    pub fn respond_draw(&mut self, by: Color, accept: bool) -> Result<Option<GameOver>, RuleViolation> {
        self.take_offer(OfferKind::Draw, by)?;
        if !accept || self.phase != Phase::Playing {
            return Ok(None);
        }
        Ok(Some(self.finish(Outcome::Draw, EndCause::Agreement)))
    }

    pub fn resign(&mut self, by: Color) -> Result<GameOver, RuleViolation> {
        if self.phase != Phase::Playing {
            return Err(RuleViolation::GameNotInProgress);
        }
        Ok(self.finish(Outcome::Winner(by.opposite()), EndCause::Resignation))
    }

    /// The player of color `leaver` disconnected. A game in progress is
    /// awarded to the other side; otherwise only pending offers are dropped.
    pub fn forfeit(&mut self, leaver: Color) -> Option<GameOver> {
        self.pending_offer = None;
        if self.phase != Phase::Playing {
            return None;
        }
        Some(self.finish(Outcome::Winner(leaver.opposite()), EndCause::Disconnect))
    }

    /// Ask for a fresh game. Resets at once when the peer is gone or has
    /// already asked for the same thing.
    pub fn request_new_game(&mut self, by: Color, peer_present: bool) -> Result<NewGameRequest, RuleViolation> {
        if self.phase == Phase::Waiting {
            return Err(RuleViolation::GameNotInProgress);
        }
        if !peer_present {
            self.reset();
            return Ok(NewGameRequest::Reset);
        }
        match self.pending_offer {
            Some(PendingOffer { kind: OfferKind::NewGame, by: requester }) if requester != by => {
                self.reset();
                Ok(NewGameRequest::Reset)
            }
            Some(_) => Err(RuleViolation::OfferPending),
            None => {
                self.pending_offer = Some(PendingOffer { kind: OfferKind::NewGame, by });
                Ok(NewGameRequest::Pending)
            }
        }
    }

    /// Answer the opponent's new-game request. Returns true if the board was reset.
    pub fn respond_new_game(&mut self, by: Color, accept: bool) -> Result<bool, RuleViolation> {
        self.take_offer(OfferKind::NewGame, by)?;
        if accept {
            self.reset();
        }
        Ok(accept)
    }

    fn take_offer(&mut self, kind: OfferKind, responder: Color) -> Result<PendingOffer, RuleViolation> {
        match self.pending_offer {
            Some(offer) if offer.kind == kind => {
                if offer.by == responder {
                    return Err(RuleViolation::OwnOffer);
                }
                self.pending_offer = None;
                Ok(offer)
            }
            _ => Err(RuleViolation::NoPendingOffer),
        }
    }

    fn finish(&mut self, outcome: Outcome, cause: EndCause) -> GameOver {
        let result = GameOver { outcome, cause };
        self.phase = Phase::Finished;
        self.result = Some(result);
        self.continuation = None;
        if matches!(self.pending_offer, Some(PendingOffer { kind: OfferKind::Draw, .. })) {
            self.pending_offer = None;
        }
        result
    }
}
