//! Wire schema. One JSON object per WebSocket text frame, discriminated by
//! `type`, field names in camelCase.

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, RuleViolation, SessionError};
use crate::game::{EndCause, GameOver, Match, MoveReport, Outcome, Phase};
use crate::piece::Color;
use crate::square::Square;

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Join {
        display_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    Move {
        from_row: i32,
        from_col: i32,
        to_row: i32,
        to_col: i32,
    },
    DrawOffer,
    DrawResponse {
        accept: bool,
    },
    Resign,
    NewGameRequest,
    NewGameResponse {
        accept: bool,
    },
    Chat {
        message: String,
    },
    Ping,
}

impl ClientMessage {
    /// Parse one text frame. A `join` that names a protocol version other
    /// than ours is refused here, before it reaches any session.
    pub fn decode(text: &str) -> Result<ClientMessage, ProtocolError> {
        let msg: ClientMessage = serde_json::from_str(text)?;
        if let ClientMessage::Join { version: Some(v), .. } = msg {
            if v != PROTOCOL_VERSION {
                return Err(ProtocolError::UnsupportedVersion(v));
            }
        }
        Ok(msg)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PieceView {
    pub row: i32,
    pub col: i32,
    pub color: Color,
    pub is_king: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub display_name: String,
    pub color: Color,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub display_name: String,
    pub message: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    ColorAssigned {
        color: Color,
        plays_from_bottom: bool,
        protocol_version: u32,
    },
    PlayersInfo {
        players: Vec<PlayerInfo>,
    },
    GameStarted,
    #[serde(rename_all = "camelCase")]
    BoardState {
        pieces: Vec<PieceView>,
        to_move: Color,
        phase: Phase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        continuation: Option<Square>,
    },
    MoveRejected {
        reason: RuleViolation,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    MoveApplied {
        from: Square,
        to: Square,
        by: Color,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        captured_at: Option<Square>,
        promoted: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        continuation: Option<Square>,
        to_move: Color,
    },
    DrawOffered {
        by: Color,
    },
    DrawDeclined {
        by: Color,
    },
    NewGameRequested {
        by: Color,
    },
    NewGameDeclined {
        by: Color,
    },
    GameOver {
        outcome: Outcome,
        cause: EndCause,
    },
    OpponentLeft {
        color: Color,
    },
    ChatMessage(ChatEntry),
    ChatHistory {
        messages: Vec<ChatEntry>,
    },
    Error {
        reason: String,
        message: String,
    },
    Pong,
}

impl ServerMessage {
    pub fn board_state(game: &Match) -> Self {
        let snap = game.snapshot();
        ServerMessage::BoardState {
            pieces: snap
                .board
                .pieces()
                .map(|(sq, p)| PieceView { row: sq.row, col: sq.col, color: p.color, is_king: p.is_king })
                .collect(),
            to_move: snap.to_move,
            phase: snap.phase,
            continuation: snap.continuation,
        }
    }

    pub fn move_applied(report: &MoveReport) -> Self {
        ServerMessage::MoveApplied {
            from: report.mv.from,
            to: report.mv.to,
            by: report.by,
            captured_at: report.captured_at,
            promoted: report.promoted,
            continuation: report.continuation,
            to_move: report.to_move,
        }
    }

    pub fn game_over(over: GameOver) -> Self {
        ServerMessage::GameOver { outcome: over.outcome, cause: over.cause }
    }

    pub fn rejected(reason: RuleViolation) -> Self {
        ServerMessage::MoveRejected { reason, message: reason.to_string() }
    }

    /// A rule violation on something other than a move (offers, resign).
    pub fn rule_error(reason: RuleViolation) -> Self {
        ServerMessage::Error { reason: format!("{reason:?}"), message: reason.to_string() }
    }

    pub fn session_error(err: SessionError) -> Self {
        ServerMessage::Error { reason: format!("{err:?}"), message: err.to_string() }
    }

    pub fn protocol_error(err: &ProtocolError) -> Self {
        ServerMessage::Error { reason: err.reason().to_string(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn move_intent_uses_camel_case_fields() {
        let msg = ClientMessage::decode(r#"{"type":"move","fromRow":5,"fromCol":0,"toRow":4,"toCol":1}"#).unwrap();
        assert_eq!(msg, ClientMessage::Move { from_row: 5, from_col: 0, to_row: 4, to_col: 1 });
    }

    #[test]
    fn unit_intents_decode() {
        assert_eq!(ClientMessage::decode(r#"{"type":"drawOffer"}"#).unwrap(), ClientMessage::DrawOffer);
        assert_eq!(ClientMessage::decode(r#"{"type":"resign"}"#).unwrap(), ClientMessage::Resign);
        assert_eq!(
            ClientMessage::decode(r#"{"type":"newGameResponse","accept":false}"#).unwrap(),
            ClientMessage::NewGameResponse { accept: false }
        );
    }

    #[test]
    fn chat_frames_flatten_the_entry() {
        assert_eq!(
            ClientMessage::decode(r#"{"type":"chat","message":"gg"}"#).unwrap(),
            ClientMessage::Chat { message: "gg".into() }
        );
        let out = ServerMessage::ChatMessage(ChatEntry { display_name: "ann".into(), message: "gg".into() });
        assert_eq!(
            serde_json::to_value(out).unwrap(),
            json!({"type": "chatMessage", "displayName": "ann", "message": "gg"})
        );
    }

    #[test]
    fn join_room_and_version_are_optional() {
        let msg = ClientMessage::decode(r#"{"type":"join","displayName":"ann"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Join { display_name: "ann".into(), room: None, version: None });
    }

    #[test]
    fn foreign_protocol_version_is_refused() {
        let err = ClientMessage::decode(r#"{"type":"join","displayName":"ann","version":2}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedVersion(2)));
        assert_eq!(err.reason(), "UnsupportedVersion");
    }

    #[test]
    fn malformed_frames_are_protocol_errors() {
        assert!(matches!(ClientMessage::decode("{"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(ClientMessage::decode(r#"{"type":"castle"}"#), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn board_state_snapshot_shape() {
        let mut game = Match::new();
        game.start();
        let value = serde_json::to_value(ServerMessage::board_state(&game)).unwrap();
        assert_eq!(value["type"], "boardState");
        assert_eq!(value["toMove"], "light");
        assert_eq!(value["phase"], "playing");
        assert_eq!(value["pieces"].as_array().unwrap().len(), 24);
        assert_eq!(value["pieces"][0], json!({"row": 0, "col": 1, "color": "dark", "isKing": false}));
        assert!(value.get("continuation").is_none());
    }

    #[test]
    fn rejection_carries_reason_and_message() {
        let value = serde_json::to_value(ServerMessage::rejected(RuleViolation::MustCapture)).unwrap();
        assert_eq!(value, json!({"type": "moveRejected", "reason": "MustCapture", "message": "a capture is available and must be taken"}));
    }

    #[test]
    fn game_over_names_winner_or_draw() {
        let win = ServerMessage::GameOver { outcome: Outcome::Winner(Color::Dark), cause: EndCause::Resignation };
        assert_eq!(
            serde_json::to_value(win).unwrap(),
            json!({"type": "gameOver", "outcome": {"winner": "dark"}, "cause": "resignation"})
        );
        let draw = ServerMessage::GameOver { outcome: Outcome::Draw, cause: EndCause::Agreement };
        assert_eq!(serde_json::to_value(draw).unwrap()["outcome"], "draw");
    }
}
