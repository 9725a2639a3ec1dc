// =============================================================================
// Session actor
//
// One task per match. Both player connections feed a single bounded queue,
// so every intent for a match is handled strictly in arrival order and the
// Match is only ever touched by this task. Outbound messages go to each
// connection's own unbounded outbox; a slow socket never blocks the match.
// =============================================================================

use std::collections::VecDeque;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::game::{GameOver, Match, NewGameRequest, Phase};
use crate::moves::Move;
use crate::piece::Color;
use crate::protocol::{ChatEntry, ClientMessage, PlayerInfo, ServerMessage, PROTOCOL_VERSION};
use crate::square::Square;

pub type ConnectionId = u64;

/// Chat lines kept per match.
const CHAT_HISTORY: usize = 50;
/// Chat lines replayed to a player on joining.
const CHAT_REPLAY: usize = 20;
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

pub enum Command {
    Join {
        conn: ConnectionId,
        display_name: String,
        outbox: Outbox,
        reply: oneshot::Sender<Result<Color, SessionError>>,
    },
    Intent {
        conn: ConnectionId,
        message: ClientMessage,
    },
    Leave {
        conn: ConnectionId,
    },
}

struct Seat {
    conn: ConnectionId,
    display_name: String,
    outbox: Outbox,
}

pub struct Session {
    room: String,
    game: Match,
    light: Option<Seat>,
    dark: Option<Seat>,
    chat: VecDeque<ChatEntry>,
}

impl Session {
    pub fn new(room: impl Into<String>) -> Self {
        Session { room: room.into(), game: Match::new(), light: None, dark: None, chat: VecDeque::new() }
    }

    pub fn game(&self) -> &Match {
        &self.game
    }

    pub fn is_empty(&self) -> bool {
        self.light.is_none() && self.dark.is_none()
    }

    fn seat(&self, color: Color) -> Option<&Seat> {
        match color {
            Color::Light => self.light.as_ref(),
            Color::Dark => self.dark.as_ref(),
        }
    }

    fn seat_mut(&mut self, color: Color) -> &mut Option<Seat> {
        match color {
            Color::Light => &mut self.light,
            Color::Dark => &mut self.dark,
        }
    }

    fn color_of(&self, conn: ConnectionId) -> Option<Color> {
        [Color::Light, Color::Dark]
            .into_iter()
            .find(|&c| self.seat(c).is_some_and(|s| s.conn == conn))
    }

    fn send_to(&self, color: Color, msg: ServerMessage) {
        if let Some(seat) = self.seat(color) {
            if seat.outbox.send(msg).is_err() {
                debug!(room = %self.room, conn = seat.conn, "outbox closed, dropping message");
            }
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        self.send_to(Color::Light, msg.clone());
        self.send_to(Color::Dark, msg);
    }

    fn players_info(&self) -> ServerMessage {
        let players = [Color::Light, Color::Dark]
            .into_iter()
            .filter_map(|color| {
                self.seat(color).map(|s| PlayerInfo { display_name: s.display_name.clone(), color })
            })
            .collect();
        ServerMessage::PlayersInfo { players }
    }

    /// Seat a connection. Light is handed out first; a vacated seat is
    /// refilled by the next connection to arrive.
    pub fn join(&mut self, conn: ConnectionId, display_name: String, outbox: Outbox) -> Result<Color, SessionError> {
        if self.color_of(conn).is_some() {
            return Err(SessionError::AlreadyJoined);
        }
        let color = [Color::Light, Color::Dark]
            .into_iter()
            .find(|&c| self.seat(c).is_none())
            .ok_or(SessionError::MatchFull)?;

        info!(room = %self.room, conn, %color, name = %display_name, "player joined");
        *self.seat_mut(color) = Some(Seat { conn, display_name, outbox });
        self.send_to(
            color,
            ServerMessage::ColorAssigned {
                color,
                plays_from_bottom: color == Color::Light,
                protocol_version: PROTOCOL_VERSION,
            },
        );
        if !self.chat.is_empty() {
            let skip = self.chat.len().saturating_sub(CHAT_REPLAY);
            let messages = self.chat.iter().skip(skip).cloned().collect();
            self.send_to(color, ServerMessage::ChatHistory { messages });
        }
        self.broadcast(self.players_info());

        if self.light.is_some() && self.dark.is_some() && self.game.phase() == Phase::Waiting {
            self.game.start();
            info!(room = %self.room, "both players seated, game started");
            self.broadcast(ServerMessage::GameStarted);
        }
        self.broadcast(ServerMessage::board_state(&self.game));
        Ok(color)
    }

    /// Drop a connection. Leaving mid-game hands the win to whoever stays.
    pub fn leave(&mut self, conn: ConnectionId) {
        let Some(color) = self.color_of(conn) else {
            return;
        };
        *self.seat_mut(color) = None;
        info!(room = %self.room, conn, %color, "player left");

        if let Some(over) = self.game.forfeit(color) {
            info!(room = %self.room, outcome = ?over.outcome, "game over by disconnect");
            self.broadcast(ServerMessage::game_over(over));
        }
        self.broadcast(ServerMessage::OpponentLeft { color });
        self.broadcast(self.players_info());
    }

    pub fn handle(&mut self, conn: ConnectionId, message: ClientMessage) {
        let Some(color) = self.color_of(conn) else {
            warn!(room = %self.room, conn, "intent from a connection without a seat");
            return;
        };
        let opponent_present = self.seat(color.opposite()).is_some();

        match message {
            ClientMessage::Ping => self.send_to(color, ServerMessage::Pong),
            ClientMessage::Join { .. } => {
                self.send_to(color, ServerMessage::session_error(SessionError::AlreadyJoined));
            }
            ClientMessage::Chat { message } => self.on_chat(color, message),
            _ if self.game.phase() == Phase::Waiting => {
                self.send_to(color, ServerMessage::session_error(SessionError::NoOpponent));
            }
            ClientMessage::Move { from_row, from_col, to_row, to_col } => {
                let mv = Move::new(Square::new(from_row, from_col), Square::new(to_row, to_col));
                self.on_move(color, mv);
            }
            ClientMessage::DrawOffer => {
                if !opponent_present {
                    self.send_to(color, ServerMessage::session_error(SessionError::NoOpponent));
                    return;
                }
                match self.game.offer_draw(color) {
                    Ok(None) => self.broadcast(ServerMessage::DrawOffered { by: color }),
                    Ok(Some(over)) => self.finish(over),
                    Err(v) => self.send_to(color, ServerMessage::rule_error(v)),
                }
            }
            ClientMessage::DrawResponse { accept } => match self.game.respond_draw(color, accept) {
                Ok(Some(over)) => self.finish(over),
                Ok(None) => self.broadcast(ServerMessage::DrawDeclined { by: color }),
                Err(v) => self.send_to(color, ServerMessage::rule_error(v)),
            },
            ClientMessage::Resign => match self.game.resign(color) {
                Ok(over) => self.finish(over),
                Err(v) => self.send_to(color, ServerMessage::rule_error(v)),
            },
            ClientMessage::NewGameRequest => match self.game.request_new_game(color, opponent_present) {
                Ok(NewGameRequest::Pending) => self.broadcast(ServerMessage::NewGameRequested { by: color }),
                Ok(NewGameRequest::Reset) => self.restarted(),
                Err(v) => self.send_to(color, ServerMessage::rule_error(v)),
            },
            ClientMessage::NewGameResponse { accept } => match self.game.respond_new_game(color, accept) {
                Ok(true) => self.restarted(),
                Ok(false) => self.broadcast(ServerMessage::NewGameDeclined { by: color }),
                Err(v) => self.send_to(color, ServerMessage::rule_error(v)),
            },
        }
    }

    fn on_move(&mut self, color: Color, mv: Move) {
        match self.game.apply_move(color, mv) {
            Ok(report) => {
                debug!(room = %self.room, %color, mv = %mv, captured = ?report.captured_at, "move applied");
                self.broadcast(ServerMessage::move_applied(&report));
                self.broadcast(ServerMessage::board_state(&self.game));
                if let Some(over) = report.game_over {
                    self.finish(over);
                }
            }
            Err(reason) => {
                debug!(room = %self.room, %color, mv = %mv, ?reason, "move rejected");
                self.send_to(color, ServerMessage::rejected(reason));
            }
        }
    }

    fn on_chat(&mut self, color: Color, message: String) {
        if message.trim().is_empty() {
            return;
        }
        let Some(seat) = self.seat(color) else {
            return;
        };
        let entry = ChatEntry { display_name: seat.display_name.clone(), message };
        if self.chat.len() == CHAT_HISTORY {
            self.chat.pop_front();
        }
        self.chat.push_back(entry.clone());
        self.broadcast(ServerMessage::ChatMessage(entry));
    }

    fn finish(&self, over: GameOver) {
        info!(room = %self.room, outcome = ?over.outcome, cause = ?over.cause, "game over");
        self.broadcast(ServerMessage::game_over(over));
    }

    fn restarted(&self) {
        info!(room = %self.room, "new game");
        self.broadcast(ServerMessage::GameStarted);
        self.broadcast(ServerMessage::board_state(&self.game));
    }

    /// Process commands until every player has left or all handles are gone.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Join { conn, display_name, outbox, reply } => {
                    let _ = reply.send(self.join(conn, display_name, outbox));
                }
                Command::Intent { conn, message } => self.handle(conn, message),
                Command::Leave { conn } => {
                    self.leave(conn);
                    if self.is_empty() {
                        break;
                    }
                }
            }
        }
        info!(room = %self.room, "session closed");
    }
}

/// Cheap, cloneable sender side of a running session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub fn spawn(room: impl Into<String>, queue_depth: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let session = Session::new(room);
        tokio::spawn(session.run(rx));
        SessionHandle { tx }
    }

    pub async fn join(&self, conn: ConnectionId, display_name: String, outbox: Outbox) -> Result<Color, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Join { conn, display_name, outbox, reply })
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        rx.await.map_err(|_| SessionError::SessionClosed)?
    }

    pub async fn send(&self, conn: ConnectionId, message: ClientMessage) -> Result<(), SessionError> {
        self.tx
            .send(Command::Intent { conn, message })
            .await
            .map_err(|_| SessionError::SessionClosed)
    }

    pub async fn leave(&self, conn: ConnectionId) {
        let _ = self.tx.send(Command::Leave { conn }).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the session task has shut down.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub fn same_session(&self, other: &SessionHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }
}
