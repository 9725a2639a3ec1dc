//! HTTP + WebSocket transport.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ProtocolError, SessionError};
use crate::lobby::Lobby;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{ConnectionId, Outbox, SessionHandle};

#[derive(Clone)]
pub struct AppState {
    pub lobby: Lobby,
    pub default_room: String,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        AppState { lobby: Lobby::new(config.queue_depth), default_room: config.default_room.clone() }
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    message: &'static str,
    build: &'static str,
    rooms: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = config.addr();
    let app = router(AppState::new(&config));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "OK",
        message: "Checkers server is running",
        build: env!("BUILD_TIMESTAMP"),
        rooms: state.lobby.room_count(),
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut outgoing) = mpsc::unbounded_channel::<ServerMessage>();
    let mut connection = Connection::new(state, outbox);
    let conn = connection.id;
    debug!(conn, "connection opened");

    // Drains this connection's outbox. Ends when every sender (ours and the
    // session's seat) is gone, or the socket refuses a write.
    let writer = tokio::spawn(async move {
        while let Some(msg) = outgoing.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(t) => t,
                Err(e) => {
                    warn!(conn, error = %e, "cannot encode outbound message");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    while let Some(frame) = receiver.next().await {
        let frame = match frame {
            Ok(f) => f,
            Err(e) => {
                debug!(conn, error = %e, "socket error");
                break;
            }
        };
        if connection.on_frame(frame).await == Flow::Close {
            break;
        }
    }

    connection.close().await;
    let _ = writer.await;
    debug!(conn, "connection closed");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// One client's view of the server: its outbox and, once joined, its match.
struct Connection {
    id: ConnectionId,
    state: AppState,
    outbox: Outbox,
    session: Option<SessionHandle>,
}

impl Connection {
    fn new(state: AppState, outbox: Outbox) -> Self {
        let id = state.lobby.next_connection_id();
        Connection { id, state, outbox, session: None }
    }

    fn reply(&self, msg: ServerMessage) {
        let _ = self.outbox.send(msg);
    }

    async fn on_frame(&mut self, frame: Message) -> Flow {
        let text = match frame {
            Message::Text(t) => t,
            Message::Close(_) => return Flow::Close,
            Message::Binary(_) => {
                self.reply(ServerMessage::protocol_error(&ProtocolError::BinaryFrame));
                return Flow::Continue;
            }
            _ => return Flow::Continue,
        };

        match ClientMessage::decode(text.as_str()) {
            Ok(msg) => self.on_message(msg).await,
            Err(e) => {
                warn!(conn = self.id, error = %e, "rejecting frame");
                self.reply(ServerMessage::protocol_error(&e));
                Flow::Continue
            }
        }
    }

    async fn on_message(&mut self, msg: ClientMessage) -> Flow {
        if let Some(handle) = &self.session {
            if handle.send(self.id, msg).await.is_err() {
                self.reply(ServerMessage::session_error(SessionError::SessionClosed));
                return Flow::Close;
            }
            return Flow::Continue;
        }

        match msg {
            ClientMessage::Ping => self.reply(ServerMessage::Pong),
            ClientMessage::Join { display_name, room, .. } => {
                let room = room.unwrap_or_else(|| self.state.default_room.clone());
                match self.state.lobby.join(&room, self.id, display_name, self.outbox.clone()).await {
                    Ok((handle, color)) => {
                        debug!(conn = self.id, %room, %color, "seated");
                        self.session = Some(handle);
                    }
                    Err(e) => {
                        info!(conn = self.id, %room, error = %e, "join refused");
                        self.reply(ServerMessage::session_error(e));
                        if e == SessionError::MatchFull {
                            return Flow::Close;
                        }
                    }
                }
            }
            _ => self.reply(ServerMessage::session_error(SessionError::NotJoined)),
        }
        Flow::Continue
    }

    /// Give up the seat, if any. The outbox closes once the session drops it too.
    async fn close(self) {
        if let Some(handle) = self.session {
            handle.leave(self.id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{EndCause, Outcome};
    use crate::piece::Color;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    #[tokio::test]
    async fn health_reports_ok_and_room_count() {
        let state = AppState { lobby: Lobby::new(4), default_room: "main".into() };
        let (tx, _rx) = mpsc::unbounded_channel();
        state.lobby.join("main", 1, "ann".into(), tx).await.unwrap();

        let Json(body) = health(State(state)).await;
        assert_eq!(body.status, "OK");
        assert_eq!(body.message, "Checkers server is running");
        assert_eq!(body.rooms, 1);
        assert!(!body.build.is_empty());
    }

    fn state() -> AppState {
        AppState { lobby: Lobby::new(8), default_room: "main".into() }
    }

    fn connect(state: &AppState) -> (Connection, UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(state.clone(), tx), rx)
    }

    fn text(json: &str) -> Message {
        Message::Text(json.to_string().into())
    }

    fn join(name: &str) -> Message {
        text(&format!(r#"{{"type":"join","displayName":"{name}"}}"#))
    }

    /// Next outbound message matching `want`, skipping the rest.
    async fn next_matching(
        rx: &mut UnboundedReceiver<ServerMessage>,
        want: impl Fn(&ServerMessage) -> bool,
    ) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let msg = rx.recv().await.expect("outbox closed");
                if want(&msg) {
                    return msg;
                }
            }
        })
        .await
        .expect("timed out waiting for a message")
    }

    fn error_reason(msg: &ServerMessage) -> Option<&str> {
        match msg {
            ServerMessage::Error { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn intents_before_join_are_refused() {
        let state = state();
        let (mut conn, mut rx) = connect(&state);

        let flow = conn.on_frame(text(r#"{"type":"move","fromRow":5,"fromCol":0,"toRow":4,"toCol":1}"#)).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(error_reason(&rx.try_recv().unwrap()), Some("NotJoined"));

        conn.on_frame(text(r#"{"type":"ping"}"#)).await;
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::Pong);
        assert!(conn.session.is_none());
    }

    #[tokio::test]
    async fn binary_frames_are_protocol_errors() {
        let state = state();
        let (mut conn, mut rx) = connect(&state);
        assert_eq!(conn.on_frame(Message::Binary(vec![1u8, 2, 3].into())).await, Flow::Continue);
        assert_eq!(error_reason(&rx.try_recv().unwrap()), Some("BinaryFrame"));
        assert_eq!(conn.on_frame(Message::Close(None)).await, Flow::Close);
    }

    #[tokio::test]
    async fn third_player_is_told_the_match_is_full_and_dropped() {
        let state = state();
        let (mut a, _rxa) = connect(&state);
        let (mut b, _rxb) = connect(&state);
        let (mut c, mut rxc) = connect(&state);

        assert_eq!(a.on_frame(join("ann")).await, Flow::Continue);
        assert_eq!(b.on_frame(join("bob")).await, Flow::Continue);
        assert_eq!(c.on_frame(join("eve")).await, Flow::Close);
        assert_eq!(error_reason(&rxc.try_recv().unwrap()), Some("MatchFull"));
        assert!(c.session.is_none());
    }

    #[tokio::test]
    async fn malformed_frame_after_join_changes_nothing() {
        let state = state();
        let (mut a, mut rxa) = connect(&state);
        let (mut b, mut rxb) = connect(&state);
        a.on_frame(join("ann")).await;
        b.on_frame(join("bob")).await;
        next_matching(&mut rxa, |m| *m == ServerMessage::GameStarted).await;

        assert_eq!(a.on_frame(text("{\"type\":\"move\"")).await, Flow::Continue);
        let err = next_matching(&mut rxa, |m| error_reason(m).is_some()).await;
        assert_eq!(error_reason(&err), Some("Malformed"));

        // Still Light's turn on the opening board.
        a.on_frame(text(r#"{"type":"move","fromRow":5,"fromCol":0,"toRow":4,"toCol":1}"#)).await;
        let applied = next_matching(&mut rxb, |m| matches!(m, ServerMessage::MoveApplied { .. })).await;
        assert!(matches!(applied, ServerMessage::MoveApplied { by: Color::Light, to_move: Color::Dark, .. }));
    }

    #[tokio::test]
    async fn closing_the_socket_forfeits_the_game() {
        let state = state();
        let (mut a, _rxa) = connect(&state);
        let (mut b, mut rxb) = connect(&state);
        a.on_frame(join("ann")).await;
        b.on_frame(join("bob")).await;
        next_matching(&mut rxb, |m| *m == ServerMessage::GameStarted).await;

        a.close().await;
        let over = next_matching(&mut rxb, |m| matches!(m, ServerMessage::GameOver { .. })).await;
        assert_eq!(
            over,
            ServerMessage::GameOver { outcome: Outcome::Winner(Color::Dark), cause: EndCause::Disconnect }
        );
        next_matching(&mut rxb, |m| *m == ServerMessage::OpponentLeft { color: Color::Light }).await;
    }

    #[test]
    fn state_follows_config() {
        use clap::Parser;
        let config = Config::try_parse_from(["server", "--default-room", "lobby"]).unwrap();
        let state = AppState::new(&config);
        assert_eq!(state.default_room, "lobby");
        let _ = router(state);
    }
}
