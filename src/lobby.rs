use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::error::SessionError;
use crate::piece::Color;
use crate::session::{ConnectionId, Outbox, SessionHandle};

/// Room code -> running session. A room is created by its first joiner and
/// forgotten once its session task has shut down.
#[derive(Clone)]
pub struct Lobby {
    rooms: Arc<Mutex<HashMap<String, SessionHandle>>>,
    next_conn: Arc<AtomicU64>,
    queue_depth: usize,
}

impl Lobby {
    pub fn new(queue_depth: usize) -> Self {
        Lobby {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            next_conn: Arc::new(AtomicU64::new(1)),
            queue_depth,
        }
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_conn.fetch_add(1, Ordering::Relaxed)
    }

    /// The live session for `room`, spawning one if needed.
    fn session(&self, room: &str) -> SessionHandle {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = rooms.get(room) {
            if !handle.is_closed() {
                return handle.clone();
            }
            debug!(room, "replacing closed session");
        }
        info!(room, "opening room");
        let handle = SessionHandle::spawn(room, self.queue_depth);
        rooms.insert(room.to_string(), handle.clone());

        // Forget the room as soon as its session shuts down.
        let lobby = self.clone();
        let watched = handle.clone();
        let room = room.to_string();
        tokio::spawn(async move {
            watched.closed().await;
            debug!(%room, "room closed");
            lobby.evict(&room, &watched);
        });
        handle
    }

    fn evict(&self, room: &str, stale: &SessionHandle) {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        if rooms.get(room).is_some_and(|h| h.same_session(stale)) {
            rooms.remove(room);
        }
    }

    /// Seat a connection in `room`. Retries once if the room's session shut
    /// down between lookup and join.
    pub async fn join(
        &self,
        room: &str,
        conn: ConnectionId,
        display_name: String,
        outbox: Outbox,
    ) -> Result<(SessionHandle, Color), SessionError> {
        for _ in 0..2 {
            let handle = self.session(room);
            match handle.join(conn, display_name.clone(), outbox.clone()).await {
                Ok(color) => return Ok((handle, color)),
                Err(SessionError::SessionClosed) => self.evict(room, &handle),
                Err(e) => return Err(e),
            }
        }
        Err(SessionError::SessionClosed)
    }

    /// Rooms with a running session.
    pub fn room_count(&self) -> usize {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.retain(|_, h| !h.is_closed());
        rooms.len()
    }
}
