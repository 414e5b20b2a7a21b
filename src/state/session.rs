//! Session registry: which live connection speaks for which participant
//!
//! Sessions are purely in-memory and never touch the entity store.

use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};

/// One live connection and its outbound queue
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: SessionId,
    pub tx: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Self {
            id: ulid::Ulid::new().to_string(),
            tx,
        };
        (conn, rx)
    }

    /// Queue a message for this connection. A closed peer is not an error.
    pub fn send(&self, msg: ServerMessage) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// The identity bound to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
}

struct Session {
    info: SessionInfo,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionRegistry {
    pub async fn register(&self, conn: &Connection, room_id: &str, participant_id: &str) {
        let session = Session {
            info: SessionInfo {
                room_id: room_id.to_string(),
                participant_id: participant_id.to_string(),
            },
            tx: conn.tx.clone(),
        };
        self.sessions.write().await.insert(conn.id.clone(), session);
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionInfo> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.info.clone())
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn remove(&self, session_id: &str) -> Option<SessionInfo> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|s| s.info)
    }

    /// Push a message to every session in the room. Sends never block;
    /// closed receivers are skipped. Returns how many queues accepted it.
    pub async fn send_to_room(&self, room_id: &str, msg: &ServerMessage) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|s| s.info.room_id == room_id)
            .filter(|s| s.tx.send(msg.clone()).is_ok())
            .count()
    }

    pub async fn count_in_room(&self, room_id: &str) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.info.room_id == room_id)
            .count()
    }
}
