//! In-memory entity store
//!
//! Each table sits behind its own `RwLock`. Operations that touch more
//! than one table always lock in the order rooms, participants, chat,
//! ballots.

use super::{EntityStore, ParticipantPatch, RoomPatch, StoreResult};
use crate::error::StoreError;
use crate::types::*;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct MemoryStore {
    rooms: Arc<RwLock<HashMap<RoomId, Room>>>,
    /// Insertion order doubles as join order
    participants: Arc<RwLock<IndexMap<ParticipantId, Participant>>>,
    chat: Arc<RwLock<IndexMap<ChatEntryId, ChatEntry>>>,
    ballots: Arc<RwLock<IndexMap<BallotId, Ballot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_room(&self, room: NewRoom) -> StoreResult<Room> {
        let mut rooms = self.rooms.write().await;
        if rooms.values().any(|r| r.room_code == room.room_code) {
            return Err(StoreError::DuplicateRoomCode(room.room_code));
        }

        let room = Room {
            id: new_id(),
            room_code: room.room_code,
            host_id: None,
            state: RoomState::Lobby,
            settings: room.settings,
            created_at: chrono::Utc::now(),
            phase_deadline: None,
            meeting: None,
            winner: None,
        };
        rooms.insert(room.id.clone(), room.clone());
        Ok(room)
    }

    async fn get_room(&self, id: &str) -> StoreResult<Option<Room>> {
        Ok(self.rooms.read().await.get(id).cloned())
    }

    async fn get_room_by_code(&self, code: &str) -> StoreResult<Option<Room>> {
        Ok(self
            .rooms
            .read()
            .await
            .values()
            .find(|r| r.room_code == code)
            .cloned())
    }

    async fn list_rooms(&self) -> StoreResult<Vec<Room>> {
        Ok(self.rooms.read().await.values().cloned().collect())
    }

    async fn update_room(&self, id: &str, patch: RoomPatch) -> StoreResult<Room> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("room", id))?;
        patch.apply(room);
        Ok(room.clone())
    }

    async fn delete_room(&self, id: &str) -> StoreResult<bool> {
        let mut rooms = self.rooms.write().await;
        let mut participants = self.participants.write().await;
        let mut chat = self.chat.write().await;
        let mut ballots = self.ballots.write().await;

        let removed = rooms.remove(id).is_some();
        participants.retain(|_, p| p.room_id != id);
        chat.retain(|_, c| c.room_id != id);
        ballots.retain(|_, b| b.room_id != id);
        Ok(removed)
    }

    async fn create_participant(&self, participant: NewParticipant) -> StoreResult<Participant> {
        let rooms = self.rooms.read().await;
        if !rooms.contains_key(&participant.room_id) {
            return Err(StoreError::not_found("room", participant.room_id));
        }

        let participant = Participant {
            id: new_id(),
            room_id: participant.room_id,
            username: participant.username,
            color: participant.color,
            role: Role::Crewmate,
            is_alive: true,
            is_host: participant.is_host,
            position: participant.position,
            tasks_completed: 0,
            total_tasks: participant.total_tasks,
            has_voted: false,
            voted_for: None,
        };
        self.participants
            .write()
            .await
            .insert(participant.id.clone(), participant.clone());
        Ok(participant)
    }

    async fn get_participant(&self, id: &str) -> StoreResult<Option<Participant>> {
        Ok(self.participants.read().await.get(id).cloned())
    }

    async fn list_participants(&self, room_id: &str) -> StoreResult<Vec<Participant>> {
        Ok(self
            .participants
            .read()
            .await
            .values()
            .filter(|p| p.room_id == room_id)
            .cloned()
            .collect())
    }

    async fn update_participant(
        &self,
        id: &str,
        patch: ParticipantPatch,
    ) -> StoreResult<Participant> {
        let mut participants = self.participants.write().await;
        let participant = participants
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("participant", id))?;
        patch.apply(participant);
        Ok(participant.clone())
    }

    async fn delete_participant(&self, id: &str) -> StoreResult<bool> {
        Ok(self.participants.write().await.shift_remove(id).is_some())
    }

    async fn create_chat_entry(
        &self,
        room_id: &str,
        author_id: &str,
        message: String,
    ) -> StoreResult<ChatEntry> {
        let rooms = self.rooms.read().await;
        if !rooms.contains_key(room_id) {
            return Err(StoreError::not_found("room", room_id));
        }

        let entry = ChatEntry {
            id: new_id(),
            room_id: room_id.to_string(),
            author_id: author_id.to_string(),
            message,
            timestamp: chrono::Utc::now(),
        };
        self.chat
            .write()
            .await
            .insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn get_chat_entry(&self, id: &str) -> StoreResult<Option<ChatEntry>> {
        Ok(self.chat.read().await.get(id).cloned())
    }

    async fn list_chat_entries(&self, room_id: &str) -> StoreResult<Vec<ChatEntry>> {
        let mut entries: Vec<ChatEntry> = self
            .chat
            .read()
            .await
            .values()
            .filter(|c| c.room_id == room_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        entries.sort_by_key(|c| c.timestamp);
        Ok(entries)
    }

    async fn delete_chat_entry(&self, id: &str) -> StoreResult<bool> {
        Ok(self.chat.write().await.shift_remove(id).is_some())
    }

    async fn create_ballot(
        &self,
        room_id: &str,
        voter_id: &str,
        target_id: Option<ParticipantId>,
    ) -> StoreResult<Ballot> {
        let rooms = self.rooms.read().await;
        if !rooms.contains_key(room_id) {
            return Err(StoreError::not_found("room", room_id));
        }

        let ballot = Ballot {
            id: new_id(),
            room_id: room_id.to_string(),
            voter_id: voter_id.to_string(),
            target_id,
            timestamp: chrono::Utc::now(),
        };
        self.ballots
            .write()
            .await
            .insert(ballot.id.clone(), ballot.clone());
        Ok(ballot)
    }

    async fn get_ballot(&self, id: &str) -> StoreResult<Option<Ballot>> {
        Ok(self.ballots.read().await.get(id).cloned())
    }

    async fn list_ballots(&self, room_id: &str) -> StoreResult<Vec<Ballot>> {
        Ok(self
            .ballots
            .read()
            .await
            .values()
            .filter(|b| b.room_id == room_id)
            .cloned()
            .collect())
    }

    async fn delete_ballot(&self, id: &str) -> StoreResult<bool> {
        Ok(self.ballots.write().await.shift_remove(id).is_some())
    }

    async fn delete_ballots_for_room(&self, room_id: &str) -> StoreResult<usize> {
        let mut ballots = self.ballots.write().await;
        let before = ballots.len();
        ballots.retain(|_, b| b.room_id != room_id);
        Ok(before - ballots.len())
    }
}
