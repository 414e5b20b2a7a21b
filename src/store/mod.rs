//! Persistence contract for rooms, participants, chat and ballots
//!
//! The store holds no game logic. Every list operation is scoped strictly
//! to one room id. `update_*` merges a partial patch and returns the new
//! value, or `StoreError::NotFound` if the entity has gone away.

pub mod memory;

#[cfg(test)]
pub(crate) mod faulty;

use crate::error::StoreError;
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait EntityStore: Send + Sync {
    // Rooms
    async fn create_room(&self, room: NewRoom) -> StoreResult<Room>;
    async fn get_room(&self, id: &str) -> StoreResult<Option<Room>>;
    async fn get_room_by_code(&self, code: &str) -> StoreResult<Option<Room>>;
    async fn list_rooms(&self) -> StoreResult<Vec<Room>>;
    async fn update_room(&self, id: &str, patch: RoomPatch) -> StoreResult<Room>;
    /// Deletes the room together with its participants, chat and ballots
    async fn delete_room(&self, id: &str) -> StoreResult<bool>;

    // Participants
    async fn create_participant(&self, participant: NewParticipant) -> StoreResult<Participant>;
    async fn get_participant(&self, id: &str) -> StoreResult<Option<Participant>>;
    /// Participants of one room in join order
    async fn list_participants(&self, room_id: &str) -> StoreResult<Vec<Participant>>;
    async fn update_participant(
        &self,
        id: &str,
        patch: ParticipantPatch,
    ) -> StoreResult<Participant>;
    async fn delete_participant(&self, id: &str) -> StoreResult<bool>;

    // Chat entries are immutable once created
    async fn create_chat_entry(
        &self,
        room_id: &str,
        author_id: &str,
        message: String,
    ) -> StoreResult<ChatEntry>;
    async fn get_chat_entry(&self, id: &str) -> StoreResult<Option<ChatEntry>>;
    /// Chat of one room ordered by timestamp
    async fn list_chat_entries(&self, room_id: &str) -> StoreResult<Vec<ChatEntry>>;
    async fn delete_chat_entry(&self, id: &str) -> StoreResult<bool>;

    // Ballots
    async fn create_ballot(
        &self,
        room_id: &str,
        voter_id: &str,
        target_id: Option<ParticipantId>,
    ) -> StoreResult<Ballot>;
    async fn get_ballot(&self, id: &str) -> StoreResult<Option<Ballot>>;
    async fn list_ballots(&self, room_id: &str) -> StoreResult<Vec<Ballot>>;
    async fn delete_ballot(&self, id: &str) -> StoreResult<bool>;
    /// Returns how many ballots were removed
    async fn delete_ballots_for_room(&self, room_id: &str) -> StoreResult<usize>;

    /// Loads everything a state broadcast needs, or `None` if the room is gone
    async fn snapshot(&self, room_id: &str) -> StoreResult<Option<RoomSnapshot>> {
        let Some(room) = self.get_room(room_id).await? else {
            return Ok(None);
        };
        let participants = self.list_participants(room_id).await?;
        let chat = self.list_chat_entries(room_id).await?;
        Ok(Some(RoomSnapshot {
            room,
            participants,
            chat,
        }))
    }
}

/// Partial update for a room. `None` leaves a field untouched; nullable
/// fields use a nested `Option` so they can be cleared.
#[derive(Debug, Clone, Default)]
pub struct RoomPatch {
    pub host_id: Option<Option<ParticipantId>>,
    pub state: Option<RoomState>,
    pub phase_deadline: Option<Option<DateTime<Utc>>>,
    pub meeting: Option<Option<Meeting>>,
    pub winner: Option<Option<Winner>>,
}

impl RoomPatch {
    pub fn state(state: RoomState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    pub fn apply(self, room: &mut Room) {
        if let Some(host_id) = self.host_id {
            room.host_id = host_id;
        }
        if let Some(state) = self.state {
            room.state = state;
        }
        if let Some(deadline) = self.phase_deadline {
            room.phase_deadline = deadline;
        }
        if let Some(meeting) = self.meeting {
            room.meeting = meeting;
        }
        if let Some(winner) = self.winner {
            room.winner = winner;
        }
    }
}

/// Partial update for a participant
#[derive(Debug, Clone, Default)]
pub struct ParticipantPatch {
    pub role: Option<Role>,
    pub is_alive: Option<bool>,
    pub is_host: Option<bool>,
    pub position: Option<Position>,
    pub tasks_completed: Option<u32>,
    pub has_voted: Option<bool>,
    pub voted_for: Option<Option<ParticipantId>>,
}

impl ParticipantPatch {
    /// Clears the vote state at the start of a voting phase or round
    pub fn reset_vote() -> Self {
        Self {
            has_voted: Some(false),
            voted_for: Some(None),
            ..Default::default()
        }
    }

    pub fn apply(self, participant: &mut Participant) {
        if let Some(role) = self.role {
            participant.role = role;
        }
        if let Some(is_alive) = self.is_alive {
            participant.is_alive = is_alive;
        }
        if let Some(is_host) = self.is_host {
            participant.is_host = is_host;
        }
        if let Some(position) = self.position {
            participant.position = position;
        }
        if let Some(tasks_completed) = self.tasks_completed {
            participant.tasks_completed = tasks_completed.min(participant.total_tasks);
        }
        if let Some(has_voted) = self.has_voted {
            participant.has_voted = has_voted;
        }
        if let Some(voted_for) = self.voted_for {
            participant.voted_for = voted_for;
        }
    }
}
