//! Store wrapper with switchable faults, for exercising error paths

use super::{EntityStore, MemoryStore, ParticipantPatch, RoomPatch, StoreResult};
use crate::error::StoreError;
use crate::types::*;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    /// The next `get_room` deletes the room first, as if its last
    /// participant left at that moment
    pub vanish_next_room_read: Arc<AtomicBool>,
    pub fail_participant_updates: Arc<AtomicBool>,
    /// Listing ballots of this room fails
    pub fail_ballots_for: Arc<Mutex<Option<RoomId>>>,
}

fn down() -> StoreError {
    StoreError::Unavailable("injected fault".to_string())
}

#[async_trait]
impl EntityStore for FaultyStore {
    async fn create_room(&self, room: NewRoom) -> StoreResult<Room> {
        self.inner.create_room(room).await
    }

    async fn get_room(&self, id: &str) -> StoreResult<Option<Room>> {
        if self.vanish_next_room_read.swap(false, Ordering::SeqCst) {
            self.inner.delete_room(id).await?;
        }
        self.inner.get_room(id).await
    }

    async fn get_room_by_code(&self, code: &str) -> StoreResult<Option<Room>> {
        self.inner.get_room_by_code(code).await
    }

    async fn list_rooms(&self) -> StoreResult<Vec<Room>> {
        self.inner.list_rooms().await
    }

    async fn update_room(&self, id: &str, patch: RoomPatch) -> StoreResult<Room> {
        self.inner.update_room(id, patch).await
    }

    async fn delete_room(&self, id: &str) -> StoreResult<bool> {
        self.inner.delete_room(id).await
    }

    async fn create_participant(&self, participant: NewParticipant) -> StoreResult<Participant> {
        self.inner.create_participant(participant).await
    }

    async fn get_participant(&self, id: &str) -> StoreResult<Option<Participant>> {
        self.inner.get_participant(id).await
    }

    async fn list_participants(&self, room_id: &str) -> StoreResult<Vec<Participant>> {
        self.inner.list_participants(room_id).await
    }

    async fn update_participant(
        &self,
        id: &str,
        patch: ParticipantPatch,
    ) -> StoreResult<Participant> {
        if self.fail_participant_updates.load(Ordering::SeqCst) {
            return Err(down());
        }
        self.inner.update_participant(id, patch).await
    }

    async fn delete_participant(&self, id: &str) -> StoreResult<bool> {
        self.inner.delete_participant(id).await
    }

    async fn create_chat_entry(
        &self,
        room_id: &str,
        author_id: &str,
        message: String,
    ) -> StoreResult<ChatEntry> {
        self.inner.create_chat_entry(room_id, author_id, message).await
    }

    async fn get_chat_entry(&self, id: &str) -> StoreResult<Option<ChatEntry>> {
        self.inner.get_chat_entry(id).await
    }

    async fn list_chat_entries(&self, room_id: &str) -> StoreResult<Vec<ChatEntry>> {
        self.inner.list_chat_entries(room_id).await
    }

    async fn delete_chat_entry(&self, id: &str) -> StoreResult<bool> {
        self.inner.delete_chat_entry(id).await
    }

    async fn create_ballot(
        &self,
        room_id: &str,
        voter_id: &str,
        target_id: Option<ParticipantId>,
    ) -> StoreResult<Ballot> {
        self.inner.create_ballot(room_id, voter_id, target_id).await
    }

    async fn get_ballot(&self, id: &str) -> StoreResult<Option<Ballot>> {
        self.inner.get_ballot(id).await
    }

    async fn list_ballots(&self, room_id: &str) -> StoreResult<Vec<Ballot>> {
        let failing = self
            .fail_ballots_for
            .lock()
            .unwrap()
            .as_deref()
            == Some(room_id);
        if failing {
            return Err(down());
        }
        self.inner.list_ballots(room_id).await
    }

    async fn delete_ballot(&self, id: &str) -> StoreResult<bool> {
        self.inner.delete_ballot(id).await
    }

    async fn delete_ballots_for_room(&self, room_id: &str) -> StoreResult<usize> {
        self.inner.delete_ballots_for_room(room_id).await
    }
}
