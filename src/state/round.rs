//! In-round actions: movement, tasks, eliminations and chat

use super::{stale_ok, AppState, Outcome};
use crate::broadcast::broadcast_room_state;
use crate::error::GameError;
use crate::rules::{self, map::resolve_zone};
use crate::store::{ParticipantPatch, RoomPatch};
use crate::types::*;

impl AppState {
    /// Update a participant's position. The zone label is recomputed from
    /// the coordinates; outside every zone the client's label is kept.
    pub async fn move_participant(
        &self,
        room_id: &str,
        participant_id: &str,
        position: Position,
    ) -> Result<Outcome, GameError> {
        let _guard = self.room_locks.lock(room_id).await;

        let Some(participant) = self.member(room_id, participant_id).await? else {
            return Ok(Outcome::Ignored);
        };

        let fallback = if position.room.is_empty() {
            participant.position.room.as_str()
        } else {
            position.room.as_str()
        };
        let zone = resolve_zone(position.x, position.y, fallback);
        let position = Position { room: zone, ..position };

        tracing::debug!(
            "{} moved to ({}, {}) in {}",
            participant.username,
            position.x,
            position.y,
            position.room
        );

        let updated = stale_ok(
            self.store
                .update_participant(
                    participant_id,
                    ParticipantPatch {
                        position: Some(position),
                        ..Default::default()
                    },
                )
                .await,
        )?;
        if updated.is_none() {
            return Ok(Outcome::Ignored);
        }

        broadcast_room_state(self, room_id).await?;
        Ok(Outcome::Updated)
    }

    /// Count one finished task, then see whether the crew has won
    pub async fn complete_task(
        &self,
        room_id: &str,
        participant_id: &str,
    ) -> Result<Outcome, GameError> {
        let _guard = self.room_locks.lock(room_id).await;

        if !self.room_in(room_id, RoomState::Playing).await? {
            return Ok(Outcome::Ignored);
        }
        let Some(participant) = self.member(room_id, participant_id).await? else {
            return Ok(Outcome::Ignored);
        };
        if participant.tasks_completed >= participant.total_tasks {
            tracing::debug!("{} has no tasks left", participant.username);
            return Ok(Outcome::Ignored);
        }

        let updated = stale_ok(
            self.store
                .update_participant(
                    participant_id,
                    ParticipantPatch {
                        tasks_completed: Some(participant.tasks_completed + 1),
                        ..Default::default()
                    },
                )
                .await,
        )?;
        let Some(updated) = updated else {
            return Ok(Outcome::Ignored);
        };

        tracing::info!(
            "{} completed a task ({}/{})",
            updated.username,
            updated.tasks_completed,
            updated.total_tasks
        );

        self.check_win(room_id).await?;
        broadcast_room_state(self, room_id).await?;
        Ok(Outcome::Updated)
    }

    /// An alive impostor takes out another alive participant of the room
    pub async fn eliminate(
        &self,
        room_id: &str,
        killer_id: &str,
        victim_id: &str,
    ) -> Result<Outcome, GameError> {
        let _guard = self.room_locks.lock(room_id).await;

        if !self.room_in(room_id, RoomState::Playing).await? {
            return Ok(Outcome::Ignored);
        }
        if killer_id == victim_id {
            return Ok(Outcome::Ignored);
        }

        let Some(killer) = self.member(room_id, killer_id).await? else {
            return Ok(Outcome::Ignored);
        };
        if killer.role != Role::Impostor || !killer.is_alive {
            tracing::info!("Ignoring eliminate from {}: not an alive impostor", killer.username);
            return Ok(Outcome::Ignored);
        }

        let Some(victim) = self.member(room_id, victim_id).await? else {
            return Ok(Outcome::Ignored);
        };
        if !victim.is_alive {
            return Ok(Outcome::Ignored);
        }

        let updated = stale_ok(
            self.store
                .update_participant(
                    victim_id,
                    ParticipantPatch {
                        is_alive: Some(false),
                        ..Default::default()
                    },
                )
                .await,
        )?;
        if updated.is_none() {
            return Ok(Outcome::Ignored);
        }

        tracing::info!("{} was eliminated", victim.username);

        self.check_win(room_id).await?;
        broadcast_room_state(self, room_id).await?;
        Ok(Outcome::Updated)
    }

    /// Append a chat line. Blank messages are dropped, long ones cut.
    pub async fn post_chat(
        &self,
        room_id: &str,
        participant_id: &str,
        message: &str,
    ) -> Result<Outcome, GameError> {
        let text: String = message.trim().chars().take(MAX_CHAT_CHARS).collect();
        if text.is_empty() {
            return Ok(Outcome::Ignored);
        }

        let _guard = self.room_locks.lock(room_id).await;

        let Some(author) = self.member(room_id, participant_id).await? else {
            return Ok(Outcome::Ignored);
        };

        let created = stale_ok(
            self.store
                .create_chat_entry(room_id, participant_id, text)
                .await,
        )?;
        if created.is_none() {
            return Ok(Outcome::Ignored);
        }

        tracing::debug!("Chat from {} in room {}", author.username, room_id);

        broadcast_room_state(self, room_id).await?;
        Ok(Outcome::Updated)
    }

    /// Whether the room exists and is in the given state
    pub(super) async fn room_in(&self, room_id: &str, state: RoomState) -> Result<bool, GameError> {
        Ok(self
            .store
            .get_room(room_id)
            .await?
            .is_some_and(|room| room.state == state))
    }

    /// Run the win evaluator and end the round if someone won.
    /// Caller holds the room lock.
    pub(super) async fn check_win(&self, room_id: &str) -> Result<Option<Winner>, GameError> {
        let Some(room) = self.store.get_room(room_id).await? else {
            return Ok(None);
        };
        let participants = self.store.list_participants(room_id).await?;

        let Some(winner) = rules::evaluate(room.state, &participants) else {
            return Ok(None);
        };

        stale_ok(
            self.store
                .update_room(
                    room_id,
                    RoomPatch {
                        state: Some(RoomState::Ended),
                        winner: Some(Some(winner)),
                        phase_deadline: Some(None),
                        ..Default::default()
                    },
                )
                .await,
        )?;

        tracing::info!("Room {} ended, {:?} win", room.room_code, winner);
        Ok(Some(winner))
    }
}
