//! Room lifecycle: join, leave, disconnect and game start

use super::{stale_ok, AppState, Connection, Outcome};
use crate::broadcast::broadcast_room_state;
use crate::error::GameError;
use crate::rules::{self, quorum_reached};
use crate::store::{ParticipantPatch, RoomPatch};
use crate::types::*;
use rand::Rng;

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generate a random room code
pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ROOM_CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Trim and upper-case a requested room code.
/// `Ok(None)` means the caller asked for a fresh room.
pub fn normalize_room_code(raw: &str) -> Result<Option<String>, GameError> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        return Ok(None);
    }
    let valid = code.len() == ROOM_CODE_LENGTH
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if valid {
        Ok(Some(code))
    } else {
        Err(GameError::InvalidRoomCode)
    }
}

fn validate_username(raw: &str) -> Result<String, GameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(GameError::MissingUsername);
    }
    if name.chars().count() > MAX_USERNAME_CHARS {
        return Err(GameError::UsernameTooLong);
    }
    Ok(name.to_string())
}

impl AppState {
    /// Pick a code no active room uses. Caller holds the creation lock.
    async fn unused_room_code(&self) -> Result<String, GameError> {
        loop {
            let code = self.with_rng(|rng| generate_room_code(rng));
            if self.store.get_room_by_code(&code).await?.is_none() {
                return Ok(code);
            }
            // Collision - try again
        }
    }

    async fn find_or_create_room(&self, requested: Option<String>) -> Result<Room, GameError> {
        let _creating = self.creation.lock().await;

        let code = match requested {
            Some(code) => {
                if let Some(room) = self.store.get_room_by_code(&code).await? {
                    return Ok(room);
                }
                code
            }
            None => self.unused_room_code().await?,
        };

        let room = self
            .store
            .create_room(NewRoom {
                room_code: code,
                settings: self.config.default_settings.clone(),
            })
            .await?;
        tracing::info!("Created room {} ({})", room.room_code, room.id);
        Ok(room)
    }

    /// Join a room by code, creating it if needed, and bind the
    /// connection's session to the new participant
    pub async fn join_room(
        &self,
        conn: &Connection,
        room_code: &str,
        username: &str,
        color: Color,
    ) -> Result<Participant, GameError> {
        if self.sessions.contains(&conn.id).await {
            return Err(GameError::AlreadyJoined);
        }
        let username = validate_username(username)?;
        let requested = normalize_room_code(room_code)?;

        let (room, _guard) = loop {
            let found = self.find_or_create_room(requested.clone()).await?;
            let guard = self.room_locks.lock(&found.id).await;

            // The room may have emptied and closed while we waited
            match self.store.get_room(&found.id).await? {
                Some(room) => break (room, guard),
                None => tracing::debug!(
                    "Room {} closed before {} got in, looking again",
                    found.room_code,
                    username
                ),
            }
        };

        if room.state != RoomState::Lobby {
            return Err(GameError::InProgress);
        }

        let existing = self.store.list_participants(&room.id).await?;
        if existing.len() >= MAX_PARTICIPANTS {
            return Err(GameError::Full);
        }
        if existing.iter().any(|p| p.color == color) {
            return Err(GameError::ColorTaken);
        }

        let is_first = existing.is_empty();
        let participant = self
            .store
            .create_participant(NewParticipant {
                room_id: room.id.clone(),
                username,
                color,
                is_host: is_first,
                total_tasks: self.config.tasks_per_player,
                position: Position::spawn(),
            })
            .await?;

        if is_first {
            self.store
                .update_room(
                    &room.id,
                    RoomPatch {
                        host_id: Some(Some(participant.id.clone())),
                        ..Default::default()
                    },
                )
                .await?;
        }

        self.sessions
            .register(conn, &room.id, &participant.id)
            .await;

        tracing::info!(
            "{} joined room {} as {:?}{}",
            participant.username,
            room.room_code,
            participant.color,
            if is_first { " (host)" } else { "" }
        );

        broadcast_room_state(self, &room.id).await?;
        Ok(participant)
    }

    /// Explicit leave or disconnect: drop the session and its participant.
    /// Unknown sessions are a no-op.
    pub async fn end_session(&self, session_id: &str) -> Result<Outcome, GameError> {
        let Some(session) = self.sessions.remove(session_id).await else {
            tracing::debug!("No session for {}, nothing to clean up", session_id);
            return Ok(Outcome::Ignored);
        };
        self.remove_participant(&session.room_id, &session.participant_id)
            .await
    }

    /// Delete a participant, hand off the host role, close empty rooms,
    /// and settle any vote or round the departure decides
    pub async fn remove_participant(
        &self,
        room_id: &str,
        participant_id: &str,
    ) -> Result<Outcome, GameError> {
        let _guard = self.room_locks.lock(room_id).await;

        if !self.store.delete_participant(participant_id).await? {
            tracing::debug!("Participant {} already gone", participant_id);
        }

        let Some(room) = self.store.get_room(room_id).await? else {
            return Ok(Outcome::Ignored);
        };
        let remaining = self.store.list_participants(room_id).await?;

        if remaining.is_empty() {
            self.store.delete_room(room_id).await?;
            tracing::info!("Room {} is empty, closed it", room.room_code);
            return Ok(Outcome::Updated);
        }

        let host_left = room.host_id.as_deref() == Some(participant_id)
            || !remaining.iter().any(|p| p.is_host);
        if host_left {
            let new_host = &remaining[0];
            stale_ok(
                self.store
                    .update_participant(
                        &new_host.id,
                        ParticipantPatch {
                            is_host: Some(true),
                            ..Default::default()
                        },
                    )
                    .await,
            )?;
            self.store
                .update_room(
                    room_id,
                    RoomPatch {
                        host_id: Some(Some(new_host.id.clone())),
                        ..Default::default()
                    },
                )
                .await?;
            tracing::info!(
                "Host left room {}, {} is the new host",
                room.room_code,
                new_host.username
            );
        }

        match room.state {
            RoomState::Voting if quorum_reached(&remaining) => {
                self.resolve_voting(room_id).await?;
            }
            RoomState::Playing => {
                self.check_win(room_id).await?;
            }
            _ => {}
        }

        broadcast_room_state(self, room_id).await?;
        Ok(Outcome::Updated)
    }

    /// Assign roles and move the room from lobby to playing
    pub async fn start_game(&self, room_id: &str) -> Result<Outcome, GameError> {
        let _guard = self.room_locks.lock(room_id).await;

        let room = self
            .store
            .get_room(room_id)
            .await?
            .ok_or(GameError::CannotStart)?;

        let participants = self.store.list_participants(room_id).await?;
        if room.state != RoomState::Lobby || participants.len() < MIN_PARTICIPANTS_TO_START {
            return Err(GameError::CannotStart);
        }
        if room.settings.impostors >= participants.len() {
            return Err(GameError::TooManyImpostors);
        }

        let ids: Vec<ParticipantId> = participants.iter().map(|p| p.id.clone()).collect();
        let assignment =
            self.with_rng(|rng| rules::assign_roles(&ids, room.settings.impostors, rng));

        for (id, role) in assignment {
            stale_ok(
                self.store
                    .update_participant(
                        &id,
                        ParticipantPatch {
                            role: Some(role),
                            ..ParticipantPatch::reset_vote()
                        },
                    )
                    .await,
            )?;
        }

        self.store
            .update_room(
                room_id,
                RoomPatch {
                    state: Some(RoomState::Playing),
                    winner: Some(None),
                    meeting: Some(None),
                    phase_deadline: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            "Room {} started with {} players, {} impostors",
            room.room_code,
            participants.len(),
            room.settings.impostors
        );

        broadcast_room_state(self, room_id).await?;
        Ok(Outcome::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::store::faulty::FaultyStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    async fn join(state: &AppState, code: &str, name: &str, color: Color) -> (Connection, Participant) {
        let (conn, _rx) = Connection::new();
        let participant = state.join_room(&conn, code, name, color).await.unwrap();
        (conn, participant)
    }

    async fn hosts(state: &AppState, room_id: &str) -> Vec<Participant> {
        state
            .store
            .list_participants(room_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.is_host)
            .collect()
    }

    #[test]
    fn test_generate_room_code_format() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let code = generate_room_code(&mut rng);
            assert_eq!(code.len(), ROOM_CODE_LENGTH);
            assert!(normalize_room_code(&code).unwrap().is_some());
        }
    }

    #[test]
    fn test_normalize_room_code() {
        assert_eq!(
            normalize_room_code(" abc123 ").unwrap(),
            Some("ABC123".to_string())
        );
        assert_eq!(normalize_room_code("").unwrap(), None);
        assert_eq!(normalize_room_code("   ").unwrap(), None);
        assert_eq!(normalize_room_code("ABC12"), Err(GameError::InvalidRoomCode));
        assert_eq!(normalize_room_code("ABC-12"), Err(GameError::InvalidRoomCode));
        assert_eq!(normalize_room_code("ÄBC123"), Err(GameError::InvalidRoomCode));
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username("  Alice ").unwrap(), "Alice");
        assert_eq!(validate_username("   "), Err(GameError::MissingUsername));
        assert_eq!(
            validate_username(&"x".repeat(MAX_USERNAME_CHARS + 1)),
            Err(GameError::UsernameTooLong)
        );
    }

    #[tokio::test]
    async fn test_first_joiner_is_host() {
        let state = AppState::new();
        let (_c1, alice) = join(&state, "ABC123", "Alice", Color::Red).await;
        let (_c2, bob) = join(&state, "abc123", "Bob", Color::Blue).await;

        assert!(alice.is_host);
        assert!(!bob.is_host);
        assert_eq!(alice.room_id, bob.room_id);

        let room = state.store.get_room(&alice.room_id).await.unwrap().unwrap();
        assert_eq!(room.host_id, Some(alice.id.clone()));
        assert_eq!(room.room_code, "ABC123");
        assert_eq!(hosts(&state, &room.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_join_without_code_creates_fresh_room() {
        let state = AppState::seeded(ServerConfig::default(), 11);
        let (_c1, alice) = join(&state, "", "Alice", Color::Red).await;
        let (_c2, bob) = join(&state, "", "Bob", Color::Red).await;

        assert_ne!(alice.room_id, bob.room_id);
        let room = state.store.get_room(&alice.room_id).await.unwrap().unwrap();
        assert!(normalize_room_code(&room.room_code).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_join_rejections() {
        let state = AppState::new();
        let (c1, _alice) = join(&state, "ABC123", "Alice", Color::Red).await;

        let (c2, _rx) = Connection::new();
        assert_eq!(
            state.join_room(&c2, "ABC123", "Bob", Color::Red).await,
            Err(GameError::ColorTaken)
        );
        assert_eq!(
            state.join_room(&c1, "ABC123", "Alice", Color::Blue).await,
            Err(GameError::AlreadyJoined)
        );
        assert_eq!(
            state.join_room(&c2, "AB", "Bob", Color::Blue).await,
            Err(GameError::InvalidRoomCode)
        );
        assert_eq!(
            state.join_room(&c2, "ABC123", "", Color::Blue).await,
            Err(GameError::MissingUsername)
        );
        // Rejected joins leave no session behind
        assert!(!state.sessions.contains(&c2.id).await);
    }

    #[tokio::test]
    async fn test_room_full_at_ten() {
        let state = AppState::new();
        let mut conns = Vec::new();
        for (i, color) in Color::ALL.iter().enumerate() {
            conns.push(join(&state, "FULL10", &format!("P{}", i), *color).await);
        }

        let (extra, _rx) = Connection::new();
        // Color check comes after the size check, so any color reports full
        assert_eq!(
            state.join_room(&extra, "FULL10", "Late", Color::Red).await,
            Err(GameError::Full)
        );
    }

    #[tokio::test]
    async fn test_host_leaving_hands_off() {
        let state = AppState::new();
        let (c1, alice) = join(&state, "ABC123", "Alice", Color::Red).await;
        let (_c2, bob) = join(&state, "ABC123", "Bob", Color::Blue).await;
        let (_c3, _carol) = join(&state, "ABC123", "Carol", Color::Green).await;

        assert_eq!(state.end_session(&c1.id).await.unwrap(), Outcome::Updated);

        let host_list = hosts(&state, &alice.room_id).await;
        assert_eq!(host_list.len(), 1);
        assert_eq!(host_list[0].id, bob.id);
        let room = state.store.get_room(&alice.room_id).await.unwrap().unwrap();
        assert_eq!(room.host_id, Some(bob.id));
    }

    #[tokio::test]
    async fn test_non_host_leaving_keeps_host() {
        let state = AppState::new();
        let (_c1, alice) = join(&state, "ABC123", "Alice", Color::Red).await;
        let (c2, _bob) = join(&state, "ABC123", "Bob", Color::Blue).await;

        state.end_session(&c2.id).await.unwrap();

        let host_list = hosts(&state, &alice.room_id).await;
        assert_eq!(host_list.len(), 1);
        assert_eq!(host_list[0].id, alice.id);
    }

    #[tokio::test]
    async fn test_last_leave_closes_room() {
        let state = AppState::new();
        let (c1, alice) = join(&state, "ABC123", "Alice", Color::Red).await;
        state
            .store
            .create_chat_entry(&alice.room_id, &alice.id, "hi".to_string())
            .await
            .unwrap();

        state.end_session(&c1.id).await.unwrap();

        assert!(state.store.get_room(&alice.room_id).await.unwrap().is_none());
        assert!(state
            .store
            .list_chat_entries(&alice.room_id)
            .await
            .unwrap()
            .is_empty());

        // The code is free again
        let (_c2, bob) = join(&state, "ABC123", "Bob", Color::Red).await;
        assert_ne!(bob.room_id, alice.room_id);
        assert!(bob.is_host);
    }

    #[tokio::test]
    async fn test_join_retries_when_room_closes_underneath() {
        let store = FaultyStore::default();
        let state = AppState::with_store(
            Arc::new(store.clone()),
            ServerConfig::default(),
            StdRng::seed_from_u64(2),
        );
        let (_c1, alice) = join(&state, "ABC123", "Alice", Color::Red).await;

        // The room is found by code, then closes before Bob gets its lock
        store.vanish_next_room_read.store(true, Ordering::SeqCst);
        let (conn, _rx) = Connection::new();
        let bob = state
            .join_room(&conn, "ABC123", "Bob", Color::Blue)
            .await
            .unwrap();

        assert_ne!(bob.room_id, alice.room_id);
        assert!(bob.is_host);
        let room = state.store.get_room(&bob.room_id).await.unwrap().unwrap();
        assert_eq!(room.room_code, "ABC123");
        assert_eq!(room.host_id, Some(bob.id));
    }

    #[tokio::test]
    async fn test_unknown_session_is_noop() {
        let state = AppState::new();
        assert_eq!(state.end_session("nobody").await.unwrap(), Outcome::Ignored);
    }

    #[tokio::test]
    async fn test_start_requires_four() {
        let state = AppState::new();
        let (_c1, alice) = join(&state, "ABC123", "Alice", Color::Red).await;
        let (_c2, _bob) = join(&state, "ABC123", "Bob", Color::Blue).await;
        let (_c3, _) = join(&state, "ABC123", "Carol", Color::Green).await;

        assert_eq!(
            state.start_game(&alice.room_id).await,
            Err(GameError::CannotStart)
        );

        join(&state, "ABC123", "Dave", Color::Yellow).await;
        join(&state, "ABC123", "Erin", Color::Pink).await;
        assert_eq!(
            state.start_game(&alice.room_id).await,
            Ok(Outcome::Updated)
        );

        let room = state.store.get_room(&alice.room_id).await.unwrap().unwrap();
        assert_eq!(room.state, RoomState::Playing);

        let roster = state.store.list_participants(&room.id).await.unwrap();
        let impostors = roster.iter().filter(|p| p.role == Role::Impostor).count();
        assert_eq!(impostors, 2);

        // Second start is refused
        assert_eq!(
            state.start_game(&alice.room_id).await,
            Err(GameError::CannotStart)
        );

        // And nobody can join mid-game
        let (late, _rx) = Connection::new();
        assert_eq!(
            state.join_room(&late, "ABC123", "Late", Color::Brown).await,
            Err(GameError::InProgress)
        );
    }

    #[tokio::test]
    async fn test_start_refuses_impostor_majority_config() {
        let config = ServerConfig {
            default_settings: RoomSettings {
                impostors: 4,
                ..RoomSettings::default()
            },
            ..ServerConfig::default()
        };
        let state = AppState::with_config(config);
        let (_c, host) = join(&state, "ABC123", "Alice", Color::Red).await;
        for (name, color) in [("B", Color::Blue), ("C", Color::Green), ("D", Color::Pink)] {
            join(&state, "ABC123", name, color).await;
        }

        assert_eq!(
            state.start_game(&host.room_id).await,
            Err(GameError::TooManyImpostors)
        );
    }

    #[tokio::test]
    async fn test_start_missing_room() {
        let state = AppState::new();
        assert_eq!(
            state.start_game("nope").await,
            Err(GameError::CannotStart)
        );
    }
}
