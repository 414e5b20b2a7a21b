mod locks;
mod room;
mod round;
pub mod session;
mod vote;

pub use locks::{RoomGuard, RoomLocks};
pub use room::{generate_room_code, normalize_room_code};
pub use session::{Connection, SessionInfo, SessionRegistry};

use crate::config::ServerConfig;
use crate::error::{GameError, StoreError};
use crate::store::{EntityStore, MemoryStore};
use crate::types::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::Mutex;

/// What a game operation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State changed; the room (if it still exists) has been broadcast
    Updated,
    /// Precondition not met or stale reference; nothing changed, nothing sent
    Ignored,
}

/// Shared application state
///
/// Owns the store handle, the live sessions and the per-room locks. Every
/// mutating operation takes its room's lock for the whole
/// read-modify-write-broadcast sequence.
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub sessions: SessionRegistry,
    pub config: ServerConfig,
    room_locks: RoomLocks,
    /// Serializes find-or-create of rooms by code
    creation: Mutex<()>,
    rng: std::sync::Mutex<StdRng>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config, StdRng::from_os_rng())
    }

    /// Deterministic role assignment and room codes, for tests
    pub fn seeded(config: ServerConfig, seed: u64) -> Self {
        Self::with_store(
            Arc::new(MemoryStore::new()),
            config,
            StdRng::seed_from_u64(seed),
        )
    }

    pub fn with_store(store: Arc<dyn EntityStore>, config: ServerConfig, rng: StdRng) -> Self {
        Self {
            store,
            sessions: SessionRegistry::default(),
            config,
            room_locks: RoomLocks::default(),
            creation: Mutex::new(()),
            rng: std::sync::Mutex::new(rng),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    /// The participant, if it exists and belongs to this room
    async fn member(
        &self,
        room_id: &str,
        participant_id: &str,
    ) -> Result<Option<Participant>, GameError> {
        Ok(self
            .store
            .get_participant(participant_id)
            .await?
            .filter(|p| p.room_id == room_id))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Treat a vanished entity as "nothing to do"
fn stale_ok<T>(result: Result<T, StoreError>) -> Result<Option<T>, StoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => {
            tracing::debug!("Skipping stale reference: {}", err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
